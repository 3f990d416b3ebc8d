//! Running games: the paced tick loop and the registry of loaded games.
//!
//! A game is shared behind a [`tokio::sync::Mutex`] so the tick loop and
//! call-surface requests take turns; each holds the lock for one tick or
//! one call, which keeps every operation on a game strictly sequential.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock};
use tokio::time::sleep_until;
use tracing::info;

use supplysim_core::config::GameConfig;
use supplysim_core::{TickOutcome, TickPacer};
use supplysim_store::DocumentStore;
use supplysim_types::{EngineId, Stage};

use crate::engine::Engine;
use crate::error::EngineError;

/// Shared handle to one running game.
#[derive(Debug, Clone)]
pub struct GameHandle {
    engine: Arc<Mutex<Engine>>,
}

impl GameHandle {
    /// Wrap a loaded engine.
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
        }
    }

    /// Exclusive access to the engine.
    pub async fn lock(&self) -> MutexGuard<'_, Engine> {
        self.engine.lock().await
    }

    /// Fire the rest of the current working day at the game's tick
    /// interval and return the day-end outcome.
    ///
    /// Deadlines are measured from the moment this is called, so a slow
    /// tick shortens the following wait rather than delaying every later
    /// tick.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Clock`] if no day is running.
    pub async fn run_day(&self) -> Result<TickOutcome, EngineError> {
        let interval = self.lock().await.tick_interval();
        let pacer = TickPacer::start(interval);
        let mut tick: u32 = 1;
        loop {
            sleep_until(pacer.deadline(tick)).await;
            let outcome = self.lock().await.tick().await?;
            if matches!(outcome, TickOutcome::DayEnded { .. }) {
                return Ok(outcome);
            }
            tick = tick.saturating_add(1);
        }
    }

    /// Play every remaining day, starting each as soon as the previous one
    /// ends. Returns once the game leaves `START`.
    ///
    /// # Errors
    ///
    /// Returns the first clock or persistence error.
    pub async fn run_game(&self) -> Result<(), EngineError> {
        loop {
            let (stage, game_time) = {
                let engine = self.lock().await;
                (engine.stage(), engine.game_time())
            };
            if stage != Stage::Start {
                return Ok(());
            }
            if game_time.is_working {
                self.run_day().await?;
            } else {
                self.lock().await.next_day().await?;
            }
        }
    }
}

/// Loaded games by id.
#[derive(Debug)]
pub struct Games {
    store: DocumentStore,
    games: RwLock<BTreeMap<EngineId, GameHandle>>,
}

impl Games {
    /// An empty registry backed by `store`.
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            games: RwLock::new(BTreeMap::new()),
        }
    }

    /// Return the loaded game `id`, or load it from the store (creating it
    /// from `config` if it was never saved).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if loading fails.
    pub async fn open(&self, id: EngineId, config: &GameConfig) -> Result<GameHandle, EngineError> {
        if let Some(game) = self.games.read().await.get(&id) {
            return Ok(game.clone());
        }
        let mut games = self.games.write().await;
        if let Some(game) = games.get(&id) {
            return Ok(game.clone());
        }
        let engine = Box::pin(Engine::load(id, config, self.store.clone())).await?;
        let game = GameHandle::new(engine);
        games.insert(id, game.clone());
        info!(engine = %id, loaded = games.len(), "Game registered");
        Ok(game)
    }

    /// A loaded game.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] if `id` is not loaded.
    pub async fn get(&self, id: EngineId) -> Result<GameHandle, EngineError> {
        self.games
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(EngineError::GameNotFound(id))
    }

    /// Unload a game. Its persisted state stays in the store.
    pub async fn close(&self, id: EngineId) -> Option<GameHandle> {
        let game = self.games.write().await.remove(&id);
        if game.is_some() {
            info!(engine = %id, "Game unloaded");
        }
        game
    }

    /// Ids of loaded games.
    pub async fn ids(&self) -> Vec<EngineId> {
        self.games.read().await.keys().copied().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio::time::Instant;

    use supplysim_types::GameTime;

    use super::*;

    const YAML: &str = r"
game:
  game_days: 2
  day_length: 5
  tick_interval_ms: 1000
";

    async fn started() -> GameHandle {
        let config = GameConfig::parse(YAML).unwrap();
        let engine = Engine::load(EngineId::new(), &config, DocumentStore::memory())
            .await
            .unwrap();
        let game = GameHandle::new(engine);
        {
            let mut engine = game.lock().await;
            while engine.stage() != Stage::Start {
                engine.next_stage().await.unwrap();
            }
        }
        game
    }

    #[tokio::test(start_paused = true)]
    async fn a_day_takes_day_length_intervals() {
        let game = started().await;
        let begin = Instant::now();
        let outcome = game.run_day().await.unwrap();
        assert!(matches!(outcome, TickOutcome::DayEnded { final_day: false, .. }));
        assert_eq!(begin.elapsed(), Duration::from_secs(5));
        let gt = game.lock().await.game_time();
        assert_eq!((gt.day, gt.time, gt.is_working), (1, 4, false));
    }

    #[tokio::test(start_paused = true)]
    async fn run_game_plays_to_final() {
        let game = started().await;
        game.run_game().await.unwrap();
        let engine = game.lock().await;
        assert_eq!(engine.stage(), Stage::Final);
        assert_eq!(engine.game_time().day, 2);
        assert_ne!(engine.game_time(), GameTime::working(2, 4));
    }

    #[tokio::test]
    async fn registry_reports_missing_games() {
        let games = Games::new(DocumentStore::memory());
        let id = EngineId::new();
        assert!(matches!(
            games.get(id).await,
            Err(EngineError::GameNotFound(missing)) if missing == id
        ));

        let config = GameConfig::parse(YAML).unwrap();
        games.open(id, &config).await.unwrap();
        assert!(games.get(id).await.is_ok());
        assert_eq!(games.ids().await, vec![id]);
        assert!(games.close(id).await.is_some());
        assert!(games.get(id).await.is_err());
    }
}
