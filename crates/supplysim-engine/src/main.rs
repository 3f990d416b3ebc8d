//! Supplysim engine binary.
//!
//! Loads a game from a YAML file, walks it through the preparation stages,
//! plays every day at the configured tick interval, and closes it.
//!
//! ```bash
//! supplysim-engine game.yaml
//! SUPPLYSIM_GAME_ID=<uuid> supplysim-engine game.yaml   # resume a saved game
//! ```

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use supplysim_core::config::{GameConfig, LogFormat, LoggingConfig, StoreBackend};
use supplysim_engine::Games;
use supplysim_store::DocumentStore;
use supplysim_types::{EngineId, Stage};

const DEFAULT_CONFIG: &str = "supplysim.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, the store, or the game fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG), PathBuf::from);
    let config = GameConfig::from_file(&path)
        .with_context(|| format!("loading {}", path.display()))?;
    init_tracing(&config.logging);

    info!(
        game = %config.game.name,
        game_days = config.game.game_days,
        day_length = config.game.day_length,
        tick_interval_ms = config.game.tick_interval_ms,
        nodes = config.nodes.len(),
        "Configuration loaded"
    );

    let store = match config.store.backend {
        StoreBackend::Memory => DocumentStore::memory(),
        StoreBackend::Dragonfly => DocumentStore::dragonfly(&config.store.dragonfly_url)
            .await
            .context("connecting to Dragonfly")?,
    };

    let id = match std::env::var("SUPPLYSIM_GAME_ID") {
        Ok(raw) => raw.parse::<EngineId>().context("parsing SUPPLYSIM_GAME_ID")?,
        Err(_) => EngineId::new(),
    };

    let games = Games::new(store);
    let game = games.open(id, &config).await?;

    {
        let mut engine = game.lock().await;
        while engine.stage() < Stage::Start {
            engine.next_stage().await?;
        }
    }
    game.run_game().await?;

    let mut engine = game.lock().await;
    if engine.stage() == Stage::Final {
        engine.next_stage().await?;
    }
    for node in engine.info() {
        info!(
            node = %node.name,
            summary = %serde_json::to_string(&node)?,
            "Final state"
        );
    }
    info!(engine = %id, stage = %engine.stage(), "Game over");
    Ok(())
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
