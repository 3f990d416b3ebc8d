//! One game instance: clock, nodes, scheduler and notification channels.
//!
//! The engine is the only owner of game time. Every clock transition is
//! committed to the engine document (`"{engine_id}:engine"`) together with
//! the scheduler, so a reloaded game resumes its stage, day and pending
//! deferred effects.
//!
//! # Tick flow
//!
//! ```text
//! tick() --> GameClock::tick --> Ticked(gt)  --> drain scheduler at gt --> run tasks
//!                            \-> DayEnded    --> storage cost per node
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use supplysim_core::config::GameConfig;
use supplysim_core::{Emitter, GameClock, Notifier, Scheduler, StageChange, TickOutcome};
use supplysim_nodes::{Node, NodeInfo};
use supplysim_store::{Document, DocumentStore};
use supplysim_types::{
    ComponentKind, EngineId, GameTime, Notification, NotificationKind, Stage, TickInstant,
};

use crate::error::EngineError;
use crate::task::ScheduledTask;

/// Persisted engine state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    /// Game time and stage.
    pub clock: GameClock,
    /// Deferred effects keyed by the instant they are due.
    pub scheduler: Scheduler<ScheduledTask>,
}

/// A running game.
#[derive(Debug)]
pub struct Engine {
    id: EngineId,
    name: String,
    tick_interval: Duration,
    state: Document<EngineState>,
    nodes: BTreeMap<String, Node>,
    notifier: Notifier,
    clock_emitter: Emitter,
}

impl Engine {
    /// Load the game `id` from `store`, or create it from `config`.
    ///
    /// Receivers are wired to the markets they list before any node is
    /// built, then every node loads its components. A game that has never
    /// left `CONSTRUCTED` gets the markets' news schedules queued.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] if the clock settings are invalid or any
    /// node or the engine document fails to load.
    pub async fn load(
        id: EngineId,
        config: &GameConfig,
        store: DocumentStore,
    ) -> Result<Self, EngineError> {
        let clock = GameClock::new(config.game.game_days, config.game.day_length)?;
        let mut notifier = Notifier::new(id);

        for node in &config.nodes {
            let c = &node.components;
            if let Some(receiver) = &c.bidding_receiver {
                for market in &receiver.markets {
                    notifier.relay(
                        (market.clone(), Some(ComponentKind::BiddingMarket)),
                        (node.name.clone(), Some(ComponentKind::BiddingReceiver)),
                    );
                }
            }
            if let Some(receiver) = &c.market_receiver {
                for market in &receiver.markets {
                    notifier.relay(
                        (market.clone(), Some(ComponentKind::Market)),
                        (node.name.clone(), Some(ComponentKind::MarketReceiver)),
                    );
                }
            }
        }

        let mut nodes = BTreeMap::new();
        for node_config in &config.nodes {
            let node = Box::pin(Node::load(&store, id, node_config, &mut notifier)).await?;
            nodes.insert(node_config.name.clone(), node);
        }

        let fresh = EngineState {
            clock,
            scheduler: Scheduler::new(),
        };
        let state = Document::load_or_create(store, format!("{id}:engine"), move || fresh).await?;
        let clock_emitter = notifier.clock_emitter();

        let mut engine = Self {
            id,
            name: config.game.name.clone(),
            tick_interval: Duration::from_millis(config.game.tick_interval_ms),
            state,
            nodes,
            notifier,
            clock_emitter,
        };

        let snapshot = engine.state.state();
        if snapshot.clock.stage() == Stage::Constructed && snapshot.scheduler.is_empty() {
            engine.schedule_news().await?;
        }

        info!(
            engine = %id,
            game = %engine.name,
            nodes = engine.nodes.len(),
            stage = %engine.stage(),
            game_time = %engine.game_time(),
            "Game loaded"
        );
        Ok(engine)
    }

    /// Game id.
    pub const fn id(&self) -> EngineId {
        self.id
    }

    /// Display name from configuration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wall-clock time between ticks.
    pub const fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// The clock.
    pub const fn clock(&self) -> &GameClock {
        &self.state.state().clock
    }

    /// Current stage.
    pub const fn stage(&self) -> Stage {
        self.clock().stage()
    }

    /// Current game time.
    pub const fn game_time(&self) -> GameTime {
        self.clock().game_time()
    }

    /// Pending deferred effects, soonest first.
    pub fn pending_tasks(&self) -> impl Iterator<Item = (TickInstant, &ScheduledTask)> {
        self.state.state().scheduler.pending()
    }

    /// Node names.
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Look up a node.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NodeNotFound`] for an unknown name.
    pub fn node(&self, name: &str) -> Result<&Node, EngineError> {
        self.nodes.get(name).ok_or_else(|| EngineError::NodeNotFound {
            name: name.to_owned(),
        })
    }

    /// Look up a node for mutation.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NodeNotFound`] for an unknown name.
    pub fn node_mut(&mut self, name: &str) -> Result<&mut Node, EngineError> {
        self.nodes
            .get_mut(name)
            .ok_or_else(|| EngineError::NodeNotFound {
                name: name.to_owned(),
            })
    }

    /// Summaries of every node.
    pub fn info(&self) -> Vec<NodeInfo> {
        self.nodes.values().map(Node::info).collect()
    }

    /// Subscribe to the clock's notifications.
    pub fn subscribe_clock(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe_clock()
    }

    /// Subscribe to one component's notifications.
    ///
    /// Returns `None` if the node does not own a component of that kind.
    pub fn subscribe(
        &self,
        node: &str,
        kind: ComponentKind,
    ) -> Option<broadcast::Receiver<Notification>> {
        self.notifier.subscribe(node, Some(kind))
    }

    /// Advance the stage. Entering `START` starts day 1 and runs whatever
    /// is due at its first instant.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Clock`] for an illegal transition, with
    /// nothing changed.
    pub async fn next_stage(&mut self) -> Result<StageChange, EngineError> {
        let change = self
            .state
            .commit(|state: &mut EngineState| state.clock.next_stage().map_err(EngineError::from))
            .await?;

        self.clock_emitter.emit(
            NotificationKind::StageChanged,
            self.game_time(),
            json!({ "from": change.from, "to": change.to }),
        );
        if let Some(day) = change.day_started {
            self.day_started(day).await?;
        }
        Ok(change)
    }

    /// Start the next working day.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Clock`] outside `START`, while a day is
    /// running, or once every day has been played.
    pub async fn next_day(&mut self) -> Result<GameTime, EngineError> {
        let game_time = self
            .state
            .commit(|state: &mut EngineState| state.clock.next_day().map_err(EngineError::from))
            .await?;
        self.day_started(game_time).await?;
        Ok(game_time)
    }

    /// Fire one tick.
    ///
    /// A normal tick runs every task due at the new instant. The tick after
    /// the day's last one ends the day instead and charges warehousing on
    /// every node; on the final day the stage moves to `FINAL`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Clock`] outside a working day.
    pub async fn tick(&mut self) -> Result<TickOutcome, EngineError> {
        let from = self.stage();
        let outcome = self
            .state
            .commit(|state: &mut EngineState| state.clock.tick().map_err(EngineError::from))
            .await?;

        match outcome {
            TickOutcome::Ticked(game_time) => {
                self.clock_emitter
                    .emit(NotificationKind::Tick, game_time, json!(game_time));
                self.run_due(game_time).await?;
            }
            TickOutcome::DayEnded {
                game_time,
                final_day,
            } => {
                for (name, node) in &mut self.nodes {
                    match node.count_storage_cost(game_time).await {
                        Ok(charged) if !charged.is_zero() => {
                            debug!(node = %name, %charged, "Storage cost charged");
                        }
                        Ok(_) => {}
                        Err(error) => warn!(node = %name, %error, "Storage cost failed"),
                    }
                }
                self.clock_emitter.emit(
                    NotificationKind::DayEnded,
                    game_time,
                    json!({ "day": game_time.day, "finalDay": final_day }),
                );
                if final_day {
                    self.clock_emitter.emit(
                        NotificationKind::StageChanged,
                        game_time,
                        json!({ "from": from, "to": self.stage() }),
                    );
                }
            }
        }
        Ok(outcome)
    }

    /// Queue `task` to run once the clock reaches `at`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Store`] if the scheduler cannot be persisted.
    pub async fn schedule(&mut self, at: TickInstant, task: ScheduledTask) -> Result<(), EngineError> {
        debug!(%at, ?task, "Task scheduled");
        self.state
            .commit(|state: &mut EngineState| {
                state.scheduler.schedule(at, task);
                Ok::<_, EngineError>(())
            })
            .await
    }

    async fn day_started(&mut self, game_time: GameTime) -> Result<(), EngineError> {
        self.clock_emitter
            .emit(NotificationKind::DayStarted, game_time, json!(game_time));
        self.run_due(game_time).await
    }

    /// Run every task due at or before `game_time`, oldest first.
    ///
    /// A failing task is logged and does not stop the others.
    async fn run_due(&mut self, game_time: GameTime) -> Result<(), EngineError> {
        let due = self
            .state
            .commit(|state: &mut EngineState| {
                Ok::<_, EngineError>(state.scheduler.drain_due(game_time.instant()))
            })
            .await?;

        for task in due {
            if let Err(error) = self.run_task(&task, game_time).await {
                warn!(?task, %error, "Scheduled task failed");
            }
        }
        Ok(())
    }

    async fn run_task(&mut self, task: &ScheduledTask, game_time: GameTime) -> Result<(), EngineError> {
        match task {
            ScheduledTask::CompleteShipment { node, shipment } => {
                let landed = self
                    .node_mut(node)?
                    .complete_shipment(*shipment, game_time)
                    .await?;
                debug!(node = %node, %shipment, landed, "Shipment completion ran");
            }
            ScheduledTask::ReleaseBiddingNews { node, index } => {
                self.node_mut(node)?
                    .bidding_market_mut()?
                    .release_news(*index, game_time)
                    .await?;
            }
            ScheduledTask::ReleaseMarketNews { node, index } => {
                self.node_mut(node)?
                    .market_mut()?
                    .release_news(*index, game_time)
                    .await?;
            }
        }
        Ok(())
    }

    async fn schedule_news(&mut self) -> Result<(), EngineError> {
        let mut tasks = Vec::new();
        for (name, node) in &self.nodes {
            if let Ok(market) = node.bidding_market() {
                for (index, news) in market.news_schedule().iter().enumerate() {
                    tasks.push((
                        TickInstant {
                            day: news.day,
                            time: news.time,
                        },
                        ScheduledTask::ReleaseBiddingNews {
                            node: name.clone(),
                            index,
                        },
                    ));
                }
            }
            if let Ok(market) = node.market() {
                for (index, news) in market.news_schedule().iter().enumerate() {
                    tasks.push((
                        TickInstant {
                            day: news.day,
                            time: news.time,
                        },
                        ScheduledTask::ReleaseMarketNews {
                            node: name.clone(),
                            index,
                        },
                    ));
                }
            }
        }
        if tasks.is_empty() {
            return Ok(());
        }

        info!(engine = %self.id, news = tasks.len(), "News scheduled");
        self.state
            .commit(|state: &mut EngineState| {
                for (at, task) in tasks {
                    state.scheduler.schedule(at, task);
                }
                Ok::<_, EngineError>(())
            })
            .await
    }
}
