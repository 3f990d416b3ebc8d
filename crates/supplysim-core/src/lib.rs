//! Clock, scheduling, configuration, and notification plumbing for
//! Supplysim games.
//!
//! # Modules
//!
//! - [`clock`] -- [`GameClock`]: game time and the stage machine
//! - [`scheduler`] -- [`Scheduler`]: one-shot tasks keyed by tick instant
//! - [`pacer`] -- [`TickPacer`]: drift-free wall-clock tick deadlines
//! - [`config`] -- YAML game configuration
//! - [`notify`] -- Per-component broadcast channels
//!
//! # Tick flow
//!
//! ```text
//! TickPacer deadline --> GameClock::tick --> Scheduler::drain_due(now)
//!                                                  |
//!                       node components <-- engine runs due tasks
//! ```

pub mod clock;
pub mod config;
pub mod notify;
pub mod pacer;
pub mod scheduler;

pub use clock::{ClockError, GameClock, StageChange, TickOutcome};
pub use config::{ConfigError, GameConfig};
pub use notify::{Emitter, Notifier};
pub use pacer::TickPacer;
pub use scheduler::Scheduler;
