//! Game engine for Supplysim.
//!
//! An [`Engine`] is one game instance. It owns the clock, the nodes and the
//! scheduler of deferred effects, runs the workflows that span nodes, and
//! exposes everything through a string-addressed call surface.
//!
//! # Modules
//!
//! - [`engine`] -- [`Engine`]: clock transitions, ticks, scheduled tasks
//! - [`workflows`] -- shipments, negotiation, spot sales, assembly
//! - [`call`] -- `(node, component, action, args)` dispatch over JSON
//! - [`runtime`] -- [`GameHandle`] tick loop and the [`Games`] registry
//! - [`task`] -- [`ScheduledTask`]: effects due at an exact tick
//! - [`error`] -- [`EngineError`]

pub mod call;
pub mod engine;
pub mod error;
pub mod runtime;
pub mod task;
pub mod workflows;

pub use engine::{Engine, EngineState};
pub use error::EngineError;
pub use runtime::{GameHandle, Games};
pub use task::ScheduledTask;
pub use workflows::{Sale, Shipment};
