//! Error types for the game engine.
//!
//! [`EngineError`] wraps every lower-layer failure so callers of the
//! engine and of the call surface propagate a single type with `?`.

use supplysim_core::{ClockError, ConfigError};
use supplysim_nodes::NodeError;
use supplysim_store::StoreError;
use supplysim_types::EngineId;

/// Top-level error of a game instance.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Illegal clock or stage transition.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A node or component rejected the operation.
    #[error("node error: {source}")]
    Node {
        /// The underlying node error.
        #[from]
        source: NodeError,
    },

    /// Persisting engine state failed. Retryable.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// No node of that name in this game.
    #[error("node not found: {name}")]
    NodeNotFound {
        /// Requested node name.
        name: String,
    },

    /// The call surface does not know the component name.
    #[error("unknown component: {name}")]
    UnknownComponent {
        /// Requested component name.
        name: String,
    },

    /// The component has no such action.
    #[error("action not found: {component}.{action}")]
    ActionNotFound {
        /// Component name.
        component: String,
        /// Requested action.
        action: String,
    },

    /// Call arguments did not match the action's shape.
    #[error("invalid arguments for {action}: {reason}")]
    InvalidArguments {
        /// Action being called.
        action: String,
        /// What was wrong.
        reason: String,
    },

    /// No game with that id is loaded.
    #[error("game not found: {0}")]
    GameNotFound(EngineId),
}
