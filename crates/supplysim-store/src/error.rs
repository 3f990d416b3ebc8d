//! Error types for the document store.
//!
//! All errors are propagated via [`StoreError`]. Every variant is a
//! rejected persistence round-trip: the caller may retry the operation.

/// Errors that can occur while loading or persisting documents.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store refused the write.
    #[error("Write rejected for key {0}")]
    WriteRejected(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
