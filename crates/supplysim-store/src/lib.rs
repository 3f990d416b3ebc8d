//! Durable state for Supplysim components.
//!
//! Every component keeps its state in memory as a plain struct and
//! persists it as one JSON document after each mutation. The store itself
//! is an opaque keyed map: either in-process ([`MemoryStore`]) or a
//! `Dragonfly` server ([`DragonflyStore`]).
//!
//! # Modules
//!
//! - [`document`] -- [`Document`]: commit/persist protocol over one key
//! - [`store`] -- [`DocumentStore`]: backend-agnostic load/save
//! - [`memory`] -- In-process backend
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) backend
//! - [`error`] -- Shared error type

pub mod document;
pub mod dragonfly;
pub mod error;
pub mod memory;
pub mod store;

pub use document::Document;
pub use dragonfly::DragonflyStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use store::DocumentStore;
