//! Shared type definitions for the Supplysim business game engine.
//!
//! This crate is the single source of truth for the value types exchanged
//! between components, persisted in documents, and published to external
//! consumers. Types flow to `TypeScript` via `ts-rs` for the game client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for games, nodes, journal entries
//! - [`time`] -- [`GameTime`], [`TickInstant`] and the game [`Stage`]
//! - [`enums`] -- Classifications, stock modes, bidding stages, roles
//! - [`structs`] -- Goods lines, transactions, lots, journals, bidding items
//! - [`notification`] -- Notification envelope and event names
//! - [`permissions`] -- Role to action/notification tables

pub mod enums;
pub mod ids;
pub mod notification;
pub mod permissions;
pub mod structs;
pub mod time;

// Re-export all public types at crate root for convenience.
pub use enums::{
    BiddingStage, ChainSide, Classification, ComponentKind, EntrySide, InventoryMode, Role,
    TransportationStatus,
};
pub use ids::{BiddingItemId, EngineId, NodeId, ShipmentId, TransactionId};
pub use notification::{Notification, NotificationKind};
pub use permissions::{allowed_actions, subscribable_notifications};
pub use structs::{
    AssemblyRecord, BiddingItem, GoodsLine, GoodsQuantity, InventoryAction,
    InventoryJournalItem, IoJournalItem, JournalEntry, LedgerItem, NewsItem, ShipmentDirection,
    StockLot, Transaction, TransactionLine, goods_total,
};
pub use time::{GameTime, Stage, TickInstant};
