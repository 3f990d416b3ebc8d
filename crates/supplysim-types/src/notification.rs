//! Read-only notifications published by the clock and by node components.
//!
//! Every notification carries the same envelope (`type`, `target`, wall
//! time, game time, node name, engine id) plus a kind-specific JSON
//! payload. External consumers subscribe; nothing flows back in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::EngineId;
use crate::time::GameTime;

/// The event name of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum NotificationKind {
    // --- Clock ---
    /// The game stage changed.
    StageChanged,
    /// A new working day started.
    DayStarted,
    /// The working day ended (`is_working` flipped to false).
    DayEnded,
    /// One tick elapsed.
    Tick,

    // --- Negotiation market ---
    /// A bidding item was published.
    BiddingReleased,
    /// A bidding item was signed.
    BiddingSigned,
    /// A bidding item was withdrawn by its publisher.
    BiddingCanceled,
    /// A signed bidding item was broken off.
    BiddingBreakoff,
    /// A bidding item was delivered.
    BiddingCompleted,
    /// Scheduled bidding-market news was released.
    BiddingNewsPublished,

    // --- Logistics ---
    /// A shipment was accepted by the importer.
    Import,
    /// A shipment was sent by the exporter.
    Export,
    /// A delayed shipment arrived.
    Complete,

    // --- Stock ---
    /// Goods stocked.
    InventoryImport,
    /// Goods shipped out of stock.
    InventoryExport,
    /// Stock quantities force-set.
    InventoryRegist,
    /// Warehousing cost charged.
    InventoryStorageCost,

    // --- Spot market ---
    /// The needs board changed.
    NeedsChange,
    /// Scheduled market news was released.
    NewsPublished,

    // --- Assembly ---
    /// A production run completed.
    Assembled,
}

/// A notification envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Notification {
    /// Event name.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    /// What the event is about (component kind, item id, ...).
    pub target: String,
    /// Wall-clock time of publication.
    pub time: DateTime<Utc>,
    /// Game time of publication.
    pub game_time: GameTime,
    /// Publishing node, empty for clock events.
    pub node_name: String,
    /// Owning game.
    pub engine_id: EngineId,
    /// Kind-specific payload.
    #[ts(type = "unknown")]
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_type_key() {
        let n = Notification {
            kind: NotificationKind::InventoryStorageCost,
            target: String::from("inventory"),
            time: Utc::now(),
            game_time: GameTime::working(1, 3),
            node_name: String::from("factory"),
            engine_id: EngineId::new(),
            payload: serde_json::json!({"cost": "4"}),
        };
        let json = serde_json::to_value(&n).unwrap_or_default();
        assert_eq!(json["type"], "inventory-storage-cost");
        assert_eq!(json["nodeName"], "factory");
        assert_eq!(json["gameTime"]["day"], 1);
    }
}
