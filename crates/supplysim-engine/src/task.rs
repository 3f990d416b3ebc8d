//! Deferred effects the clock resolves at an exact tick.

use serde::{Deserialize, Serialize};

use supplysim_types::ShipmentId;

/// A one-shot task waiting in the engine's scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScheduledTask {
    /// Land a delivering shipment in the importer's stock.
    CompleteShipment {
        /// Importing node.
        node: String,
        /// Shipment to complete.
        shipment: ShipmentId,
    },
    /// Publish a negotiation market's scheduled news item.
    ReleaseBiddingNews {
        /// Node hosting the market.
        node: String,
        /// Index into the market's news schedule.
        index: usize,
    },
    /// Publish a spot market's scheduled news item.
    ReleaseMarketNews {
        /// Node hosting the market.
        node: String,
        /// Index into the market's news schedule.
        index: usize,
    },
}
