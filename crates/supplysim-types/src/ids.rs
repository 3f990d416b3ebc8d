//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Games, nodes, journal entries, shipments and bidding items each carry a
//! strongly-typed ID so they cannot be mixed up at compile time. All IDs use
//! UUID v7 (time-ordered), which keeps persisted journals sortable by
//! creation order.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for one game instance (one engine, one clock).
    EngineId
}

define_id! {
    /// Persisted identifier of a node. The node name stays the lookup key.
    NodeId
}

define_id! {
    /// Unique identifier for a posted ledger transaction.
    TransactionId
}

define_id! {
    /// Unique identifier for a logistics shipment journal item.
    ShipmentId
}

define_id! {
    /// Unique identifier for a bidding (negotiation) item.
    BiddingItemId
}
