//! Enumeration types shared by every Supplysim crate.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Bookkeeping
// ---------------------------------------------------------------------------

/// A ledger classification (chart-of-accounts entry).
///
/// Balances are kept per classification as debit total minus credit total,
/// so asset and expense classifications normally carry positive balances
/// and revenue, liability and equity classifications negative ones.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub enum Classification {
    // --- Assets ---
    /// Money on hand.
    Cash,
    /// Money owed to the node.
    AccountsReceivable,
    /// Goods on hand, valued at cost.
    Inventory,
    /// Long-lived production equipment.
    Equipment,

    // --- Liabilities and equity ---
    /// Money the node owes.
    AccountsPayable,
    /// Owner capital seeded at game start.
    Capital,

    // --- Revenue ---
    /// Revenue from goods sold.
    Sales,
    /// Compensation received when a counterparty breaks a contract.
    IncomeFromCounterPartyDefault,

    // --- Expenses ---
    /// Cost of the goods sold, computed by FIFO lot walk.
    CostOfSales,
    /// Warehousing cost charged at the end of each working day.
    CostOfWarehousing,
    /// Transit cost paid by the exporter of a shipment.
    TransportationCost,
    /// Penalty paid when this node breaks a contract.
    CounterPartyDefault,
}

impl core::fmt::Display for Classification {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Which side of a transaction a ledger item was posted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EntrySide {
    /// Adds to the classification balance.
    Debit,
    /// Subtracts from the classification balance.
    Credit,
}

// ---------------------------------------------------------------------------
// Stock and logistics
// ---------------------------------------------------------------------------

/// Stock-keeping mode of an inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum InventoryMode {
    /// Every import creates a priced lot; exports consume lots FIFO.
    #[default]
    Perpetual,
    /// Imports and exports do not touch stock; quantities are registered.
    Periodic,
}

/// Transit status of a logistics shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum TransportationStatus {
    /// Goods are on the way; stock lands when the transit time elapses.
    Delivering,
    /// Goods have arrived.
    #[default]
    Completed,
}

// ---------------------------------------------------------------------------
// Negotiation market
// ---------------------------------------------------------------------------

/// Lifecycle stage of a bidding item. Transitions are one-directional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum BiddingStage {
    /// Created but not yet published.
    Constructed,
    /// Published and open for signing.
    Bidding,
    /// Signed by an opposite-chain counterparty.
    Signed,
    /// Goods delivered; terminal.
    Completed,
    /// Contract broken after signing; terminal.
    Breakoff,
    /// Withdrawn by the publisher before signing; terminal.
    Canceled,
}

impl BiddingStage {
    /// Whether no further transition is possible.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Breakoff | Self::Canceled)
    }
}

/// Which side of a market's supply chain a participant sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ChainSide {
    /// A supplier of the market.
    Upstream,
    /// A customer of the market.
    Downstream,
}

impl ChainSide {
    /// The opposite side of the chain.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Upstream => Self::Downstream,
            Self::Downstream => Self::Upstream,
        }
    }
}

// ---------------------------------------------------------------------------
// Components and permissions
// ---------------------------------------------------------------------------

/// The kind of a node component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ComponentKind {
    /// Double-entry ledger.
    Account,
    /// Lot-costed stock ledger.
    Inventory,
    /// Import/export logistics channel.
    Io,
    /// Negotiation market between fixed upstream/downstream nodes.
    BiddingMarket,
    /// Per-node proxy to one or more negotiation markets.
    BiddingReceiver,
    /// Spot market with a needs board.
    Market,
    /// Per-node proxy selling into spot markets.
    MarketReceiver,
    /// Bill-of-materials production.
    Assembly,
}

impl ComponentKind {
    /// Every component kind, in registry order.
    pub const ALL: [Self; 8] = [
        Self::Account,
        Self::Inventory,
        Self::Io,
        Self::BiddingMarket,
        Self::BiddingReceiver,
        Self::Market,
        Self::MarketReceiver,
        Self::Assembly,
    ];

    /// The `snake_case` name used on the call surface and in config.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Inventory => "inventory",
            Self::Io => "io",
            Self::BiddingMarket => "bidding_market",
            Self::BiddingReceiver => "bidding_receiver",
            Self::Market => "market",
            Self::MarketReceiver => "market_receiver",
            Self::Assembly => "assembly",
        }
    }
}

impl core::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown component kind: {s}"))
    }
}

/// A caller role consulted by the external permission layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Role {
    /// Game operator: may drive every component.
    Admin,
    /// The player that owns the node.
    Owner,
    /// Any other participant: read-only access.
    Guest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_kind_round_trips_through_str() {
        for kind in ComponentKind::ALL {
            let parsed: Result<ComponentKind, _> = kind.as_str().parse();
            assert_eq!(parsed, Ok(kind));
        }
        assert!("warehouse".parse::<ComponentKind>().is_err());
    }

    #[test]
    fn terminal_bidding_stages() {
        assert!(!BiddingStage::Bidding.is_terminal());
        assert!(!BiddingStage::Signed.is_terminal());
        assert!(BiddingStage::Completed.is_terminal());
        assert!(BiddingStage::Breakoff.is_terminal());
        assert!(BiddingStage::Canceled.is_terminal());
    }

    #[test]
    fn classification_uses_plain_names() {
        let json = serde_json::to_string(&Classification::AccountsReceivable).unwrap_or_default();
        assert_eq!(json, "\"AccountsReceivable\"");
    }

    #[test]
    fn chain_sides_are_opposites() {
        assert_eq!(ChainSide::Upstream.opposite(), ChainSide::Downstream);
        assert_eq!(ChainSide::Downstream.opposite(), ChainSide::Upstream);
    }
}
