//! Core record types: goods lines, transactions, stock lots, journals,
//! bidding items, and market needs.
//!
//! Money is always [`Decimal`]; goods quantities are whole units (`u64`).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{
    BiddingStage, ChainSide, Classification, EntrySide, TransportationStatus,
};
use crate::ids::{BiddingItemId, ShipmentId, TransactionId};
use crate::time::GameTime;

// ---------------------------------------------------------------------------
// Goods
// ---------------------------------------------------------------------------

/// A priced quantity of one good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct GoodsLine {
    /// Good name, e.g. `"Body"`.
    pub name: String,
    /// Number of units.
    pub unit: u64,
    /// Price per unit.
    #[serde(default, alias = "unit_price")]
    #[ts(as = "String")]
    pub unit_price: Decimal,
}

impl GoodsLine {
    /// Build a goods line.
    pub fn new(name: impl Into<String>, unit: u64, unit_price: Decimal) -> Self {
        Self {
            name: name.into(),
            unit,
            unit_price,
        }
    }

    /// `unit * unit_price`, or `None` on overflow.
    pub fn amount(&self) -> Option<Decimal> {
        Decimal::from(self.unit).checked_mul(self.unit_price)
    }
}

/// Sum of `unit * unit_price` over a set of goods lines.
///
/// Returns `None` on overflow.
pub fn goods_total(goods: &[GoodsLine]) -> Option<Decimal> {
    goods
        .iter()
        .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.amount()?))
}

/// An unpriced quantity of one good (bill-of-materials line, stock query).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GoodsQuantity {
    /// Good name.
    pub name: String,
    /// Number of units.
    pub unit: u64,
}

// ---------------------------------------------------------------------------
// Double-entry bookkeeping
// ---------------------------------------------------------------------------

/// One side-line of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct TransactionLine {
    /// Amount posted; must be positive.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// Classification the amount is posted to.
    pub classification: Classification,
    /// The node (or other object) on the other side of the exchange.
    #[serde(default)]
    pub counter_object: Option<String>,
}

impl TransactionLine {
    /// Build a line without a counter object.
    pub const fn new(amount: Decimal, classification: Classification) -> Self {
        Self {
            amount,
            classification,
            counter_object: None,
        }
    }
}

/// A transaction submitted to a ledger.
///
/// The debit total must equal the credit total unless `unbalance` is set,
/// which is reserved for seed and capital entries.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Transaction {
    /// Debit lines.
    #[serde(default)]
    pub debit: Vec<TransactionLine>,
    /// Credit lines.
    #[serde(default)]
    pub credit: Vec<TransactionLine>,
    /// Accept an imbalanced transaction (seed/capital only).
    #[serde(default)]
    pub unbalance: bool,
    /// Free-form description.
    #[serde(default)]
    pub memo: Option<String>,
}

/// A transaction as recorded in a ledger's journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct JournalEntry {
    /// Journal entry identifier.
    pub id: TransactionId,
    /// The posted transaction.
    pub transaction: Transaction,
    /// Game time of posting.
    pub game_time: GameTime,
    /// Wall-clock time of posting.
    pub posted_at: DateTime<Utc>,
}

/// One posted ledger item within a classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct LedgerItem {
    /// The journal entry this item belongs to.
    pub transaction_id: TransactionId,
    /// Debit or credit.
    pub side: EntrySide,
    /// Posted amount.
    #[ts(as = "String")]
    pub amount: Decimal,
    /// Counter object of the originating line.
    pub counter_object: Option<String>,
    /// Game time of posting.
    pub game_time: GameTime,
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

/// A purchase batch of one good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct StockLot {
    /// Good name.
    pub good: String,
    /// Units originally stocked in this lot.
    pub unit: u64,
    /// Cost per unit.
    #[ts(as = "String")]
    pub unit_price: Decimal,
    /// Units still on hand.
    pub left: u64,
    /// Game time the lot was stocked.
    pub game_time: GameTime,
}

/// What an inventory journal item records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export, export_to = "bindings/")]
pub enum InventoryAction {
    /// Goods stocked.
    Import,
    /// Goods shipped out.
    Export,
    /// Quantities force-set.
    Regist,
    /// End-of-day warehousing charge.
    StorageCost,
}

/// One inventory journal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct InventoryJournalItem {
    /// Kind of movement.
    pub action: InventoryAction,
    /// Goods moved.
    pub goods: Vec<GoodsLine>,
    /// Sale or purchase price of the movement.
    #[ts(as = "String")]
    pub price: Decimal,
    /// FIFO cost of goods removed (zero for imports and registrations).
    #[ts(as = "String")]
    pub cost: Decimal,
    /// Counterparty, when known.
    pub counter_object: Option<String>,
    /// Game time of the movement.
    pub game_time: GameTime,
}

// ---------------------------------------------------------------------------
// Logistics
// ---------------------------------------------------------------------------

/// Direction of a shipment from the point of view of the journaling node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ShipmentDirection {
    /// Goods coming in.
    Import,
    /// Goods going out.
    Export,
}

/// One logistics journal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct IoJournalItem {
    /// Shipment identifier.
    pub id: ShipmentId,
    /// Import or export.
    pub direction: ShipmentDirection,
    /// Shipping node.
    pub from: String,
    /// Receiving node.
    pub to: String,
    /// Goods shipped.
    pub goods: Vec<GoodsLine>,
    /// Price of the goods.
    #[ts(as = "String")]
    pub price: Decimal,
    /// Transit cost paid by the exporter.
    #[ts(as = "String")]
    pub transportation_cost: Decimal,
    /// Transit time in ticks.
    pub transportation_time: u32,
    /// Transit status.
    pub transportation_status: TransportationStatus,
    /// Game time the shipment was recorded.
    pub game_time: GameTime,
}

// ---------------------------------------------------------------------------
// Negotiation market
// ---------------------------------------------------------------------------

/// A negotiable offer between a publisher and an opposite-chain party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct BiddingItem {
    /// Item identifier.
    pub id: BiddingItemId,
    /// Goods under negotiation.
    pub goods: Vec<GoodsLine>,
    /// Node that published the item.
    pub publisher: String,
    /// Node that signed the item, once signed.
    pub signer: Option<String>,
    /// Agreed total price.
    #[ts(as = "String")]
    pub price: Decimal,
    /// Lifecycle stage.
    pub stage: BiddingStage,
    /// Which chain the publisher belongs to.
    pub published_from_chain: ChainSide,
    /// Game time of publication.
    pub published_at: GameTime,
    /// Game time of signing.
    pub signed_at: Option<GameTime>,
    /// Game time the item reached a terminal stage.
    pub closed_at: Option<GameTime>,
}

impl BiddingItem {
    /// The upstream party (seller), if known yet.
    pub fn upstream_party(&self) -> Option<&str> {
        match self.published_from_chain {
            ChainSide::Upstream => Some(self.publisher.as_str()),
            ChainSide::Downstream => self.signer.as_deref(),
        }
    }

    /// The downstream party (buyer), if known yet.
    pub fn downstream_party(&self) -> Option<&str> {
        match self.published_from_chain {
            ChainSide::Upstream => self.signer.as_deref(),
            ChainSide::Downstream => Some(self.publisher.as_str()),
        }
    }
}

/// A news item released at a scheduled game time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct NewsItem {
    /// Headline.
    pub title: String,
    /// Body text.
    #[serde(default)]
    pub content: String,
    /// Day of release.
    pub day: u32,
    /// Tick of release within the day.
    #[serde(default)]
    pub time: u32,
    /// Replacement needs board published with the news (spot market only).
    #[serde(default)]
    pub needs: Option<Vec<GoodsLine>>,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// One production run recorded by an assembly component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct AssemblyRecord {
    /// Node whose stock was transformed.
    pub receiver: String,
    /// Product assembled.
    pub product: String,
    /// Units produced.
    pub unit: u64,
    /// Components consumed.
    pub components: Vec<GoodsQuantity>,
    /// Summed component cost, carried over as the product's cost.
    #[ts(as = "String")]
    pub cost: Decimal,
    /// Game time of assembly.
    pub game_time: GameTime,
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn goods_total_sums_lines() {
        let goods = vec![
            GoodsLine::new("Body", 10, dec!(10)),
            GoodsLine::new("Wheel", 4, dec!(2.5)),
        ];
        assert_eq!(goods_total(&goods), Some(dec!(110)));
    }

    #[test]
    fn goods_line_accepts_snake_case_price() {
        let line: Result<GoodsLine, _> =
            serde_json::from_str(r#"{"name":"Body","unit":2,"unit_price":"3.5"}"#);
        assert_eq!(line.ok().map(|l| l.unit_price), Some(dec!(3.5)));
    }

    #[test]
    fn parties_follow_publishing_chain() {
        let mut item = BiddingItem {
            id: BiddingItemId::new(),
            goods: Vec::new(),
            publisher: String::from("factory"),
            signer: None,
            price: Decimal::ZERO,
            stage: BiddingStage::Bidding,
            published_from_chain: ChainSide::Upstream,
            published_at: GameTime::working(1, 0),
            signed_at: None,
            closed_at: None,
        };
        assert_eq!(item.upstream_party(), Some("factory"));
        assert_eq!(item.downstream_party(), None);

        item.signer = Some(String::from("retailer"));
        assert_eq!(item.downstream_party(), Some("retailer"));

        item.published_from_chain = ChainSide::Downstream;
        assert_eq!(item.upstream_party(), Some("retailer"));
        assert_eq!(item.downstream_party(), Some("factory"));
    }
}
