//! The `inventory` component: a FIFO lot-costed stock ledger.
//!
//! In `PERPETUAL` mode every import appends one priced lot per good and
//! every export walks the lots oldest first, consuming partial lots where
//! needed. The walk yields the cost of sales posted to the ledger next to
//! the sale itself.
//!
//! In `PERIODIC` mode imports and exports do not touch stock or the ledger;
//! quantities change only through [`Inventory::regist`].
//!
//! Invariants: `left` never goes negative, lots stay in stocking order, and
//! an export that cannot be covered changes nothing.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use supplysim_core::Emitter;
use supplysim_core::config::InventoryConfig;
use supplysim_store::{Document, DocumentStore};
use supplysim_types::{
    Classification, GameTime, GoodsLine, GoodsQuantity, InventoryAction, InventoryJournalItem,
    InventoryMode, NotificationKind, StockLot,
};

use crate::account::Account;
use crate::error::NodeError;

/// Persisted state of an inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryState {
    /// Lots per good, in stocking order.
    pub storage: BTreeMap<String, Vec<StockLot>>,
    /// Every movement, in order.
    pub journal: Vec<InventoryJournalItem>,
}

/// Lot-costed stock ledger of one node.
#[derive(Debug)]
pub struct Inventory {
    doc: Document<InventoryState>,
    config: InventoryConfig,
    emitter: Emitter,
}

impl Inventory {
    /// Load or create the inventory at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Store`] if loading or creating fails.
    pub async fn load(
        store: DocumentStore,
        key: String,
        config: InventoryConfig,
        emitter: Emitter,
    ) -> Result<Self, NodeError> {
        let doc = Document::load_or_create(store, key, InventoryState::default).await?;
        Ok(Self {
            doc,
            config,
            emitter,
        })
    }

    /// Stock-keeping mode.
    pub const fn mode(&self) -> InventoryMode {
        self.config.mode
    }

    /// Units of `good` on hand.
    pub fn storage_unit(&self, good: &str) -> u64 {
        self.doc
            .state()
            .storage
            .get(good)
            .map_or(0, |lots| units_left(lots))
    }

    /// Units on hand of every good ever stocked.
    pub fn storage(&self) -> BTreeMap<String, u64> {
        self.doc
            .state()
            .storage
            .iter()
            .map(|(good, lots)| (good.clone(), units_left(lots)))
            .collect()
    }

    /// Lots of `good`, oldest first.
    pub fn lots(&self, good: &str) -> &[StockLot] {
        self.doc
            .state()
            .storage
            .get(good)
            .map_or(&[] as &[StockLot], Vec::as_slice)
    }

    /// The movement journal.
    pub fn journal(&self) -> &[InventoryJournalItem] {
        &self.doc.state().journal
    }

    /// FIFO cost of removing `goods` now, without removing them.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::OutOfStock`] if any good is short, or
    /// [`NodeError::Overflow`] on arithmetic overflow.
    pub fn cost_of_sales(&self, goods: &[GoodsQuantity]) -> Result<Decimal, NodeError> {
        let mut storage = self.doc.state().storage.clone();
        goods.iter().try_fold(Decimal::ZERO, |acc, line| {
            let cost = consume_fifo(&mut storage, &line.name, line.unit)?;
            acc.checked_add(cost).ok_or(NodeError::Overflow {
                context: "summing cost of sales",
            })
        })
    }

    /// Stock `goods` bought for `price` and post Inventory/AccountsPayable.
    ///
    /// No-op in `PERIODIC` mode.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] if the goods are malformed or posting fails.
    pub async fn import(
        &mut self,
        account: &mut Account,
        goods: &[GoodsLine],
        price: Decimal,
        counter_object: Option<&str>,
        game_time: GameTime,
    ) -> Result<(), NodeError> {
        if self.config.mode == InventoryMode::Periodic {
            debug!(node = self.emitter.node_name(), "Periodic inventory ignores import");
            return Ok(());
        }
        check_goods(goods)?;

        let entry = InventoryJournalItem {
            action: InventoryAction::Import,
            goods: goods.to_vec(),
            price,
            cost: Decimal::ZERO,
            counter_object: counter_object.map(str::to_owned),
            game_time,
        };
        self.doc
            .commit(|state: &mut InventoryState| {
                for line in goods {
                    state.storage.entry(line.name.clone()).or_default().push(StockLot {
                        good: line.name.clone(),
                        unit: line.unit,
                        unit_price: line.unit_price,
                        left: line.unit,
                        game_time,
                    });
                }
                state.journal.push(entry);
                Ok::<_, NodeError>(())
            })
            .await?;

        account
            .transfer(
                price,
                Classification::Inventory,
                Classification::AccountsPayable,
                counter_object,
                game_time,
            )
            .await?;

        info!(
            node = self.emitter.node_name(),
            lines = goods.len(),
            %price,
            "Inventory import"
        );
        self.emitter.emit(
            NotificationKind::InventoryImport,
            game_time,
            json!({ "goods": goods, "price": price, "counterObject": counter_object }),
        );
        Ok(())
    }

    /// Ship `goods` out for `price`.
    ///
    /// Posts `CostOfSales`/`Inventory` for the FIFO cost and
    /// `AccountsReceivable`/`Sales` for the price. Returns the cost. No-op
    /// returning zero in `PERIODIC` mode.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::OutOfStock`] with nothing changed if any good
    /// is short.
    pub async fn export(
        &mut self,
        account: &mut Account,
        goods: &[GoodsLine],
        price: Decimal,
        counter_object: Option<&str>,
        game_time: GameTime,
    ) -> Result<Decimal, NodeError> {
        if self.config.mode == InventoryMode::Periodic {
            debug!(node = self.emitter.node_name(), "Periodic inventory ignores export");
            return Ok(Decimal::ZERO);
        }
        check_goods(goods)?;

        let cost = self
            .doc
            .commit(|state: &mut InventoryState| -> Result<Decimal, NodeError> {
                let cost = goods.iter().try_fold(Decimal::ZERO, |acc, line| {
                    let cost = consume_fifo(&mut state.storage, &line.name, line.unit)?;
                    acc.checked_add(cost).ok_or(NodeError::Overflow {
                        context: "summing export cost",
                    })
                })?;
                state.journal.push(InventoryJournalItem {
                    action: InventoryAction::Export,
                    goods: goods.to_vec(),
                    price,
                    cost,
                    counter_object: counter_object.map(str::to_owned),
                    game_time,
                });
                Ok(cost)
            })
            .await?;

        account
            .transfer(
                cost,
                Classification::CostOfSales,
                Classification::Inventory,
                counter_object,
                game_time,
            )
            .await?;
        account
            .transfer(
                price,
                Classification::AccountsReceivable,
                Classification::Sales,
                counter_object,
                game_time,
            )
            .await?;

        info!(
            node = self.emitter.node_name(),
            lines = goods.len(),
            %price,
            %cost,
            "Inventory export"
        );
        self.emitter.emit(
            NotificationKind::InventoryExport,
            game_time,
            json!({ "goods": goods, "price": price, "cost": cost, "counterObject": counter_object }),
        );
        Ok(cost)
    }

    /// Force-set the quantity of each good, replacing its lots with one lot
    /// at the given unit price. Works in both modes and posts nothing.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] if the goods are malformed or persisting fails.
    pub async fn regist(
        &mut self,
        goods: &[GoodsLine],
        game_time: GameTime,
    ) -> Result<(), NodeError> {
        check_goods(goods)?;
        self.doc
            .commit(|state: &mut InventoryState| {
                for line in goods {
                    let lots = if line.unit == 0 {
                        Vec::new()
                    } else {
                        vec![StockLot {
                            good: line.name.clone(),
                            unit: line.unit,
                            unit_price: line.unit_price,
                            left: line.unit,
                            game_time,
                        }]
                    };
                    state.storage.insert(line.name.clone(), lots);
                }
                state.journal.push(InventoryJournalItem {
                    action: InventoryAction::Regist,
                    goods: goods.to_vec(),
                    price: Decimal::ZERO,
                    cost: Decimal::ZERO,
                    counter_object: None,
                    game_time,
                });
                Ok::<_, NodeError>(())
            })
            .await?;

        info!(node = self.emitter.node_name(), lines = goods.len(), "Inventory registered");
        self.emitter.emit(
            NotificationKind::InventoryRegist,
            game_time,
            json!({ "goods": goods }),
        );
        Ok(())
    }

    /// Charge the end-of-day warehousing cost.
    ///
    /// Sums `ceil(unit / batch_size) * cost_per_batch` over goods with a
    /// rate and posts `CostOfWarehousing`/`Cash`. Does nothing when disabled,
    /// when the node is bankrupt, or when the total is zero. Returns the
    /// amount charged.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] if the computation overflows or posting fails.
    pub async fn count_storage_cost(
        &mut self,
        account: &mut Account,
        game_time: GameTime,
    ) -> Result<Decimal, NodeError> {
        if !self.config.storage_cost.enabled || account.is_bankrupt() {
            return Ok(Decimal::ZERO);
        }

        let mut charged = Vec::new();
        let mut total = Decimal::ZERO;
        for (good, rate) in &self.config.storage_cost.goods {
            let unit = self.storage_unit(good);
            let cost = batched_cost(unit, rate.batch_size, rate.cost_per_batch)?;
            if cost.is_zero() {
                continue;
            }
            total = total.checked_add(cost).ok_or(NodeError::Overflow {
                context: "summing storage cost",
            })?;
            charged.push(GoodsLine::new(good.clone(), unit, Decimal::ZERO));
        }
        if total.is_zero() {
            return Ok(Decimal::ZERO);
        }

        self.doc
            .commit(|state: &mut InventoryState| {
                state.journal.push(InventoryJournalItem {
                    action: InventoryAction::StorageCost,
                    goods: charged.clone(),
                    price: Decimal::ZERO,
                    cost: total,
                    counter_object: None,
                    game_time,
                });
                Ok::<_, NodeError>(())
            })
            .await?;
        account
            .transfer(
                total,
                Classification::CostOfWarehousing,
                Classification::Cash,
                None,
                game_time,
            )
            .await?;

        info!(node = self.emitter.node_name(), cost = %total, "Storage cost charged");
        self.emitter.emit(
            NotificationKind::InventoryStorageCost,
            game_time,
            json!({ "goods": charged, "cost": total }),
        );
        Ok(total)
    }
}

/// `ceil(unit / batch_size) * cost_per_batch`.
///
/// # Errors
///
/// Returns [`NodeError::Invalid`] for a zero batch size and
/// [`NodeError::Overflow`] on overflow.
pub fn batched_cost(unit: u64, batch_size: u64, cost_per_batch: Decimal) -> Result<Decimal, NodeError> {
    if batch_size == 0 {
        return Err(NodeError::invalid("batch size must be at least 1"));
    }
    let batches = unit.div_ceil(batch_size);
    Decimal::from(batches)
        .checked_mul(cost_per_batch)
        .ok_or(NodeError::Overflow {
            context: "computing batched cost",
        })
}

/// Reject empty names and repeated goods.
pub(crate) fn check_goods<'a, I, G>(goods: I) -> Result<(), NodeError>
where
    I: IntoIterator<Item = &'a G>,
    G: GoodName + 'a,
{
    let mut seen = std::collections::BTreeSet::new();
    for line in goods {
        let name = line.good_name();
        if name.is_empty() {
            return Err(NodeError::invalid("goods lines need a name"));
        }
        if !seen.insert(name) {
            return Err(NodeError::DuplicateGoods {
                good: name.to_owned(),
            });
        }
    }
    Ok(())
}

/// Anything that names a good.
pub(crate) trait GoodName {
    fn good_name(&self) -> &str;
}

impl GoodName for GoodsLine {
    fn good_name(&self) -> &str {
        &self.name
    }
}

impl GoodName for GoodsQuantity {
    fn good_name(&self) -> &str {
        &self.name
    }
}

fn units_left(lots: &[StockLot]) -> u64 {
    lots.iter().fold(0_u64, |acc, lot| acc.saturating_add(lot.left))
}

/// Remove `unit` of `good` oldest-lot-first and return the cost.
fn consume_fifo(
    storage: &mut BTreeMap<String, Vec<StockLot>>,
    good: &str,
    unit: u64,
) -> Result<Decimal, NodeError> {
    let lots = storage.get_mut(good);
    let available = lots.as_deref().map_or(0, |l| units_left(l));
    if available < unit {
        return Err(NodeError::OutOfStock {
            good: good.to_owned(),
            available,
            requested: unit,
        });
    }

    let mut remaining = unit;
    let mut cost = Decimal::ZERO;
    for lot in lots.into_iter().flatten() {
        if remaining == 0 {
            break;
        }
        let taken = remaining.min(lot.left);
        if taken == 0 {
            continue;
        }
        lot.left = lot.left.saturating_sub(taken);
        remaining = remaining.saturating_sub(taken);
        cost = Decimal::from(taken)
            .checked_mul(lot.unit_price)
            .and_then(|c| cost.checked_add(c))
            .ok_or(NodeError::Overflow {
                context: "walking stock lots",
            })?;
    }
    Ok(cost)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;
    use supplysim_core::config::{AccountConfig, StorageCostConfig, StorageRate};
    use supplysim_types::ComponentKind;

    use super::*;

    async fn fixture(config: InventoryConfig) -> (Inventory, Account) {
        let store = DocumentStore::memory();
        let inventory = Inventory::load(
            store.clone(),
            "g:factory:inventory".to_owned(),
            config,
            Emitter::detached("factory", ComponentKind::Inventory),
        )
        .await
        .unwrap();
        let account = Account::load(store, "g:factory:account".to_owned(), &AccountConfig::default())
            .await
            .unwrap();
        (inventory, account)
    }

    const T: GameTime = GameTime::working(1, 0);

    fn body(unit: u64, price: Decimal) -> Vec<GoodsLine> {
        vec![GoodsLine::new("Body", unit, price)]
    }

    #[tokio::test]
    async fn import_then_export_costs_fifo() {
        let (mut inv, mut acc) = fixture(InventoryConfig::default()).await;
        inv.import(&mut acc, &body(10, dec!(10)), dec!(100), Some("supplier"), T)
            .await
            .unwrap();
        assert_eq!(acc.balance(Classification::Inventory), dec!(100));
        assert_eq!(acc.balance(Classification::AccountsPayable), dec!(-100));

        let cost = inv
            .export(&mut acc, &body(5, dec!(20)), dec!(100), Some("retailer"), T)
            .await
            .unwrap();
        assert_eq!(cost, dec!(50));
        assert_eq!(inv.storage_unit("Body"), 5);
        assert_eq!(acc.balance(Classification::CostOfSales), dec!(50));
        assert_eq!(acc.balance(Classification::Inventory), dec!(50));
        assert_eq!(acc.balance(Classification::AccountsReceivable), dec!(100));
        assert_eq!(acc.balance(Classification::Sales), dec!(-100));
    }

    #[tokio::test]
    async fn fifo_spans_lots() {
        let (mut inv, mut acc) = fixture(InventoryConfig::default()).await;
        inv.import(&mut acc, &body(4, dec!(3)), dec!(12), None, T).await.unwrap();
        inv.import(&mut acc, &body(6, dec!(5)), dec!(30), None, T).await.unwrap();

        let within_first = [GoodsQuantity { name: "Body".to_owned(), unit: 3 }];
        assert_eq!(inv.cost_of_sales(&within_first).unwrap(), dec!(9));

        let spanning = [GoodsQuantity { name: "Body".to_owned(), unit: 7 }];
        assert_eq!(inv.cost_of_sales(&spanning).unwrap(), dec!(27));

        // Projection leaves stock untouched.
        assert_eq!(inv.storage_unit("Body"), 10);

        let cost = inv.export(&mut acc, &body(7, dec!(8)), dec!(56), None, T).await.unwrap();
        assert_eq!(cost, dec!(27));
        let lots = inv.lots("Body");
        assert_eq!(lots.iter().map(|l| l.left).collect::<Vec<_>>(), vec![0, 3]);
    }

    #[tokio::test]
    async fn short_export_changes_nothing() {
        let (mut inv, mut acc) = fixture(InventoryConfig::default()).await;
        inv.import(&mut acc, &body(2, dec!(1)), dec!(2), None, T).await.unwrap();
        let journal_len = acc.journal().len();

        let result = inv.export(&mut acc, &body(3, dec!(1)), dec!(3), None, T).await;
        assert!(matches!(
            result,
            Err(NodeError::OutOfStock { available: 2, requested: 3, .. })
        ));
        assert_eq!(inv.storage_unit("Body"), 2);
        assert_eq!(acc.journal().len(), journal_len);
        assert_eq!(inv.journal().len(), 1);
    }

    #[tokio::test]
    async fn periodic_mode_only_moves_by_regist() {
        let config = InventoryConfig {
            mode: InventoryMode::Periodic,
            ..InventoryConfig::default()
        };
        let (mut inv, mut acc) = fixture(config).await;
        inv.import(&mut acc, &body(10, dec!(1)), dec!(10), None, T).await.unwrap();
        assert_eq!(inv.storage_unit("Body"), 0);
        assert!(acc.journal().is_empty());

        inv.regist(&body(7, Decimal::ZERO), T).await.unwrap();
        assert_eq!(inv.storage_unit("Body"), 7);
        inv.export(&mut acc, &body(7, dec!(1)), dec!(7), None, T).await.unwrap();
        assert_eq!(inv.storage_unit("Body"), 7);
    }

    #[tokio::test]
    async fn storage_cost_rounds_batches_up() {
        let mut goods = BTreeMap::new();
        goods.insert(
            "Body".to_owned(),
            StorageRate {
                batch_size: 4,
                cost_per_batch: dec!(2),
            },
        );
        let config = InventoryConfig {
            mode: InventoryMode::Perpetual,
            storage_cost: StorageCostConfig {
                enabled: true,
                goods,
            },
        };
        let (mut inv, mut acc) = fixture(config).await;

        // Nothing stored, nothing charged.
        assert_eq!(inv.count_storage_cost(&mut acc, T).await.unwrap(), Decimal::ZERO);

        inv.import(&mut acc, &body(9, dec!(1)), dec!(9), None, T).await.unwrap();
        // Cash is negative, so the node is solvent under the game rule.
        acc.transfer(dec!(50), Classification::CostOfSales, Classification::Cash, None, T)
            .await
            .unwrap();

        let charged = inv.count_storage_cost(&mut acc, T).await.unwrap();
        assert_eq!(charged, dec!(6));
        assert_eq!(acc.balance(Classification::CostOfWarehousing), dec!(6));
    }

    #[tokio::test]
    async fn bankrupt_node_pays_no_storage() {
        let mut goods = BTreeMap::new();
        goods.insert(
            "Body".to_owned(),
            StorageRate {
                batch_size: 1,
                cost_per_batch: dec!(1),
            },
        );
        let config = InventoryConfig {
            mode: InventoryMode::Perpetual,
            storage_cost: StorageCostConfig {
                enabled: true,
                goods,
            },
        };
        let (mut inv, mut acc) = fixture(config).await;
        inv.regist(&body(3, Decimal::ZERO), T).await.unwrap();
        acc.transfer(dec!(10), Classification::Cash, Classification::Capital, None, T)
            .await
            .unwrap();
        assert!(acc.is_bankrupt());
        assert_eq!(inv.count_storage_cost(&mut acc, T).await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn duplicate_goods_rejected() {
        let (mut inv, mut acc) = fixture(InventoryConfig::default()).await;
        let goods = vec![
            GoodsLine::new("Body", 1, dec!(1)),
            GoodsLine::new("Body", 1, dec!(1)),
        ];
        let result = inv.import(&mut acc, &goods, dec!(2), None, T).await;
        assert!(matches!(result, Err(NodeError::DuplicateGoods { .. })));
    }

    #[test]
    fn batched_cost_rounds_up() {
        assert_eq!(batched_cost(9, 4, dec!(2)).unwrap(), dec!(6));
        assert_eq!(batched_cost(8, 4, dec!(2)).unwrap(), dec!(4));
        assert_eq!(batched_cost(0, 4, dec!(2)).unwrap(), Decimal::ZERO);
        assert!(batched_cost(1, 0, dec!(2)).is_err());
    }
}
