//! The `io` component: the logistics channel of one node.
//!
//! The channel journals every shipment, enforces the optional import
//! allow-list, and prices transit. Moving stock is left to the node, which
//! pairs each accepted shipment with the matching [`Inventory`] call:
//!
//! - an accepted import with status `COMPLETED` (or zero transit time)
//!   lands in stock at once;
//! - an accepted import with status `DELIVERING` is returned as deferred,
//!   and lands when the engine calls [`Io::complete`] at the arrival tick.
//!
//! Allow-list quota is consumed on acceptance, whatever happens in transit.
//!
//! [`Inventory`]: crate::inventory::Inventory

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use supplysim_core::Emitter;
use supplysim_core::config::IoConfig;
use supplysim_store::{Document, DocumentStore};
use supplysim_types::{
    GameTime, GoodsLine, IoJournalItem, NotificationKind, ShipmentDirection, ShipmentId,
    TransportationStatus,
};

use crate::error::NodeError;
use crate::inventory::{batched_cost, check_goods};

/// Persisted state of a logistics channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoState {
    /// Shipments, in recording order.
    pub journal: Vec<IoJournalItem>,
    /// Remaining import quota per good, when an allow-list is configured.
    pub available_goods: Option<BTreeMap<String, u64>>,
}

/// Logistics channel of one node.
#[derive(Debug)]
pub struct Io {
    doc: Document<IoState>,
    config: IoConfig,
    emitter: Emitter,
}

impl Io {
    /// Load or create the channel at `key`. A new channel starts with the
    /// configured allow-list.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Store`] if loading or creating fails.
    pub async fn load(
        store: DocumentStore,
        key: String,
        config: IoConfig,
        emitter: Emitter,
    ) -> Result<Self, NodeError> {
        let available_goods = config.available_goods.clone();
        let doc = Document::load_or_create(store, key, move || IoState {
            journal: Vec::new(),
            available_goods,
        })
        .await?;
        Ok(Self {
            doc,
            config,
            emitter,
        })
    }

    /// Shipments, in recording order.
    pub fn journal(&self) -> &[IoJournalItem] {
        &self.doc.state().journal
    }

    /// Remaining allow-list quota, if any.
    pub fn available_goods(&self) -> Option<&BTreeMap<String, u64>> {
        self.doc.state().available_goods.as_ref()
    }

    /// Import shipments still in transit.
    pub fn in_transit(&self) -> impl Iterator<Item = &IoJournalItem> {
        self.journal().iter().filter(|item| {
            item.direction == ShipmentDirection::Import
                && item.transportation_status == TransportationStatus::Delivering
        })
    }

    /// Transit cost of `goods`: `ceil(unit / batch_size) * unit_cost` summed
    /// over goods with a rate.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] on a zero batch size or overflow.
    pub fn transportation_cost(&self, goods: &[GoodsLine]) -> Result<Decimal, NodeError> {
        goods.iter().try_fold(Decimal::ZERO, |acc, line| {
            let Some(rate) = self.config.transportation_cost.get(&line.name) else {
                return Ok(acc);
            };
            let cost = batched_cost(line.unit, rate.batch_size, rate.unit_cost)?;
            acc.checked_add(cost).ok_or(NodeError::Overflow {
                context: "summing transportation cost",
            })
        })
    }

    /// Check that [`Io::import`] would accept `goods`, without recording
    /// anything.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::DuplicateGoods`] or
    /// [`NodeError::GoodsNotAvailable`].
    pub fn check_import(&self, goods: &[GoodsLine]) -> Result<(), NodeError> {
        check_goods(goods)?;
        if let Some(quota) = self.available_goods() {
            check_quota(quota, goods)?;
        }
        Ok(())
    }

    /// Accept an incoming shipment from `from`.
    ///
    /// Rejects repeated goods and goods outside the allow-list quota, then
    /// records the shipment with the configured status and transit time.
    /// The returned item tells the node whether the stock lands now
    /// (`COMPLETED`) or later (`DELIVERING`).
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::DuplicateGoods`] or
    /// [`NodeError::GoodsNotAvailable`] with nothing changed.
    pub async fn import(
        &mut self,
        from: &str,
        goods: &[GoodsLine],
        price: Decimal,
        game_time: GameTime,
    ) -> Result<IoJournalItem, NodeError> {
        check_goods(goods)?;

        let status = if self.config.transportation_time == 0 {
            TransportationStatus::Completed
        } else {
            self.config.transportation_status
        };
        let item = IoJournalItem {
            id: ShipmentId::new(),
            direction: ShipmentDirection::Import,
            from: from.to_owned(),
            to: self.emitter.node_name().to_owned(),
            goods: goods.to_vec(),
            price,
            transportation_cost: Decimal::ZERO,
            transportation_time: self.config.transportation_time,
            transportation_status: status,
            game_time,
        };

        let recorded = item.clone();
        self.doc
            .commit(|state: &mut IoState| -> Result<(), NodeError> {
                if let Some(quota) = state.available_goods.as_mut() {
                    consume_quota(quota, goods)?;
                }
                state.journal.push(recorded);
                Ok(())
            })
            .await?;

        info!(
            node = self.emitter.node_name(),
            from,
            shipment = %item.id,
            status = ?item.transportation_status,
            "Shipment accepted"
        );
        self.emitter
            .emit(NotificationKind::Import, game_time, json!(item));
        Ok(item)
    }

    /// Record an outgoing shipment to `to` and price its transit.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::DuplicateGoods`] with nothing changed, or
    /// [`NodeError::Store`] if recording fails.
    pub async fn export(
        &mut self,
        to: &str,
        goods: &[GoodsLine],
        price: Decimal,
        game_time: GameTime,
    ) -> Result<IoJournalItem, NodeError> {
        let item = self.prepare_export(to, goods, price, game_time)?;
        let recorded = item.clone();
        self.doc
            .commit(|state: &mut IoState| {
                state.journal.push(recorded);
                Ok::<_, NodeError>(())
            })
            .await?;

        info!(
            node = self.emitter.node_name(),
            to,
            shipment = %item.id,
            transportation_cost = %item.transportation_cost,
            "Shipment sent"
        );
        self.emitter
            .emit(NotificationKind::Export, game_time, json!(item));
        Ok(item)
    }

    /// Validate an outgoing shipment and build its journal item without
    /// recording it.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] if the goods repeat or transit cannot be priced.
    pub fn prepare_export(
        &self,
        to: &str,
        goods: &[GoodsLine],
        price: Decimal,
        game_time: GameTime,
    ) -> Result<IoJournalItem, NodeError> {
        check_goods(goods)?;
        Ok(IoJournalItem {
            id: ShipmentId::new(),
            direction: ShipmentDirection::Export,
            from: self.emitter.node_name().to_owned(),
            to: to.to_owned(),
            goods: goods.to_vec(),
            price,
            transportation_cost: self.transportation_cost(goods)?,
            transportation_time: 0,
            transportation_status: TransportationStatus::Completed,
            game_time,
        })
    }

    /// Mark a delivering import as arrived.
    ///
    /// Returns the shipment the first time it completes and `None` if it
    /// had already completed, so arrival effects happen exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::ShipmentNotFound`] for an unknown id.
    pub async fn complete(
        &mut self,
        shipment: ShipmentId,
        game_time: GameTime,
    ) -> Result<Option<IoJournalItem>, NodeError> {
        let arrived = self
            .doc
            .commit(|state: &mut IoState| -> Result<Option<IoJournalItem>, NodeError> {
                let item = state
                    .journal
                    .iter_mut()
                    .find(|item| item.id == shipment)
                    .ok_or(NodeError::ShipmentNotFound(shipment))?;
                if item.transportation_status == TransportationStatus::Completed {
                    return Ok(None);
                }
                item.transportation_status = TransportationStatus::Completed;
                Ok(Some(item.clone()))
            })
            .await?;

        if let Some(item) = &arrived {
            info!(
                node = self.emitter.node_name(),
                shipment = %item.id,
                at = %game_time,
                "Shipment arrived"
            );
            self.emitter
                .emit(NotificationKind::Complete, game_time, json!(item));
        }
        Ok(arrived)
    }
}

fn check_quota(quota: &BTreeMap<String, u64>, goods: &[GoodsLine]) -> Result<(), NodeError> {
    for line in goods {
        let remaining = quota.get(&line.name).copied().unwrap_or(0);
        if remaining < line.unit {
            return Err(NodeError::GoodsNotAvailable {
                good: line.name.clone(),
                remaining,
                requested: line.unit,
            });
        }
    }
    Ok(())
}

fn consume_quota(quota: &mut BTreeMap<String, u64>, goods: &[GoodsLine]) -> Result<(), NodeError> {
    check_quota(quota, goods)?;
    for line in goods {
        if let Some(remaining) = quota.get_mut(&line.name) {
            *remaining = remaining.saturating_sub(line.unit);
        }
    }
    Ok(())
}
