//! Shipments between nodes, with transit delay resolved by the clock.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use supplysim_types::{GameTime, GoodsLine, IoJournalItem, TransportationStatus};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::task::ScheduledTask;

/// Both journal records of one shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    /// Exporter's record, carrying the transit cost.
    pub export: IoJournalItem,
    /// Importer's record, carrying the transit status.
    pub import: IoJournalItem,
}

impl Engine {
    /// Ship `goods` from `from` to `to` for `price`.
    ///
    /// Both sides are checked first: the importer's components, goods and
    /// allow-list quota, then the exporter's stock. The exporter then
    /// removes the goods and pays transit, and the importer accepts the
    /// shipment, landing it now or scheduling its arrival.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NodeNotFound`] or a node error. A rejected
    /// check changes nothing; a storage failure on the importer leaves the
    /// export in place.
    pub async fn transfer(
        &mut self,
        from: &str,
        to: &str,
        goods: &[GoodsLine],
        price: Decimal,
    ) -> Result<Shipment, EngineError> {
        self.node(to)?.check_import(goods, price)?;
        let game_time = self.game_time();

        let export = self
            .node_mut(from)?
            .export_goods(to, goods, price, game_time)
            .await?;
        let import = self.accept_import(to, from, goods, price).await?;

        info!(from, to, %price, shipment = %import.id, "Goods transferred");
        Ok(Shipment { export, import })
    }

    /// Accept a shipment on `to`. A delivering shipment is completed by the
    /// clock `transportation_time` ticks from now, or from the first tick of
    /// day 1 while the game has not started.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NodeNotFound`] or the importer's rejection.
    pub async fn accept_import(
        &mut self,
        to: &str,
        from: &str,
        goods: &[GoodsLine],
        price: Decimal,
    ) -> Result<IoJournalItem, EngineError> {
        let game_time = self.game_time();
        let item = self
            .node_mut(to)?
            .import_goods(from, goods, price, game_time)
            .await?;

        if item.transportation_status == TransportationStatus::Delivering {
            let departure = if game_time.day == 0 {
                GameTime::working(1, 0)
            } else {
                game_time
            };
            let due = self
                .clock()
                .game_time_add(departure, item.transportation_time)
                .instant();
            self.schedule(
                due,
                ScheduledTask::CompleteShipment {
                    node: to.to_owned(),
                    shipment: item.id,
                },
            )
            .await?;
            debug!(node = to, shipment = %item.id, %due, "Arrival scheduled");
        }
        Ok(item)
    }
}
