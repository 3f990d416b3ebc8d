//! Spot market purchases.

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

use supplysim_types::{ComponentKind, GoodsLine, GoodsQuantity, IoJournalItem};

use crate::engine::Engine;
use crate::error::EngineError;

/// A completed spot sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    /// Goods at board prices.
    pub goods: Vec<GoodsLine>,
    /// Total paid.
    pub price: Decimal,
    /// Seller's shipment record.
    pub export: IoJournalItem,
    /// Market's shipment record; `None` when the market node has no io and
    /// simply absorbs the goods.
    pub import: Option<IoJournalItem>,
}

impl Engine {
    /// Sell `goods` from `seller` into `market` at the board's prices.
    ///
    /// The seller must list the market in its receiver and be one of the
    /// market's upstreams, the board must cover every good, and a market
    /// node with io must accept the shipment. The goods are exported from
    /// the seller, imported by the market node if it has io, and the board
    /// is decremented last.
    ///
    /// # Errors
    ///
    /// Returns a node error with nothing changed when any check fails.
    pub async fn market_sell(
        &mut self,
        market: &str,
        seller: &str,
        goods: &[GoodsQuantity],
    ) -> Result<Sale, EngineError> {
        self.node(seller)?.check_market_access(market)?;
        let quote = self.node(market)?.market()?.quote(seller, goods)?;
        let absorbs = !self.node(market)?.has(ComponentKind::Io);
        if !absorbs {
            self.node(market)?.check_import(&quote.goods, quote.price)?;
        }
        let game_time = self.game_time();

        let export = self
            .node_mut(seller)?
            .export_goods(market, &quote.goods, quote.price, game_time)
            .await?;
        let import = if absorbs {
            None
        } else {
            Some(
                self.accept_import(market, seller, &quote.goods, quote.price)
                    .await?,
            )
        };
        self.node_mut(market)?
            .market_mut()?
            .consume(&quote.goods, game_time)
            .await?;

        info!(market, seller, price = %quote.price, "Spot sale");
        Ok(Sale {
            goods: quote.goods,
            price: quote.price,
            export,
            import,
        })
    }

    /// Replace a market's needs board.
    ///
    /// # Errors
    ///
    /// Returns a node error if the node has no market or the board repeats
    /// a good.
    pub async fn set_needs(&mut self, market: &str, needs: Vec<GoodsLine>) -> Result<(), EngineError> {
        let game_time = self.game_time();
        Ok(self
            .node_mut(market)?
            .market_mut()?
            .set_needs(needs, game_time)
            .await?)
    }
}
