//! The `market` component: a spot market with a needs board.
//!
//! The board lists open demand `{name, unit, unit_price}`. A registered
//! upstream sells against it at the board's price; the sale is forwarded to
//! the seller's `market_receiver` and the board is decremented afterwards.
//! Scheduled news may replace the whole board when released.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use supplysim_core::Emitter;
use supplysim_core::config::MarketConfig;
use supplysim_store::{Document, DocumentStore};
use supplysim_types::{GameTime, GoodsLine, GoodsQuantity, NewsItem, NotificationKind};

use crate::error::NodeError;
use crate::inventory::check_goods;

/// Persisted state of a spot market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    /// Open demand.
    pub needs: Vec<GoodsLine>,
    /// News released so far.
    pub news: Vec<NewsItem>,
}

/// A priced purchase against the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Requested goods priced at the board's unit prices.
    pub goods: Vec<GoodsLine>,
    /// Total price.
    pub price: Decimal,
}

/// Spot market hosted by one node.
#[derive(Debug)]
pub struct Market {
    doc: Document<MarketState>,
    config: MarketConfig,
    emitter: Emitter,
}

impl Market {
    /// Load or create the market at `key`. A new market starts with the
    /// configured board.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Store`] if loading or creating fails.
    pub async fn load(
        store: DocumentStore,
        key: String,
        config: MarketConfig,
        emitter: Emitter,
    ) -> Result<Self, NodeError> {
        let needs = config.needs.clone();
        let doc = Document::load_or_create(store, key, move || MarketState {
            needs,
            news: Vec::new(),
        })
        .await?;
        Ok(Self {
            doc,
            config,
            emitter,
        })
    }

    /// Current board.
    pub fn needs(&self) -> &[GoodsLine] {
        &self.doc.state().needs
    }

    /// News released so far.
    pub fn news(&self) -> &[NewsItem] {
        &self.doc.state().news
    }

    /// The configured news schedule.
    pub fn news_schedule(&self) -> &[NewsItem] {
        &self.config.news
    }

    /// Whether `name` may sell into this market.
    pub fn is_upstream(&self, name: &str) -> bool {
        self.config.upstreams.iter().any(|n| n == name)
    }

    /// Price a sale by `seller` against the board. Changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NotRegistered`] for an unlisted seller and
    /// [`NodeError::InsufficientNeeds`] when the board is short.
    pub fn quote(&self, seller: &str, goods: &[GoodsQuantity]) -> Result<Quote, NodeError> {
        if !self.is_upstream(seller) {
            return Err(NodeError::NotRegistered {
                name: seller.to_owned(),
                role: "market upstream",
            });
        }
        if goods.is_empty() {
            return Err(NodeError::invalid("a purchase needs goods"));
        }
        check_goods(goods)?;

        let mut priced = Vec::with_capacity(goods.len());
        let mut price = Decimal::ZERO;
        for wanted in goods {
            let need = self.needs().iter().find(|n| n.name == wanted.name);
            let remaining = need.map_or(0, |n| n.unit);
            let Some(need) = need.filter(|_| remaining >= wanted.unit) else {
                return Err(NodeError::InsufficientNeeds {
                    good: wanted.name.clone(),
                    remaining,
                    requested: wanted.unit,
                });
            };
            let line = GoodsLine::new(wanted.name.clone(), wanted.unit, need.unit_price);
            price = line
                .amount()
                .and_then(|amount| price.checked_add(amount))
                .ok_or(NodeError::Overflow {
                    context: "pricing a market purchase",
                })?;
            priced.push(line);
        }
        Ok(Quote {
            goods: priced,
            price,
        })
    }

    /// Decrement the board by a completed sale.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::InsufficientNeeds`] if the board changed since
    /// the quote.
    pub async fn consume(
        &mut self,
        goods: &[GoodsLine],
        game_time: GameTime,
    ) -> Result<(), NodeError> {
        self.doc
            .commit(|state: &mut MarketState| -> Result<(), NodeError> {
                for sold in goods {
                    let need = state.needs.iter_mut().find(|n| n.name == sold.name);
                    let remaining = need.as_ref().map_or(0, |n| n.unit);
                    match need {
                        Some(need) if need.unit >= sold.unit => {
                            need.unit = need.unit.saturating_sub(sold.unit);
                        }
                        _ => {
                            return Err(NodeError::InsufficientNeeds {
                                good: sold.name.clone(),
                                remaining,
                                requested: sold.unit,
                            });
                        }
                    }
                }
                Ok(())
            })
            .await?;

        info!(market = self.emitter.node_name(), lines = goods.len(), "Needs consumed");
        self.emitter.emit(
            NotificationKind::NeedsChange,
            game_time,
            json!({ "needs": self.needs() }),
        );
        Ok(())
    }

    /// Replace the whole board.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] if the board repeats a good or persisting fails.
    pub async fn set_needs(
        &mut self,
        needs: Vec<GoodsLine>,
        game_time: GameTime,
    ) -> Result<(), NodeError> {
        check_goods(&needs)?;
        self.doc
            .commit(|state: &mut MarketState| {
                state.needs = needs;
                Ok::<_, NodeError>(())
            })
            .await?;

        info!(market = self.emitter.node_name(), lines = self.needs().len(), "Needs replaced");
        self.emitter.emit(
            NotificationKind::NeedsChange,
            game_time,
            json!({ "needs": self.needs() }),
        );
        Ok(())
    }

    /// Release the scheduled news item at `index`, replacing the board if
    /// the item carries needs.
    ///
    /// Returns `None` for an index outside the schedule.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError`] if persisting fails.
    pub async fn release_news(
        &mut self,
        index: usize,
        game_time: GameTime,
    ) -> Result<Option<NewsItem>, NodeError> {
        let Some(news) = self.config.news.get(index).cloned() else {
            return Ok(None);
        };
        let stored = news.clone();
        self.doc
            .commit(|state: &mut MarketState| {
                state.news.push(stored);
                Ok::<_, NodeError>(())
            })
            .await?;

        info!(market = self.emitter.node_name(), title = %news.title, "Market news released");
        self.emitter
            .emit(NotificationKind::NewsPublished, game_time, json!(news));

        if let Some(needs) = news.needs.clone() {
            self.set_needs(needs, game_time).await?;
        }
        Ok(Some(news))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use supplysim_types::ComponentKind;

    use super::*;

    const T: GameTime = GameTime::working(1, 0);

    async fn market() -> Market {
        Market::load(
            DocumentStore::memory(),
            "g:mall:market".to_owned(),
            MarketConfig {
                upstreams: vec!["retailer".to_owned()],
                needs: vec![GoodsLine::new("Bike", 5, dec!(300))],
                news: vec![NewsItem {
                    title: "Cycling boom".to_owned(),
                    content: "Demand doubles".to_owned(),
                    day: 1,
                    time: 4,
                    needs: Some(vec![GoodsLine::new("Bike", 10, dec!(320))]),
                }],
            },
            Emitter::detached("mall", ComponentKind::Market),
        )
        .await
        .unwrap()
    }

    fn bikes(unit: u64) -> Vec<GoodsQuantity> {
        vec![GoodsQuantity {
            name: "Bike".to_owned(),
            unit,
        }]
    }

    #[tokio::test]
    async fn quote_uses_board_prices() {
        let m = market().await;
        let quote = m.quote("retailer", &bikes(2)).unwrap();
        assert_eq!(quote.price, dec!(600));
        assert_eq!(quote.goods[0].unit_price, dec!(300));
    }

    #[tokio::test]
    async fn quote_rejects_strangers_and_excess() {
        let m = market().await;
        assert!(matches!(
            m.quote("factory", &bikes(1)),
            Err(NodeError::NotRegistered { .. })
        ));
        assert!(matches!(
            m.quote("retailer", &bikes(6)),
            Err(NodeError::InsufficientNeeds { remaining: 5, requested: 6, .. })
        ));
    }

    #[tokio::test]
    async fn consume_decrements_board() {
        let mut m = market().await;
        let quote = m.quote("retailer", &bikes(2)).unwrap();
        m.consume(&quote.goods, T).await.unwrap();
        assert_eq!(m.needs()[0].unit, 3);
    }

    #[tokio::test]
    async fn news_replaces_board() {
        let mut m = market().await;
        let news = m.release_news(0, GameTime::working(1, 4)).await.unwrap();
        assert!(news.is_some());
        assert_eq!(m.needs(), &[GoodsLine::new("Bike", 10, dec!(320))]);
        assert_eq!(m.news().len(), 1);
    }
}
