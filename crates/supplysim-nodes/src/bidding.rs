//! The `bidding_market` component: a two-party negotiation market.
//!
//! Each item runs a one-way state machine:
//!
//! ```text
//! CONSTRUCTED --release--> BIDDING --sign--> SIGNED --deliver--> COMPLETED
//!                             |                 |
//!                           cancel          breakoff
//!                             v                 v
//!                          CANCELED          BREAKOFF
//! ```
//!
//! The market only moves items and computes amounts. Ledger postings and
//! the goods transfer on delivery touch other nodes and are carried out by
//! the engine with the values returned here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use supplysim_core::Emitter;
use supplysim_core::config::BiddingMarketConfig;
use supplysim_store::{Document, DocumentStore};
use supplysim_types::{
    BiddingItem, BiddingItemId, BiddingStage, ChainSide, GameTime, GoodsLine, NewsItem,
    NotificationKind, goods_total,
};

use crate::error::NodeError;
use crate::inventory::check_goods;

/// Persisted state of a negotiation market.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiddingState {
    /// Every item ever released, in release order.
    pub items: Vec<BiddingItem>,
    /// News released so far.
    pub news: Vec<NewsItem>,
}

/// Amounts owed after a breakoff.
///
/// `penalty` and `compensation` come from independent ratios; nothing makes
/// them agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakoff {
    /// The item, now in `BREAKOFF`.
    pub item: BiddingItem,
    /// Party that broke the contract.
    pub breaker: String,
    /// The other party.
    pub counterparty: String,
    /// `price * penalty_ratio`, paid by the breaker.
    pub penalty: Decimal,
    /// `price * compensation_ratio`, received by the counterparty.
    pub compensation: Decimal,
}

/// Goods transfer owed by a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Item being delivered.
    pub id: BiddingItemId,
    /// Upstream party; ships the goods.
    pub seller: String,
    /// Downstream party; receives the goods.
    pub buyer: String,
    /// Agreed goods.
    pub goods: Vec<GoodsLine>,
    /// Agreed price.
    pub price: Decimal,
}

/// A negotiation market between fixed upstream and downstream nodes.
#[derive(Debug)]
pub struct BiddingMarket {
    doc: Document<BiddingState>,
    config: BiddingMarketConfig,
    emitter: Emitter,
}

impl BiddingMarket {
    /// Load or create the market at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Store`] if loading or creating fails.
    pub async fn load(
        store: DocumentStore,
        key: String,
        config: BiddingMarketConfig,
        emitter: Emitter,
    ) -> Result<Self, NodeError> {
        let doc = Document::load_or_create(store, key, BiddingState::default).await?;
        Ok(Self {
            doc,
            config,
            emitter,
        })
    }

    /// Every item, in release order.
    pub fn items(&self) -> &[BiddingItem] {
        &self.doc.state().items
    }

    /// One item.
    pub fn item(&self, id: BiddingItemId) -> Option<&BiddingItem> {
        self.items().iter().find(|item| item.id == id)
    }

    /// News released so far.
    pub fn news(&self) -> &[NewsItem] {
        &self.doc.state().news
    }

    /// The configured news schedule.
    pub fn news_schedule(&self) -> &[NewsItem] {
        &self.config.news
    }

    /// Which side of the chain `name` is on, if listed.
    pub fn side_of(&self, name: &str) -> Option<ChainSide> {
        if self.config.upstreams.iter().any(|n| n == name) {
            Some(ChainSide::Upstream)
        } else if self.config.downstreams.iter().any(|n| n == name) {
            Some(ChainSide::Downstream)
        } else {
            None
        }
    }

    /// Publish a new item.
    ///
    /// The declared `price` must equal `sum(unit * unit_price)` of `goods`,
    /// and the publisher must be a listed upstream or downstream node.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NotRegistered`], [`NodeError::PriceMismatch`],
    /// or [`NodeError::Invalid`] with nothing changed.
    pub async fn release(
        &mut self,
        publisher: &str,
        goods: Vec<GoodsLine>,
        price: Decimal,
        game_time: GameTime,
    ) -> Result<BiddingItem, NodeError> {
        let side = self.side_of(publisher).ok_or_else(|| NodeError::NotRegistered {
            name: publisher.to_owned(),
            role: "bidding participant",
        })?;
        if goods.is_empty() {
            return Err(NodeError::invalid("a bidding item needs goods"));
        }
        check_goods(&goods)?;
        let computed = goods_total(&goods).ok_or(NodeError::Overflow {
            context: "summing bidding goods",
        })?;
        if computed != price {
            return Err(NodeError::PriceMismatch {
                declared: price,
                computed,
            });
        }

        let mut item = BiddingItem {
            id: BiddingItemId::new(),
            goods,
            publisher: publisher.to_owned(),
            signer: None,
            price,
            stage: BiddingStage::Constructed,
            published_from_chain: side,
            published_at: game_time,
            signed_at: None,
            closed_at: None,
        };
        item.stage = BiddingStage::Bidding;

        let stored = item.clone();
        self.doc
            .commit(|state: &mut BiddingState| {
                state.items.push(stored);
                Ok::<_, NodeError>(())
            })
            .await?;

        info!(
            market = self.emitter.node_name(),
            item = %item.id,
            publisher,
            side = ?side,
            %price,
            "Bidding item released"
        );
        self.emitter
            .emit(NotificationKind::BiddingReleased, game_time, json!(item));
        Ok(item)
    }

    /// Sign an item. Only an opposite-chain node may sign, and only while
    /// the item is `BIDDING`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::IllegalBiddingStage`] or [`NodeError::Forbidden`]
    /// with nothing changed.
    pub async fn sign(
        &mut self,
        id: BiddingItemId,
        signer: &str,
        game_time: GameTime,
    ) -> Result<BiddingItem, NodeError> {
        let signer_side = self.side_of(signer);
        let item = self
            .transition(id, "sign", game_time, |item| {
                require_stage(item, BiddingStage::Bidding, "sign")?;
                if signer_side != Some(item.published_from_chain.opposite()) {
                    return Err(forbidden(item, signer, "sign"));
                }
                item.signer = Some(signer.to_owned());
                item.signed_at = Some(game_time);
                item.stage = BiddingStage::Signed;
                Ok(())
            })
            .await?;
        self.emitter
            .emit(NotificationKind::BiddingSigned, game_time, json!(item));
        Ok(item)
    }

    /// Withdraw an item. Only the publisher may cancel, and only while the
    /// item is `BIDDING`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::IllegalBiddingStage`] or [`NodeError::Forbidden`]
    /// with nothing changed.
    pub async fn cancel(
        &mut self,
        id: BiddingItemId,
        caller: &str,
        game_time: GameTime,
    ) -> Result<BiddingItem, NodeError> {
        let item = self
            .transition(id, "cancel", game_time, |item| {
                require_stage(item, BiddingStage::Bidding, "cancel")?;
                if item.publisher != caller {
                    return Err(forbidden(item, caller, "cancel"));
                }
                item.stage = BiddingStage::Canceled;
                item.closed_at = Some(game_time);
                Ok(())
            })
            .await?;
        self.emitter
            .emit(NotificationKind::BiddingCanceled, game_time, json!(item));
        Ok(item)
    }

    /// Break off a signed item. Only the publisher or signer may, and only
    /// while the item is `SIGNED`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::IllegalBiddingStage`], [`NodeError::Forbidden`],
    /// or [`NodeError::Overflow`] with nothing changed.
    pub async fn breakoff(
        &mut self,
        id: BiddingItemId,
        caller: &str,
        game_time: GameTime,
    ) -> Result<Breakoff, NodeError> {
        let penalty_ratio = self.config.penalty_ratio;
        let compensation_ratio = self.config.compensation_ratio;
        let mut amounts = None;

        let item = self
            .transition(id, "breakoff", game_time, |item| {
                require_stage(item, BiddingStage::Signed, "breakoff")?;
                let counterparty = if item.publisher == caller {
                    item.signer.clone()
                } else if item.signer.as_deref() == Some(caller) {
                    Some(item.publisher.clone())
                } else {
                    None
                };
                let counterparty = counterparty.ok_or_else(|| forbidden(item, caller, "breakoff"))?;
                let penalty = item.price.checked_mul(penalty_ratio);
                let compensation = item.price.checked_mul(compensation_ratio);
                let (Some(penalty), Some(compensation)) = (penalty, compensation) else {
                    return Err(NodeError::Overflow {
                        context: "computing breakoff amounts",
                    });
                };
                amounts = Some((counterparty, penalty, compensation));
                item.stage = BiddingStage::Breakoff;
                item.closed_at = Some(game_time);
                Ok(())
            })
            .await?;

        let (counterparty, penalty, compensation) = amounts.ok_or(NodeError::Overflow {
            context: "recovering breakoff amounts",
        })?;
        self.emitter.emit(
            NotificationKind::BiddingBreakoff,
            game_time,
            json!({
                "item": item,
                "breaker": caller,
                "penalty": penalty,
                "compensation": compensation,
            }),
        );
        Ok(Breakoff {
            item,
            breaker: caller.to_owned(),
            counterparty,
            penalty,
            compensation,
        })
    }

    /// Check that `caller` may deliver a signed item and return the goods
    /// transfer it requires. Changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::BiddingItemNotFound`],
    /// [`NodeError::IllegalBiddingStage`], or [`NodeError::Forbidden`].
    pub fn prepare_delivery(&self, id: BiddingItemId, caller: &str) -> Result<Delivery, NodeError> {
        let item = self.item(id).ok_or(NodeError::BiddingItemNotFound(id))?;
        require_stage(item, BiddingStage::Signed, "deliver")?;
        if item.publisher != caller && item.signer.as_deref() != Some(caller) {
            return Err(forbidden(item, caller, "deliver"));
        }
        let (Some(seller), Some(buyer)) = (item.upstream_party(), item.downstream_party()) else {
            return Err(NodeError::IllegalBiddingStage {
                id,
                stage: item.stage,
                action: "deliver",
            });
        };
        Ok(Delivery {
            id,
            seller: seller.to_owned(),
            buyer: buyer.to_owned(),
            goods: item.goods.clone(),
            price: item.price,
        })
    }

    /// Mark a signed item delivered.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::IllegalBiddingStage`] unless the item is
    /// `SIGNED`.
    pub async fn complete_delivery(
        &mut self,
        id: BiddingItemId,
        game_time: GameTime,
    ) -> Result<BiddingItem, NodeError> {
        let item = self
            .transition(id, "deliver", game_time, |item| {
                require_stage(item, BiddingStage::Signed, "deliver")?;
                item.stage = BiddingStage::Completed;
                item.closed_at = Some(game_time);
                Ok(())
            })
            .await?;
        self.emitter
            .emit(NotificationKind::BiddingCompleted, game_time, json!(item));
        Ok(item)
    }

    /// Release the scheduled news item at `index`.
    ///
    /// Returns `None` for an index outside the schedule.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Store`] if persisting fails.
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
            .commit(|state: &mut BiddingState| {
                state.news.push(stored);
                Ok::<_, NodeError>(())
            })
            .await?;

        info!(market = self.emitter.node_name(), title = %news.title, "Bidding news released");
        self.emitter
            .emit(NotificationKind::BiddingNewsPublished, game_time, json!(news));
        Ok(Some(news))
    }

    async fn transition<F>(
        &mut self,
        id: BiddingItemId,
        action: &'static str,
        game_time: GameTime,
        apply: F,
    ) -> Result<BiddingItem, NodeError>
    where
        F: FnOnce(&mut BiddingItem) -> Result<(), NodeError> + Send,
    {
        let item = self
            .doc
            .commit(|state: &mut BiddingState| -> Result<BiddingItem, NodeError> {
                let item = state
                    .items
                    .iter_mut()
                    .find(|item| item.id == id)
                    .ok_or(NodeError::BiddingItemNotFound(id))?;
                apply(item)?;
                Ok(item.clone())
            })
            .await?;
        info!(
            market = self.emitter.node_name(),
            item = %id,
            action,
            stage = ?item.stage,
            at = %game_time,
            "Bidding item updated"
        );
        Ok(item)
    }
}

fn require_stage(
    item: &BiddingItem,
    expected: BiddingStage,
    action: &'static str,
) -> Result<(), NodeError> {
    if item.stage == expected {
        Ok(())
    } else {
        Err(NodeError::IllegalBiddingStage {
            id: item.id,
            stage: item.stage,
            action,
        })
    }
}

fn forbidden(item: &BiddingItem, caller: &str, action: &'static str) -> NodeError {
    NodeError::Forbidden {
        id: item.id,
        caller: caller.to_owned(),
        action,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use supplysim_types::ComponentKind;

    use super::*;

    const T: GameTime = GameTime::working(1, 0);

    async fn market() -> BiddingMarket {
        BiddingMarket::load(
            DocumentStore::memory(),
            "g:exchange:bidding_market".to_owned(),
            BiddingMarketConfig {
                upstreams: vec!["factory".to_owned()],
                downstreams: vec!["retailer".to_owned()],
                penalty_ratio: dec!(0.1),
                compensation_ratio: dec!(0.05),
                news: vec![NewsItem {
                    title: "Steel shortage".to_owned(),
                    content: String::new(),
                    day: 1,
                    time: 2,
                    needs: None,
                }],
            },
            Emitter::detached("exchange", ComponentKind::BiddingMarket),
        )
        .await
        .unwrap()
    }

    fn bodies() -> Vec<GoodsLine> {
        vec![GoodsLine::new("Body", 10, dec!(10))]
    }

    #[tokio::test]
    async fn release_checks_price_and_publisher() {
        let mut m = market().await;
        let mismatch = m.release("factory", bodies(), dec!(99), T).await;
        assert!(matches!(mismatch, Err(NodeError::PriceMismatch { .. })));

        let stranger = m.release("stranger", bodies(), dec!(100), T).await;
        assert!(matches!(stranger, Err(NodeError::NotRegistered { .. })));

        let item = m.release("factory", bodies(), dec!(100), T).await.unwrap();
        assert_eq!(item.stage, BiddingStage::Bidding);
        assert_eq!(item.published_from_chain, ChainSide::Upstream);
        assert_eq!(m.items().len(), 1);
    }

    #[tokio::test]
    async fn only_opposite_chain_may_sign() {
        let mut m = market().await;
        let item = m.release("factory", bodies(), dec!(100), T).await.unwrap();

        let own_side = m.sign(item.id, "factory", T).await;
        assert!(matches!(own_side, Err(NodeError::Forbidden { .. })));

        let signed = m.sign(item.id, "retailer", T).await.unwrap();
        assert_eq!(signed.stage, BiddingStage::Signed);
        assert_eq!(signed.signer.as_deref(), Some("retailer"));

        let again = m.sign(item.id, "retailer", T).await;
        assert!(matches!(again, Err(NodeError::IllegalBiddingStage { .. })));
    }

    #[tokio::test]
    async fn cancel_only_by_publisher_while_bidding() {
        let mut m = market().await;
        let item = m.release("retailer", bodies(), dec!(100), T).await.unwrap();
        assert!(m.cancel(item.id, "factory", T).await.is_err());

        let canceled = m.cancel(item.id, "retailer", T).await.unwrap();
        assert_eq!(canceled.stage, BiddingStage::Canceled);
        assert!(m.sign(item.id, "factory", T).await.is_err());
    }

    #[tokio::test]
    async fn breakoff_computes_independent_amounts() {
        let mut m = market().await;
        let item = m.release("factory", bodies(), dec!(100), T).await.unwrap();
        assert!(m.breakoff(item.id, "factory", T).await.is_err());

        m.sign(item.id, "retailer", T).await.unwrap();
        let outcome = m.breakoff(item.id, "retailer", T).await.unwrap();
        assert_eq!(outcome.item.stage, BiddingStage::Breakoff);
        assert_eq!(outcome.breaker, "retailer");
        assert_eq!(outcome.counterparty, "factory");
        assert_eq!(outcome.penalty, dec!(10));
        assert_eq!(outcome.compensation, dec!(5));

        assert!(m.prepare_delivery(item.id, "factory").is_err());
    }

    #[tokio::test]
    async fn delivery_resolves_seller_and_buyer() {
        let mut m = market().await;
        let item = m.release("retailer", bodies(), dec!(100), T).await.unwrap();
        assert!(m.prepare_delivery(item.id, "retailer").is_err());

        m.sign(item.id, "factory", T).await.unwrap();
        let delivery = m.prepare_delivery(item.id, "retailer").unwrap();
        assert_eq!(delivery.seller, "factory");
        assert_eq!(delivery.buyer, "retailer");
        assert!(m.prepare_delivery(item.id, "stranger").is_err());

        let done = m.complete_delivery(item.id, T).await.unwrap();
        assert_eq!(done.stage, BiddingStage::Completed);
        assert!(m.complete_delivery(item.id, T).await.is_err());
    }

    #[tokio::test]
    async fn news_is_released_by_index() {
        let mut m = market().await;
        assert!(m.news().is_empty());
        let news = m.release_news(0, GameTime::working(1, 2)).await.unwrap();
        assert_eq!(news.map(|n| n.title), Some("Steel shortage".to_owned()));
        assert_eq!(m.news().len(), 1);
        assert!(m.release_news(5, T).await.unwrap().is_none());
    }
}
