//! Negotiation market actions taken through a node's bidding receiver.
//!
//! Every action names the acting node and the market it trades on. The
//! receiver check runs first; publishing and signing also require the
//! acting node to be solvent.

use rust_decimal::Decimal;
use tracing::info;

use supplysim_types::{BiddingItem, BiddingItemId, Classification, GoodsLine};

use crate::engine::Engine;
use crate::error::EngineError;

impl Engine {
    /// Publish a contract offer by `publisher` on `market`.
    ///
    /// # Errors
    ///
    /// Returns a node error if the publisher may not trade on the market,
    /// is bankrupt, is not a listed participant, or the price does not
    /// match the goods.
    pub async fn bidding_release(
        &mut self,
        market: &str,
        publisher: &str,
        goods: Vec<GoodsLine>,
        price: Decimal,
    ) -> Result<BiddingItem, EngineError> {
        self.node(publisher)?.check_bidding_access(market, true)?;
        let game_time = self.game_time();
        Ok(self
            .node_mut(market)?
            .bidding_market_mut()?
            .release(publisher, goods, price, game_time)
            .await?)
    }

    /// Accept an offer as the opposite-chain counterparty.
    ///
    /// # Errors
    ///
    /// Returns a node error for an illegal signer or stage.
    pub async fn bidding_sign(
        &mut self,
        market: &str,
        id: BiddingItemId,
        signer: &str,
    ) -> Result<BiddingItem, EngineError> {
        self.node(signer)?.check_bidding_access(market, true)?;
        let game_time = self.game_time();
        Ok(self
            .node_mut(market)?
            .bidding_market_mut()?
            .sign(id, signer, game_time)
            .await?)
    }

    /// Withdraw an unsigned offer as its publisher.
    ///
    /// # Errors
    ///
    /// Returns a node error for an illegal caller or stage.
    pub async fn bidding_cancel(
        &mut self,
        market: &str,
        id: BiddingItemId,
        caller: &str,
    ) -> Result<BiddingItem, EngineError> {
        self.node(caller)?.check_bidding_access(market, false)?;
        let game_time = self.game_time();
        Ok(self
            .node_mut(market)?
            .bidding_market_mut()?
            .cancel(id, caller, game_time)
            .await?)
    }

    /// Break a signed contract.
    ///
    /// The breaker posts the penalty to `CounterPartyDefault`/`AccountsPayable`
    /// and the counterparty posts the compensation to
    /// `Cash`/`IncomeFromCounterPartyDefault`. Zero amounts post nothing.
    ///
    /// # Errors
    ///
    /// Returns a node error for an illegal caller or stage, or when either
    /// party has no account, with nothing changed. A storage failure while
    /// posting leaves the item in `BREAKOFF`.
    pub async fn bidding_breakoff(
        &mut self,
        market: &str,
        id: BiddingItemId,
        caller: &str,
    ) -> Result<BiddingItem, EngineError> {
        self.node(caller)?.check_bidding_access(market, false)?;
        if let Some(item) = self.node(market)?.bidding_market()?.item(id) {
            for party in std::iter::once(item.publisher.as_str()).chain(item.signer.as_deref()) {
                self.node(party)?.account()?;
            }
        }
        let game_time = self.game_time();
        let breakoff = self
            .node_mut(market)?
            .bidding_market_mut()?
            .breakoff(id, caller, game_time)
            .await?;

        self.node_mut(&breakoff.breaker)?
            .account_mut()?
            .transfer(
                breakoff.penalty,
                Classification::CounterPartyDefault,
                Classification::AccountsPayable,
                Some(&breakoff.counterparty),
                game_time,
            )
            .await?;
        self.node_mut(&breakoff.counterparty)?
            .account_mut()?
            .transfer(
                breakoff.compensation,
                Classification::Cash,
                Classification::IncomeFromCounterPartyDefault,
                Some(&breakoff.breaker),
                game_time,
            )
            .await?;

        info!(
            market,
            item = %id,
            breaker = %breakoff.breaker,
            penalty = %breakoff.penalty,
            compensation = %breakoff.compensation,
            "Contract broken off"
        );
        Ok(breakoff.item)
    }

    /// Deliver a signed contract: ship the goods upstream to downstream at
    /// the agreed price, then mark the item completed.
    ///
    /// # Errors
    ///
    /// Returns a node error for an illegal caller or stage, or the
    /// shipment's error. A failed shipment leaves the item `SIGNED`.
    pub async fn bidding_deliver(
        &mut self,
        market: &str,
        id: BiddingItemId,
        caller: &str,
    ) -> Result<BiddingItem, EngineError> {
        self.node(caller)?.check_bidding_access(market, false)?;
        let delivery = self
            .node(market)?
            .bidding_market()?
            .prepare_delivery(id, caller)?;

        self.transfer(&delivery.seller, &delivery.buyer, &delivery.goods, delivery.price)
            .await?;

        let game_time = self.game_time();
        Ok(self
            .node_mut(market)?
            .bidding_market_mut()?
            .complete_delivery(id, game_time)
            .await?)
    }
}
