//! Per-node proxies to markets hosted on other nodes.
//!
//! Receivers hold no state of their own. They gate which markets a node
//! may trade on and, for negotiation markets, keep bankrupt nodes from
//! taking on new contracts. Market notifications reach receivers through
//! notifier relays set up when the game is loaded.

use supplysim_core::config::{BiddingReceiverConfig, MarketReceiverConfig};

use crate::error::NodeError;

/// Proxy to negotiation markets.
#[derive(Debug, Clone)]
pub struct BiddingReceiver {
    config: BiddingReceiverConfig,
}

impl BiddingReceiver {
    /// Build from configuration.
    pub const fn new(config: BiddingReceiverConfig) -> Self {
        Self { config }
    }

    /// Markets this node trades on.
    pub fn markets(&self) -> &[String] {
        &self.config.markets
    }

    /// Check that `market` is one of this node's markets.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NotRegistered`] otherwise.
    pub fn check_market(&self, market: &str) -> Result<(), NodeError> {
        if self.config.markets.iter().any(|m| m == market) {
            Ok(())
        } else {
            Err(NodeError::NotRegistered {
                name: market.to_owned(),
                role: "bidding market of this node",
            })
        }
    }
}

/// Proxy for selling into spot markets.
#[derive(Debug, Clone)]
pub struct MarketReceiver {
    config: MarketReceiverConfig,
}

impl MarketReceiver {
    /// Build from configuration.
    pub const fn new(config: MarketReceiverConfig) -> Self {
        Self { config }
    }

    /// Markets this node sells into.
    pub fn markets(&self) -> &[String] {
        &self.config.markets
    }

    /// Check that `market` is one of this node's markets.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NotRegistered`] otherwise.
    pub fn check_market(&self, market: &str) -> Result<(), NodeError> {
        if self.config.markets.iter().any(|m| m == market) {
            Ok(())
        } else {
            Err(NodeError::NotRegistered {
                name: market.to_owned(),
                role: "spot market of this node",
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_listed_markets_pass() {
        let receiver = BiddingReceiver::new(BiddingReceiverConfig {
            markets: vec!["exchange".to_owned()],
        });
        assert!(receiver.check_market("exchange").is_ok());
        assert!(matches!(
            receiver.check_market("bazaar"),
            Err(NodeError::NotRegistered { .. })
        ));

        let seller = MarketReceiver::new(MarketReceiverConfig::default());
        assert!(seller.check_market("mall").is_err());
    }
}
