//! Node components for Supplysim games.
//!
//! A [`Node`] owns at most one component of each kind. Every stateful
//! component keeps its state in a [`supplysim_store::Document`] under
//! `"{engine_id}:{node}:{kind}"` and commits each mutation before
//! reporting success.
//!
//! # Modules
//!
//! - [`account`] -- [`Account`]: the node's double-entry ledger
//! - [`inventory`] -- [`Inventory`]: FIFO stock with cost-of-sales postings
//! - [`io`] -- [`Io`]: shipments, allow-list quotas, transit delay and cost
//! - [`bidding`] -- [`BiddingMarket`]: negotiated upstream/downstream contracts
//! - [`market`] -- [`Market`]: spot market with a needs board
//! - [`receiver`] -- per-node proxies to markets hosted elsewhere
//! - [`assembly`] -- [`Assembly`]: bill-of-materials production
//! - [`node`] -- [`Node`]: component ownership and same-node operations
//! - [`error`] -- [`NodeError`]

pub mod account;
pub mod assembly;
pub mod bidding;
pub mod error;
pub mod inventory;
pub mod io;
pub mod market;
pub mod node;
pub mod receiver;

pub use account::Account;
pub use assembly::Assembly;
pub use bidding::{BiddingMarket, Breakoff, Delivery};
pub use error::NodeError;
pub use inventory::Inventory;
pub use io::Io;
pub use market::{Market, Quote};
pub use node::{Component, Node, NodeInfo};
pub use receiver::{BiddingReceiver, MarketReceiver};
