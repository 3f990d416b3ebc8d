//! Error types for the node components.
//!
//! Every single-node operation checks before it mutates, so any error
//! returned here means the node's state is unchanged. Persistence failures
//! surface as [`NodeError::Store`] and may be retried.

use rust_decimal::Decimal;

use supplysim_ledger::LedgerError;
use supplysim_store::StoreError;
use supplysim_types::{BiddingItemId, BiddingStage, ComponentKind, ShipmentId};

/// Errors that can occur during node component operations.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The ledger rejected a transaction.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Loading or persisting component state failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The node has no component of the required kind.
    #[error("node '{node}' has no {kind} component")]
    MissingComponent {
        /// Node name.
        node: String,
        /// Required component kind.
        kind: ComponentKind,
    },

    /// A component of this kind is already attached.
    #[error("node '{node}' already has a {kind} component")]
    AlreadyInitialized {
        /// Node name.
        node: String,
        /// Component kind attached twice.
        kind: ComponentKind,
    },

    /// Malformed request arguments.
    #[error("invalid request: {reason}")]
    Invalid {
        /// What is wrong with the request.
        reason: String,
    },

    /// Not enough stock of a good.
    #[error("out of stock: {good} has {available} units, {requested} requested")]
    OutOfStock {
        /// Good name.
        good: String,
        /// Units on hand.
        available: u64,
        /// Units requested.
        requested: u64,
    },

    /// The same good appears twice in one shipment.
    #[error("good {good} appears more than once in one shipment")]
    DuplicateGoods {
        /// The repeated good.
        good: String,
    },

    /// The import allow-list does not cover the shipment.
    #[error("good {good} not available for import: {remaining} remaining, {requested} requested")]
    GoodsNotAvailable {
        /// Good name.
        good: String,
        /// Remaining quota.
        remaining: u64,
        /// Units requested.
        requested: u64,
    },

    /// Declared price differs from the sum of the goods lines.
    #[error("declared price {declared} does not match goods total {computed}")]
    PriceMismatch {
        /// Price given by the caller.
        declared: Decimal,
        /// `sum(unit * unit_price)` of the goods.
        computed: Decimal,
    },

    /// A counterparty is not registered with the component.
    #[error("'{name}' is not a registered {role}")]
    NotRegistered {
        /// The unregistered name.
        name: String,
        /// Role it was expected in (upstream, market, receiver, ...).
        role: &'static str,
    },

    /// A participant may not perform the action on this item.
    #[error("'{caller}' may not {action} bidding item {id}")]
    Forbidden {
        /// Item concerned.
        id: BiddingItemId,
        /// Calling participant.
        caller: String,
        /// Attempted action.
        action: &'static str,
    },

    /// The action is not legal from the item's current stage.
    #[error("cannot {action} bidding item {id} in stage {stage:?}")]
    IllegalBiddingStage {
        /// Item concerned.
        id: BiddingItemId,
        /// Current stage.
        stage: BiddingStage,
        /// Attempted action.
        action: &'static str,
    },

    /// No bidding item with this id.
    #[error("bidding item {0} not found")]
    BiddingItemNotFound(BiddingItemId),

    /// No shipment with this id.
    #[error("shipment {0} not found")]
    ShipmentNotFound(ShipmentId),

    /// The node is bankrupt and may not take on new contracts.
    #[error("node '{node}' is bankrupt")]
    Bankrupt {
        /// Node name.
        node: String,
    },

    /// The needs board cannot satisfy a purchase.
    #[error("market needs {remaining} units of {good}, {requested} offered")]
    InsufficientNeeds {
        /// Good name.
        good: String,
        /// Units remaining on the board.
        remaining: u64,
        /// Units offered.
        requested: u64,
    },

    /// The product has no bill of materials.
    #[error("no bill of materials for {product}")]
    UnknownProduct {
        /// Product name.
        product: String,
    },

    /// A money or unit computation overflowed.
    #[error("arithmetic overflow while {context}")]
    Overflow {
        /// What was being computed.
        context: &'static str,
    },
}

impl NodeError {
    /// Shorthand for [`NodeError::Invalid`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }
}
