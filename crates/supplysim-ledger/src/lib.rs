//! Double-entry bookkeeping for Supplysim nodes.
//!
//! Each node that owns an `account` component keeps one [`Ledger`]: an
//! append-only journal of [`Transaction`]s plus a per-classification view
//! of posted items and running balances derived from it.
//!
//! # Modules
//!
//! - [`ledger`] -- The [`Ledger`] struct: posting, balances, bankruptcy.
//! - [`transaction`] -- The [`TransactionBuilder`] and balance validation.
//!
//! # Balance Law
//!
//! For every transaction not flagged `unbalance`:
//!
//! ```text
//! sum(debit.amount) == sum(credit.amount)
//! ```
//!
//! A classification's balance is its debit total minus its credit total.
//! There is no balancing across nodes: a sale on one node and the matching
//! purchase on another are two independent postings made by the callers.
//!
//! # Usage
//!
//! ```
//! use supplysim_ledger::{Ledger, TransactionBuilder};
//! use supplysim_types::{Classification, GameTime};
//! use rust_decimal::Decimal;
//!
//! let mut ledger = Ledger::new();
//! let tx = TransactionBuilder::new()
//!     .debit(Decimal::new(100, 0), Classification::Cash)
//!     .credit(Decimal::new(100, 0), Classification::Sales)
//!     .build();
//! if let Ok(tx) = tx {
//!     ledger.add(tx, GameTime::working(1, 0)).ok();
//! }
//!
//! assert_eq!(ledger.balance(Classification::Cash), Decimal::new(100, 0));
//! assert_eq!(ledger.balance(Classification::Sales), Decimal::new(-100, 0));
//! ```
//!
//! [`Transaction`]: supplysim_types::Transaction

pub mod ledger;
pub mod transaction;

// Re-export primary types at crate root.
pub use ledger::{ClassificationLedger, Ledger};
pub use transaction::{TransactionBuilder, validate};

use rust_decimal::Decimal;

use supplysim_types::Classification;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when posting to a ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The transaction has no lines at all.
    #[error("transaction has no debit or credit lines")]
    EmptyTransaction,

    /// A line amount is zero or negative.
    #[error("amount posted to {classification} must be positive, got {amount}")]
    NonPositiveAmount {
        /// Classification of the offending line.
        classification: Classification,
        /// The invalid amount.
        amount: Decimal,
    },

    /// Debit and credit totals differ on a transaction not flagged
    /// `unbalance`.
    #[error("unbalanced transaction: debit {debit} != credit {credit}")]
    Unbalanced {
        /// Debit total.
        debit: Decimal,
        /// Credit total.
        credit: Decimal,
    },

    /// Summing amounts overflowed [`Decimal`].
    #[error("arithmetic overflow while {context}")]
    Overflow {
        /// What was being computed.
        context: &'static str,
    },
}
