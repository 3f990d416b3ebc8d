//! Transaction construction and validation.
//!
//! [`validate`] enforces the balance law on any [`Transaction`], including
//! ones deserialized from callers. [`TransactionBuilder`] is the in-crate
//! convenience for components that post their own entries.

use rust_decimal::Decimal;

use supplysim_types::{Classification, Transaction, TransactionLine};

use crate::LedgerError;

// ---------------------------------------------------------------------------
// Transaction builder
// ---------------------------------------------------------------------------

/// Builder for [`Transaction`] values.
///
/// # Examples
///
/// ```
/// use supplysim_ledger::TransactionBuilder;
/// use supplysim_types::Classification;
/// use rust_decimal::Decimal;
///
/// let tx = TransactionBuilder::new()
///     .debit(Decimal::new(50, 0), Classification::CostOfSales)
///     .credit(Decimal::new(50, 0), Classification::Inventory)
///     .counter("retailer")
///     .build();
///
/// assert!(tx.is_ok());
/// ```
#[derive(Debug, Default)]
pub struct TransactionBuilder {
    debit: Vec<TransactionLine>,
    credit: Vec<TransactionLine>,
    counter_object: Option<String>,
    unbalance: bool,
    memo: Option<String>,
}

impl TransactionBuilder {
    /// Start an empty transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a two-line transfer of `amount` from `credit` to `debit`.
    pub fn transfer(amount: Decimal, debit: Classification, credit: Classification) -> Self {
        Self::new().debit(amount, debit).credit(amount, credit)
    }

    /// Add a debit line.
    #[must_use]
    pub fn debit(mut self, amount: Decimal, classification: Classification) -> Self {
        self.debit.push(TransactionLine::new(amount, classification));
        self
    }

    /// Add a credit line.
    #[must_use]
    pub fn credit(mut self, amount: Decimal, classification: Classification) -> Self {
        self.credit.push(TransactionLine::new(amount, classification));
        self
    }

    /// Set the counter object on every line.
    #[must_use]
    pub fn counter(mut self, counter_object: impl Into<String>) -> Self {
        self.counter_object = Some(counter_object.into());
        self
    }

    /// Set the journal memo.
    #[must_use]
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Accept a debit/credit imbalance (seed and capital entries only).
    #[must_use]
    pub const fn unbalanced(mut self) -> Self {
        self.unbalance = true;
        self
    }

    /// Validate and produce the [`Transaction`].
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`validate`].
    pub fn build(self) -> Result<Transaction, LedgerError> {
        let stamp = |lines: Vec<TransactionLine>| -> Vec<TransactionLine> {
            lines
                .into_iter()
                .map(|mut line| {
                    if line.counter_object.is_none() {
                        line.counter_object.clone_from(&self.counter_object);
                    }
                    line
                })
                .collect()
        };

        let tx = Transaction {
            debit: stamp(self.debit),
            credit: stamp(self.credit),
            unbalance: self.unbalance,
            memo: self.memo,
        };
        validate(&tx)?;
        Ok(tx)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check a transaction against the balance law.
///
/// # Errors
///
/// Returns [`LedgerError::EmptyTransaction`] if there are no lines,
/// [`LedgerError::NonPositiveAmount`] if any amount is not positive,
/// [`LedgerError::Unbalanced`] if debit and credit totals differ and the
/// transaction is not flagged `unbalance`, and [`LedgerError::Overflow`]
/// if a total overflows.
pub fn validate(tx: &Transaction) -> Result<(), LedgerError> {
    if tx.debit.is_empty() && tx.credit.is_empty() {
        return Err(LedgerError::EmptyTransaction);
    }

    for line in tx.debit.iter().chain(&tx.credit) {
        if line.amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount {
                classification: line.classification,
                amount: line.amount,
            });
        }
    }

    let debit = side_total(&tx.debit)?;
    let credit = side_total(&tx.credit)?;
    if debit != credit && !tx.unbalance {
        return Err(LedgerError::Unbalanced { debit, credit });
    }

    Ok(())
}

/// Sum the amounts of one side of a transaction.
fn side_total(lines: &[TransactionLine]) -> Result<Decimal, LedgerError> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| {
        acc.checked_add(line.amount).ok_or(LedgerError::Overflow {
            context: "summing transaction lines",
        })
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn balanced_transfer_builds() {
        let tx = TransactionBuilder::transfer(dec!(10), Classification::Cash, Classification::Sales)
            .build();
        assert!(tx.is_ok());
    }

    #[test]
    fn counter_is_stamped_on_every_line() {
        let tx = TransactionBuilder::transfer(
            dec!(10),
            Classification::AccountsReceivable,
            Classification::Sales,
        )
        .counter("retailer")
        .build();

        let Ok(tx) = tx else {
            panic!("transfer should build");
        };
        assert!(
            tx.debit
                .iter()
                .chain(&tx.credit)
                .all(|l| l.counter_object.as_deref() == Some("retailer"))
        );
    }

    #[test]
    fn unbalanced_rejected_unless_flagged() {
        let result = TransactionBuilder::new()
            .debit(dec!(100), Classification::Cash)
            .credit(dec!(90), Classification::Capital)
            .build();
        assert_eq!(
            result.err(),
            Some(LedgerError::Unbalanced {
                debit: dec!(100),
                credit: dec!(90),
            })
        );

        let seeded = TransactionBuilder::new()
            .debit(dec!(100), Classification::Cash)
            .unbalanced()
            .build();
        assert!(seeded.is_ok());
    }

    #[test]
    fn zero_and_negative_amounts_rejected() {
        let zero = TransactionBuilder::transfer(
            Decimal::ZERO,
            Classification::Cash,
            Classification::Sales,
        )
        .build();
        assert!(matches!(zero, Err(LedgerError::NonPositiveAmount { .. })));

        let negative =
            TransactionBuilder::transfer(dec!(-3), Classification::Cash, Classification::Sales)
                .build();
        assert!(matches!(negative, Err(LedgerError::NonPositiveAmount { .. })));
    }

    #[test]
    fn empty_transaction_rejected() {
        assert_eq!(
            validate(&Transaction::default()),
            Err(LedgerError::EmptyTransaction)
        );
    }

    #[test]
    fn multi_line_sides_are_summed() {
        let tx = TransactionBuilder::new()
            .debit(dec!(30), Classification::Cash)
            .debit(dec!(20), Classification::AccountsReceivable)
            .credit(dec!(50), Classification::Sales)
            .build();
        assert!(tx.is_ok());
    }
}
