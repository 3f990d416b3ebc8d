//! The `account` component: a persisted [`Ledger`].

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::info;

use supplysim_core::config::AccountConfig;
use supplysim_ledger::{Ledger, TransactionBuilder};
use supplysim_store::{Document, DocumentStore};
use supplysim_types::{Classification, GameTime, JournalEntry, LedgerItem, Transaction};

use crate::error::NodeError;

/// Double-entry ledger of one node.
#[derive(Debug)]
pub struct Account {
    doc: Document<Ledger>,
}

impl Account {
    /// Load the ledger at `key`, or create it and post the configured seed
    /// entries (always accepted unbalanced).
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Ledger`] if a seed entry is malformed, or
    /// [`NodeError::Store`] if loading or creating the document fails.
    pub async fn load(
        store: DocumentStore,
        key: String,
        config: &AccountConfig,
    ) -> Result<Self, NodeError> {
        let mut seeded = Ledger::new();
        for entry in &config.initial {
            let mut seed = entry.clone();
            seed.unbalance = true;
            if seed.memo.is_none() {
                seed.memo = Some("initial balance".to_owned());
            }
            seeded.add(seed, GameTime::INITIAL)?;
        }

        let doc = Document::load_or_create(store, key, move || seeded).await?;
        Ok(Self { doc })
    }

    /// Validate and post a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Ledger`] if the transaction is rejected, or
    /// [`NodeError::Store`] if it cannot be persisted. Either way the
    /// ledger is unchanged.
    pub async fn add(
        &mut self,
        transaction: Transaction,
        game_time: GameTime,
    ) -> Result<JournalEntry, NodeError> {
        self.doc
            .commit(|ledger| {
                ledger
                    .add(transaction, game_time)
                    .cloned()
                    .map_err(NodeError::from)
            })
            .await
    }

    /// Build and post a two-line transfer with a counter object.
    ///
    /// Zero amounts post nothing and return `None`.
    ///
    /// # Errors
    ///
    /// Same as [`Account::add`].
    pub async fn transfer(
        &mut self,
        amount: Decimal,
        debit: Classification,
        credit: Classification,
        counter_object: Option<&str>,
        game_time: GameTime,
    ) -> Result<Option<JournalEntry>, NodeError> {
        if amount.is_zero() {
            return Ok(None);
        }
        let mut builder = TransactionBuilder::transfer(amount, debit, credit);
        if let Some(counter) = counter_object {
            builder = builder.counter(counter);
        }
        let entry = self.add(builder.build()?, game_time).await?;
        info!(
            %amount,
            debit = %debit,
            credit = %credit,
            counter = counter_object.unwrap_or_default(),
            "Ledger transfer"
        );
        Ok(Some(entry))
    }

    /// Balance of a classification; zero if never posted.
    pub fn balance(&self, classification: Classification) -> Decimal {
        self.doc.state().balance(classification)
    }

    /// All classification balances.
    pub fn balances(&self) -> BTreeMap<Classification, Decimal> {
        self.doc.state().balances()
    }

    /// Posted items of a classification.
    pub fn items(&self, classification: Classification) -> &[LedgerItem] {
        self.doc.state().items(classification)
    }

    /// The journal.
    pub fn journal(&self) -> &[JournalEntry] {
        self.doc.state().journal()
    }

    /// See [`Ledger::is_bankrupt`].
    pub fn is_bankrupt(&self) -> bool {
        self.doc.state().is_bankrupt()
    }
}
