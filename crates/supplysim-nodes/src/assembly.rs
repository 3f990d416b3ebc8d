//! The `assembly` component: bill-of-materials production.
//!
//! Assembling `unit` of a product on a receiver consumes
//! `unit * bill_of_materials[product]` from the receiver's stock and adds
//! `unit` of the product carried at the summed FIFO cost of the components.
//! The stock movements and postings happen on the receiver; this component
//! checks the request and keeps the production journal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use supplysim_core::Emitter;
use supplysim_core::config::AssemblyConfig;
use supplysim_store::{Document, DocumentStore};
use supplysim_types::{AssemblyRecord, GameTime, GoodsQuantity, NotificationKind};

use crate::error::NodeError;

/// Persisted state of an assembly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyState {
    /// Production runs, in order.
    pub journal: Vec<AssemblyRecord>,
}

/// Bill-of-materials production hosted by one node.
#[derive(Debug)]
pub struct Assembly {
    doc: Document<AssemblyState>,
    config: AssemblyConfig,
    emitter: Emitter,
}

impl Assembly {
    /// Load or create the assembly at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Store`] if loading or creating fails.
    pub async fn load(
        store: DocumentStore,
        key: String,
        config: AssemblyConfig,
        emitter: Emitter,
    ) -> Result<Self, NodeError> {
        let doc = Document::load_or_create(store, key, AssemblyState::default).await?;
        Ok(Self {
            doc,
            config,
            emitter,
        })
    }

    /// Production journal.
    pub fn journal(&self) -> &[AssemblyRecord] {
        &self.doc.state().journal
    }

    /// The configured bill of materials.
    pub const fn bill_of_materials(&self) -> &std::collections::BTreeMap<String, Vec<GoodsQuantity>> {
        &self.config.bill_of_materials
    }

    /// Components needed to assemble `unit` of `product` on `receiver`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NotRegistered`] for an unlisted receiver,
    /// [`NodeError::UnknownProduct`], or [`NodeError::Invalid`] for zero
    /// units.
    pub fn plan(
        &self,
        receiver: &str,
        product: &str,
        unit: u64,
    ) -> Result<Vec<GoodsQuantity>, NodeError> {
        if !self.config.receivers.iter().any(|r| r == receiver) {
            return Err(NodeError::NotRegistered {
                name: receiver.to_owned(),
                role: "assembly receiver",
            });
        }
        if unit == 0 {
            return Err(NodeError::invalid("assemble at least one unit"));
        }
        let bom = self
            .config
            .bill_of_materials
            .get(product)
            .ok_or_else(|| NodeError::UnknownProduct {
                product: product.to_owned(),
            })?;
        bom.iter()
            .map(|part| {
                part.unit
                    .checked_mul(unit)
                    .map(|total| GoodsQuantity {
                        name: part.name.clone(),
                        unit: total,
                    })
                    .ok_or(NodeError::Overflow {
                        context: "scaling bill of materials",
                    })
            })
            .collect()
    }

    /// Journal a completed production run.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::Store`] if persisting fails.
    pub async fn record(
        &mut self,
        receiver: &str,
        product: &str,
        unit: u64,
        components: Vec<GoodsQuantity>,
        cost: Decimal,
        game_time: GameTime,
    ) -> Result<AssemblyRecord, NodeError> {
        let record = AssemblyRecord {
            receiver: receiver.to_owned(),
            product: product.to_owned(),
            unit,
            components,
            cost,
            game_time,
        };
        let stored = record.clone();
        self.doc
            .commit(|state: &mut AssemblyState| {
                state.journal.push(stored);
                Ok::<_, NodeError>(())
            })
            .await?;

        info!(
            assembly = self.emitter.node_name(),
            receiver,
            product,
            unit,
            %cost,
            "Assembled"
        );
        self.emitter
            .emit(NotificationKind::Assembled, game_time, json!(record));
        Ok(record)
    }
}
