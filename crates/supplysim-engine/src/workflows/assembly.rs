//! Bill-of-materials production on a receiver's stock.

use tracing::info;

use supplysim_types::AssemblyRecord;

use crate::engine::Engine;
use crate::error::EngineError;

impl Engine {
    /// Assemble `unit` of `product` for `receiver` using `assembler`'s bill
    /// of materials.
    ///
    /// The components leave the receiver's stock at FIFO cost and the
    /// product enters it at the same total; the assembler journals the run.
    ///
    /// # Errors
    ///
    /// Returns a node error for an unlisted receiver, unknown product, or
    /// short stock, with nothing changed.
    pub async fn assemble(
        &mut self,
        assembler: &str,
        receiver: &str,
        product: &str,
        unit: u64,
    ) -> Result<AssemblyRecord, EngineError> {
        let components = self
            .node(assembler)?
            .assembly()?
            .plan(receiver, product, unit)?;
        let game_time = self.game_time();

        let cost = self
            .node_mut(receiver)?
            .assemble_stock(assembler, product, unit, &components, game_time)
            .await?;
        let record = self
            .node_mut(assembler)?
            .assembly_mut()?
            .record(receiver, product, unit, components, cost, game_time)
            .await?;

        info!(assembler, receiver, product, unit, %cost, "Assembly run");
        Ok(record)
    }
}
