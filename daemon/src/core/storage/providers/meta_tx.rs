use async_trait::async_trait;
use usdtg_common::{
    crypto::Hash,
    transaction::{MetaTransaction, SponsorshipRecord},
};

use crate::core::error::CoreError;

#[async_trait]
pub trait MetaTransactionProvider {
    /// Check if a meta-transaction is recorded under the tx id
    async fn has_meta_transaction(&self, tx_id: &Hash) -> Result<bool, CoreError>;

    /// Get the recorded meta-transaction
    async fn get_meta_transaction(&self, tx_id: &Hash) -> Result<MetaTransaction, CoreError>;

    /// Record a meta-transaction keyed by its tx id.
    /// Executed transactions recorded here are the replay guard: a tx id
    /// present with `executed = true` can never run again; unexecuted ones
    /// form the in-flight set.
    async fn set_meta_transaction(&mut self, tx: &MetaTransaction) -> Result<(), CoreError>;

    /// Drop a recorded meta-transaction; used to collect expired
    /// in-flight entries
    async fn delete_meta_transaction(&mut self, tx_id: &Hash) -> Result<(), CoreError>;

    /// The in-flight set: recorded but not yet executed transactions
    async fn get_pending_meta_transactions(&self) -> Result<Vec<MetaTransaction>, CoreError>;

    /// Meta-transactions recorded so far, in flight or executed
    async fn count_meta_transactions(&self) -> Result<usize, CoreError>;

    /// Record the sponsorship bookkeeping row of a sponsored execution
    async fn set_sponsorship_record(
        &mut self,
        tx_id: &Hash,
        record: &SponsorshipRecord,
    ) -> Result<(), CoreError>;

    /// Get the sponsorship row recorded for the tx id
    async fn get_sponsorship_record(&self, tx_id: &Hash) -> Result<SponsorshipRecord, CoreError>;
}
