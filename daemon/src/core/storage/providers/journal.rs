use async_trait::async_trait;
use usdtg_common::{
    crypto::{Address, Hash},
    ledger::JournalEntry,
};

use crate::core::error::CoreError;

#[async_trait]
pub trait JournalProvider {
    /// Allocate the next monotone write sequence
    async fn next_journal_sequence(&mut self) -> Result<u64, CoreError>;

    /// Append an entry; the entry's sequence must come from
    /// `next_journal_sequence` and entries are never mutated afterwards
    async fn append_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), CoreError>;

    /// Check if a tx hash is already journaled
    async fn has_journal_entry(&self, tx_hash: &Hash) -> Result<bool, CoreError>;

    /// Get an entry by its tx hash
    async fn get_journal_entry(&self, tx_hash: &Hash) -> Result<JournalEntry, CoreError>;

    /// Entries touching the address (as sender or receiver), newest first.
    /// `cursor` is the sequence below which to resume; the returned cursor
    /// is None once the history is exhausted.
    async fn get_journal_entries_for(
        &self,
        address: &Address,
        cursor: Option<u64>,
        limit: usize,
    ) -> Result<(Vec<JournalEntry>, Option<u64>), CoreError>;

    /// Every entry in write order, for replay and audit
    async fn get_all_journal_entries(&self) -> Result<Vec<JournalEntry>, CoreError>;
}
