use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use log::trace;

use usdtg_common::{
    account::Wallet,
    asset::Denomination,
    bonus::{BonusRecord, SystemBonusStats, UserBonusStats},
    crypto::{Address, Hash},
    ledger::{Amount, JournalEntry},
    recovery::{BackupCodeSet, RecoveryProposal, RecoverySession},
    transaction::{MetaTransaction, SponsorshipRecord},
};

use super::{
    BalanceProvider, BonusProvider, JournalProvider, MetaTransactionProvider, RecoveryProvider,
    Storage, WalletProvider,
};
use crate::core::error::CoreError;

// Volatile backend holding everything in plain maps.
// Useful for tooling and logic-level tests; it honors every provider
// contract except durability, which has nothing to persist to.
#[derive(Default)]
pub struct MemoryStorage {
    balances: HashMap<(Address, Denomination), Amount>,
    // journal keyed by write sequence so iteration is write order
    journal: BTreeMap<u64, JournalEntry>,
    journal_by_hash: HashMap<Hash, u64>,
    journal_sequence: u64,
    wallets: HashMap<Address, Wallet>,
    owner_nonces: HashMap<Address, u64>,
    meta_txs: HashMap<Hash, MetaTransaction>,
    sponsorships: HashMap<Hash, SponsorshipRecord>,
    recovery_sessions: HashMap<Address, RecoverySession>,
    recovery_proposals: HashMap<Address, RecoveryProposal>,
    backup_codes: HashMap<Address, BackupCodeSet>,
    bonus_records: HashMap<Hash, BonusRecord>,
    bonus_by_wallet: HashMap<Address, Vec<Hash>>,
    user_stats: HashMap<Address, UserBonusStats>,
    system_stats: SystemBonusStats,
    bonus_sequence: u64,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceProvider for MemoryStorage {
    async fn has_balance_for(
        &self,
        address: &Address,
        asset: Denomination,
    ) -> Result<bool, CoreError> {
        Ok(self.balances.contains_key(&(address.clone(), asset)))
    }

    async fn get_balance(
        &self,
        address: &Address,
        asset: Denomination,
    ) -> Result<Amount, CoreError> {
        Ok(self
            .balances
            .get(&(address.clone(), asset))
            .copied()
            .unwrap_or(0))
    }

    async fn set_balance(
        &mut self,
        address: &Address,
        asset: Denomination,
        amount: Amount,
    ) -> Result<(), CoreError> {
        trace!("set balance {} {} for {}", amount, asset, address);
        self.balances.insert((address.clone(), asset), amount);
        Ok(())
    }

    async fn count_balances(&self) -> Result<usize, CoreError> {
        Ok(self.balances.len())
    }
}

#[async_trait]
impl JournalProvider for MemoryStorage {
    async fn next_journal_sequence(&mut self) -> Result<u64, CoreError> {
        let sequence = self.journal_sequence;
        self.journal_sequence += 1;
        Ok(sequence)
    }

    async fn append_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), CoreError> {
        self.journal_by_hash
            .insert(entry.get_tx_hash().clone(), entry.get_sequence());
        self.journal.insert(entry.get_sequence(), entry.clone());
        Ok(())
    }

    async fn has_journal_entry(&self, tx_hash: &Hash) -> Result<bool, CoreError> {
        Ok(self.journal_by_hash.contains_key(tx_hash))
    }

    async fn get_journal_entry(&self, tx_hash: &Hash) -> Result<JournalEntry, CoreError> {
        self.journal_by_hash
            .get(tx_hash)
            .and_then(|sequence| self.journal.get(sequence))
            .cloned()
            .ok_or_else(|| CoreError::TransactionNotFound(tx_hash.clone()))
    }

    async fn get_journal_entries_for(
        &self,
        address: &Address,
        cursor: Option<u64>,
        limit: usize,
    ) -> Result<(Vec<JournalEntry>, Option<u64>), CoreError> {
        let mut entries = Vec::with_capacity(limit);
        let mut next_cursor = None;
        for (sequence, entry) in self.journal.iter().rev() {
            if !entry.concerns(address) {
                continue;
            }

            if let Some(cursor) = cursor {
                if *sequence >= cursor {
                    continue;
                }
            }

            if entries.len() == limit {
                next_cursor = entries
                    .last()
                    .map(|entry: &JournalEntry| entry.get_sequence());
                break;
            }

            entries.push(entry.clone());
        }

        Ok((entries, next_cursor))
    }

    async fn get_all_journal_entries(&self) -> Result<Vec<JournalEntry>, CoreError> {
        Ok(self.journal.values().cloned().collect())
    }
}

#[async_trait]
impl WalletProvider for MemoryStorage {
    async fn has_wallet(&self, address: &Address) -> Result<bool, CoreError> {
        Ok(self.wallets.contains_key(address))
    }

    async fn get_wallet(&self, address: &Address) -> Result<Wallet, CoreError> {
        self.wallets
            .get(address)
            .cloned()
            .ok_or_else(|| CoreError::WalletNotFound(address.clone()))
    }

    async fn set_wallet(&mut self, wallet: &Wallet) -> Result<(), CoreError> {
        self.wallets
            .insert(wallet.get_address().clone(), wallet.clone());
        Ok(())
    }

    async fn get_owner_creation_nonce(&self, owner: &Address) -> Result<u64, CoreError> {
        Ok(self.owner_nonces.get(owner).copied().unwrap_or(0))
    }

    async fn increment_owner_creation_nonce(&mut self, owner: &Address) -> Result<u64, CoreError> {
        let nonce = self.owner_nonces.entry(owner.clone()).or_insert(0);
        *nonce += 1;
        Ok(*nonce)
    }

    async fn count_wallets(&self) -> Result<usize, CoreError> {
        Ok(self.wallets.len())
    }
}

#[async_trait]
impl MetaTransactionProvider for MemoryStorage {
    async fn has_meta_transaction(&self, tx_id: &Hash) -> Result<bool, CoreError> {
        Ok(self.meta_txs.contains_key(tx_id))
    }

    async fn get_meta_transaction(&self, tx_id: &Hash) -> Result<MetaTransaction, CoreError> {
        self.meta_txs
            .get(tx_id)
            .cloned()
            .ok_or_else(|| CoreError::TransactionNotFound(tx_id.clone()))
    }

    async fn set_meta_transaction(&mut self, tx: &MetaTransaction) -> Result<(), CoreError> {
        self.meta_txs.insert(tx.get_tx_id().clone(), tx.clone());
        Ok(())
    }

    async fn delete_meta_transaction(&mut self, tx_id: &Hash) -> Result<(), CoreError> {
        self.meta_txs.remove(tx_id);
        Ok(())
    }

    async fn get_pending_meta_transactions(&self) -> Result<Vec<MetaTransaction>, CoreError> {
        Ok(self
            .meta_txs
            .values()
            .filter(|tx| !tx.is_executed())
            .cloned()
            .collect())
    }

    async fn count_meta_transactions(&self) -> Result<usize, CoreError> {
        Ok(self.meta_txs.len())
    }

    async fn set_sponsorship_record(
        &mut self,
        tx_id: &Hash,
        record: &SponsorshipRecord,
    ) -> Result<(), CoreError> {
        self.sponsorships.insert(tx_id.clone(), record.clone());
        Ok(())
    }

    async fn get_sponsorship_record(&self, tx_id: &Hash) -> Result<SponsorshipRecord, CoreError> {
        self.sponsorships
            .get(tx_id)
            .cloned()
            .ok_or_else(|| CoreError::TransactionNotFound(tx_id.clone()))
    }
}

#[async_trait]
impl RecoveryProvider for MemoryStorage {
    async fn has_recovery_session(&self, wallet: &Address) -> Result<bool, CoreError> {
        Ok(self.recovery_sessions.contains_key(wallet))
    }

    async fn get_recovery_session(&self, wallet: &Address) -> Result<RecoverySession, CoreError> {
        self.recovery_sessions
            .get(wallet)
            .cloned()
            .ok_or_else(|| CoreError::RecoverySessionNotFound(wallet.clone()))
    }

    async fn set_recovery_session(&mut self, session: &RecoverySession) -> Result<(), CoreError> {
        self.recovery_sessions
            .insert(session.get_wallet().clone(), session.clone());
        Ok(())
    }

    async fn delete_recovery_session(&mut self, wallet: &Address) -> Result<(), CoreError> {
        self.recovery_sessions.remove(wallet);
        Ok(())
    }

    async fn has_backup_codes(&self, wallet: &Address) -> Result<bool, CoreError> {
        Ok(self.backup_codes.contains_key(wallet))
    }

    async fn get_backup_codes(&self, wallet: &Address) -> Result<BackupCodeSet, CoreError> {
        self.backup_codes
            .get(wallet)
            .cloned()
            .ok_or_else(|| CoreError::RecoverySessionNotFound(wallet.clone()))
    }

    async fn set_backup_codes(
        &mut self,
        wallet: &Address,
        codes: &BackupCodeSet,
    ) -> Result<(), CoreError> {
        self.backup_codes.insert(wallet.clone(), codes.clone());
        Ok(())
    }

    async fn has_recovery_proposal(&self, wallet: &Address) -> Result<bool, CoreError> {
        Ok(self.recovery_proposals.contains_key(wallet))
    }

    async fn get_recovery_proposal(&self, wallet: &Address) -> Result<RecoveryProposal, CoreError> {
        self.recovery_proposals
            .get(wallet)
            .cloned()
            .ok_or_else(|| CoreError::RecoverySessionNotFound(wallet.clone()))
    }

    async fn set_recovery_proposal(
        &mut self,
        proposal: &RecoveryProposal,
    ) -> Result<(), CoreError> {
        self.recovery_proposals
            .insert(proposal.get_wallet().clone(), proposal.clone());
        Ok(())
    }

    async fn delete_recovery_proposal(&mut self, wallet: &Address) -> Result<(), CoreError> {
        self.recovery_proposals.remove(wallet);
        Ok(())
    }
}

#[async_trait]
impl BonusProvider for MemoryStorage {
    async fn has_bonus_record(&self, bonus_id: &Hash) -> Result<bool, CoreError> {
        Ok(self.bonus_records.contains_key(bonus_id))
    }

    async fn get_bonus_record(&self, bonus_id: &Hash) -> Result<BonusRecord, CoreError> {
        self.bonus_records
            .get(bonus_id)
            .cloned()
            .ok_or_else(|| CoreError::BonusNotFound(bonus_id.clone()))
    }

    async fn set_bonus_record(&mut self, record: &BonusRecord) -> Result<(), CoreError> {
        let ids = self
            .bonus_by_wallet
            .entry(record.get_wallet().clone())
            .or_default();
        if !ids.contains(record.get_bonus_id()) {
            ids.push(record.get_bonus_id().clone());
        }

        self.bonus_records
            .insert(record.get_bonus_id().clone(), record.clone());
        Ok(())
    }

    async fn get_bonus_ids_for_wallet(&self, wallet: &Address) -> Result<Vec<Hash>, CoreError> {
        Ok(self.bonus_by_wallet.get(wallet).cloned().unwrap_or_default())
    }

    async fn get_user_bonus_stats(&self, wallet: &Address) -> Result<UserBonusStats, CoreError> {
        Ok(self.user_stats.get(wallet).cloned().unwrap_or_default())
    }

    async fn set_user_bonus_stats(
        &mut self,
        wallet: &Address,
        stats: &UserBonusStats,
    ) -> Result<(), CoreError> {
        self.user_stats.insert(wallet.clone(), stats.clone());
        Ok(())
    }

    async fn get_system_bonus_stats(&self) -> Result<SystemBonusStats, CoreError> {
        Ok(self.system_stats.clone())
    }

    async fn set_system_bonus_stats(&mut self, stats: &SystemBonusStats) -> Result<(), CoreError> {
        self.system_stats = stats.clone();
        Ok(())
    }

    async fn next_bonus_sequence(&mut self) -> Result<u64, CoreError> {
        let sequence = self.bonus_sequence;
        self.bonus_sequence += 1;
        Ok(sequence)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn flush(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn get_size_on_disk(&self) -> Result<u64, CoreError> {
        Ok(0)
    }
}
