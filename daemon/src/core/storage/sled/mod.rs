use async_trait::async_trait;
use log::{debug, info, trace};
use sled::{Db, Tree};
use std::path::Path;

use usdtg_common::{
    account::Wallet,
    asset::Denomination,
    bonus::{BonusRecord, SystemBonusStats, UserBonusStats},
    crypto::{Address, Hash},
    ledger::{Amount, JournalEntry},
    recovery::{BackupCodeSet, RecoveryProposal, RecoverySession},
    serializer::Serializer,
    transaction::{MetaTransaction, SponsorshipRecord},
};

use super::{
    BalanceProvider, BonusProvider, JournalProvider, MetaTransactionProvider, RecoveryProvider,
    Storage, WalletProvider,
};
use crate::core::error::CoreError;

// Tree names
const BALANCES: &str = "balances";
const JOURNAL: &str = "journal";
const JOURNAL_BY_HASH: &str = "journal_by_hash";
const JOURNAL_BY_ADDRESS: &str = "journal_by_address";
const WALLETS: &str = "wallets";
const META_TXS: &str = "meta_txs";
const SPONSORSHIPS: &str = "sponsorships";
const RECOVERY_SESSIONS: &str = "recovery_sessions";
const RECOVERY_PROPOSALS: &str = "recovery_proposals";
const BACKUP_CODES: &str = "backup_codes";
const BONUS_RECORDS: &str = "bonus_records";
const BONUS_BY_WALLET: &str = "bonus_by_wallet";
const USER_STATS: &str = "user_stats";
const COUNTERS: &str = "counters";

// Counter keys
const JOURNAL_SEQUENCE: &[u8] = b"journal_seq";
const BONUS_SEQUENCE: &[u8] = b"bonus_seq";
const OWNER_NONCE_PREFIX: &[u8] = b"owner_nonce";
const SYSTEM_STATS_KEY: &[u8] = b"system_stats";

// Embedded KV backend.
// One tree per concern; every value is encoded through the binary
// serializer. Secondary indexes (journal by address, bonus by wallet) are
// written in the same call as the primary row.
pub struct SledStorage {
    db: Db,
    balances: Tree,
    journal: Tree,
    journal_by_hash: Tree,
    journal_by_address: Tree,
    wallets: Tree,
    meta_txs: Tree,
    sponsorships: Tree,
    recovery_sessions: Tree,
    recovery_proposals: Tree,
    backup_codes: Tree,
    bonus_records: Tree,
    bonus_by_wallet: Tree,
    user_stats: Tree,
    counters: Tree,
}

impl SledStorage {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let db = sled::open(path)?;
        Self::with_db(db)
    }

    // In-memory variant for tests and tooling
    pub fn open_temporary() -> Result<Self, CoreError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::with_db(db)
    }

    fn with_db(db: Db) -> Result<Self, CoreError> {
        let storage = Self {
            balances: db.open_tree(BALANCES)?,
            journal: db.open_tree(JOURNAL)?,
            journal_by_hash: db.open_tree(JOURNAL_BY_HASH)?,
            journal_by_address: db.open_tree(JOURNAL_BY_ADDRESS)?,
            wallets: db.open_tree(WALLETS)?,
            meta_txs: db.open_tree(META_TXS)?,
            sponsorships: db.open_tree(SPONSORSHIPS)?,
            recovery_sessions: db.open_tree(RECOVERY_SESSIONS)?,
            recovery_proposals: db.open_tree(RECOVERY_PROPOSALS)?,
            backup_codes: db.open_tree(BACKUP_CODES)?,
            bonus_records: db.open_tree(BONUS_RECORDS)?,
            bonus_by_wallet: db.open_tree(BONUS_BY_WALLET)?,
            user_stats: db.open_tree(USER_STATS)?,
            counters: db.open_tree(COUNTERS)?,
            db,
        };

        info!("sled storage ready, {} bytes on disk", storage.db.size_on_disk()?);
        Ok(storage)
    }

    // Addresses are length-prefixed by the serializer, so concatenated
    // keys stay self-delimiting.
    fn address_key(address: &Address) -> Vec<u8> {
        address.to_bytes()
    }

    fn balance_key(address: &Address, asset: Denomination) -> Vec<u8> {
        let mut key = Self::address_key(address);
        key.extend_from_slice(&asset.to_bytes());
        key
    }

    fn load<T: Serializer>(tree: &Tree, key: &[u8]) -> Result<Option<T>, CoreError> {
        match tree.get(key)? {
            Some(bytes) => Ok(Some(T::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save<T: Serializer>(tree: &Tree, key: &[u8], value: &T) -> Result<(), CoreError> {
        tree.insert(key, value.to_bytes())?;
        Ok(())
    }

    // Fetch-and-increment of a persisted u64 counter
    fn next_counter(&self, key: &[u8]) -> Result<u64, CoreError> {
        let current = match self.counters.get(key)? {
            Some(bytes) => u64::from_bytes(&bytes)?,
            None => 0,
        };

        self.counters.insert(key, (current + 1).to_bytes())?;
        Ok(current)
    }

    fn owner_nonce_key(owner: &Address) -> Vec<u8> {
        let mut key = OWNER_NONCE_PREFIX.to_vec();
        key.extend_from_slice(&Self::address_key(owner));
        key
    }
}

#[async_trait]
impl BalanceProvider for SledStorage {
    async fn has_balance_for(
        &self,
        address: &Address,
        asset: Denomination,
    ) -> Result<bool, CoreError> {
        Ok(self.balances.contains_key(Self::balance_key(address, asset))?)
    }

    async fn get_balance(
        &self,
        address: &Address,
        asset: Denomination,
    ) -> Result<Amount, CoreError> {
        trace!("get balance {} for {}", asset, address);
        Ok(Self::load(&self.balances, &Self::balance_key(address, asset))?.unwrap_or(0))
    }

    async fn set_balance(
        &mut self,
        address: &Address,
        asset: Denomination,
        amount: Amount,
    ) -> Result<(), CoreError> {
        trace!("set balance {} {} for {}", amount, asset, address);
        Self::save(&self.balances, &Self::balance_key(address, asset), &amount)
    }

    async fn count_balances(&self) -> Result<usize, CoreError> {
        Ok(self.balances.len())
    }
}

#[async_trait]
impl JournalProvider for SledStorage {
    async fn next_journal_sequence(&mut self) -> Result<u64, CoreError> {
        self.next_counter(JOURNAL_SEQUENCE)
    }

    async fn append_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), CoreError> {
        let sequence = entry.get_sequence();
        trace!("append journal entry {} at sequence {}", entry.get_tx_hash(), sequence);

        let sequence_key = sequence.to_bytes();
        Self::save(&self.journal, &sequence_key, entry)?;
        self.journal_by_hash
            .insert(entry.get_tx_hash().as_bytes(), sequence_key.clone())?;

        // Index both sides so list_journal finds the entry either way
        let mut from_key = Self::address_key(entry.get_from());
        from_key.extend_from_slice(&sequence_key);
        self.journal_by_address.insert(from_key, Vec::new())?;

        if entry.get_from() != entry.get_to() {
            let mut to_key = Self::address_key(entry.get_to());
            to_key.extend_from_slice(&sequence_key);
            self.journal_by_address.insert(to_key, Vec::new())?;
        }

        Ok(())
    }

    async fn has_journal_entry(&self, tx_hash: &Hash) -> Result<bool, CoreError> {
        Ok(self.journal_by_hash.contains_key(tx_hash.as_bytes())?)
    }

    async fn get_journal_entry(&self, tx_hash: &Hash) -> Result<JournalEntry, CoreError> {
        let sequence = self
            .journal_by_hash
            .get(tx_hash.as_bytes())?
            .ok_or_else(|| CoreError::TransactionNotFound(tx_hash.clone()))?;

        Self::load(&self.journal, &sequence)?
            .ok_or_else(|| CoreError::TransactionNotFound(tx_hash.clone()))
    }

    async fn get_journal_entries_for(
        &self,
        address: &Address,
        cursor: Option<u64>,
        limit: usize,
    ) -> Result<(Vec<JournalEntry>, Option<u64>), CoreError> {
        debug!("list journal for {} cursor {:?} limit {}", address, cursor, limit);
        let prefix = Self::address_key(address);

        let mut entries = Vec::with_capacity(limit);
        let mut next_cursor = None;
        for item in self.journal_by_address.scan_prefix(&prefix).rev() {
            let (key, _) = item?;
            let sequence_bytes = &key[prefix.len()..];
            let sequence = u64::from_bytes(sequence_bytes)?;

            if let Some(cursor) = cursor {
                if sequence >= cursor {
                    continue;
                }
            }

            if entries.len() == limit {
                // one more row exists, expose where to resume
                next_cursor = entries
                    .last()
                    .map(|entry: &JournalEntry| entry.get_sequence());
                break;
            }

            let entry: JournalEntry = Self::load(&self.journal, sequence_bytes)?
                .ok_or(CoreError::CorruptedData(
                    usdtg_common::serializer::ReaderError::InvalidValue,
                ))?;
            entries.push(entry);
        }

        Ok((entries, next_cursor))
    }

    async fn get_all_journal_entries(&self) -> Result<Vec<JournalEntry>, CoreError> {
        let mut entries = Vec::with_capacity(self.journal.len());
        for item in self.journal.iter() {
            let (_, bytes) = item?;
            entries.push(JournalEntry::from_bytes(&bytes)?);
        }

        Ok(entries)
    }
}

#[async_trait]
impl WalletProvider for SledStorage {
    async fn has_wallet(&self, address: &Address) -> Result<bool, CoreError> {
        Ok(self.wallets.contains_key(Self::address_key(address))?)
    }

    async fn get_wallet(&self, address: &Address) -> Result<Wallet, CoreError> {
        Self::load(&self.wallets, &Self::address_key(address))?
            .ok_or_else(|| CoreError::WalletNotFound(address.clone()))
    }

    async fn set_wallet(&mut self, wallet: &Wallet) -> Result<(), CoreError> {
        trace!("set wallet {}", wallet.get_address());
        Self::save(&self.wallets, &Self::address_key(wallet.get_address()), wallet)
    }

    async fn get_owner_creation_nonce(&self, owner: &Address) -> Result<u64, CoreError> {
        Ok(Self::load(&self.counters, &Self::owner_nonce_key(owner))?.unwrap_or(0))
    }

    async fn increment_owner_creation_nonce(&mut self, owner: &Address) -> Result<u64, CoreError> {
        let key = Self::owner_nonce_key(owner);
        let current: u64 = Self::load(&self.counters, &key)?.unwrap_or(0);
        Self::save(&self.counters, &key, &(current + 1))?;
        Ok(current + 1)
    }

    async fn count_wallets(&self) -> Result<usize, CoreError> {
        Ok(self.wallets.len())
    }
}

#[async_trait]
impl MetaTransactionProvider for SledStorage {
    async fn has_meta_transaction(&self, tx_id: &Hash) -> Result<bool, CoreError> {
        Ok(self.meta_txs.contains_key(tx_id.as_bytes())?)
    }

    async fn get_meta_transaction(&self, tx_id: &Hash) -> Result<MetaTransaction, CoreError> {
        Self::load(&self.meta_txs, tx_id.as_bytes())?
            .ok_or_else(|| CoreError::TransactionNotFound(tx_id.clone()))
    }

    async fn set_meta_transaction(&mut self, tx: &MetaTransaction) -> Result<(), CoreError> {
        trace!("set meta tx {}", tx.get_tx_id());
        Self::save(&self.meta_txs, tx.get_tx_id().as_bytes(), tx)
    }

    async fn delete_meta_transaction(&mut self, tx_id: &Hash) -> Result<(), CoreError> {
        self.meta_txs.remove(tx_id.as_bytes())?;
        Ok(())
    }

    async fn get_pending_meta_transactions(&self) -> Result<Vec<MetaTransaction>, CoreError> {
        let mut pending = Vec::new();
        for item in self.meta_txs.iter() {
            let (_, bytes) = item?;
            let tx = MetaTransaction::from_bytes(&bytes)?;
            if !tx.is_executed() {
                pending.push(tx);
            }
        }

        Ok(pending)
    }

    async fn count_meta_transactions(&self) -> Result<usize, CoreError> {
        Ok(self.meta_txs.len())
    }

    async fn set_sponsorship_record(
        &mut self,
        tx_id: &Hash,
        record: &SponsorshipRecord,
    ) -> Result<(), CoreError> {
        Self::save(&self.sponsorships, tx_id.as_bytes(), record)
    }

    async fn get_sponsorship_record(&self, tx_id: &Hash) -> Result<SponsorshipRecord, CoreError> {
        Self::load(&self.sponsorships, tx_id.as_bytes())?
            .ok_or_else(|| CoreError::TransactionNotFound(tx_id.clone()))
    }
}

#[async_trait]
impl RecoveryProvider for SledStorage {
    async fn has_recovery_session(&self, wallet: &Address) -> Result<bool, CoreError> {
        Ok(self
            .recovery_sessions
            .contains_key(Self::address_key(wallet))?)
    }

    async fn get_recovery_session(&self, wallet: &Address) -> Result<RecoverySession, CoreError> {
        Self::load(&self.recovery_sessions, &Self::address_key(wallet))?
            .ok_or_else(|| CoreError::RecoverySessionNotFound(wallet.clone()))
    }

    async fn set_recovery_session(&mut self, session: &RecoverySession) -> Result<(), CoreError> {
        Self::save(
            &self.recovery_sessions,
            &Self::address_key(session.get_wallet()),
            session,
        )
    }

    async fn delete_recovery_session(&mut self, wallet: &Address) -> Result<(), CoreError> {
        self.recovery_sessions.remove(Self::address_key(wallet))?;
        Ok(())
    }

    async fn has_backup_codes(&self, wallet: &Address) -> Result<bool, CoreError> {
        Ok(self.backup_codes.contains_key(Self::address_key(wallet))?)
    }

    async fn get_backup_codes(&self, wallet: &Address) -> Result<BackupCodeSet, CoreError> {
        Self::load(&self.backup_codes, &Self::address_key(wallet))?
            .ok_or_else(|| CoreError::RecoverySessionNotFound(wallet.clone()))
    }

    async fn set_backup_codes(
        &mut self,
        wallet: &Address,
        codes: &BackupCodeSet,
    ) -> Result<(), CoreError> {
        Self::save(&self.backup_codes, &Self::address_key(wallet), codes)
    }

    async fn has_recovery_proposal(&self, wallet: &Address) -> Result<bool, CoreError> {
        Ok(self
            .recovery_proposals
            .contains_key(Self::address_key(wallet))?)
    }

    async fn get_recovery_proposal(&self, wallet: &Address) -> Result<RecoveryProposal, CoreError> {
        Self::load(&self.recovery_proposals, &Self::address_key(wallet))?
            .ok_or_else(|| CoreError::RecoverySessionNotFound(wallet.clone()))
    }

    async fn set_recovery_proposal(
        &mut self,
        proposal: &RecoveryProposal,
    ) -> Result<(), CoreError> {
        Self::save(
            &self.recovery_proposals,
            &Self::address_key(proposal.get_wallet()),
            proposal,
        )
    }

    async fn delete_recovery_proposal(&mut self, wallet: &Address) -> Result<(), CoreError> {
        self.recovery_proposals.remove(Self::address_key(wallet))?;
        Ok(())
    }
}

#[async_trait]
impl BonusProvider for SledStorage {
    async fn has_bonus_record(&self, bonus_id: &Hash) -> Result<bool, CoreError> {
        Ok(self.bonus_records.contains_key(bonus_id.as_bytes())?)
    }

    async fn get_bonus_record(&self, bonus_id: &Hash) -> Result<BonusRecord, CoreError> {
        Self::load(&self.bonus_records, bonus_id.as_bytes())?
            .ok_or_else(|| CoreError::BonusNotFound(bonus_id.clone()))
    }

    async fn set_bonus_record(&mut self, record: &BonusRecord) -> Result<(), CoreError> {
        trace!("set bonus record {}", record.get_bonus_id());
        Self::save(&self.bonus_records, record.get_bonus_id().as_bytes(), record)?;

        let mut index_key = Self::address_key(record.get_wallet());
        index_key.extend_from_slice(record.get_bonus_id().as_bytes());
        self.bonus_by_wallet.insert(index_key, Vec::new())?;
        Ok(())
    }

    async fn get_bonus_ids_for_wallet(&self, wallet: &Address) -> Result<Vec<Hash>, CoreError> {
        let prefix = Self::address_key(wallet);
        let mut ids = Vec::new();
        for item in self.bonus_by_wallet.scan_prefix(&prefix) {
            let (key, _) = item?;
            let hash_bytes: [u8; 32] = key[prefix.len()..]
                .try_into()
                .map_err(|_| CoreError::CorruptedData(
                    usdtg_common::serializer::ReaderError::InvalidSize,
                ))?;
            ids.push(Hash::new(hash_bytes));
        }

        Ok(ids)
    }

    async fn get_user_bonus_stats(&self, wallet: &Address) -> Result<UserBonusStats, CoreError> {
        Ok(Self::load(&self.user_stats, &Self::address_key(wallet))?.unwrap_or_default())
    }

    async fn set_user_bonus_stats(
        &mut self,
        wallet: &Address,
        stats: &UserBonusStats,
    ) -> Result<(), CoreError> {
        Self::save(&self.user_stats, &Self::address_key(wallet), stats)
    }

    async fn get_system_bonus_stats(&self) -> Result<SystemBonusStats, CoreError> {
        Ok(Self::load(&self.counters, SYSTEM_STATS_KEY)?.unwrap_or_default())
    }

    async fn set_system_bonus_stats(&mut self, stats: &SystemBonusStats) -> Result<(), CoreError> {
        Self::save(&self.counters, SYSTEM_STATS_KEY, stats)
    }

    async fn next_bonus_sequence(&mut self) -> Result<u64, CoreError> {
        self.next_counter(BONUS_SEQUENCE)
    }
}

#[async_trait]
impl Storage for SledStorage {
    async fn flush(&mut self) -> Result<(), CoreError> {
        self.db.flush_async().await?;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), CoreError> {
        debug!("stopping sled storage");
        self.flush().await
    }

    async fn get_size_on_disk(&self) -> Result<u64, CoreError> {
        Ok(self.db.size_on_disk()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usdtg_common::{
        crypto::hash,
        ledger::TransactionStatus,
    };

    fn storage() -> SledStorage {
        SledStorage::open_temporary().expect("temporary sled storage")
    }

    fn addr(seed: &[u8]) -> Address {
        Address::from_hash(&hash(seed))
    }

    fn entry(seed: &[u8], from: &Address, to: &Address, sequence: u64) -> JournalEntry {
        JournalEntry::new(
            hash(seed),
            from.clone(),
            to.clone(),
            Denomination::USDTg,
            1,
            0,
            TransactionStatus::Confirmed,
            sequence * 10,
            sequence,
            None,
        )
    }

    #[tokio::test]
    async fn test_balance_defaults_to_zero() {
        let mut storage = storage();
        let a = addr(b"a");

        assert_eq!(storage.get_balance(&a, Denomination::USDTg).await.unwrap(), 0);
        assert!(!storage.has_balance_for(&a, Denomination::USDTg).await.unwrap());

        storage.set_balance(&a, Denomination::USDTg, 42).await.unwrap();
        assert_eq!(storage.get_balance(&a, Denomination::USDTg).await.unwrap(), 42);

        // denominations are independent rows
        assert_eq!(storage.get_balance(&a, Denomination::USDTgV).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_journal_sequence_is_monotone() {
        let mut storage = storage();
        for expected in 0..5u64 {
            assert_eq!(storage.next_journal_sequence().await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_journal_indexes_both_sides() {
        let mut storage = storage();
        let a = addr(b"a");
        let b = addr(b"b");
        let c = addr(b"c");

        for (i, (from, to)) in [(&a, &b), (&b, &c), (&c, &a)].iter().enumerate() {
            let sequence = storage.next_journal_sequence().await.unwrap();
            storage
                .append_journal_entry(&entry(&[i as u8], from, to, sequence))
                .await
                .unwrap();
        }

        // a appears as sender of #0 and receiver of #2, newest first
        let (entries, next) = storage.get_journal_entries_for(&a, None, 10).await.unwrap();
        assert!(next.is_none());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].get_sequence(), 2);
        assert_eq!(entries[1].get_sequence(), 0);
    }

    #[tokio::test]
    async fn test_journal_pagination_cursor() {
        let mut storage = storage();
        let a = addr(b"a");
        let b = addr(b"b");

        for i in 0..5u64 {
            let sequence = storage.next_journal_sequence().await.unwrap();
            storage
                .append_journal_entry(&entry(&[i as u8], &a, &b, sequence))
                .await
                .unwrap();
        }

        let (first, cursor) = storage.get_journal_entries_for(&a, None, 2).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(cursor, Some(3));

        let (second, cursor) = storage.get_journal_entries_for(&a, cursor, 2).await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(cursor, Some(1));

        let (third, cursor) = storage.get_journal_entries_for(&a, cursor, 2).await.unwrap();
        assert_eq!(third.len(), 1);
        assert!(cursor.is_none());
    }

    #[tokio::test]
    async fn test_lookup_by_hash() {
        let mut storage = storage();
        let a = addr(b"a");
        let b = addr(b"b");

        let sequence = storage.next_journal_sequence().await.unwrap();
        let entry = entry(b"tx", &a, &b, sequence);
        storage.append_journal_entry(&entry).await.unwrap();

        assert!(storage.has_journal_entry(entry.get_tx_hash()).await.unwrap());
        let loaded = storage.get_journal_entry(entry.get_tx_hash()).await.unwrap();
        assert_eq!(loaded.get_sequence(), sequence);

        let missing = storage.get_journal_entry(&hash(b"missing")).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_owner_creation_nonce_advances() {
        let mut storage = storage();
        let owner = addr(b"owner");

        assert_eq!(storage.get_owner_creation_nonce(&owner).await.unwrap(), 0);
        assert_eq!(storage.increment_owner_creation_nonce(&owner).await.unwrap(), 1);
        assert_eq!(storage.increment_owner_creation_nonce(&owner).await.unwrap(), 2);
        assert_eq!(storage.get_owner_creation_nonce(&owner).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_recovery_proposal_crud() {
        let mut storage = storage();
        let wallet = addr(b"wallet");

        assert!(!storage.has_recovery_proposal(&wallet).await.unwrap());

        let mut proposal = RecoveryProposal::open(wallet.clone(), addr(b"new-owner"));
        proposal.approve(addr(b"guardian")).unwrap();
        storage.set_recovery_proposal(&proposal).await.unwrap();

        let loaded = storage.get_recovery_proposal(&wallet).await.unwrap();
        assert_eq!(loaded.get_approvals().len(), 1);

        storage.delete_recovery_proposal(&wallet).await.unwrap();
        assert!(!storage.has_recovery_proposal(&wallet).await.unwrap());
    }
}
