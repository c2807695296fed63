use std::{collections::BTreeMap, sync::Arc};

use lazy_static::lazy_static;
use log::{debug, trace};
use tokio::sync::RwLock;

use usdtg_common::{
    asset::Denomination,
    config::{
        AIRDROP_RESERVE_ADDRESS, BONUS_RESERVE_ADDRESS, BRIDGE_RESERVE_ADDRESS,
        DEFAULT_JOURNAL_PAGE_SIZE, MAX_JOURNAL_PAGE_SIZE, MAX_TRANSFER_AMOUNT,
    },
    crypto::{Address, Hash, Hasher},
    ledger::{Amount, JournalEntry, SourceTag, TransactionStatus},
    serializer::{Serializer, Writer},
    time::get_current_time_in_millis,
};

use super::{error::CoreError, locks::AddressLockTable, storage::Storage};

lazy_static! {
    static ref AIRDROP_RESERVE: Address = Address::parse(AIRDROP_RESERVE_ADDRESS)
        .expect("airdrop reserve address must be valid");
    static ref BONUS_RESERVE: Address =
        Address::parse(BONUS_RESERVE_ADDRESS).expect("bonus reserve address must be valid");
    static ref BRIDGE_RESERVE: Address =
        Address::parse(BRIDGE_RESERVE_ADDRESS).expect("bridge reserve address must be valid");
}

// The reserve originating a single-sided credit
pub fn reserve_address(tag: SourceTag) -> &'static Address {
    match tag {
        SourceTag::Airdrop => &AIRDROP_RESERVE,
        SourceTag::Bonus => &BONUS_RESERVE,
        SourceTag::Bridge => &BRIDGE_RESERVE,
    }
}

// True for the accounts allowed to originate credits without a debit
pub fn is_reserve(address: &Address) -> bool {
    address == &*AIRDROP_RESERVE || address == &*BONUS_RESERVE || address == &*BRIDGE_RESERVE
}

// One leg of an atomic transfer bundle
#[derive(Debug, Clone)]
pub struct TransferLeg {
    pub to: Address,
    pub asset: Denomination,
    pub amount: Amount,
    pub memo: Option<String>,
}

// L0: atomic, crash-safe balance mutations plus the append-only journal.
//
// Every mutating operation serializes on the per-address lock table
// (lexicographic acquisition for multi-address operations), validates
// before touching any row, then writes the balance deltas and exactly one
// journal entry per applied leg, and flushes before reporting success.
// A rejected operation writes nothing.
pub struct LedgerStore<S: Storage> {
    storage: Arc<RwLock<S>>,
    locks: AddressLockTable,
    hasher: Arc<dyn Hasher>,
}

impl<S: Storage> LedgerStore<S> {
    pub fn new(storage: Arc<RwLock<S>>, hasher: Arc<dyn Hasher>) -> Self {
        Self {
            storage,
            locks: AddressLockTable::new(),
            hasher,
        }
    }

    pub fn get_storage(&self) -> &Arc<RwLock<S>> {
        &self.storage
    }

    fn check_amount(amount: Amount) -> Result<(), CoreError> {
        if amount == 0 {
            return Err(CoreError::ZeroAmount);
        }

        if amount > MAX_TRANSFER_AMOUNT {
            return Err(CoreError::AmountAboveLimit {
                amount,
                maximum: MAX_TRANSFER_AMOUNT,
            });
        }

        Ok(())
    }

    // tx_hash = H(from || to || denom || amount || memo || timestamp || counter)
    fn derive_tx_hash(
        &self,
        from: &Address,
        to: &Address,
        asset: Denomination,
        amount: Amount,
        memo: &Option<String>,
        timestamp: u64,
        counter: u64,
    ) -> Hash {
        let mut writer = Writer::new();
        from.write(&mut writer);
        to.write(&mut writer);
        asset.write(&mut writer);
        writer.write_u128(&amount);
        memo.write(&mut writer);
        writer.write_u64(&timestamp);
        writer.write_u64(&counter);
        self.hasher.hash(&writer.bytes())
    }

    pub async fn get_balance(
        &self,
        address: &Address,
        asset: Denomination,
    ) -> Result<Amount, CoreError> {
        let storage = self.storage.read().await;
        storage.get_balance(address, asset).await
    }

    // Atomic debit + credit + journal append.
    // Holds both address locks for the whole operation; validation happens
    // before the first write so a failure leaves no observable effect.
    pub async fn apply_transfer(
        &self,
        from: &Address,
        to: &Address,
        asset: Denomination,
        amount: Amount,
        fee: Amount,
        memo: Option<String>,
    ) -> Result<Hash, CoreError> {
        Self::check_amount(amount)?;

        let need = amount
            .checked_add(fee)
            .ok_or(CoreError::OverflowOnCredit { address: to.clone() })?;

        let _guards = self.locks.lock_ordered(&[from, to]).await;
        let mut storage = self.storage.write().await;

        let from_balance = storage.get_balance(from, asset).await?;
        if from_balance < need {
            debug!(
                "transfer of {} {} from {} rejected: balance {}",
                amount, asset, from, from_balance
            );
            return Err(CoreError::InsufficientBalance {
                need,
                have: from_balance,
            });
        }

        // Debit first so a self-transfer reads its own debited balance
        storage.set_balance(from, asset, from_balance - need).await?;

        let to_balance = storage.get_balance(to, asset).await?;
        let credited = match to_balance.checked_add(amount) {
            Some(credited) => credited,
            None => {
                // undo the debit, nothing was journaled yet
                storage.set_balance(from, asset, from_balance).await?;
                return Err(CoreError::OverflowOnCredit { address: to.clone() });
            }
        };
        storage.set_balance(to, asset, credited).await?;

        let timestamp = get_current_time_in_millis();
        let sequence = storage.next_journal_sequence().await?;
        let tx_hash = self.derive_tx_hash(from, to, asset, amount, &memo, timestamp, sequence);

        let entry = JournalEntry::new(
            tx_hash.clone(),
            from.clone(),
            to.clone(),
            asset,
            amount,
            fee,
            TransactionStatus::Confirmed,
            timestamp,
            sequence,
            memo,
        );
        storage.append_journal_entry(&entry).await?;
        storage.flush().await?;

        trace!("transfer {} applied", tx_hash);
        Ok(tx_hash)
    }

    // Single-sided credit from a reserve account.
    // Reserves bypass the balance precondition; no other account may.
    pub async fn credit(
        &self,
        to: &Address,
        asset: Denomination,
        amount: Amount,
        memo: Option<String>,
        source_tag: SourceTag,
    ) -> Result<Hash, CoreError> {
        Self::check_amount(amount)?;
        let from = reserve_address(source_tag);

        let _guard = self.locks.lock(to).await;
        let mut storage = self.storage.write().await;

        let to_balance = storage.get_balance(to, asset).await?;
        let credited = to_balance
            .checked_add(amount)
            .ok_or(CoreError::OverflowOnCredit { address: to.clone() })?;
        storage.set_balance(to, asset, credited).await?;

        let timestamp = get_current_time_in_millis();
        let sequence = storage.next_journal_sequence().await?;
        let tx_hash = self.derive_tx_hash(from, to, asset, amount, &memo, timestamp, sequence);

        let entry = JournalEntry::new(
            tx_hash.clone(),
            from.clone(),
            to.clone(),
            asset,
            amount,
            0,
            TransactionStatus::Confirmed,
            timestamp,
            sequence,
            memo,
        );
        storage.append_journal_entry(&entry).await?;
        storage.flush().await?;

        debug!("credited {} {} to {} ({})", amount, asset, to, source_tag.as_str());
        Ok(tx_hash)
    }

    // Apply several legs debiting one sender, all or nothing.
    // Used by wallet-batch settlement: the whole bundle is validated under
    // the locks before the first write, so a failing leg leaves the ledger
    // untouched even under concurrent external debits.
    pub async fn apply_transfer_bundle(
        &self,
        from: &Address,
        legs: &[TransferLeg],
    ) -> Result<Vec<Hash>, CoreError> {
        if legs.is_empty() {
            return Ok(Vec::new());
        }

        for leg in legs {
            Self::check_amount(leg.amount)?;
        }

        let mut addresses: Vec<&Address> = legs.iter().map(|leg| &leg.to).collect();
        addresses.push(from);
        let _guards = self.locks.lock_ordered(&addresses).await;
        let mut storage = self.storage.write().await;

        // Plan every balance move on a working set before writing anything
        let mut working: BTreeMap<(Address, Denomination), Amount> = BTreeMap::new();
        for leg in legs {
            let debit_key = (from.clone(), leg.asset);
            if !working.contains_key(&debit_key) {
                working.insert(debit_key.clone(), storage.get_balance(from, leg.asset).await?);
            }

            let debited = working[&debit_key]
                .checked_sub(leg.amount)
                .ok_or_else(|| CoreError::InsufficientBalance {
                    need: leg.amount,
                    have: working[&debit_key],
                })?;
            working.insert(debit_key, debited);

            let credit_key = (leg.to.clone(), leg.asset);
            if !working.contains_key(&credit_key) {
                working.insert(
                    credit_key.clone(),
                    storage.get_balance(&leg.to, leg.asset).await?,
                );
            }

            let credited = working[&credit_key]
                .checked_add(leg.amount)
                .ok_or(CoreError::OverflowOnCredit {
                    address: leg.to.clone(),
                })?;
            working.insert(credit_key, credited);
        }

        // Commit the plan
        for ((address, asset), amount) in &working {
            storage.set_balance(address, *asset, *amount).await?;
        }

        let timestamp = get_current_time_in_millis();
        let mut hashes = Vec::with_capacity(legs.len());
        for leg in legs {
            let sequence = storage.next_journal_sequence().await?;
            let tx_hash = self.derive_tx_hash(
                from, &leg.to, leg.asset, leg.amount, &leg.memo, timestamp, sequence,
            );

            let entry = JournalEntry::new(
                tx_hash.clone(),
                from.clone(),
                leg.to.clone(),
                leg.asset,
                leg.amount,
                0,
                TransactionStatus::Confirmed,
                timestamp,
                sequence,
                leg.memo.clone(),
            );
            storage.append_journal_entry(&entry).await?;
            hashes.push(tx_hash);
        }

        storage.flush().await?;
        debug!("bundle of {} leg(s) applied for {}", legs.len(), from);
        Ok(hashes)
    }

    // Entries touching the address, newest first, stable pagination
    pub async fn list_journal(
        &self,
        address: &Address,
        cursor: Option<u64>,
        limit: Option<usize>,
    ) -> Result<(Vec<JournalEntry>, Option<u64>), CoreError> {
        let limit = limit
            .unwrap_or(DEFAULT_JOURNAL_PAGE_SIZE)
            .clamp(1, MAX_JOURNAL_PAGE_SIZE);

        let storage = self.storage.read().await;
        storage.get_journal_entries_for(address, cursor, limit).await
    }

    pub async fn get_journal_entry(&self, tx_hash: &Hash) -> Result<JournalEntry, CoreError> {
        let storage = self.storage.read().await;
        storage.get_journal_entry(tx_hash).await
    }

    // Rebuild the balance set implied by a journal, for audit and replay
    // checks. Reserve debits are skipped since reserves mint.
    pub fn replay_journal(
        entries: &[JournalEntry],
    ) -> BTreeMap<(Address, Denomination), Amount> {
        let mut balances: BTreeMap<(Address, Denomination), Amount> = BTreeMap::new();
        for entry in entries {
            if entry.get_status() != TransactionStatus::Confirmed {
                continue;
            }

            if !is_reserve(entry.get_from()) {
                let key = (entry.get_from().clone(), entry.get_asset());
                let debit = entry.get_amount() + entry.get_fee();
                let balance = balances.entry(key).or_insert(0);
                *balance = balance.saturating_sub(debit);
            }

            let key = (entry.get_to().clone(), entry.get_asset());
            let balance = balances.entry(key).or_insert(0);
            *balance += entry.get_amount();
        }

        balances.retain(|_, amount| *amount > 0);
        balances
    }
}
