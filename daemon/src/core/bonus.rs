use std::sync::Arc;

use log::{debug, info};
use tokio::sync::RwLock;

use usdtg_common::{
    bonus::{compute_bonus, BonusEstimate, BonusRecord, SystemBonusStats, UserBonusStats,
        MIN_QUALIFYING_PURCHASE},
    crypto::{Address, Hash, Hasher},
    ledger::{Amount, SourceTag},
    serializer::{Serializer, Writer},
    time::get_current_time_in_millis,
};

use super::{
    error::CoreError, ledger::LedgerStore, locks::AddressLockTable, storage::Storage,
    wallet::SETTLEMENT_DENOMINATION,
};

// L2c: deterministic, idempotent loyalty bonuses.
//
// Creation records the tier-table bonus and updates the per-wallet and
// system aggregates under the wallet lock. Distribution credits from the
// bonus reserve exactly once: the stored (distributed, credit_tx_hash)
// pair is the single source of truth, so repeated calls return the same
// hash without a second credit.
pub struct BonusEngine<S: Storage> {
    storage: Arc<RwLock<S>>,
    ledger: Arc<LedgerStore<S>>,
    locks: Arc<AddressLockTable>,
    hasher: Arc<dyn Hasher>,
}

impl<S: Storage> BonusEngine<S> {
    pub fn new(
        storage: Arc<RwLock<S>>,
        ledger: Arc<LedgerStore<S>>,
        locks: Arc<AddressLockTable>,
        hasher: Arc<dyn Hasher>,
    ) -> Self {
        Self {
            storage,
            ledger,
            locks,
            hasher,
        }
    }

    // Pure tier lookup, no side effects
    pub fn compute_bonus(&self, purchase_amount: Amount) -> BonusEstimate {
        compute_bonus(purchase_amount)
    }

    // bonus_id = H(wallet || user_id || creation sequence)
    fn derive_bonus_id(&self, wallet: &Address, user_id: &str, sequence: u64) -> Hash {
        let mut writer = Writer::new();
        wallet.write(&mut writer);
        writer.write_string(user_id);
        writer.write_u64(&sequence);
        self.hasher.hash(&writer.bytes())
    }

    pub async fn create_bonus(
        &self,
        wallet: &Address,
        user_id: &str,
        purchase_amount: Amount,
    ) -> Result<Hash, CoreError> {
        let estimate = compute_bonus(purchase_amount);
        let tier = match estimate.tier {
            Some(tier) => tier,
            None => {
                return Err(CoreError::BelowBonusThreshold {
                    amount: purchase_amount,
                    minimum: MIN_QUALIFYING_PURCHASE,
                })
            }
        };

        let _guard = self.locks.lock(wallet).await;
        let mut storage = self.storage.write().await;

        let sequence = storage.next_bonus_sequence().await?;
        let bonus_id = self.derive_bonus_id(wallet, user_id, sequence);
        let record = BonusRecord::new(
            bonus_id.clone(),
            wallet.clone(),
            user_id.to_string(),
            purchase_amount,
            tier,
            get_current_time_in_millis(),
        );
        storage.set_bonus_record(&record).await?;

        // Aggregates move in the same guarded write as the record
        let mut user_stats = storage.get_user_bonus_stats(wallet).await?;
        user_stats.record_bonus(purchase_amount, record.get_bonus_amount(), tier);
        storage.set_user_bonus_stats(wallet, &user_stats).await?;

        let mut system_stats = storage.get_system_bonus_stats().await?;
        system_stats.record_created(purchase_amount, record.get_bonus_amount());
        storage.set_system_bonus_stats(&system_stats).await?;
        storage.flush().await?;

        info!(
            "bonus {} created for wallet {}: {} tier",
            bonus_id, wallet, tier
        );
        Ok(bonus_id)
    }

    // Credit the bonus into the ledger exactly once.
    // A second call returns the recorded credit hash and leaves every
    // balance untouched, even under concurrent distribution attempts.
    pub async fn distribute_bonus(&self, bonus_id: &Hash) -> Result<Hash, CoreError> {
        let wallet = {
            let storage = self.storage.read().await;
            storage.get_bonus_record(bonus_id).await?.get_wallet().clone()
        };

        let _guard = self.locks.lock(&wallet).await;

        // Re-read under the lock: a concurrent call may have distributed
        // while we were waiting
        let mut record = {
            let storage = self.storage.read().await;
            storage.get_bonus_record(bonus_id).await?
        };

        if record.is_distributed() {
            let tx_hash = record
                .get_credit_tx_hash()
                .clone()
                .ok_or_else(|| CoreError::BonusNotFound(bonus_id.clone()))?;
            debug!("bonus {} already distributed as {}", bonus_id, tx_hash);
            return Ok(tx_hash);
        }

        let tx_hash = self
            .ledger
            .credit(
                &wallet,
                SETTLEMENT_DENOMINATION,
                record.get_bonus_amount(),
                Some(format!("BONUS:{}", record.get_tier())),
                SourceTag::Bonus,
            )
            .await?;

        record.mark_distributed(tx_hash.clone(), get_current_time_in_millis());

        let mut storage = self.storage.write().await;
        storage.set_bonus_record(&record).await?;

        let mut system_stats = storage.get_system_bonus_stats().await?;
        system_stats.record_distributed(record.get_bonus_amount());
        storage.set_system_bonus_stats(&system_stats).await?;
        storage.flush().await?;

        info!("bonus {} distributed as {}", bonus_id, tx_hash);
        Ok(tx_hash)
    }

    pub async fn get_bonus_record(&self, bonus_id: &Hash) -> Result<BonusRecord, CoreError> {
        let storage = self.storage.read().await;
        storage.get_bonus_record(bonus_id).await
    }

    pub async fn get_bonuses_for_wallet(
        &self,
        wallet: &Address,
    ) -> Result<Vec<BonusRecord>, CoreError> {
        let storage = self.storage.read().await;
        let ids = storage.get_bonus_ids_for_wallet(wallet).await?;

        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            records.push(storage.get_bonus_record(&id).await?);
        }

        Ok(records)
    }

    pub async fn user_stats(&self, wallet: &Address) -> Result<UserBonusStats, CoreError> {
        let storage = self.storage.read().await;
        storage.get_user_bonus_stats(wallet).await
    }

    pub async fn system_stats(&self) -> Result<SystemBonusStats, CoreError> {
        let storage = self.storage.read().await;
        storage.get_system_bonus_stats().await
    }
}
