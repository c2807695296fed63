use std::sync::Arc;

use log::{info, warn};
use tokio::sync::RwLock;

use usdtg_common::{
    account::{AccountType, Wallet},
    api::daemon::{
        BatchTransferResult, JournalPage, PurchaseReport, StepOutcome, StepReport,
        TransferLegOutcome,
    },
    asset::Denomination,
    bonus::{BonusEstimate, BonusRecord, SystemBonusStats, UserBonusStats},
    crypto::{Address, Blake3Hasher, Hash, Hasher, RecoveredOwnerVerifier, SignatureVerifier},
    ledger::{Amount, JournalEntry},
    recovery::RecoveryChannel,
    transaction::{BatchTransaction, MetaTransaction, SponsorshipRecord},
};

use super::{
    bonus::BonusEngine,
    error::CoreError,
    ledger::LedgerStore,
    locks::AddressLockTable,
    recovery::RecoveryEngine,
    storage::Storage,
    transfer::{BatchLegResult, TransferEngine},
    wallet::WalletEngine,
};

// L3: the single façade used by every external adapter.
//
// Thin glue only: it wires the engines together over one storage handle
// and translates engine results into the typed API payloads. Multi-step
// orchestrations report per-step outcomes so partial effects are always
// visible to the caller.
pub struct Runtime<S: Storage> {
    storage: Arc<RwLock<S>>,
    ledger: Arc<LedgerStore<S>>,
    transfer: Arc<TransferEngine<S>>,
    wallet: Arc<WalletEngine<S>>,
    recovery: Arc<RecoveryEngine<S>>,
    bonus: Arc<BonusEngine<S>>,
}

impl<S: Storage> Runtime<S> {
    pub fn new(
        storage: S,
        hasher: Arc<dyn Hasher>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        let storage = Arc::new(RwLock::new(storage));
        let wallet_locks = Arc::new(AddressLockTable::new());

        let ledger = Arc::new(LedgerStore::new(storage.clone(), hasher.clone()));
        let transfer = Arc::new(TransferEngine::new(ledger.clone()));
        let wallet = Arc::new(WalletEngine::new(
            storage.clone(),
            transfer.clone(),
            wallet_locks.clone(),
            hasher.clone(),
            verifier,
        ));
        let recovery = Arc::new(RecoveryEngine::new(storage.clone(), wallet_locks.clone()));
        let bonus = Arc::new(BonusEngine::new(
            storage.clone(),
            ledger.clone(),
            wallet_locks,
            hasher,
        ));

        Self {
            storage,
            ledger,
            transfer,
            wallet,
            recovery,
            bonus,
        }
    }

    // Production capability set: blake3 hashing, owner-bound signatures
    pub fn with_defaults(storage: S) -> Self {
        Self::new(
            storage,
            Arc::new(Blake3Hasher),
            Arc::new(RecoveredOwnerVerifier),
        )
    }

    pub fn ledger(&self) -> &Arc<LedgerStore<S>> {
        &self.ledger
    }

    pub fn transfer_engine(&self) -> &Arc<TransferEngine<S>> {
        &self.transfer
    }

    pub fn wallet_engine(&self) -> &Arc<WalletEngine<S>> {
        &self.wallet
    }

    pub fn recovery_engine(&self) -> &Arc<RecoveryEngine<S>> {
        &self.recovery
    }

    pub fn bonus_engine(&self) -> &Arc<BonusEngine<S>> {
        &self.bonus
    }

    // ===== Ledger / transfers =====

    pub async fn get_balance(
        &self,
        address: &Address,
        asset: Denomination,
    ) -> Result<Amount, CoreError> {
        self.ledger.get_balance(address, asset).await
    }

    pub async fn transfer(
        &self,
        from: &Address,
        to: &Address,
        asset: Denomination,
        amount: Amount,
        memo: Option<String>,
    ) -> Result<Hash, CoreError> {
        self.transfer.transfer(from, to, asset, amount, memo).await
    }

    pub async fn airdrop(
        &self,
        to: &Address,
        asset: Denomination,
        amount: Amount,
        reason: &str,
    ) -> Result<Hash, CoreError> {
        self.transfer.airdrop(to, asset, amount, reason).await
    }

    pub async fn batch_transfer(
        &self,
        from: &Address,
        recipients: &[Address],
        asset: Denomination,
        amounts: &[Amount],
        memo: Option<String>,
    ) -> Result<BatchTransferResult, CoreError> {
        let results = self
            .transfer
            .batch_transfer(from, recipients, asset, amounts, memo)
            .await?;

        let legs = results
            .into_iter()
            .map(|leg| match leg {
                BatchLegResult::Applied(tx_hash) => TransferLegOutcome::Applied { tx_hash },
                BatchLegResult::Failed(error) => TransferLegOutcome::Failed {
                    error: error.to_api_error(),
                },
                BatchLegResult::Skipped => TransferLegOutcome::Skipped,
            })
            .collect();

        Ok(BatchTransferResult { legs })
    }

    pub async fn list_journal(
        &self,
        address: &Address,
        cursor: Option<u64>,
        limit: Option<usize>,
    ) -> Result<JournalPage, CoreError> {
        let (entries, next_cursor) = self.ledger.list_journal(address, cursor, limit).await?;
        Ok(JournalPage {
            entries,
            next_cursor,
        })
    }

    pub async fn get_journal_entry(&self, tx_hash: &Hash) -> Result<JournalEntry, CoreError> {
        self.ledger.get_journal_entry(tx_hash).await
    }

    // ===== Wallets / meta-transactions =====

    pub async fn create_wallet(
        &self,
        owner: &Address,
        account_type: AccountType,
    ) -> Result<Address, CoreError> {
        self.wallet.create_wallet(owner, account_type).await
    }

    pub async fn initialize_wallet(
        &self,
        address: &Address,
        implementation_ref: Hash,
    ) -> Result<(), CoreError> {
        self.wallet.initialize(address, implementation_ref).await
    }

    pub async fn configure_recovery(
        &self,
        address: &Address,
        recovery_set: Vec<Address>,
        threshold: u8,
    ) -> Result<(), CoreError> {
        self.wallet
            .configure_recovery(address, recovery_set, threshold)
            .await
    }

    pub async fn deactivate_wallet(&self, address: &Address) -> Result<(), CoreError> {
        self.wallet.deactivate(address).await
    }

    pub async fn reactivate_wallet(&self, address: &Address) -> Result<(), CoreError> {
        self.wallet.reactivate(address).await
    }

    pub async fn get_wallet(&self, address: &Address) -> Result<Wallet, CoreError> {
        self.wallet.get_wallet(address).await
    }

    pub async fn execute_meta_transaction(&self, tx: MetaTransaction) -> Result<Hash, CoreError> {
        self.wallet.execute_meta_tx(tx).await
    }

    pub async fn submit_meta_transaction(&self, tx: MetaTransaction) -> Result<Hash, CoreError> {
        self.wallet.submit_meta_tx(tx).await
    }

    pub async fn execute_pending(&self, tx_id: &Hash) -> Result<Hash, CoreError> {
        self.wallet.execute_pending(tx_id).await
    }

    pub async fn get_meta_transaction(&self, tx_id: &Hash) -> Result<MetaTransaction, CoreError> {
        self.wallet.get_meta_transaction(tx_id).await
    }

    pub async fn get_sponsorship_record(
        &self,
        tx_id: &Hash,
    ) -> Result<SponsorshipRecord, CoreError> {
        self.wallet.get_sponsorship_record(tx_id).await
    }

    pub async fn collect_expired_meta_transactions(&self) -> Result<usize, CoreError> {
        self.wallet.collect_expired_meta_txs().await
    }

    pub async fn aggregate_batch(
        &self,
        wallet: &Address,
        tx_ids: &[Hash],
    ) -> Result<BatchTransaction, CoreError> {
        self.wallet.aggregate_batch(wallet, tx_ids).await
    }

    pub async fn submit_batch(&self, batch: BatchTransaction) -> Result<Vec<Hash>, CoreError> {
        self.wallet.submit_batch(batch).await
    }

    // ===== Recovery =====

    pub async fn generate_recovery_code(
        &self,
        wallet: &Address,
        channel: RecoveryChannel,
        identifier: String,
    ) -> Result<String, CoreError> {
        self.recovery.generate_code(wallet, channel, identifier).await
    }

    pub async fn verify_recovery_code(
        &self,
        wallet: &Address,
        code: &str,
    ) -> Result<(), CoreError> {
        self.recovery.verify_code(wallet, code).await
    }

    pub async fn generate_backup_codes(&self, wallet: &Address) -> Result<Vec<String>, CoreError> {
        self.recovery.generate_backup_codes(wallet).await
    }

    pub async fn use_backup_code(&self, wallet: &Address, code: &str) -> Result<(), CoreError> {
        self.recovery.use_backup_code(wallet, code).await
    }

    pub async fn recover_wallet(
        &self,
        wallet: &Address,
        new_owner: &Address,
    ) -> Result<(), CoreError> {
        self.recovery.recover_wallet(wallet, new_owner).await
    }

    pub async fn approve_recovery(
        &self,
        wallet: &Address,
        guardian: &Address,
        new_owner: &Address,
    ) -> Result<usize, CoreError> {
        self.recovery
            .approve_recovery(wallet, guardian, new_owner)
            .await
    }

    // ===== Bonuses =====

    pub fn compute_bonus(&self, purchase_amount: Amount) -> BonusEstimate {
        self.bonus.compute_bonus(purchase_amount)
    }

    pub async fn create_bonus(
        &self,
        wallet: &Address,
        user_id: &str,
        purchase_amount: Amount,
    ) -> Result<Hash, CoreError> {
        self.bonus.create_bonus(wallet, user_id, purchase_amount).await
    }

    pub async fn distribute_bonus(&self, bonus_id: &Hash) -> Result<Hash, CoreError> {
        self.bonus.distribute_bonus(bonus_id).await
    }

    pub async fn get_bonus_record(&self, bonus_id: &Hash) -> Result<BonusRecord, CoreError> {
        self.bonus.get_bonus_record(bonus_id).await
    }

    pub async fn user_stats(&self, wallet: &Address) -> Result<UserBonusStats, CoreError> {
        self.bonus.user_stats(wallet).await
    }

    pub async fn system_stats(&self) -> Result<SystemBonusStats, CoreError> {
        self.bonus.system_stats().await
    }

    // Purchase-confirmed orchestration: create the bonus, then distribute
    // it. Each step's outcome is reported; a failure after the first step
    // is a partial effect the caller must see, not an exception that
    // hides it.
    pub async fn confirm_purchase(
        &self,
        wallet: &Address,
        user_id: &str,
        purchase_amount: Amount,
    ) -> PurchaseReport {
        let mut steps = Vec::with_capacity(2);

        let bonus_id = match self.create_bonus(wallet, user_id, purchase_amount).await {
            Ok(bonus_id) => {
                steps.push(StepReport {
                    step: "create_bonus".to_string(),
                    outcome: StepOutcome::Completed,
                });
                bonus_id
            }
            Err(error) => {
                warn!("purchase confirmation for {} stopped: {}", wallet, error);
                steps.push(StepReport {
                    step: "create_bonus".to_string(),
                    outcome: StepOutcome::Failed {
                        error: error.to_api_error(),
                    },
                });
                steps.push(StepReport {
                    step: "distribute_bonus".to_string(),
                    outcome: StepOutcome::Skipped,
                });
                return PurchaseReport {
                    bonus_id: None,
                    credit_tx_hash: None,
                    steps,
                };
            }
        };

        match self.distribute_bonus(&bonus_id).await {
            Ok(credit_tx_hash) => {
                steps.push(StepReport {
                    step: "distribute_bonus".to_string(),
                    outcome: StepOutcome::Completed,
                });
                PurchaseReport {
                    bonus_id: Some(bonus_id),
                    credit_tx_hash: Some(credit_tx_hash),
                    steps,
                }
            }
            Err(error) => {
                warn!(
                    "bonus {} created but distribution failed: {}",
                    bonus_id, error
                );
                steps.push(StepReport {
                    step: "distribute_bonus".to_string(),
                    outcome: StepOutcome::Failed {
                        error: error.to_api_error(),
                    },
                });
                PurchaseReport {
                    bonus_id: Some(bonus_id),
                    credit_tx_hash: None,
                    steps,
                }
            }
        }
    }

    // Flush and stop the backing store
    pub async fn stop(&self) -> Result<(), CoreError> {
        info!("stopping runtime");
        let mut storage = self.storage.write().await;
        storage.stop().await
    }
}
