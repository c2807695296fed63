use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use log::{debug, info, warn};
use tokio::sync::RwLock;

use usdtg_common::{
    account::{AccountType, Nonce, Wallet},
    asset::Denomination,
    crypto::{Address, Hash, Hasher, SignatureVerifier},
    serializer::{Serializer, Writer},
    time::{get_current_time_in_millis, get_current_time_in_seconds},
    transaction::{BatchTransaction, MetaTransaction, SponsorshipRecord},
};

use super::{
    error::CoreError,
    ledger::TransferLeg,
    locks::AddressLockTable,
    storage::Storage,
    transfer::TransferEngine,
};

// Meta-transaction value settles in the family's base denomination
pub const SETTLEMENT_DENOMINATION: Denomination = Denomination::USDTg;

// L2a: the smart-contract wallet registry and the meta-transaction
// execution engine.
//
// Every mutation of a wallet (nonce, status, recovery pointers) runs
// under that wallet's lock; two batches on the same wallet can never
// interleave. Validation is complete before the first observable effect,
// so a failed execution mutates neither the wallet nor the transaction.
pub struct WalletEngine<S: Storage> {
    storage: Arc<RwLock<S>>,
    transfer: Arc<TransferEngine<S>>,
    // Shared with the recovery and bonus engines: one lock per wallet
    // covers nonce, status, recovery pointers and bonus counters
    locks: Arc<AddressLockTable>,
    hasher: Arc<dyn Hasher>,
    verifier: Arc<dyn SignatureVerifier>,
    // Non-repeating counter folded into execution hashes
    execution_counter: AtomicU64,
}

impl<S: Storage> WalletEngine<S> {
    pub fn new(
        storage: Arc<RwLock<S>>,
        transfer: Arc<TransferEngine<S>>,
        locks: Arc<AddressLockTable>,
        hasher: Arc<dyn Hasher>,
        verifier: Arc<dyn SignatureVerifier>,
    ) -> Self {
        Self {
            storage,
            transfer,
            locks,
            hasher,
            verifier,
            execution_counter: AtomicU64::new(0),
        }
    }

    // Deterministic wallet address: H(owner || creation_nonce)
    pub fn derive_wallet_address(&self, owner: &Address, creation_nonce: u64) -> Address {
        let mut writer = Writer::new();
        owner.write(&mut writer);
        writer.write_u64(&creation_nonce);
        Address::from_hash(&self.hasher.hash(&writer.bytes()))
    }

    pub async fn create_wallet(
        &self,
        owner: &Address,
        account_type: AccountType,
    ) -> Result<Address, CoreError> {
        let _guard = self.locks.lock(owner).await;
        let mut storage = self.storage.write().await;

        let creation_nonce = storage.get_owner_creation_nonce(owner).await?;
        let address = self.derive_wallet_address(owner, creation_nonce);

        let wallet = Wallet::new(
            address.clone(),
            owner.clone(),
            account_type,
            None,
            get_current_time_in_millis(),
        );
        storage.set_wallet(&wallet).await?;
        storage.increment_owner_creation_nonce(owner).await?;
        storage.flush().await?;

        info!("wallet {} created for owner {}", address, owner);
        Ok(address)
    }

    pub async fn get_wallet(&self, address: &Address) -> Result<Wallet, CoreError> {
        let storage = self.storage.read().await;
        storage.get_wallet(address).await
    }

    pub async fn has_wallet(&self, address: &Address) -> Result<bool, CoreError> {
        let storage = self.storage.read().await;
        storage.has_wallet(address).await
    }

    pub async fn initialize(
        &self,
        address: &Address,
        implementation_ref: Hash,
    ) -> Result<(), CoreError> {
        let _guard = self.locks.lock(address).await;
        let mut storage = self.storage.write().await;

        let mut wallet = storage.get_wallet(address).await?;
        wallet.initialize(implementation_ref)?;
        storage.set_wallet(&wallet).await?;
        storage.flush().await?;

        debug!("wallet {} initialized", address);
        Ok(())
    }

    pub async fn deactivate(&self, address: &Address) -> Result<(), CoreError> {
        let _guard = self.locks.lock(address).await;
        let mut storage = self.storage.write().await;

        let mut wallet = storage.get_wallet(address).await?;
        wallet.deactivate()?;
        storage.set_wallet(&wallet).await?;
        storage.flush().await?;

        info!("wallet {} deactivated", address);
        Ok(())
    }

    pub async fn reactivate(&self, address: &Address) -> Result<(), CoreError> {
        let _guard = self.locks.lock(address).await;
        let mut storage = self.storage.write().await;

        let mut wallet = storage.get_wallet(address).await?;
        wallet.reactivate()?;
        storage.set_wallet(&wallet).await?;
        storage.flush().await?;

        info!("wallet {} reactivated", address);
        Ok(())
    }

    pub async fn configure_recovery(
        &self,
        address: &Address,
        recovery_set: Vec<Address>,
        threshold: u8,
    ) -> Result<(), CoreError> {
        let _guard = self.locks.lock(address).await;
        let mut storage = self.storage.write().await;

        let mut wallet = storage.get_wallet(address).await?;
        wallet.configure_recovery(recovery_set, threshold)?;
        storage.set_wallet(&wallet).await?;
        storage.flush().await?;

        debug!("recovery configured for wallet {}", address);
        Ok(())
    }

    // execution_hash = H(tx_id || timestamp || non-repeating counter)
    fn derive_execution_hash(&self, tx_id: &Hash, timestamp: u64) -> Hash {
        let counter = self.execution_counter.fetch_add(1, Ordering::SeqCst);
        let mut writer = Writer::new();
        tx_id.write(&mut writer);
        writer.write_u64(&timestamp);
        writer.write_u64(&counter);
        self.hasher.hash(&writer.bytes())
    }

    // Record a meta-transaction in the in-flight set without executing
    // it. The entry waits for `execute_pending` (or a batch) and becomes
    // collectable once its deadline passes.
    pub async fn submit_meta_tx(&self, tx: MetaTransaction) -> Result<Hash, CoreError> {
        let address = tx.get_from().clone();
        let _guard = self.locks.lock(&address).await;
        let mut storage = self.storage.write().await;

        if !storage.has_wallet(&address).await? {
            return Err(CoreError::WalletNotFound(address));
        }

        if tx.is_executed() {
            return Err(CoreError::AlreadyExecuted(tx.get_tx_id().clone()));
        }

        if storage.has_meta_transaction(tx.get_tx_id()).await? {
            let stored = storage.get_meta_transaction(tx.get_tx_id()).await?;
            if stored.is_executed() {
                return Err(CoreError::AlreadyExecuted(tx.get_tx_id().clone()));
            }
        }

        let now_seconds = get_current_time_in_seconds();
        if tx.is_expired(now_seconds) {
            return Err(CoreError::DeadlineExpired {
                deadline: tx.get_deadline(),
                now: now_seconds,
            });
        }

        let tx_id = tx.get_tx_id().clone();
        storage.set_meta_transaction(&tx).await?;
        storage.flush().await?;

        debug!("meta tx {} submitted for wallet {}", tx_id, address);
        Ok(tx_id)
    }

    // Execute a previously submitted in-flight transaction
    pub async fn execute_pending(&self, tx_id: &Hash) -> Result<Hash, CoreError> {
        let tx = {
            let storage = self.storage.read().await;
            storage.get_meta_transaction(tx_id).await?
        };

        self.execute_meta_tx(tx).await
    }

    pub async fn get_meta_transaction(&self, tx_id: &Hash) -> Result<MetaTransaction, CoreError> {
        let storage = self.storage.read().await;
        storage.get_meta_transaction(tx_id).await
    }

    pub async fn get_sponsorship_record(
        &self,
        tx_id: &Hash,
    ) -> Result<SponsorshipRecord, CoreError> {
        let storage = self.storage.read().await;
        storage.get_sponsorship_record(tx_id).await
    }

    // Drop every in-flight transaction whose deadline has passed.
    // Permitted housekeeping: an expired entry can never execute anyway.
    pub async fn collect_expired_meta_txs(&self) -> Result<usize, CoreError> {
        let now_seconds = get_current_time_in_seconds();
        let mut storage = self.storage.write().await;

        let mut removed = 0;
        for tx in storage.get_pending_meta_transactions().await? {
            if tx.is_expired(now_seconds) {
                storage.delete_meta_transaction(tx.get_tx_id()).await?;
                removed += 1;
            }
        }

        if removed > 0 {
            storage.flush().await?;
            info!("collected {} expired meta transaction(s)", removed);
        }

        Ok(removed)
    }

    // Assemble an atomic batch envelope from in-flight transactions.
    // The batch id is derived from the wallet and the member ids, so the
    // same aggregation always produces the same envelope.
    pub async fn aggregate_batch(
        &self,
        wallet: &Address,
        tx_ids: &[Hash],
    ) -> Result<BatchTransaction, CoreError> {
        let storage = self.storage.read().await;

        let mut transactions = Vec::with_capacity(tx_ids.len());
        for tx_id in tx_ids {
            let tx = storage.get_meta_transaction(tx_id).await?;
            if tx.is_executed() {
                return Err(CoreError::AlreadyExecuted(tx_id.clone()));
            }
            transactions.push(tx);
        }

        let mut writer = Writer::new();
        wallet.write(&mut writer);
        for tx_id in tx_ids {
            tx_id.write(&mut writer);
        }
        let batch_id = self.hasher.hash(&writer.bytes());

        Ok(BatchTransaction::new(batch_id, wallet.clone(), transactions)?)
    }

    // The full §4.3 validation ladder for one meta-transaction.
    // The replay guard runs right after the wallet status check so a
    // replayed envelope reports the duplicate rather than the incidental
    // nonce conflict it would also produce.
    async fn validate_meta_tx(
        &self,
        storage: &S,
        wallet: &Wallet,
        tx: &MetaTransaction,
        expected_nonce: Nonce,
        now_seconds: u64,
    ) -> Result<(), CoreError> {
        if !wallet.is_initialized() {
            return Err(CoreError::WalletNotInitialized(wallet.get_address().clone()));
        }

        if !wallet.is_active() {
            return Err(CoreError::WalletDeactivated(wallet.get_address().clone()));
        }

        if tx.is_executed() {
            return Err(CoreError::AlreadyExecuted(tx.get_tx_id().clone()));
        }

        if storage.has_meta_transaction(tx.get_tx_id()).await? {
            let stored = storage.get_meta_transaction(tx.get_tx_id()).await?;
            if stored.is_executed() {
                return Err(CoreError::AlreadyExecuted(tx.get_tx_id().clone()));
            }
        }

        if tx.get_nonce() != expected_nonce {
            return Err(CoreError::InvalidNonce {
                expected: expected_nonce,
                got: tx.get_nonce(),
            });
        }

        if tx.is_expired(now_seconds) {
            return Err(CoreError::DeadlineExpired {
                deadline: tx.get_deadline(),
                now: now_seconds,
            });
        }

        let payload = MetaTransaction::signing_payload(
            tx.get_from(),
            tx.get_to(),
            tx.get_value(),
            tx.get_data(),
            tx.get_gas_limit(),
            tx.get_gas_price(),
            tx.get_nonce(),
            tx.get_payment_mode(),
            tx.get_sponsor(),
            tx.get_relayer(),
            tx.get_deadline(),
        );
        if !self
            .verifier
            .verify(&payload, tx.get_signature(), wallet.get_owner())
        {
            return Err(CoreError::InvalidSignature(wallet.get_address().clone()));
        }

        Ok(())
    }

    // Execute a single meta-transaction at most once.
    //
    // The value settlement runs before any wallet mutation: if the ledger
    // rejects it (insufficient funds, ceiling) the wallet and the
    // transaction are untouched. Once settled, the nonce advances by one,
    // the transaction is recorded executed and everything is flushed.
    pub async fn execute_meta_tx(&self, mut tx: MetaTransaction) -> Result<Hash, CoreError> {
        let address = tx.get_from().clone();
        let _guard = self.locks.lock(&address).await;

        let wallet = {
            let storage = self.storage.read().await;
            if !storage.has_wallet(&address).await? {
                return Err(CoreError::WalletNotFound(address.clone()));
            }

            let wallet = storage.get_wallet(&address).await?;
            let now_seconds = get_current_time_in_seconds();
            self.validate_meta_tx(&storage, &wallet, &tx, wallet.get_nonce(), now_seconds)
                .await?;
            wallet
        };

        if tx.get_value() > 0 {
            self.transfer
                .transfer(
                    &address,
                    tx.get_to(),
                    SETTLEMENT_DENOMINATION,
                    tx.get_value(),
                    Some(format!("META_TX: {}", tx.get_tx_id())),
                )
                .await?;
        }

        let now_millis = get_current_time_in_millis();
        let execution_hash = self.derive_execution_hash(tx.get_tx_id(), now_millis);

        let mut storage = self.storage.write().await;
        let mut wallet = wallet;
        wallet.advance_nonce(now_millis);
        storage.set_wallet(&wallet).await?;

        tx.mark_executed(execution_hash.clone());
        storage.set_meta_transaction(&tx).await?;
        if let Some(record) = tx.sponsorship_record() {
            storage.set_sponsorship_record(tx.get_tx_id(), &record).await?;
        }
        storage.flush().await?;

        debug!(
            "meta tx {} executed for wallet {}, nonce now {}",
            tx.get_tx_id(),
            address,
            wallet.get_nonce()
        );
        Ok(execution_hash)
    }

    // Execute a wallet batch atomically.
    //
    // Every leg is validated before anything runs: leg i must carry nonce
    // wallet.nonce + i, a live deadline, a valid signature and no prior
    // execution. Value legs settle through a single all-or-nothing ledger
    // bundle, so a failing leg leaves no transfer side effect and the
    // wallet nonce unchanged.
    pub async fn submit_batch(&self, batch: BatchTransaction) -> Result<Vec<Hash>, CoreError> {
        let address = batch.get_wallet_address().clone();
        let _guard = self.locks.lock(&address).await;

        let wallet = {
            let storage = self.storage.read().await;
            if !storage.has_wallet(&address).await? {
                return Err(CoreError::WalletNotFound(address.clone()));
            }

            let wallet = storage.get_wallet(&address).await?;
            let now_seconds = get_current_time_in_seconds();
            for (index, tx) in batch.get_transactions().iter().enumerate() {
                let expected_nonce = wallet.get_nonce() + index as u64;
                if let Err(error) = self
                    .validate_meta_tx(&storage, &wallet, tx, expected_nonce, now_seconds)
                    .await
                {
                    warn!(
                        "batch {} rejected at leg {}: {}",
                        batch.get_batch_id(),
                        index,
                        error
                    );
                    return Err(error);
                }
            }
            wallet
        };

        // Settle every value leg in one atomic bundle
        let legs: Vec<TransferLeg> = batch
            .get_transactions()
            .iter()
            .filter(|tx| tx.get_value() > 0)
            .map(|tx| TransferLeg {
                to: tx.get_to().clone(),
                asset: SETTLEMENT_DENOMINATION,
                amount: tx.get_value(),
                memo: Some(format!("META_TX: {}", tx.get_tx_id())),
            })
            .collect();

        if !legs.is_empty() {
            self.transfer
                .get_ledger()
                .apply_transfer_bundle(&address, &legs)
                .await?;
        }

        let now_millis = get_current_time_in_millis();
        let mut storage = self.storage.write().await;
        let mut wallet = wallet;
        let mut execution_hashes = Vec::with_capacity(batch.get_transactions().len());

        for mut tx in batch.into_transactions() {
            let execution_hash = self.derive_execution_hash(tx.get_tx_id(), now_millis);
            tx.mark_executed(execution_hash.clone());
            storage.set_meta_transaction(&tx).await?;
            if let Some(record) = tx.sponsorship_record() {
                storage.set_sponsorship_record(tx.get_tx_id(), &record).await?;
            }
            wallet.advance_nonce(now_millis);
            execution_hashes.push(execution_hash);
        }

        storage.set_wallet(&wallet).await?;
        storage.flush().await?;

        info!(
            "batch executed for wallet {}: {} leg(s), nonce now {}",
            address,
            execution_hashes.len(),
            wallet.get_nonce()
        );
        Ok(execution_hashes)
    }
}
