use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::RwLock;

use usdtg_common::{
    crypto::Address,
    recovery::{
        generate_numeric_code, BackupCodeSet, RecoveryChannel, RecoveryProposal, RecoverySession,
    },
    time::get_current_time_in_seconds,
};

use super::{error::CoreError, locks::AddressLockTable, storage::Storage};

// L2b: bounded, retry-limited out-of-band recovery of wallet ownership.
//
// One session per wallet: generating a code supersedes any prior pending
// code regardless of channel. Codes are returned to the caller for
// out-of-band delivery and never appear in errors or logs.
pub struct RecoveryEngine<S: Storage> {
    storage: Arc<RwLock<S>>,
    locks: Arc<AddressLockTable>,
}

impl<S: Storage> RecoveryEngine<S> {
    pub fn new(storage: Arc<RwLock<S>>, locks: Arc<AddressLockTable>) -> Self {
        Self { storage, locks }
    }

    // Open a fresh recovery window: 6-digit code, 600 s expiry,
    // 3 attempts. Any prior pending session is superseded.
    pub async fn generate_code(
        &self,
        wallet: &Address,
        channel: RecoveryChannel,
        identifier: String,
    ) -> Result<String, CoreError> {
        let _guard = self.locks.lock(wallet).await;
        let mut storage = self.storage.write().await;

        if !storage.has_wallet(wallet).await? {
            return Err(CoreError::WalletNotFound(wallet.clone()));
        }

        let code = generate_numeric_code();
        let session = RecoverySession::open(
            wallet.clone(),
            channel,
            identifier,
            code.clone(),
            get_current_time_in_seconds(),
        );
        storage.set_recovery_session(&session).await?;
        storage.flush().await?;

        info!(
            "recovery code issued for wallet {} via {}",
            wallet,
            channel.as_str()
        );
        Ok(code)
    }

    // One verification attempt against the pending code.
    // Attempt accounting is persisted even on mismatch, so retries are
    // bounded across restarts.
    pub async fn verify_code(&self, wallet: &Address, code: &str) -> Result<(), CoreError> {
        let _guard = self.locks.lock(wallet).await;
        let mut storage = self.storage.write().await;

        let mut session = storage.get_recovery_session(wallet).await?;
        let outcome = session.attempt(code, get_current_time_in_seconds());

        storage.set_recovery_session(&session).await?;
        storage.flush().await?;

        match outcome {
            Ok(()) => {
                debug!("recovery verified for wallet {}", wallet);
                Ok(())
            }
            Err(error) => {
                warn!("recovery attempt failed for wallet {}: {}", wallet, error);
                Err(error.into())
            }
        }
    }

    // Issue five single-use backup codes, invalidating any previous set
    pub async fn generate_backup_codes(&self, wallet: &Address) -> Result<Vec<String>, CoreError> {
        let _guard = self.locks.lock(wallet).await;
        let mut storage = self.storage.write().await;

        if !storage.has_wallet(wallet).await? {
            return Err(CoreError::WalletNotFound(wallet.clone()));
        }

        let set = BackupCodeSet::generate();
        let codes = set
            .get_codes()
            .iter()
            .map(|code| code.get_code().to_string())
            .collect();

        storage.set_backup_codes(wallet, &set).await?;
        storage.flush().await?;

        info!("backup codes regenerated for wallet {}", wallet);
        Ok(codes)
    }

    // Burn a backup code and mark the wallet's session verified.
    // Opens a session if none is pending, so a backup code alone is
    // enough to recover.
    pub async fn use_backup_code(&self, wallet: &Address, code: &str) -> Result<(), CoreError> {
        let _guard = self.locks.lock(wallet).await;
        let mut storage = self.storage.write().await;

        if !storage.has_wallet(wallet).await? {
            return Err(CoreError::WalletNotFound(wallet.clone()));
        }

        let mut set = storage.get_backup_codes(wallet).await?;
        set.use_code(code)?;
        storage.set_backup_codes(wallet, &set).await?;

        let mut session = match storage.has_recovery_session(wallet).await? {
            true => storage.get_recovery_session(wallet).await?,
            // synthetic session; its code is never revealed so only the
            // backup-code path can have verified it
            false => RecoverySession::open(
                wallet.clone(),
                RecoveryChannel::Email,
                String::new(),
                generate_numeric_code(),
                get_current_time_in_seconds(),
            ),
        };
        session.mark_verified();
        storage.set_recovery_session(&session).await?;
        storage.flush().await?;

        info!("backup code accepted for wallet {}", wallet);
        Ok(())
    }

    // One guardian approval toward a threshold ownership change.
    //
    // The guardian must belong to the wallet's recovery set. Approving a
    // different new owner than the pending proposal restarts the count.
    // Reaching the wallet's threshold applies the change immediately and
    // discards the proposal (and any pending code session).
    pub async fn approve_recovery(
        &self,
        wallet: &Address,
        guardian: &Address,
        new_owner: &Address,
    ) -> Result<usize, CoreError> {
        let _guard = self.locks.lock(wallet).await;
        let mut storage = self.storage.write().await;

        let row = storage.get_wallet(wallet).await?;
        if row.get_recovery_set().is_empty() {
            return Err(CoreError::RecoveryNotConfigured(wallet.clone()));
        }

        if !row.get_recovery_set().contains(guardian) {
            return Err(CoreError::NotAGuardian(guardian.clone()));
        }

        let mut proposal = match storage.has_recovery_proposal(wallet).await? {
            true => {
                let pending = storage.get_recovery_proposal(wallet).await?;
                if pending.get_new_owner() == new_owner {
                    pending
                } else {
                    debug!(
                        "proposal for wallet {} restarted with new owner {}",
                        wallet, new_owner
                    );
                    RecoveryProposal::open(wallet.clone(), new_owner.clone())
                }
            }
            false => RecoveryProposal::open(wallet.clone(), new_owner.clone()),
        };

        let approvals = proposal.approve(guardian.clone())?;

        if proposal.is_met(row.get_recovery_threshold()) {
            let mut row = row;
            row.transfer_ownership(new_owner.clone());
            storage.set_wallet(&row).await?;
            storage.delete_recovery_proposal(wallet).await?;
            storage.delete_recovery_session(wallet).await?;
            storage.flush().await?;

            info!(
                "wallet {} ownership moved to {} after {} guardian approval(s)",
                wallet, new_owner, approvals
            );
        } else {
            storage.set_recovery_proposal(&proposal).await?;
            storage.flush().await?;

            debug!(
                "wallet {} proposal at {}/{} approval(s)",
                wallet,
                approvals,
                row.get_recovery_threshold()
            );
        }

        Ok(approvals)
    }

    // Transfer ownership once the session is verified.
    // The session is closed afterwards: any further change needs a new
    // code.
    pub async fn recover_wallet(
        &self,
        wallet: &Address,
        new_owner: &Address,
    ) -> Result<(), CoreError> {
        let _guard = self.locks.lock(wallet).await;
        let mut storage = self.storage.write().await;

        let session = match storage.has_recovery_session(wallet).await? {
            true => storage.get_recovery_session(wallet).await?,
            false => return Err(CoreError::RecoveryNotVerified(wallet.clone())),
        };

        if !session.is_verified() {
            return Err(CoreError::RecoveryNotVerified(wallet.clone()));
        }

        let mut row = storage.get_wallet(wallet).await?;
        let previous_owner = row.get_owner().clone();
        row.transfer_ownership(new_owner.clone());
        storage.set_wallet(&row).await?;

        storage.delete_recovery_session(wallet).await?;
        storage.flush().await?;

        info!(
            "wallet {} ownership moved from {} to {}",
            wallet, previous_owner, new_owner
        );
        Ok(())
    }
}
