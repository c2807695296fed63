use async_trait::async_trait;
use usdtg_common::{
    crypto::Address,
    recovery::{BackupCodeSet, RecoveryProposal, RecoverySession},
};

use crate::core::error::CoreError;

#[async_trait]
pub trait RecoveryProvider {
    /// Check if a recovery session is open for the wallet
    async fn has_recovery_session(&self, wallet: &Address) -> Result<bool, CoreError>;

    /// Get the open recovery session for the wallet
    async fn get_recovery_session(&self, wallet: &Address) -> Result<RecoverySession, CoreError>;

    /// Insert or overwrite the session; a new code supersedes any prior one
    async fn set_recovery_session(&mut self, session: &RecoverySession) -> Result<(), CoreError>;

    /// Close the session, returning the wallet to the idle state
    async fn delete_recovery_session(&mut self, wallet: &Address) -> Result<(), CoreError>;

    /// Check if the wallet holds backup codes
    async fn has_backup_codes(&self, wallet: &Address) -> Result<bool, CoreError>;

    /// Get the current backup code set
    async fn get_backup_codes(&self, wallet: &Address) -> Result<BackupCodeSet, CoreError>;

    /// Overwrite the backup code set; regeneration invalidates the old set
    async fn set_backup_codes(
        &mut self,
        wallet: &Address,
        codes: &BackupCodeSet,
    ) -> Result<(), CoreError>;

    /// Check if a threshold ownership proposal is pending for the wallet
    async fn has_recovery_proposal(&self, wallet: &Address) -> Result<bool, CoreError>;

    /// Get the pending threshold ownership proposal
    async fn get_recovery_proposal(&self, wallet: &Address) -> Result<RecoveryProposal, CoreError>;

    /// Insert or overwrite the pending proposal
    async fn set_recovery_proposal(&mut self, proposal: &RecoveryProposal)
        -> Result<(), CoreError>;

    /// Discard the pending proposal
    async fn delete_recovery_proposal(&mut self, wallet: &Address) -> Result<(), CoreError>;
}
