use thiserror::Error;

use crate::crypto::Address;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Wallet {0} is already initialized")]
    AlreadyInitialized(Address),

    #[error("Wallet {0} is not initialized")]
    NotInitialized(Address),

    #[error("Wallet {0} is deactivated")]
    Deactivated(Address),

    #[error("Recovery threshold {threshold} is out of range for {members} member(s)")]
    ThresholdOutOfRange { threshold: u8, members: usize },

    #[error("Recovery set of {0} member(s) exceeds the maximum of {1}")]
    RecoverySetTooLarge(usize, usize),
}
