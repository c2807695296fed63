use thiserror::Error;

use usdtg_common::{
    account::{Nonce, WalletError},
    api::ErrorKind,
    crypto::{Address, AddressError, Hash},
    ledger::Amount,
    recovery::RecoveryError,
    serializer::ReaderError,
    transaction::TransactionError,
};

// Every failure the core produces.
// Each variant carries the context an adapter needs and maps onto exactly
// one kind of the closed taxonomy through `kind()`. Secrets (recovery
// codes, backup codes) never appear in a variant.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Amount {amount} exceeds the per-call ceiling of {maximum}")]
    AmountAboveLimit { amount: Amount, maximum: Amount },

    #[error("Balance overflow while crediting {address}")]
    OverflowOnCredit { address: Address },

    #[error("Malformed transaction: {0}")]
    MalformedTransaction(#[from] TransactionError),

    #[error("Recovery threshold {threshold} is out of range for {members} member(s)")]
    ThresholdOutOfRange { threshold: u8, members: usize },

    #[error("Batch shape mismatch: {recipients} recipient(s) but {amounts} amount(s)")]
    BatchShapeMismatch { recipients: usize, amounts: usize },

    #[error("Wallet {0} is not initialized")]
    WalletNotInitialized(Address),

    #[error("Wallet {0} is already initialized")]
    WalletAlreadyInitialized(Address),

    #[error("Wallet {0} is deactivated")]
    WalletDeactivated(Address),

    #[error("Invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: Nonce, got: Nonce },

    #[error("Meta-transaction deadline {deadline} has passed (now {now})")]
    DeadlineExpired { deadline: u64, now: u64 },

    #[error("Recovery code has expired")]
    RecoveryCodeExpired,

    #[error("No recovery attempts remaining")]
    RecoveryAttemptsExhausted,

    #[error("Recovery session is already verified")]
    RecoveryAlreadyVerified,

    #[error("Insufficient balance: need {need}, have {have}")]
    InsufficientBalance { need: Amount, have: Amount },

    #[error("Wallet {0} not found")]
    WalletNotFound(Address),

    #[error("Transaction {0} not found")]
    TransactionNotFound(Hash),

    #[error("Bonus {0} not found")]
    BonusNotFound(Hash),

    #[error("No recovery session open for wallet {0}")]
    RecoverySessionNotFound(Address),

    #[error("Meta-transaction {0} was already executed")]
    AlreadyExecuted(Hash),

    #[error("Invalid signature for wallet {0}")]
    InvalidSignature(Address),

    #[error("Recovery code mismatch, {attempts_remaining} attempt(s) remaining")]
    RecoveryCodeMismatch { attempts_remaining: u8 },

    #[error("No matching unused backup code")]
    UnknownBackupCode,

    #[error("Recovery for wallet {0} is not verified")]
    RecoveryNotVerified(Address),

    #[error("No recovery set configured for wallet {0}")]
    RecoveryNotConfigured(Address),

    #[error("Address {0} is not in the wallet's recovery set")]
    NotAGuardian(Address),

    #[error("Guardian already approved this ownership change")]
    DuplicateApproval,

    #[error("Purchase of {amount} is below the {minimum} bonus threshold")]
    BelowBonusThreshold { amount: Amount, minimum: Amount },

    #[error("Backing store unavailable: {0}")]
    Storage(#[from] sled::Error),

    #[error("Corrupted entry in backing store: {0}")]
    CorruptedData(#[from] ReaderError),
}

impl CoreError {
    // Map the variant onto the closed adapter-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAddress(_)
            | Self::ZeroAmount
            | Self::AmountAboveLimit { .. }
            | Self::OverflowOnCredit { .. }
            | Self::MalformedTransaction(_)
            | Self::ThresholdOutOfRange { .. }
            | Self::BatchShapeMismatch { .. } => ErrorKind::Validation,

            Self::WalletNotInitialized(_)
            | Self::WalletAlreadyInitialized(_)
            | Self::WalletDeactivated(_)
            | Self::InvalidNonce { .. }
            | Self::DeadlineExpired { .. }
            | Self::RecoveryCodeExpired
            | Self::RecoveryAttemptsExhausted
            | Self::RecoveryAlreadyVerified
            | Self::RecoveryNotConfigured(_) => ErrorKind::StateConflict,

            Self::InsufficientBalance { .. } => ErrorKind::InsufficientFunds,

            Self::WalletNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::BonusNotFound(_)
            | Self::RecoverySessionNotFound(_) => ErrorKind::NotFound,

            Self::AlreadyExecuted(_) | Self::DuplicateApproval => ErrorKind::Duplicate,

            Self::InvalidSignature(_)
            | Self::RecoveryCodeMismatch { .. }
            | Self::UnknownBackupCode
            | Self::NotAGuardian(_)
            | Self::RecoveryNotVerified(_) => ErrorKind::AuthorizationFailure,

            Self::BelowBonusThreshold { .. } => ErrorKind::PolicyRejection,

            Self::Storage(_) | Self::CorruptedData(_) => ErrorKind::BackingStoreUnavailable,
        }
    }

    pub fn to_api_error(&self) -> usdtg_common::api::ApiError {
        usdtg_common::api::ApiError::new(self.kind(), self.to_string())
    }
}

impl From<WalletError> for CoreError {
    fn from(error: WalletError) -> Self {
        match error {
            WalletError::AlreadyInitialized(address) => Self::WalletAlreadyInitialized(address),
            WalletError::NotInitialized(address) => Self::WalletNotInitialized(address),
            WalletError::Deactivated(address) => Self::WalletDeactivated(address),
            WalletError::ThresholdOutOfRange { threshold, members } => {
                Self::ThresholdOutOfRange { threshold, members }
            }
            WalletError::RecoverySetTooLarge(members, _) => Self::ThresholdOutOfRange {
                threshold: 0,
                members,
            },
        }
    }
}

impl From<RecoveryError> for CoreError {
    fn from(error: RecoveryError) -> Self {
        match error {
            RecoveryError::CodeExpired => Self::RecoveryCodeExpired,
            RecoveryError::AttemptsExhausted => Self::RecoveryAttemptsExhausted,
            RecoveryError::AlreadyVerified => Self::RecoveryAlreadyVerified,
            RecoveryError::CodeMismatch { attempts_remaining } => {
                Self::RecoveryCodeMismatch { attempts_remaining }
            }
            RecoveryError::UnknownBackupCode => Self::UnknownBackupCode,
            RecoveryError::DuplicateApproval => Self::DuplicateApproval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usdtg_common::crypto::hash;

    #[test]
    fn test_kinds_cover_the_taxonomy() {
        let address = Address::from_hash(&hash(b"wallet"));

        assert_eq!(CoreError::ZeroAmount.kind(), ErrorKind::Validation);
        assert_eq!(
            CoreError::InvalidNonce {
                expected: 0,
                got: 1
            }
            .kind(),
            ErrorKind::StateConflict
        );
        assert_eq!(
            CoreError::InsufficientBalance { need: 2, have: 1 }.kind(),
            ErrorKind::InsufficientFunds
        );
        assert_eq!(
            CoreError::WalletNotFound(address.clone()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            CoreError::AlreadyExecuted(hash(b"tx")).kind(),
            ErrorKind::Duplicate
        );
        assert_eq!(
            CoreError::InvalidSignature(address.clone()).kind(),
            ErrorKind::AuthorizationFailure
        );
        assert_eq!(
            CoreError::BelowBonusThreshold {
                amount: 1,
                minimum: 2
            }
            .kind(),
            ErrorKind::PolicyRejection
        );
    }
}
