use thiserror::Error;

use crate::crypto::Address;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Meta-transaction data of {size} bytes exceeds the {maximum} bytes limit")]
    DataTooLarge { size: usize, maximum: usize },

    #[error("Gas parameters overflow")]
    GasOverflow,

    #[error("Batch contains no transactions")]
    EmptyBatch,

    #[error("Batch of {0} transactions exceeds the maximum of {1}")]
    BatchTooLarge(usize, usize),

    #[error("Batch wallet mismatch: expected {expected}, found {found}")]
    BatchWalletMismatch { expected: Address, found: Address },

    #[error("Sponsored payment mode requires a sponsor address")]
    MissingSponsor,

    #[error("Relayer payment mode requires a relayer address")]
    MissingRelayer,
}
