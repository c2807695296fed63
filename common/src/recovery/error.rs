use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Recovery code has expired")]
    CodeExpired,

    #[error("No verification attempts remaining")]
    AttemptsExhausted,

    #[error("Recovery code mismatch, {attempts_remaining} attempt(s) remaining")]
    CodeMismatch { attempts_remaining: u8 },

    #[error("Recovery session is already verified")]
    AlreadyVerified,

    #[error("No matching unused backup code")]
    UnknownBackupCode,

    #[error("Guardian already approved this proposal")]
    DuplicateApproval,
}
