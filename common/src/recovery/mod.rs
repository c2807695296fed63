// Social recovery state.
// A session is bounded two ways: a 600 second expiry and three failed
// attempts. Exhaustion is terminal regardless of the clock; only a fresh
// code opens a new window. Backup codes are single-use and regenerating
// them invalidates the previous set.

mod error;

pub use error::RecoveryError;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    config::{BACKUP_CODE_COUNT, RECOVERY_CODE_TTL_SECONDS, RECOVERY_MAX_ATTEMPTS},
    crypto::Address,
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampSeconds,
};

// Out-of-band channel a recovery code is delivered through
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryChannel {
    Email,
    Phone,
}

impl RecoveryChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecoveryChannel::Email => "email",
            RecoveryChannel::Phone => "phone",
        }
    }
}

impl Serializer for RecoveryChannel {
    fn write(&self, writer: &mut Writer) {
        let v = match self {
            RecoveryChannel::Email => 0u8,
            RecoveryChannel::Phone => 1u8,
        };
        writer.write_u8(v);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        match reader.read_u8()? {
            0 => Ok(RecoveryChannel::Email),
            1 => Ok(RecoveryChannel::Phone),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        1
    }
}

// 6-digit decimal code, zero padded
pub fn generate_numeric_code() -> String {
    let value: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", value)
}

// A pending recovery window for one (wallet, channel) pair
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RecoverySession {
    wallet: Address,
    channel: RecoveryChannel,
    // Where the code was delivered (masked email, phone number, ...)
    identifier: String,
    code: String,
    expires_at: TimestampSeconds,
    attempts_remaining: u8,
    verified: bool,
}

impl RecoverySession {
    pub fn open(
        wallet: Address,
        channel: RecoveryChannel,
        identifier: String,
        code: String,
        now: TimestampSeconds,
    ) -> Self {
        Self {
            wallet,
            channel,
            identifier,
            code,
            expires_at: now + RECOVERY_CODE_TTL_SECONDS,
            attempts_remaining: RECOVERY_MAX_ATTEMPTS,
            verified: false,
        }
    }

    pub fn get_wallet(&self) -> &Address {
        &self.wallet
    }

    pub fn get_channel(&self) -> RecoveryChannel {
        self.channel
    }

    pub fn get_identifier(&self) -> &str {
        &self.identifier
    }

    pub fn get_expires_at(&self) -> TimestampSeconds {
        self.expires_at
    }

    pub fn get_attempts_remaining(&self) -> u8 {
        self.attempts_remaining
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn is_expired(&self, now: TimestampSeconds) -> bool {
        now >= self.expires_at
    }

    // One verification attempt.
    // A code verifies at most once; exhaustion is checked before expiry
    // so a locked-out session stays locked out even past its natural end.
    pub fn attempt(&mut self, code: &str, now: TimestampSeconds) -> Result<(), RecoveryError> {
        if self.verified {
            return Err(RecoveryError::AlreadyVerified);
        }

        if self.attempts_remaining == 0 {
            return Err(RecoveryError::AttemptsExhausted);
        }

        if self.is_expired(now) {
            return Err(RecoveryError::CodeExpired);
        }

        if self.code != code {
            self.attempts_remaining -= 1;
            return Err(RecoveryError::CodeMismatch {
                attempts_remaining: self.attempts_remaining,
            });
        }

        self.verified = true;
        self.attempts_remaining = RECOVERY_MAX_ATTEMPTS;
        Ok(())
    }

    // Used by the backup-code path, which bypasses the numeric code
    pub fn mark_verified(&mut self) {
        self.verified = true;
    }
}

impl Serializer for RecoverySession {
    fn write(&self, writer: &mut Writer) {
        self.wallet.write(writer);
        self.channel.write(writer);
        writer.write_string(&self.identifier);
        writer.write_string(&self.code);
        writer.write_u64(&self.expires_at);
        writer.write_u8(self.attempts_remaining);
        writer.write_bool(self.verified);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            wallet: Address::read(reader)?,
            channel: RecoveryChannel::read(reader)?,
            identifier: reader.read_string()?,
            code: reader.read_string()?,
            expires_at: reader.read_u64()?,
            attempts_remaining: reader.read_u8()?,
            verified: reader.read_bool()?,
        })
    }
}

// A pending threshold ownership change.
// Guardians from the wallet's recovery set approve a proposed new owner;
// once the approvals reach the wallet's threshold the change applies and
// the proposal is discarded. Approving a different owner restarts the
// count from scratch.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RecoveryProposal {
    wallet: Address,
    new_owner: Address,
    approvals: Vec<Address>,
}

impl RecoveryProposal {
    pub fn open(wallet: Address, new_owner: Address) -> Self {
        Self {
            wallet,
            new_owner,
            approvals: Vec::new(),
        }
    }

    pub fn get_wallet(&self) -> &Address {
        &self.wallet
    }

    pub fn get_new_owner(&self) -> &Address {
        &self.new_owner
    }

    pub fn get_approvals(&self) -> &[Address] {
        &self.approvals
    }

    pub fn has_approved(&self, guardian: &Address) -> bool {
        self.approvals.contains(guardian)
    }

    pub fn approve(&mut self, guardian: Address) -> Result<usize, RecoveryError> {
        if self.has_approved(&guardian) {
            return Err(RecoveryError::DuplicateApproval);
        }

        self.approvals.push(guardian);
        Ok(self.approvals.len())
    }

    pub fn is_met(&self, threshold: u8) -> bool {
        self.approvals.len() >= threshold as usize
    }
}

impl Serializer for RecoveryProposal {
    fn write(&self, writer: &mut Writer) {
        self.wallet.write(writer);
        self.new_owner.write(writer);
        self.approvals.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            wallet: Address::read(reader)?,
            new_owner: Address::read(reader)?,
            approvals: Vec::read(reader)?,
        })
    }
}

// A single-use backup code
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BackupCode {
    code: String,
    used: bool,
}

impl BackupCode {
    pub fn get_code(&self) -> &str {
        &self.code
    }

    pub fn is_used(&self) -> bool {
        self.used
    }
}

impl Serializer for BackupCode {
    fn write(&self, writer: &mut Writer) {
        writer.write_string(&self.code);
        writer.write_bool(self.used);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            code: reader.read_string()?,
            used: reader.read_bool()?,
        })
    }
}

// The current set of backup codes for a wallet
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BackupCodeSet {
    codes: Vec<BackupCode>,
}

impl BackupCodeSet {
    pub fn generate() -> Self {
        let codes = (0..BACKUP_CODE_COUNT)
            .map(|_| BackupCode {
                code: generate_numeric_code(),
                used: false,
            })
            .collect();
        Self { codes }
    }

    pub fn get_codes(&self) -> &[BackupCode] {
        &self.codes
    }

    pub fn unused_count(&self) -> usize {
        self.codes.iter().filter(|c| !c.used).count()
    }

    // Consume the matching unused code, if any
    pub fn use_code(&mut self, code: &str) -> Result<(), RecoveryError> {
        for backup in self.codes.iter_mut() {
            if !backup.used && backup.code == code {
                backup.used = true;
                return Ok(());
            }
        }

        Err(RecoveryError::UnknownBackupCode)
    }
}

impl Serializer for BackupCodeSet {
    fn write(&self, writer: &mut Writer) {
        self.codes.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            codes: Vec::read(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash;

    fn session(code: &str) -> RecoverySession {
        RecoverySession::open(
            Address::from_hash(&hash(b"wallet")),
            RecoveryChannel::Email,
            "a***@example.com".to_string(),
            code.to_string(),
            1_000,
        )
    }

    #[test]
    fn test_code_format() {
        for _ in 0..32 {
            let code = generate_numeric_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_verify_success_resets_attempts() {
        let mut session = session("123456");
        session.attempt("000000", 1_100).unwrap_err();
        session.attempt("123456", 1_100).unwrap();
        assert!(session.is_verified());
        assert_eq!(session.get_attempts_remaining(), RECOVERY_MAX_ATTEMPTS);
    }

    #[test]
    fn test_three_failures_lock_out() {
        let mut session = session("123456");
        for _ in 0..3 {
            assert!(matches!(
                session.attempt("000000", 1_100),
                Err(RecoveryError::CodeMismatch { .. }) | Err(RecoveryError::AttemptsExhausted)
            ));
        }
        assert_eq!(session.get_attempts_remaining(), 0);

        // even the correct code is refused once exhausted
        assert!(matches!(
            session.attempt("123456", 1_100),
            Err(RecoveryError::AttemptsExhausted)
        ));
    }

    #[test]
    fn test_expiry() {
        let mut session = session("123456");
        assert!(matches!(
            session.attempt("123456", 1_000 + RECOVERY_CODE_TTL_SECONDS),
            Err(RecoveryError::CodeExpired)
        ));
    }

    #[test]
    fn test_backup_codes_single_use() {
        let mut set = BackupCodeSet::generate();
        assert_eq!(set.unused_count(), BACKUP_CODE_COUNT);

        let code = set.get_codes()[0].get_code().to_string();
        set.use_code(&code).unwrap();
        assert_eq!(set.unused_count(), BACKUP_CODE_COUNT - 1);
        assert!(matches!(
            set.use_code(&code),
            Err(RecoveryError::UnknownBackupCode)
        ));
    }

    #[test]
    fn test_proposal_counts_distinct_guardians() {
        let wallet = Address::from_hash(&hash(b"wallet"));
        let new_owner = Address::from_hash(&hash(b"new-owner"));
        let mut proposal = RecoveryProposal::open(wallet, new_owner);

        let g1 = Address::from_hash(&hash(b"g1"));
        let g2 = Address::from_hash(&hash(b"g2"));

        assert_eq!(proposal.approve(g1.clone()).unwrap(), 1);
        assert!(matches!(
            proposal.approve(g1),
            Err(RecoveryError::DuplicateApproval)
        ));
        assert_eq!(proposal.approve(g2).unwrap(), 2);

        assert!(proposal.is_met(2));
        assert!(!proposal.is_met(3));
    }

    #[test]
    fn test_session_roundtrip() {
        let session = session("123456");
        let decoded = RecoverySession::from_bytes(&session.to_bytes()).unwrap();
        assert_eq!(decoded.get_wallet(), session.get_wallet());
        assert_eq!(decoded.get_attempts_remaining(), RECOVERY_MAX_ATTEMPTS);
        assert!(!decoded.is_verified());
    }
}
