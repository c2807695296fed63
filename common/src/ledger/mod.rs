use serde::{Deserialize, Serialize};

use crate::{
    asset::Denomination,
    crypto::{Address, Hash},
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
};

// Fixed-point amount in minor units (18 decimals).
// Arithmetic on amounts is always checked; overflow is an error, never
// wraparound.
pub type Amount = u128;

// Terminal status of a journal entry
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Failed,
    Rejected,
}

impl Serializer for TransactionStatus {
    fn write(&self, writer: &mut Writer) {
        let v = match self {
            TransactionStatus::Pending => 0u8,
            TransactionStatus::Confirmed => 1u8,
            TransactionStatus::Failed => 2u8,
            TransactionStatus::Rejected => 3u8,
        };
        writer.write_u8(v);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        match reader.read_u8()? {
            0 => Ok(TransactionStatus::Pending),
            1 => Ok(TransactionStatus::Confirmed),
            2 => Ok(TransactionStatus::Failed),
            3 => Ok(TransactionStatus::Rejected),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        1
    }
}

// Which reserve originated a single-sided credit
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Airdrop,
    Bonus,
    Bridge,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::Airdrop => "AIRDROP",
            SourceTag::Bonus => "BONUS",
            SourceTag::Bridge => "BRIDGE",
        }
    }
}

impl Serializer for SourceTag {
    fn write(&self, writer: &mut Writer) {
        let v = match self {
            SourceTag::Airdrop => 0u8,
            SourceTag::Bonus => 1u8,
            SourceTag::Bridge => 2u8,
        };
        writer.write_u8(v);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        match reader.read_u8()? {
            0 => Ok(SourceTag::Airdrop),
            1 => Ok(SourceTag::Bonus),
            2 => Ok(SourceTag::Bridge),
            _ => Err(ReaderError::InvalidValue),
        }
    }

    fn size(&self) -> usize {
        1
    }
}

// An immutable record of a balance change.
// Entries are append-only: once written they are never mutated, and the
// sequence number breaks timestamp ties for stable pagination.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct JournalEntry {
    tx_hash: Hash,
    from: Address,
    to: Address,
    asset: Denomination,
    amount: Amount,
    fee: Amount,
    status: TransactionStatus,
    timestamp: TimestampMillis,
    // Monotone write sequence assigned by the ledger store
    sequence: u64,
    memo: Option<String>,
}

impl JournalEntry {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tx_hash: Hash,
        from: Address,
        to: Address,
        asset: Denomination,
        amount: Amount,
        fee: Amount,
        status: TransactionStatus,
        timestamp: TimestampMillis,
        sequence: u64,
        memo: Option<String>,
    ) -> Self {
        Self {
            tx_hash,
            from,
            to,
            asset,
            amount,
            fee,
            status,
            timestamp,
            sequence,
            memo,
        }
    }

    pub fn get_tx_hash(&self) -> &Hash {
        &self.tx_hash
    }

    pub fn get_from(&self) -> &Address {
        &self.from
    }

    pub fn get_to(&self) -> &Address {
        &self.to
    }

    pub fn get_asset(&self) -> Denomination {
        self.asset
    }

    pub fn get_amount(&self) -> Amount {
        self.amount
    }

    pub fn get_fee(&self) -> Amount {
        self.fee
    }

    pub fn get_status(&self) -> TransactionStatus {
        self.status
    }

    pub fn get_timestamp(&self) -> TimestampMillis {
        self.timestamp
    }

    pub fn get_sequence(&self) -> u64 {
        self.sequence
    }

    pub fn get_memo(&self) -> &Option<String> {
        &self.memo
    }

    pub fn concerns(&self, address: &Address) -> bool {
        &self.from == address || &self.to == address
    }
}

impl Serializer for JournalEntry {
    fn write(&self, writer: &mut Writer) {
        self.tx_hash.write(writer);
        self.from.write(writer);
        self.to.write(writer);
        self.asset.write(writer);
        writer.write_u128(&self.amount);
        writer.write_u128(&self.fee);
        self.status.write(writer);
        writer.write_u64(&self.timestamp);
        writer.write_u64(&self.sequence);
        self.memo.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            tx_hash: Hash::read(reader)?,
            from: Address::read(reader)?,
            to: Address::read(reader)?,
            asset: Denomination::read(reader)?,
            amount: reader.read_u128()?,
            fee: reader.read_u128()?,
            status: TransactionStatus::read(reader)?,
            timestamp: reader.read_u64()?,
            sequence: reader.read_u64()?,
            memo: Option::read(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash;

    #[test]
    fn test_journal_entry_roundtrip() {
        let entry = JournalEntry::new(
            hash(b"tx"),
            Address::from_hash(&hash(b"a")),
            Address::from_hash(&hash(b"b")),
            Denomination::USDTg,
            1_000_000,
            0,
            TransactionStatus::Confirmed,
            1_700_000_000_000,
            42,
            Some("AIRDROP: genesis".to_string()),
        );

        let decoded = JournalEntry::from_bytes(&entry.to_bytes()).unwrap();
        assert_eq!(decoded.get_tx_hash(), entry.get_tx_hash());
        assert_eq!(decoded.get_amount(), 1_000_000);
        assert_eq!(decoded.get_sequence(), 42);
        assert_eq!(decoded.get_status(), TransactionStatus::Confirmed);
        assert_eq!(decoded.get_memo(), entry.get_memo());
    }

    #[test]
    fn test_concerns() {
        let a = Address::from_hash(&hash(b"a"));
        let b = Address::from_hash(&hash(b"b"));
        let c = Address::from_hash(&hash(b"c"));
        let entry = JournalEntry::new(
            hash(b"tx"),
            a.clone(),
            b.clone(),
            Denomination::USDTg,
            1,
            0,
            TransactionStatus::Confirmed,
            0,
            0,
            None,
        );

        assert!(entry.concerns(&a));
        assert!(entry.concerns(&b));
        assert!(!entry.concerns(&c));
    }
}
