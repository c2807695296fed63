use serde::{Deserialize, Serialize};

use super::BonusTier;
use crate::{
    crypto::{Address, Hash},
    ledger::Amount,
    serializer::{Reader, ReaderError, Serializer, Writer},
    time::TimestampMillis,
};

// A bonus earned by a qualifying purchase.
// `distributed` transitions false -> true exactly once; the credit hash
// recorded at that moment is the stable answer for every later
// distribution attempt.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BonusRecord {
    bonus_id: Hash,
    wallet: Address,
    user_id: String,
    purchase_amount: Amount,
    bonus_amount: Amount,
    tier: BonusTier,
    tier_rate_bps: u16,
    created_at: TimestampMillis,
    distributed_at: Option<TimestampMillis>,
    distributed: bool,
    credit_tx_hash: Option<Hash>,
}

impl BonusRecord {
    pub fn new(
        bonus_id: Hash,
        wallet: Address,
        user_id: String,
        purchase_amount: Amount,
        tier: BonusTier,
        created_at: TimestampMillis,
    ) -> Self {
        Self {
            bonus_id,
            wallet,
            user_id,
            purchase_amount,
            bonus_amount: tier.bonus_amount(),
            tier,
            tier_rate_bps: tier.rate_bps(),
            created_at,
            distributed_at: None,
            distributed: false,
            credit_tx_hash: None,
        }
    }

    pub fn get_bonus_id(&self) -> &Hash {
        &self.bonus_id
    }

    pub fn get_wallet(&self) -> &Address {
        &self.wallet
    }

    pub fn get_user_id(&self) -> &str {
        &self.user_id
    }

    pub fn get_purchase_amount(&self) -> Amount {
        self.purchase_amount
    }

    pub fn get_bonus_amount(&self) -> Amount {
        self.bonus_amount
    }

    pub fn get_tier(&self) -> BonusTier {
        self.tier
    }

    pub fn get_tier_rate_bps(&self) -> u16 {
        self.tier_rate_bps
    }

    pub fn get_created_at(&self) -> TimestampMillis {
        self.created_at
    }

    pub fn get_distributed_at(&self) -> Option<TimestampMillis> {
        self.distributed_at
    }

    pub fn is_distributed(&self) -> bool {
        self.distributed
    }

    pub fn get_credit_tx_hash(&self) -> &Option<Hash> {
        &self.credit_tx_hash
    }

    // One-way transition; the caller must hold the wallet lock
    pub fn mark_distributed(&mut self, credit_tx_hash: Hash, now: TimestampMillis) {
        self.distributed = true;
        self.distributed_at = Some(now);
        self.credit_tx_hash = Some(credit_tx_hash);
    }
}

impl Serializer for BonusRecord {
    fn write(&self, writer: &mut Writer) {
        self.bonus_id.write(writer);
        self.wallet.write(writer);
        writer.write_string(&self.user_id);
        writer.write_u128(&self.purchase_amount);
        writer.write_u128(&self.bonus_amount);
        self.tier.write(writer);
        writer.write_u16(self.tier_rate_bps);
        writer.write_u64(&self.created_at);
        self.distributed_at.write(writer);
        writer.write_bool(self.distributed);
        self.credit_tx_hash.write(writer);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            bonus_id: Hash::read(reader)?,
            wallet: Address::read(reader)?,
            user_id: reader.read_string()?,
            purchase_amount: reader.read_u128()?,
            bonus_amount: reader.read_u128()?,
            tier: BonusTier::read(reader)?,
            tier_rate_bps: reader.read_u16()?,
            created_at: reader.read_u64()?,
            distributed_at: Option::read(reader)?,
            distributed: reader.read_bool()?,
            credit_tx_hash: Option::read(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash;

    #[test]
    fn test_record_matches_tier_table() {
        let record = BonusRecord::new(
            hash(b"bonus"),
            Address::from_hash(&hash(b"wallet")),
            "user-1".to_string(),
            BonusTier::Gold.threshold(),
            BonusTier::Gold,
            1_000,
        );

        assert_eq!(record.get_bonus_amount(), BonusTier::Gold.bonus_amount());
        assert_eq!(record.get_tier_rate_bps(), BonusTier::Gold.rate_bps());
        assert!(!record.is_distributed());
    }

    #[test]
    fn test_mark_distributed_sets_hash() {
        let mut record = BonusRecord::new(
            hash(b"bonus"),
            Address::from_hash(&hash(b"wallet")),
            "user-1".to_string(),
            BonusTier::Bronze.threshold(),
            BonusTier::Bronze,
            1_000,
        );

        record.mark_distributed(hash(b"credit"), 2_000);
        assert!(record.is_distributed());
        assert_eq!(record.get_credit_tx_hash(), &Some(hash(b"credit")));
        assert_eq!(record.get_distributed_at(), Some(2_000));
    }

    #[test]
    fn test_serializer_roundtrip() {
        let mut record = BonusRecord::new(
            hash(b"bonus"),
            Address::from_hash(&hash(b"wallet")),
            "user-1".to_string(),
            BonusTier::Diamond.threshold(),
            BonusTier::Diamond,
            1_000,
        );
        record.mark_distributed(hash(b"credit"), 2_000);

        let decoded = BonusRecord::from_bytes(&record.to_bytes()).unwrap();
        assert_eq!(decoded.get_bonus_id(), record.get_bonus_id());
        assert_eq!(decoded.get_tier(), BonusTier::Diamond);
        assert!(decoded.is_distributed());
        assert_eq!(decoded.get_credit_tx_hash(), record.get_credit_tx_hash());
    }
}
