use serde::{Deserialize, Serialize};

use super::BonusTier;
use crate::{
    ledger::Amount,
    serializer::{Reader, ReaderError, Serializer, Writer},
};

// How many bonuses make a user VIP regardless of tier
pub const VIP_BONUS_COUNT: u64 = 3;

// Per-wallet bonus aggregates.
// VIP holds iff the user earned at least VIP_BONUS_COUNT bonuses or ever
// reached Diamond.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UserBonusStats {
    total_purchases: Amount,
    total_bonuses: Amount,
    bonus_count: u64,
    highest_tier: Option<BonusTier>,
    is_vip: bool,
}

impl UserBonusStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_total_purchases(&self) -> Amount {
        self.total_purchases
    }

    pub fn get_total_bonuses(&self) -> Amount {
        self.total_bonuses
    }

    pub fn get_bonus_count(&self) -> u64 {
        self.bonus_count
    }

    pub fn get_highest_tier(&self) -> Option<BonusTier> {
        self.highest_tier
    }

    pub fn is_vip(&self) -> bool {
        self.is_vip
    }

    // Fold one earned bonus into the aggregates and recompute the VIP flag
    pub fn record_bonus(&mut self, purchase_amount: Amount, bonus_amount: Amount, tier: BonusTier) {
        self.total_purchases = self.total_purchases.saturating_add(purchase_amount);
        self.total_bonuses = self.total_bonuses.saturating_add(bonus_amount);
        self.bonus_count += 1;

        self.highest_tier = match self.highest_tier {
            Some(current) if current >= tier => Some(current),
            _ => Some(tier),
        };

        self.is_vip =
            self.bonus_count >= VIP_BONUS_COUNT || self.highest_tier == Some(BonusTier::Diamond);
    }
}

impl Serializer for UserBonusStats {
    fn write(&self, writer: &mut Writer) {
        writer.write_u128(&self.total_purchases);
        writer.write_u128(&self.total_bonuses);
        writer.write_u64(&self.bonus_count);
        self.highest_tier.write(writer);
        writer.write_bool(self.is_vip);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            total_purchases: reader.read_u128()?,
            total_bonuses: reader.read_u128()?,
            bonus_count: reader.read_u64()?,
            highest_tier: Option::read(reader)?,
            is_vip: reader.read_bool()?,
        })
    }
}

// System-wide bonus aggregates.
// Counters are snapshot-consistent individually, not across each other.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct SystemBonusStats {
    bonuses_created: u64,
    bonuses_distributed: u64,
    total_purchase_volume: Amount,
    total_bonus_amount: Amount,
    total_distributed_amount: Amount,
}

impl SystemBonusStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_bonuses_created(&self) -> u64 {
        self.bonuses_created
    }

    pub fn get_bonuses_distributed(&self) -> u64 {
        self.bonuses_distributed
    }

    pub fn get_total_purchase_volume(&self) -> Amount {
        self.total_purchase_volume
    }

    pub fn get_total_bonus_amount(&self) -> Amount {
        self.total_bonus_amount
    }

    pub fn get_total_distributed_amount(&self) -> Amount {
        self.total_distributed_amount
    }

    pub fn record_created(&mut self, purchase_amount: Amount, bonus_amount: Amount) {
        self.bonuses_created += 1;
        self.total_purchase_volume = self.total_purchase_volume.saturating_add(purchase_amount);
        self.total_bonus_amount = self.total_bonus_amount.saturating_add(bonus_amount);
    }

    pub fn record_distributed(&mut self, bonus_amount: Amount) {
        self.bonuses_distributed += 1;
        self.total_distributed_amount = self.total_distributed_amount.saturating_add(bonus_amount);
    }
}

impl Serializer for SystemBonusStats {
    fn write(&self, writer: &mut Writer) {
        writer.write_u64(&self.bonuses_created);
        writer.write_u64(&self.bonuses_distributed);
        writer.write_u128(&self.total_purchase_volume);
        writer.write_u128(&self.total_bonus_amount);
        writer.write_u128(&self.total_distributed_amount);
    }

    fn read(reader: &mut Reader) -> Result<Self, ReaderError> {
        Ok(Self {
            bonuses_created: reader.read_u64()?,
            bonuses_distributed: reader.read_u64()?,
            total_purchase_volume: reader.read_u128()?,
            total_bonus_amount: reader.read_u128()?,
            total_distributed_amount: reader.read_u128()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vip_after_three_bonuses() {
        let mut stats = UserBonusStats::new();
        for _ in 0..2 {
            stats.record_bonus(
                BonusTier::Bronze.threshold(),
                BonusTier::Bronze.bonus_amount(),
                BonusTier::Bronze,
            );
            assert!(!stats.is_vip());
        }

        stats.record_bonus(
            BonusTier::Bronze.threshold(),
            BonusTier::Bronze.bonus_amount(),
            BonusTier::Bronze,
        );
        assert!(stats.is_vip());
        assert_eq!(stats.get_bonus_count(), 3);
    }

    #[test]
    fn test_vip_after_single_diamond() {
        let mut stats = UserBonusStats::new();
        stats.record_bonus(
            BonusTier::Diamond.threshold(),
            BonusTier::Diamond.bonus_amount(),
            BonusTier::Diamond,
        );
        assert!(stats.is_vip());
        assert_eq!(stats.get_highest_tier(), Some(BonusTier::Diamond));
    }

    #[test]
    fn test_highest_tier_never_lowers() {
        let mut stats = UserBonusStats::new();
        stats.record_bonus(
            BonusTier::Gold.threshold(),
            BonusTier::Gold.bonus_amount(),
            BonusTier::Gold,
        );
        stats.record_bonus(
            BonusTier::Bronze.threshold(),
            BonusTier::Bronze.bonus_amount(),
            BonusTier::Bronze,
        );
        assert_eq!(stats.get_highest_tier(), Some(BonusTier::Gold));
    }

    #[test]
    fn test_stats_roundtrip() {
        let mut stats = UserBonusStats::new();
        stats.record_bonus(
            BonusTier::Silver.threshold(),
            BonusTier::Silver.bonus_amount(),
            BonusTier::Silver,
        );

        let decoded = UserBonusStats::from_bytes(&stats.to_bytes()).unwrap();
        assert_eq!(decoded.get_bonus_count(), 1);
        assert_eq!(decoded.get_highest_tier(), Some(BonusTier::Silver));
    }
}
