use async_trait::async_trait;
use usdtg_common::{
    bonus::{BonusRecord, SystemBonusStats, UserBonusStats},
    crypto::{Address, Hash},
};

use crate::core::error::CoreError;

#[async_trait]
pub trait BonusProvider {
    /// Check if a bonus record exists
    async fn has_bonus_record(&self, bonus_id: &Hash) -> Result<bool, CoreError>;

    /// Get a bonus record by id
    async fn get_bonus_record(&self, bonus_id: &Hash) -> Result<BonusRecord, CoreError>;

    /// Insert or overwrite the bonus record and its wallet index row
    async fn set_bonus_record(&mut self, record: &BonusRecord) -> Result<(), CoreError>;

    /// All bonus ids earned by the wallet, oldest first
    async fn get_bonus_ids_for_wallet(&self, wallet: &Address) -> Result<Vec<Hash>, CoreError>;

    /// Per-wallet aggregates; defaults for wallets without bonuses
    async fn get_user_bonus_stats(&self, wallet: &Address) -> Result<UserBonusStats, CoreError>;

    /// Overwrite the per-wallet aggregates
    async fn set_user_bonus_stats(
        &mut self,
        wallet: &Address,
        stats: &UserBonusStats,
    ) -> Result<(), CoreError>;

    /// System-wide aggregates
    async fn get_system_bonus_stats(&self) -> Result<SystemBonusStats, CoreError>;

    /// Overwrite the system-wide aggregates
    async fn set_system_bonus_stats(&mut self, stats: &SystemBonusStats) -> Result<(), CoreError>;

    /// Allocate the next bonus creation sequence, used for id derivation
    async fn next_bonus_sequence(&mut self) -> Result<u64, CoreError>;
}
