use async_trait::async_trait;
use usdtg_common::{asset::Denomination, crypto::Address, ledger::Amount};

use crate::core::error::CoreError;

#[async_trait]
pub trait BalanceProvider {
    /// Check if a balance row exists for the pair
    async fn has_balance_for(
        &self,
        address: &Address,
        asset: Denomination,
    ) -> Result<bool, CoreError>;

    /// Get the balance, zero for any pair never credited (implicit account)
    async fn get_balance(
        &self,
        address: &Address,
        asset: Denomination,
    ) -> Result<Amount, CoreError>;

    /// Overwrite the balance row for the pair
    async fn set_balance(
        &mut self,
        address: &Address,
        asset: Denomination,
        amount: Amount,
    ) -> Result<(), CoreError>;

    /// Number of non-zero balance rows, for diagnostics
    async fn count_balances(&self) -> Result<usize, CoreError>;
}
