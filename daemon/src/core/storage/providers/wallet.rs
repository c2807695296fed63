use async_trait::async_trait;
use usdtg_common::{account::Wallet, crypto::Address};

use crate::core::error::CoreError;

#[async_trait]
pub trait WalletProvider {
    /// Check if a wallet is registered at the address
    async fn has_wallet(&self, address: &Address) -> Result<bool, CoreError>;

    /// Get the wallet registered at the address
    async fn get_wallet(&self, address: &Address) -> Result<Wallet, CoreError>;

    /// Insert or overwrite the wallet row
    async fn set_wallet(&mut self, wallet: &Wallet) -> Result<(), CoreError>;

    /// How many wallets an owner has created so far; used as the
    /// creation nonce for deterministic address derivation
    async fn get_owner_creation_nonce(&self, owner: &Address) -> Result<u64, CoreError>;

    /// Bump the owner creation nonce after a successful creation
    async fn increment_owner_creation_nonce(&mut self, owner: &Address) -> Result<u64, CoreError>;

    /// Total registered wallets
    async fn count_wallets(&self) -> Result<usize, CoreError>;
}
