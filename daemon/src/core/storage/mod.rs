mod providers;

pub mod memory;
pub mod sled;

pub use self::{memory::MemoryStorage, providers::*, sled::SledStorage};

use async_trait::async_trait;

use crate::core::error::CoreError;

// The durable state owned by the core: balances plus journal (L0),
// wallet registry and executed meta-transactions (L2a), recovery state
// (L2b) and bonus records with their aggregates (L2c).
//
// A successful return from any mutating engine operation implies the
// written state is recoverable after a crash; engines call `flush`
// before reporting success.
#[async_trait]
pub trait Storage:
    BalanceProvider
    + JournalProvider
    + WalletProvider
    + MetaTransactionProvider
    + RecoveryProvider
    + BonusProvider
    + Sync
    + Send
    + 'static
{
    // Make every prior write durable
    async fn flush(&mut self) -> Result<(), CoreError>;

    // Stop the storage and wait for it to finish
    async fn stop(&mut self) -> Result<(), CoreError>;

    // Size of the backing store on disk in bytes
    async fn get_size_on_disk(&self) -> Result<u64, CoreError>;
}
