mod error;
mod wallet;

pub use error::WalletError;
pub use wallet::{AccountType, Wallet};

// Nonce used to prevent replay of meta-transactions and keep them ordered
pub type Nonce = u64;
