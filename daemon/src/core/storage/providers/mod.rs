mod balance;
mod bonus;
mod journal;
mod meta_tx;
mod recovery;
mod wallet;

pub use balance::BalanceProvider;
pub use bonus::BonusProvider;
pub use journal::JournalProvider;
pub use meta_tx::MetaTransactionProvider;
pub use recovery::RecoveryProvider;
pub use wallet::WalletProvider;
