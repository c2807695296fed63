pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 18 decimals numbers for the USDTg family
pub const COIN_DECIMALS: u8 = 18;
// 10^18 minor units to represent 1 USDTg
pub const COIN_VALUE: u128 = 10u128.pow(COIN_DECIMALS as u32);

// Per-call ceiling on externally initiated transfers and credits
// 1 000 000 major units per operation
pub const MAX_TRANSFER_AMOUNT: u128 = 1_000_000 * COIN_VALUE;

// Addresses format
// native prefix address
pub const PREFIX_ADDRESS: &str = "usdtg1";
// legacy (hex) prefix address kept for compat
pub const PREFIX_LEGACY_ADDRESS: &str = "0x";
// payload bounds for the native form (chars after the prefix)
pub const NATIVE_ADDRESS_MIN_LEN: usize = 32;
pub const NATIVE_ADDRESS_MAX_LEN: usize = 58;
// hex chars after the legacy prefix
pub const LEGACY_ADDRESS_LEN: usize = 40;

// Well-known reserve accounts
// These are the only accounts allowed to originate credits without a debit.
// They must stay stable across restarts, so they are fixed literals.
pub const AIRDROP_RESERVE_ADDRESS: &str = "usdtg1airdropreserve00000000000000000000";
pub const BONUS_RESERVE_ADDRESS: &str = "usdtg1bonusreserve0000000000000000000000";
pub const BRIDGE_RESERVE_ADDRESS: &str = "usdtg1bridgereserve000000000000000000000";

// Meta-transaction rules
// Maximum size of the opaque call data carried by a meta-transaction
pub const MAX_META_TX_DATA_SIZE: usize = 1024; // 1 KiB
// Maximum number of meta-transactions aggregated under one batch envelope
pub const MAX_BATCH_META_TX: usize = 32;

// Recovery rules
// A recovery code is valid for 10 minutes
pub const RECOVERY_CODE_TTL_SECONDS: u64 = 600;
// Failed verifications allowed before the session locks out
pub const RECOVERY_MAX_ATTEMPTS: u8 = 3;
// Single-use backup codes issued per wallet
pub const BACKUP_CODE_COUNT: usize = 5;
// Upper bound on the recovery set of a wallet
pub const MAX_RECOVERY_ADDRESSES: usize = 5;

// Journal pagination
pub const MAX_JOURNAL_PAGE_SIZE: usize = 100;
pub const DEFAULT_JOURNAL_PAGE_SIZE: usize = 20;
