// Storage-backed tests for the core engines.
// Every test runs against a temporary sled database through the same
// Runtime facade the adapters use; signatures are real owner-bound
// signatures so the authorization paths are exercised end to end.

mod property_tests;

use usdtg_common::{
    account::AccountType,
    config::COIN_VALUE,
    crypto::{hash, Address, Blake3Hasher, Hash, RecoveredOwnerVerifier},
    ledger::Amount,
    time::get_current_time_in_seconds,
    transaction::{MetaTransaction, MetaTransactionBuilder},
};

use super::{
    runtime::Runtime,
    storage::{SledStorage, Storage},
};

pub fn test_runtime() -> Runtime<SledStorage> {
    let storage = SledStorage::open_temporary().expect("temporary sled storage");
    Runtime::with_defaults(storage)
}

pub fn address(seed: &[u8]) -> Address {
    Address::from_hash(&hash(seed))
}

// Amounts in tests are written in major units
pub fn major(amount: u128) -> Amount {
    amount * COIN_VALUE
}

// Create, initialize and activate a smart-contract wallet
pub async fn active_wallet<S: Storage>(runtime: &Runtime<S>, owner: &Address) -> Address {
    let wallet = runtime
        .create_wallet(owner, AccountType::SmartContract)
        .await
        .expect("wallet creation");
    runtime
        .initialize_wallet(&wallet, hash(b"implementation"))
        .await
        .expect("wallet initialization");
    wallet
}

// A meta-transaction signed by the wallet's owner
pub fn signed_meta_tx(
    owner: &Address,
    from: &Address,
    to: &Address,
    value: Amount,
    nonce: u64,
    deadline: u64,
) -> MetaTransaction {
    let builder = MetaTransactionBuilder::new(from.clone(), to.clone(), nonce, deadline)
        .with_value(value)
        .with_gas(21_000, 2);
    let signature = RecoveredOwnerVerifier::sign(&builder.signing_payload(), owner);
    builder.build(&Blake3Hasher, signature).expect("meta tx build")
}

// Same shape, signed by somebody other than the owner
pub fn badly_signed_meta_tx(
    from: &Address,
    to: &Address,
    value: Amount,
    nonce: u64,
    deadline: u64,
) -> MetaTransaction {
    let intruder = address(b"intruder");
    let builder = MetaTransactionBuilder::new(from.clone(), to.clone(), nonce, deadline)
        .with_value(value)
        .with_gas(21_000, 2);
    let signature = RecoveredOwnerVerifier::sign(&builder.signing_payload(), &intruder);
    builder.build(&Blake3Hasher, signature).expect("meta tx build")
}

pub fn far_deadline() -> u64 {
    get_current_time_in_seconds() + 3_600
}

pub fn batch_id(seed: &[u8]) -> Hash {
    hash(seed)
}
