// Property-style tests for the universal invariants.
// Inputs are driven by a seeded RNG so failures reproduce.

use std::sync::Arc;

use futures::future::join_all;
use indexmap::IndexMap;
use rand::{rngs::StdRng, Rng, SeedableRng};

use usdtg_common::{
    asset::Denomination,
    bonus::{compute_bonus, BonusTier},
    config::COIN_VALUE,
    crypto::Address,
    ledger::Amount,
};

use super::*;
use crate::core::ledger::LedgerStore;
use crate::core::storage::{JournalProvider, SledStorage};

fn participants() -> Vec<Address> {
    (0u8..4).map(|i| address(&[b'p', i])).collect()
}

async fn all_balances(
    runtime: &Runtime<SledStorage>,
    addresses: &[Address],
) -> Vec<(Address, Amount)> {
    let mut balances = Vec::new();
    for address in addresses {
        let balance = runtime
            .get_balance(address, Denomination::USDTg)
            .await
            .unwrap();
        balances.push((address.clone(), balance));
    }
    balances
}

// Invariants 1 and 3: balances never go negative (a rejected debit leaves
// everything untouched) and replaying the journal from an empty state
// reconstructs the exact balance set.
#[tokio::test]
async fn prop_random_ops_keep_ledger_consistent() {
    let runtime = test_runtime();
    let addresses = participants();
    let mut rng = StdRng::seed_from_u64(0xC0FFEE);

    // shadow bookkeeping mirroring what the ledger should hold
    let mut shadow: IndexMap<Address, Amount> = IndexMap::new();

    for _ in 0..200 {
        let from = addresses[rng.gen_range(0..addresses.len())].clone();
        let to = addresses[rng.gen_range(0..addresses.len())].clone();
        let amount = major(rng.gen_range(1..50));

        if rng.gen_bool(0.3) {
            runtime
                .airdrop(&to, Denomination::USDTg, amount, "fuzz")
                .await
                .unwrap();
            *shadow.entry(to).or_insert(0) += amount;
        } else {
            let balance = shadow.get(&from).copied().unwrap_or(0);
            let result = runtime
                .transfer(&from, &to, Denomination::USDTg, amount, None)
                .await;

            if balance >= amount {
                result.unwrap();
                if from != to {
                    *shadow.entry(from).or_insert(0) -= amount;
                    *shadow.entry(to).or_insert(0) += amount;
                }
            } else {
                result.unwrap_err();
            }
        }
    }

    // the shadow bookkeeping and the ledger agree
    for address in &addresses {
        let expected = shadow.get(address).copied().unwrap_or(0);
        assert_eq!(
            runtime.get_balance(address, Denomination::USDTg).await.unwrap(),
            expected
        );
    }

    // replay: the journal alone reconstructs the live balance set
    let entries = {
        let storage = runtime.ledger().get_storage().read().await;
        storage.get_all_journal_entries().await.unwrap()
    };
    let replayed = LedgerStore::<SledStorage>::replay_journal(&entries);

    for (address, balance) in all_balances(&runtime, &addresses).await {
        let from_replay = replayed
            .get(&(address.clone(), Denomination::USDTg))
            .copied()
            .unwrap_or(0);
        assert_eq!(balance, from_replay, "replay mismatch for {}", address);
    }
}

// Invariant 2: a zero-fee transfer conserves the pair's total
#[tokio::test]
async fn prop_transfer_conserves_total() {
    let runtime = test_runtime();
    let a = address(b"a");
    let b = address(b"b");
    let mut rng = StdRng::seed_from_u64(42);

    runtime
        .airdrop(&a, Denomination::USDTg, major(1_000), "seed")
        .await
        .unwrap();

    for _ in 0..50 {
        let before_a = runtime.get_balance(&a, Denomination::USDTg).await.unwrap();
        let before_b = runtime.get_balance(&b, Denomination::USDTg).await.unwrap();

        let amount = major(rng.gen_range(1..30));
        let (from, to) = if rng.gen_bool(0.5) { (&a, &b) } else { (&b, &a) };
        let _ = runtime
            .transfer(from, to, Denomination::USDTg, amount, None)
            .await;

        let after_a = runtime.get_balance(&a, Denomination::USDTg).await.unwrap();
        let after_b = runtime.get_balance(&b, Denomination::USDTg).await.unwrap();
        assert_eq!(before_a + before_b, after_a + after_b);
    }
}

// Invariants 4 and 5: the nonce only ever advances by one per successful
// execution, and every tx id executes at most once
#[tokio::test]
async fn prop_nonce_monotone_and_at_most_once() {
    let runtime = test_runtime();
    let owner = address(b"owner");
    let wallet = active_wallet(&runtime, &owner).await;
    let to = address(b"receiver");

    let mut executed = Vec::new();
    for nonce in 0..5u64 {
        // a replay of any earlier envelope must fail without moving state
        for tx in &executed {
            let before = runtime.get_wallet(&wallet).await.unwrap().get_nonce();
            runtime
                .execute_meta_transaction(Clone::clone(tx))
                .await
                .unwrap_err();
            assert_eq!(runtime.get_wallet(&wallet).await.unwrap().get_nonce(), before);
        }

        // a nonce from the future is refused
        let ahead = signed_meta_tx(&owner, &wallet, &to, 0, nonce + 1, far_deadline());
        runtime.execute_meta_transaction(ahead).await.unwrap_err();

        let tx = signed_meta_tx(&owner, &wallet, &to, 0, nonce, far_deadline());
        runtime.execute_meta_transaction(tx.clone()).await.unwrap();
        assert_eq!(runtime.get_wallet(&wallet).await.unwrap().get_nonce(), nonce + 1);
        executed.push(tx);
    }
}

// Invariant 6: N distributions, one credit, stable hash
#[tokio::test]
async fn prop_bonus_distribution_is_idempotent() {
    let runtime = test_runtime();
    let owner = address(b"owner");
    let wallet = active_wallet(&runtime, &owner).await;

    let bonus_id = runtime
        .create_bonus(&wallet, "user-1", major(100_000))
        .await
        .unwrap();

    let mut hashes = Vec::new();
    for _ in 0..5 {
        hashes.push(runtime.distribute_bonus(&bonus_id).await.unwrap());
    }
    assert!(hashes.windows(2).all(|pair| pair[0] == pair[1]));

    assert_eq!(
        runtime.get_balance(&wallet, Denomination::USDTg).await.unwrap(),
        BonusTier::Gold.bonus_amount()
    );

    // exactly one journal entry from the bonus reserve
    let page = runtime.list_journal(&wallet, None, None).await.unwrap();
    let credits = page
        .entries
        .iter()
        .filter(|entry| entry.get_memo() == &Some("BONUS:Gold".to_string()))
        .count();
    assert_eq!(credits, 1);
}

// Invariant 6 under contention: concurrent distributions still credit
// exactly once and every caller observes the same hash
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn prop_concurrent_distribution_credits_once() {
    let runtime = Arc::new(test_runtime());
    let owner = address(b"owner");
    let wallet = active_wallet(&runtime, &owner).await;

    let bonus_id = runtime
        .create_bonus(&wallet, "user-1", major(500_000))
        .await
        .unwrap();

    let attempts: Vec<_> = (0..8)
        .map(|_| {
            let runtime = runtime.clone();
            let bonus_id = bonus_id.clone();
            tokio::spawn(async move { runtime.distribute_bonus(&bonus_id).await })
        })
        .collect();

    let hashes: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();
    assert!(hashes.windows(2).all(|pair| pair[0] == pair[1]));

    assert_eq!(
        runtime.get_balance(&wallet, Denomination::USDTg).await.unwrap(),
        BonusTier::Platinum.bonus_amount()
    );
}

// Invariant 7: one success per generated code, at most 3 failures
#[tokio::test]
async fn prop_recovery_verification_is_bounded() {
    let runtime = test_runtime();
    let owner = address(b"owner");
    let wallet = active_wallet(&runtime, &owner).await;

    let code = runtime
        .generate_recovery_code(&wallet, usdtg_common::recovery::RecoveryChannel::Email, "id".into())
        .await
        .unwrap();

    runtime.verify_recovery_code(&wallet, &code).await.unwrap();

    // the same code cannot verify a second time
    runtime.verify_recovery_code(&wallet, &code).await.unwrap_err();

    // a fresh code opens a fresh window
    let code = runtime
        .generate_recovery_code(&wallet, usdtg_common::recovery::RecoveryChannel::Email, "id".into())
        .await
        .unwrap();
    runtime.verify_recovery_code(&wallet, &code).await.unwrap();
}

// Invariant 8: the engine's tier selection matches a straight scan of
// the canonical table
#[test]
fn prop_tier_selection_matches_table() {
    let table = [
        (10_000u128, BonusTier::Bronze),
        (50_000, BonusTier::Silver),
        (100_000, BonusTier::Gold),
        (500_000, BonusTier::Platinum),
        (1_000_000, BonusTier::Diamond),
    ];

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..2_000 {
        let amount_major: u128 = rng.gen_range(0..2_000_000);
        let amount = amount_major * COIN_VALUE;

        let expected = table
            .iter()
            .rev()
            .find(|(threshold, _)| amount_major >= *threshold)
            .map(|(_, tier)| *tier);

        let estimate = compute_bonus(amount);
        assert_eq!(estimate.tier, expected, "amount {}", amount_major);
        if let Some(tier) = expected {
            assert_eq!(estimate.amount, tier.bonus_amount());
        } else {
            assert_eq!(estimate.amount, 0);
        }
    }
}

// Round-trip law: pagination yields the full per-address history in
// strictly decreasing sequence order, without duplicates
#[tokio::test]
async fn prop_journal_pagination_roundtrip() {
    let runtime = test_runtime();
    let a = address(b"pager");

    for i in 0..25u32 {
        runtime
            .airdrop(&a, Denomination::USDTg, major(1 + i as u128), "page")
            .await
            .unwrap();
    }

    let mut collected = Vec::new();
    let mut cursor = None;
    loop {
        let page = runtime.list_journal(&a, cursor, Some(4)).await.unwrap();
        collected.extend(page.entries);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    assert_eq!(collected.len(), 25);
    assert!(collected
        .windows(2)
        .all(|pair| pair[0].get_sequence() > pair[1].get_sequence()));
    assert!(collected.iter().all(|entry| entry.concerns(&a)));
}
