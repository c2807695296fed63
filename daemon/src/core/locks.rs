use std::sync::Arc;

use dashmap::DashMap;
use log::trace;
use tokio::sync::{Mutex, OwnedMutexGuard};
use usdtg_common::crypto::Address;

// Keyed logical lock table serializing mutations per address.
// Cross-address operations must acquire their guards through
// `lock_ordered`, which sorts lexicographically so two operations touching
// the same pair of addresses can never deadlock each other.
pub struct AddressLockTable {
    locks: DashMap<Address, Arc<Mutex<()>>>,
}

impl AddressLockTable {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn entry(&self, address: &Address) -> Arc<Mutex<()>> {
        self.locks
            .entry(address.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn lock(&self, address: &Address) -> OwnedMutexGuard<()> {
        trace!("locking {}", address);
        self.entry(address).lock_owned().await
    }

    // Acquire every distinct address in lexicographic order
    pub async fn lock_ordered(&self, addresses: &[&Address]) -> Vec<OwnedMutexGuard<()>> {
        let mut distinct: Vec<&Address> = addresses.to_vec();
        distinct.sort();
        distinct.dedup();

        let mut guards = Vec::with_capacity(distinct.len());
        for address in distinct {
            guards.push(self.lock(address).await);
        }

        guards
    }
}

impl Default for AddressLockTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usdtg_common::crypto::hash;

    #[tokio::test]
    async fn test_same_address_is_exclusive() {
        let table = Arc::new(AddressLockTable::new());
        let address = Address::from_hash(&hash(b"a"));

        let guard = table.lock(&address).await;
        let table2 = table.clone();
        let address2 = address.clone();
        let pending = tokio::spawn(async move {
            let _guard = table2.lock(&address2).await;
        });

        // the second locker cannot finish while the guard is held
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        drop(guard);
        pending.await.unwrap();
    }

    #[tokio::test]
    async fn test_lock_ordered_dedups() {
        let table = AddressLockTable::new();
        let a = Address::from_hash(&hash(b"a"));
        let b = Address::from_hash(&hash(b"b"));

        let guards = table.lock_ordered(&[&b, &a, &b]).await;
        assert_eq!(guards.len(), 2);
    }
}
