//! Membership cache of script addresses the indexer keeps UTXOs for.
//!
//! A single coarse lock guards the set. Mutation is rare next to lookups and a
//! hash-set probe under the lock is cheap, so readers and writers share one
//! `parking_lot::Mutex`. Store I/O never happens while the lock is held.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::db::{AddressStore, StoreError};
use crate::models::Address;

#[derive(Default)]
struct Members {
    addresses: HashSet<String>,
    /// Set while a refresh is loading from the store.
    refreshing: bool,
    /// Addresses added while `refreshing`, merged into the reloaded set.
    added_during_refresh: Vec<String>,
}

impl Members {
    fn insert(&mut self, address: String) {
        if self.refreshing {
            self.added_during_refresh.push(address.clone());
        }
        self.addresses.insert(address);
    }
}

/// Marks the set as refreshing for as long as a reload is in flight. If the
/// refresh future is dropped before `finish`, the flag and journal are reset
/// so later adds are not journaled forever.
struct RefreshJournal<'a> {
    members: &'a Mutex<Members>,
    done: bool,
}

impl<'a> RefreshJournal<'a> {
    fn start(members: &'a Mutex<Members>) -> Self {
        let mut guard = members.lock();
        guard.refreshing = true;
        guard.added_during_refresh.clear();
        Self { members, done: false }
    }

    /// Stop journaling. The returned guard keeps the lock so the caller can
    /// swap the set before any other add lands.
    fn finish(mut self) -> (MutexGuard<'a, Members>, Vec<String>) {
        self.done = true;
        let members = self.members;
        let mut guard = members.lock();
        guard.refreshing = false;
        let added = std::mem::take(&mut guard.added_during_refresh);
        (guard, added)
    }
}

impl Drop for RefreshJournal<'_> {
    fn drop(&mut self) {
        if !self.done {
            let mut members = self.members.lock();
            members.refreshing = false;
            members.added_during_refresh.clear();
        }
    }
}

pub struct AddressCache {
    store: Arc<dyn AddressStore>,
    members: Mutex<Members>,
    /// Serializes refreshes against each other and against `publish`.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl AddressCache {
    /// Create an empty cache backed by `store`. Nothing is loaded until
    /// [`AddressCache::refresh`] is called; use [`AddressCache::load`] at startup.
    pub fn new(store: Arc<dyn AddressStore>) -> Self {
        Self {
            store,
            members: Mutex::new(Members::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Create the cache and populate it with every stored address.
    pub async fn load(store: Arc<dyn AddressStore>) -> Result<Self, StoreError> {
        let cache = Self::new(store);
        let count = cache.refresh().await?;
        info!("Address cache initialized with {} addresses", count);
        Ok(cache)
    }

    pub fn contains(&self, address: &str) -> bool {
        self.members.lock().addresses.contains(address)
    }

    pub fn add(&self, address: &str) {
        self.members.lock().insert(address.to_string());
    }

    pub fn add_all<I, S>(&self, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut members = self.members.lock();
        for address in addresses {
            members.insert(address.into());
        }
    }

    /// Register freshly derived address records.
    pub fn add_addresses(&self, addresses: &[Address]) {
        self.add_all(addresses.iter().map(|a| a.address.clone()));
    }

    /// Register derived addresses, then persist them through `store`.
    ///
    /// Holds the refresh lock across both steps: a refresh that read the
    /// store before `save` landed would otherwise swap in a set without these
    /// addresses.
    pub async fn publish(&self, addresses: &[Address], store: &dyn AddressStore) -> Result<(), StoreError> {
        let _guard = self.refresh_lock.lock().await;
        self.add_addresses(addresses);
        store.save(addresses).await
    }

    pub fn len(&self) -> usize {
        self.members.lock().addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the cached set with the store's current contents.
    ///
    /// The new set is swapped in under the lock in one step, so `contains`
    /// never observes a cleared or half-loaded set. Addresses added while the
    /// store is being read are kept. On error the current set is left as is.
    pub async fn refresh(&self) -> Result<usize, StoreError> {
        let _guard = self.refresh_lock.lock().await;

        let journal = RefreshJournal::start(&self.members);
        let loaded = self.store.find_all().await;
        let (mut members, added) = journal.finish();

        let stored = loaded?;
        let mut addresses: HashSet<String> = stored.into_iter().map(|a| a.address).collect();
        addresses.extend(added);

        let count = addresses.len();
        members.addresses = addresses;
        debug!("Address cache refreshed with {} addresses", count);

        Ok(count)
    }

    /// Periodically reload the cache until `shutdown` is cancelled. A failed
    /// reload keeps serving the previous set.
    pub fn spawn_refresh_task(
        self: Arc<Self>,
        period: Duration,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately and the cache was just loaded
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.refresh().await {
                            Ok(count) => info!("Refreshed address cache: {} addresses", count),
                            Err(e) => warn!("Address cache refresh failed, keeping stale set: {}", e),
                        }
                    }
                    _ = shutdown.cancelled() => {
                        info!("Stopping address cache refresh task");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::MemoryAddressStore;

    #[tokio::test]
    async fn test_dropped_refresh_stops_journaling() {
        let store = Arc::new(MemoryAddressStore::with_addresses(&["a"]));
        store.pause_reads();
        let cache = AddressCache::new(store.clone());

        let abandoned = tokio::time::timeout(Duration::from_millis(20), cache.refresh()).await;
        assert!(abandoned.is_err());

        {
            let members = cache.members.lock();
            assert!(!members.refreshing);
            assert!(members.added_during_refresh.is_empty());
        }

        cache.add("b");
        assert!(cache.members.lock().added_during_refresh.is_empty());
        assert!(cache.contains("b"));
        assert!(cache.refresh_lock.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_finished_refresh_merges_journal() {
        let store = Arc::new(MemoryAddressStore::with_addresses(&["a"]));
        let cache = AddressCache::new(store.clone());

        let journal = RefreshJournal::start(&cache.members);
        cache.add("b");
        let (members, added) = journal.finish();

        assert_eq!(added, vec!["b".to_string()]);
        assert!(!members.refreshing);
    }
}
