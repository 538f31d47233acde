//! Key-value memoization of asynchronous fetch results
//!
//! Entries have no TTL and no size bound; they live until invalidated or
//! until the owning store is dropped. Values are stored type-erased and read
//! back with the type they were written with.

use crate::stats::{CacheStatistics, StatsCounters};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

type CachedValue = Arc<dyn Any + Send + Sync>;
type LoadGate = Arc<AsyncMutex<()>>;

/// In-memory cache of loaded values, cheap to clone and share
#[derive(Clone, Default)]
pub struct CacheStore {
    inner: Arc<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    entries: RwLock<HashMap<String, CachedValue>>,
    /// One gate per key with a load in progress
    load_gates: Mutex<HashMap<String, LoadGate>>,
    stats: StatsCounters,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff a value is currently stored for `key`
    pub fn has(&self, key: &str) -> bool {
        self.inner.entries.read().contains_key(key)
    }

    /// Read a cached value without ever triggering a load.
    ///
    /// Returns `None` when the key is absent or was stored with another type.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        let value = self.inner.entries.read().get(key).cloned();
        match value.map(|v| v.downcast::<T>()) {
            Some(Ok(typed)) => {
                self.inner.stats.record_hit();
                Some(typed)
            }
            Some(Err(_)) => {
                debug!(key = %key, "cache entry has a different type");
                self.inner.stats.record_miss();
                None
            }
            None => {
                self.inner.stats.record_miss();
                None
            }
        }
    }

    /// Insert or overwrite the value stored under `key`
    pub fn set<T>(&self, key: impl Into<String>, value: T)
    where
        T: Any + Send + Sync,
    {
        self.set_shared(key, Arc::new(value));
    }

    /// Insert an already shared value
    pub fn set_shared<T>(&self, key: impl Into<String>, value: Arc<T>)
    where
        T: Any + Send + Sync,
    {
        let key = key.into();
        debug!(key = %key, "cache write");
        self.inner.entries.write().insert(key, value);
        self.inner.stats.record_write();
    }

    /// Remove one entry; returns whether anything was removed
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.inner.entries.write().remove(key).is_some();
        if removed {
            debug!(key = %key, "cache entry invalidated");
            self.inner.stats.record_removals(1);
        }
        removed
    }

    /// Remove every entry
    pub fn invalidate_all(&self) {
        let removed = {
            let mut entries = self.inner.entries.write();
            let count = entries.len();
            entries.clear();
            count
        };
        debug!(removed, "cache cleared");
        self.inner.stats.record_removals(removed as u64);
    }

    /// Load `key` with `loader` unless a value is already present.
    ///
    /// The loader runs at most once per call. A value is stored only when
    /// the loader yields `Ok(Some(_))`; errors and empty results are logged
    /// and leave the store unchanged, so the next call tries again.
    ///
    /// Concurrent calls for the same key are serialized: a caller that had
    /// to wait re-checks presence and skips its own loader when the earlier
    /// load stored a value.
    pub async fn ensure_loaded<T, F, Fut, E>(&self, key: &str, loader: F)
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Display,
    {
        if self.has(key) {
            debug!(key = %key, "cache hit, skipping load");
            return;
        }

        let gate = self.load_gate(key);
        {
            let _guard = gate.lock().await;

            if self.has(key) {
                debug!(key = %key, "loaded by a concurrent caller");
            } else {
                self.run_loader(key, loader).await;
            }
        }
        self.release_load_gate(key, gate);
    }

    async fn run_loader<T, F, Fut, E>(&self, key: &str, loader: F)
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<T>, E>>,
        E: Display,
    {
        debug!(key = %key, "cache miss, loading");
        match loader().await {
            Ok(Some(value)) => {
                self.set(key, value);
                self.inner.stats.record_load();
            }
            Ok(None) => {
                warn!(key = %key, "loader returned no data, leaving cache unchanged");
                self.inner.stats.record_failed_load();
            }
            Err(e) => {
                warn!(key = %key, error = %e, "cache load failed");
                self.inner.stats.record_failed_load();
            }
        }
    }

    fn load_gate(&self, key: &str) -> LoadGate {
        let mut gates = self.inner.load_gates.lock();
        Arc::clone(gates.entry(key.to_string()).or_default())
    }

    fn release_load_gate(&self, key: &str, gate: LoadGate) {
        let mut gates = self.inner.load_gates.lock();
        // Clones are only handed out under this lock, so the count is stable:
        // the map's copy plus ours means nobody else is waiting.
        if Arc::strong_count(&gate) == 2
            && gates.get(key).is_some_and(|current| Arc::ptr_eq(current, &gate))
        {
            gates.remove(key);
        }
    }

    /// Snapshot of the stored keys, in no particular order
    pub fn keys(&self) -> Vec<String> {
        self.inner.entries.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.read().is_empty()
    }

    pub fn statistics(&self) -> CacheStatistics {
        self.inner.stats.snapshot()
    }

    #[cfg(test)]
    fn pending_gates(&self) -> usize {
        self.inner.load_gates.lock().len()
    }
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_loader(
        calls: &Arc<AtomicUsize>,
        result: Result<Option<Vec<&'static str>>, String>,
    ) -> impl FnOnce() -> std::future::Ready<Result<Option<Vec<&'static str>>, String>> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(result)
        }
    }

    #[test]
    fn test_set_then_get() {
        let cache = CacheStore::new();
        cache.set("profile_42", String::from("Ada"));

        assert!(cache.has("profile_42"));
        assert_eq!(cache.get::<String>("profile_42").as_deref(), Some(&"Ada".to_string()));
        assert!(cache.get::<String>("profile_43").is_none());
    }

    #[test]
    fn test_get_with_wrong_type_is_absent() {
        let cache = CacheStore::new();
        cache.set("templates", vec![1_u32, 2, 3]);

        assert!(cache.get::<String>("templates").is_none());
        assert_eq!(cache.get::<Vec<u32>>("templates").unwrap().len(), 3);

        let stats = cache.statistics();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_invalidate() {
        let cache = CacheStore::new();
        cache.set("a", 1_u8);
        cache.set("b", 2_u8);

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert!(!cache.has("a"));
        assert!(cache.has("b"));
        assert_eq!(cache.statistics().removals, 1);
    }

    #[tokio::test]
    async fn test_ensure_loaded_runs_loader_once() {
        let cache = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .ensure_loaded("templates", counting_loader(&calls, Ok(Some(vec!["nda"]))))
            .await;
        cache
            .ensure_loaded("templates", counting_loader(&calls, Ok(Some(vec!["other"]))))
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let templates = cache.get::<Vec<&'static str>>("templates").unwrap();
        assert_eq!(*templates, vec!["nda"]);
        assert_eq!(cache.statistics().loads, 1);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_cache_unchanged_and_retries() {
        let cache = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .ensure_loaded("templates", counting_loader(&calls, Err("503".into())))
            .await;
        assert!(!cache.has("templates"));

        cache
            .ensure_loaded("templates", counting_loader(&calls, Ok(None)))
            .await;
        assert!(!cache.has("templates"));

        cache
            .ensure_loaded("templates", counting_loader(&calls, Ok(Some(vec!["nda"]))))
            .await;
        assert!(cache.has("templates"));

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(cache.statistics().failed_loads, 2);
        assert_eq!(cache.pending_gates(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_loads_share_one_fetch() {
        let cache = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let slow_loader = |calls: Arc<AtomicUsize>| {
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, String>(Some(7_u64))
            }
        };

        tokio::join!(
            cache.ensure_loaded("profile_1", slow_loader(Arc::clone(&calls))),
            cache.ensure_loaded("profile_1", slow_loader(Arc::clone(&calls))),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*cache.get::<u64>("profile_1").unwrap(), 7);
        assert_eq!(cache.pending_gates(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_retries_after_concurrent_failure() {
        let cache = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err::<Option<u64>, _>("timeout")
            }
        };
        let second = {
            let calls = Arc::clone(&calls);
            move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(Some(9_u64))
            }
        };

        tokio::join!(
            cache.ensure_loaded("recent_documents_1", first),
            cache.ensure_loaded("recent_documents_1", second),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(*cache.get::<u64>("recent_documents_1").unwrap(), 9);
    }

    proptest! {
        #[test]
        fn prop_set_makes_value_readable(key in "[a-z_0-9]{1,16}", value in any::<i64>()) {
            let cache = CacheStore::new();
            cache.set(key.clone(), value);
            prop_assert!(cache.has(&key));
            prop_assert_eq!(cache.get::<i64>(&key).map(|v| *v), Some(value));
        }

        #[test]
        fn prop_invalidate_all_clears_every_key(keys in proptest::collection::vec("[a-z]{1,8}", 0..32)) {
            let cache = CacheStore::new();
            for key in &keys {
                cache.set(key.clone(), key.len());
            }
            cache.invalidate_all();
            for key in &keys {
                prop_assert!(!cache.has(key));
            }
            prop_assert!(cache.is_empty());
        }
    }
}
