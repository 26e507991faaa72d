//! Keyed single-flight cache.
//!
//! A [`Repository`] memoises the result of an expensive async load per key.
//! Concurrent callers for the same uncached key share one in-flight load;
//! only successful loads are stored, so a failed or empty load leaves the
//! key absent and the next call tries again.

use grid_common::{GridError, NoDataExt};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

/// Outcome of one load attempt, shared by every caller that joined it.
type Slot<V> = Arc<OnceCell<Option<V>>>;

/// Repository statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositoryStats {
    /// Calls answered from a stored value
    pub hits: u64,
    /// Calls that started a new load
    pub misses: u64,
    /// Calls that attached to a load already in flight
    pub joins: u64,
    /// Loader invocations
    pub loads: u64,
    /// Loader invocations that produced no value
    pub failed_loads: u64,
    /// Stored values
    pub entries: usize,
}

impl RepositoryStats {
    /// Hit rate as a percentage of all lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.joins;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
    loads: AtomicU64,
    failed_loads: AtomicU64,
}

/// Single-flight memoising cache keyed by `K`.
///
/// Values are cloned out on every hit, so `V` is typically an `Arc` or a
/// small snapshot struct.
pub struct Repository<K, V> {
    name: &'static str,
    entries: Mutex<HashMap<K, Slot<V>>>,
    counters: Counters,
}

impl<K, V> Repository<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    /// Create an empty repository. `name` labels its log lines.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Return the stored value for `key`, or run `loader` to produce it.
    ///
    /// At most one loader runs per key at a time. Callers arriving while a
    /// load is in flight wait for it and receive its outcome. A `None`
    /// outcome is returned to every waiter but not stored.
    ///
    /// If the caller driving the load is cancelled, the next waiter runs its
    /// own loader in its place.
    pub async fn get_or_load<F, Fut>(&self, key: K, loader: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<V>>,
    {
        let slot = {
            let mut entries = self.entries.lock().await;
            match entries.get(&key).cloned() {
                Some(slot) => match slot.get() {
                    Some(Some(value)) => {
                        self.counters.hits.fetch_add(1, Ordering::Relaxed);
                        return Some(value.clone());
                    }
                    // Failed attempt not yet removed by its driver
                    Some(None) => self.start(&mut entries, &key),
                    None => {
                        self.counters.joins.fetch_add(1, Ordering::Relaxed);
                        debug!(repository = self.name, key = ?key, "Joining in-flight load");
                        Arc::clone(&slot)
                    }
                },
                None => self.start(&mut entries, &key),
            }
        };

        let outcome = slot
            .get_or_init(|| async {
                self.counters.loads.fetch_add(1, Ordering::Relaxed);
                let value = loader().await;
                if value.is_none() {
                    self.counters.failed_loads.fetch_add(1, Ordering::Relaxed);
                }
                value
            })
            .await
            .clone();

        if outcome.is_none() {
            let mut entries = self.entries.lock().await;
            if entries
                .get(&key)
                .is_some_and(|current| Arc::ptr_eq(current, &slot))
            {
                entries.remove(&key);
                debug!(repository = self.name, key = ?key, "Load produced no data, not cached");
            }
        }

        outcome
    }

    /// Like [`get_or_load`](Self::get_or_load) for a fallible loader.
    ///
    /// Errors are logged under the repository name and collapse to `None`.
    pub async fn get_or_try_load<F, Fut, E>(&self, key: K, loader: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Into<GridError>,
    {
        let name = self.name;
        self.get_or_load(key, || async move { loader().await.or_no_data(name) })
            .await
    }

    /// Stored value for `key` without loading.
    pub async fn peek(&self, key: &K) -> Option<V> {
        let entries = self.entries.lock().await;
        entries.get(key).and_then(|slot| slot.get().cloned().flatten())
    }

    /// Drop the stored value for `key`.
    ///
    /// A load in flight for `key` still completes for its callers, but its
    /// result is not stored. Returns whether anything was removed.
    pub async fn invalidate(&self, key: &K) -> bool {
        let removed = self.entries.lock().await.remove(key).is_some();
        if removed {
            debug!(repository = self.name, key = ?key, "Invalidated");
        }
        removed
    }

    /// Drop every stored value. Counters are kept.
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        let count = entries.len();
        entries.clear();
        debug!(repository = self.name, count, "Cleared");
    }

    /// Number of stored values.
    pub async fn len(&self) -> usize {
        let entries = self.entries.lock().await;
        entries
            .values()
            .filter(|slot| matches!(slot.get(), Some(Some(_))))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> RepositoryStats {
        RepositoryStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            joins: self.counters.joins.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            failed_loads: self.counters.failed_loads.load(Ordering::Relaxed),
            entries: self.len().await,
        }
    }

    fn start(&self, entries: &mut HashMap<K, Slot<V>>, key: &K) -> Slot<V> {
        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let slot: Slot<V> = Arc::new(OnceCell::new());
        entries.insert(key.clone(), Arc::clone(&slot));
        slot
    }
}

impl<K, V> Debug for Repository<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
