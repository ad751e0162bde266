//! `QueryCache`: in-memory keyed read-through cache with invalidation
//! notifications.

use std::collections::HashMap;
use std::future::Future;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{CacheKey, CacheStore, KeySet};

/// Freshness of a cached value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Served only by `peek`; the next `fetch` goes to the server.
    Stale,
}

/// Notification sent to subscribers on every `invalidate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    pub keys: KeySet,
}

impl Invalidation {
    /// Whether a view showing `key` should refetch.
    pub fn affects(&self, key: &CacheKey) -> bool {
        self.keys.iter().any(|pattern| pattern.matches(key))
    }
}

struct Entry {
    value: Value,
    freshness: Freshness,
    fetched_at: Instant,
}

#[derive(Default)]
struct State {
    entries: HashMap<CacheKey, Entry>,
    /// Bumped on every invalidation.
    generation: u64,
    /// Pattern → generation of its latest invalidation.
    invalidated_at: HashMap<CacheKey, u64>,
    /// Generation of the latest `clear`.
    cleared_at: u64,
}

impl State {
    fn invalidated_since(&self, key: &CacheKey, generation: u64) -> bool {
        self.invalidated_at
            .iter()
            .any(|(pattern, at)| *at > generation && pattern.matches(key))
    }
}

/// In-memory read-through cache.
///
/// Values are stored as JSON so any serde type can be cached under any key.
pub struct QueryCache {
    state: RwLock<State>,
    max_age: Option<Duration>,
    notify: broadcast::Sender<Invalidation>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    /// Cache whose entries stay fresh until invalidated.
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(64);
        Self {
            state: RwLock::new(State::default()),
            max_age: None,
            notify,
        }
    }

    /// Cache whose entries additionally go stale after `max_age`.
    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
            ..Self::new()
        }
    }

    /// Read `key`, running `fetcher` if there is no fresh value.
    ///
    /// An invalidation that lands while `fetcher` is in flight leaves the
    /// stored result stale, so the next read fetches again. A `clear` that
    /// lands in flight discards the result entirely: it belongs to the
    /// session that was just dropped.
    pub async fn fetch<T, E, F, Fut>(&self, key: &CacheKey, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        E: From<serde_json::Error>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started_at = {
            let state = self.state.read();
            if let Some(entry) = state.entries.get(key) {
                if self.is_fresh(entry) {
                    match serde_json::from_value::<T>(entry.value.clone()) {
                        Ok(value) => return Ok(value),
                        Err(e) => tracing::debug!("Cached {} has a different shape, refetching: {}", key, e),
                    }
                }
            }
            state.generation
        };

        let value = fetcher().await?;
        let json = serde_json::to_value(&value)?;

        let mut state = self.state.write();
        if state.cleared_at > started_at {
            tracing::debug!("Cache cleared during fetch of {}, discarding result", key);
            return Ok(value);
        }
        let freshness = if state.invalidated_since(key, started_at) {
            tracing::debug!("{} invalidated during fetch, storing as stale", key);
            Freshness::Stale
        } else {
            Freshness::Fresh
        };
        state.entries.insert(
            key.clone(),
            Entry {
                value: json,
                freshness,
                fetched_at: Instant::now(),
            },
        );
        Ok(value)
    }

    /// Seed or overwrite a value as fresh.
    pub fn set<T: Serialize>(&self, key: CacheKey, value: &T) -> Result<(), serde_json::Error> {
        let json = serde_json::to_value(value)?;
        self.state.write().entries.insert(
            key,
            Entry {
                value: json,
                freshness: Freshness::Fresh,
                fetched_at: Instant::now(),
            },
        );
        Ok(())
    }

    /// Current value and freshness, without fetching.
    pub fn peek(&self, key: &CacheKey) -> Option<(Value, Freshness)> {
        let state = self.state.read();
        state.entries.get(key).map(|entry| {
            let freshness = if self.is_fresh(entry) {
                Freshness::Fresh
            } else {
                Freshness::Stale
            };
            (entry.value.clone(), freshness)
        })
    }

    pub fn freshness(&self, key: &CacheKey) -> Option<Freshness> {
        self.peek(key).map(|(_, freshness)| freshness)
    }

    pub fn remove(&self, key: &CacheKey) {
        self.state.write().entries.remove(key);
    }

    /// Drop every entry (e.g. on logout). Fetches already in flight store
    /// nothing when they complete.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.generation += 1;
        state.cleared_at = state.generation;
        state.entries.clear();
        state.invalidated_at.clear();
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to invalidation notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Invalidation> {
        self.notify.subscribe()
    }

    fn is_fresh(&self, entry: &Entry) -> bool {
        entry.freshness == Freshness::Fresh
            && self
                .max_age
                .map_or(true, |max_age| entry.fetched_at.elapsed() < max_age)
    }
}

impl CacheStore for QueryCache {
    fn invalidate(&self, keys: &KeySet) {
        if keys.is_empty() {
            return;
        }
        let marked = {
            let mut state = self.state.write();
            state.generation += 1;
            let generation = state.generation;
            for pattern in keys {
                state.invalidated_at.insert(pattern.clone(), generation);
            }
            let mut marked = 0usize;
            for (key, entry) in state.entries.iter_mut() {
                if keys.iter().any(|pattern| pattern.matches(key)) {
                    entry.freshness = Freshness::Stale;
                    marked += 1;
                }
            }
            marked
        };
        tracing::debug!(
            keys = ?keys.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            marked,
            "Invalidated cache keys"
        );
        let _ = self.notify.send(Invalidation { keys: keys.clone() });
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("max_age", &self.max_age)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn key_set(resources: &[&str]) -> KeySet {
        resources.iter().map(|r| CacheKey::new(*r)).collect()
    }

    async fn fetch_counting(cache: &QueryCache, key: &CacheKey, calls: &AtomicU32) -> u32 {
        cache
            .fetch(key, || async {
                Ok::<_, serde_json::Error>(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_is_read_through() {
        let cache = QueryCache::new();
        let key = CacheKey::new(keys::HOLDINGS);
        let calls = AtomicU32::new(0);

        assert_eq!(fetch_counting(&cache, &key, &calls).await, 1);
        assert_eq!(fetch_counting(&cache, &key, &calls).await, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_triggers_refetch() {
        let cache = QueryCache::new();
        let key = CacheKey::new(keys::TRADES).with("status", "ACTIVE");
        let calls = AtomicU32::new(0);

        fetch_counting(&cache, &key, &calls).await;
        cache.invalidate(&key_set(&[keys::TRADES]));
        assert_eq!(cache.freshness(&key), Some(Freshness::Stale));

        assert_eq!(fetch_counting(&cache, &key, &calls).await, 2);
        assert_eq!(cache.freshness(&key), Some(Freshness::Fresh));
    }

    #[test]
    fn test_double_invalidate_is_idempotent() {
        let cache = QueryCache::new();
        let trades = CacheKey::new(keys::TRADES);
        cache.set(trades.clone(), &vec![1, 2, 3]).unwrap();

        cache.invalidate(&key_set(&[keys::TRADES]));
        let once = cache.peek(&trades);
        cache.invalidate(&key_set(&[keys::TRADES]));
        let twice = cache.peek(&trades);

        assert_eq!(once, twice);
        assert_eq!(twice.unwrap().1, Freshness::Stale);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_leaves_other_keys_fresh() {
        let cache = QueryCache::new();
        cache.set(CacheKey::new(keys::SIGNALS), &1).unwrap();
        cache.set(CacheKey::new(keys::TRADES), &2).unwrap();

        cache.invalidate(&keys::signal_generated());

        assert_eq!(cache.freshness(&CacheKey::new(keys::SIGNALS)), Some(Freshness::Stale));
        assert_eq!(cache.freshness(&CacheKey::new(keys::TRADES)), Some(Freshness::Fresh));
    }

    #[tokio::test]
    async fn test_invalidation_during_fetch_stores_stale() {
        let cache = QueryCache::new();
        let key = CacheKey::new(keys::METRICS);

        let value: u32 = cache
            .fetch(&key, || async {
                cache.invalidate(&key_set(&[keys::METRICS]));
                Ok::<_, serde_json::Error>(7)
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(cache.freshness(&key), Some(Freshness::Stale));
    }

    #[tokio::test]
    async fn test_clear_during_fetch_discards_result() {
        let cache = QueryCache::new();
        let key = CacheKey::new(keys::HOLDINGS);

        let value: u32 = cache
            .fetch(&key, || async {
                cache.clear();
                Ok::<_, serde_json::Error>(111)
            })
            .await
            .unwrap();

        assert_eq!(value, 111);
        assert!(cache.peek(&key).is_none());

        // Fetches started after the clear are stored normally.
        let calls = AtomicU32::new(0);
        fetch_counting(&cache, &key, &calls).await;
        assert_eq!(cache.freshness(&key), Some(Freshness::Fresh));
    }

    #[test]
    fn test_fetch_error_stores_nothing() {
        let cache = QueryCache::new();
        let key = CacheKey::new(keys::ANALYTICS);
        let result: Result<u32, crate::error::SyncError> = tokio_test::block_on(
            cache.fetch(&key, || async { Err(crate::error::SyncError::Other("boom".into())) }),
        );
        assert!(result.is_err());
        assert!(cache.peek(&key).is_none());
    }

    #[test]
    fn test_subscribers_are_notified() {
        let cache = QueryCache::new();
        let mut rx = cache.subscribe();
        cache.invalidate(&keys::trade_change());

        let note = rx.try_recv().unwrap();
        assert!(note.affects(&CacheKey::new(keys::TRADES).with("page", 3)));
        assert!(!note.affects(&CacheKey::new(keys::SIGNALS)));
    }

    #[test]
    fn test_empty_invalidation_is_silent() {
        let cache = QueryCache::new();
        let mut rx = cache.subscribe();
        cache.invalidate(&KeySet::new());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_max_age_expires_entries() {
        let cache = QueryCache::with_max_age(Duration::from_millis(0));
        let key = CacheKey::new(keys::HOLDINGS);
        let calls = AtomicU32::new(0);

        fetch_counting(&cache, &key, &calls).await;
        fetch_counting(&cache, &key, &calls).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
