//! Bounded in-memory cache of rendered artifacts.
//!
//! ## Single-flight production
//!
//! A miss registers a shared pending future under its key before the
//! producer runs; concurrent callers for the same key join that future
//! instead of starting their own. The producer runs in its own task, so a
//! caller that goes away (client disconnect, cancelled playback frame) never
//! cancels a render that other callers are waiting on. The task itself
//! clears the pending entry and stores a successful result under one lock
//! acquisition, so a key is always either pending, cached or absent.
//! Failures are handed to every joined caller and are not stored.
//!
//! ## Eviction and invalidation
//!
//! Capacity is an entry count. Inserting past capacity evicts the least
//! recently used entry. Invalidating a dataset drops its entries at once and
//! retires its id: productions for a retired dataset that finish later are
//! returned to their callers but never stored.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use viz_common::{Artifact, DatasetId, RenderError, RenderResult};

use crate::cache_key::CacheKey;

type Production = Shared<BoxFuture<'static, RenderResult<Artifact>>>;

/// How a lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from a stored entry.
    Hit,
    /// This caller started the production.
    Miss,
    /// Joined a production started by another caller.
    Coalesced,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
            CacheStatus::Coalesced => "COALESCED",
        }
    }
}

/// Result of [`RenderCache::get_or_compute`].
#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub artifact: Artifact,
    pub status: CacheStatus,
}

/// Cache statistics.
///
/// All fields are atomic for lock-free reads from metrics endpoints.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups served from a stored entry
    pub hits: AtomicU64,
    /// Lookups that started a production
    pub misses: AtomicU64,
    /// Lookups that joined an in-flight production
    pub coalesced: AtomicU64,
    /// Entries evicted by capacity
    pub evictions: AtomicU64,
    /// Entries dropped by dataset invalidation
    pub invalidated: AtomicU64,
    /// Productions that failed
    pub failures: AtomicU64,
    /// Current number of stored entries
    pub entry_count: AtomicU64,
}

impl CacheStats {
    /// Hit rate as a percentage (0-100). Coalesced joins count as hits.
    pub fn hit_rate(&self) -> f64 {
        let served = self.hits() + self.coalesced();
        let total = served + self.misses();
        if total == 0 {
            0.0
        } else {
            (served as f64 / total as f64) * 100.0
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn invalidated(&self) -> u64 {
        self.invalidated.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count.load(Ordering::Relaxed)
    }
}

struct CacheState {
    entries: LruCache<CacheKey, Artifact>,
    in_flight: HashMap<CacheKey, Production>,
    // Ids are never reused, so this only grows by one token per superseded load.
    retired: HashSet<DatasetId>,
}

impl CacheState {
    /// Store an artifact unless its dataset was retired. Returns whether the
    /// entry was stored.
    fn store(&mut self, key: CacheKey, artifact: Artifact, stats: &CacheStats, name: &str) -> bool {
        if self.retired.contains(&key.dataset()) {
            debug!(cache = name, key = %key, "Dropping artifact for retired dataset");
            return false;
        }

        if let Some((evicted, _)) = self.entries.push(key, artifact) {
            // `push` also hands back the old value when the key was present.
            if evicted != key {
                stats.evictions.fetch_add(1, Ordering::Relaxed);
                debug!(cache = name, evicted = %evicted, "Evicted least recently used entry");
            }
        }
        stats
            .entry_count
            .store(self.entries.len() as u64, Ordering::Relaxed);
        true
    }
}

/// Bounded LRU cache of rendered artifacts with single-flight production.
pub struct RenderCache {
    name: &'static str,
    capacity: NonZeroUsize,
    state: Arc<Mutex<CacheState>>,
    stats: Arc<CacheStats>,
}

impl RenderCache {
    /// Create a cache holding at most `capacity` artifacts (minimum 1).
    ///
    /// `name` labels log lines and metrics ("interactive", "export").
    ///
    /// # Example
    /// ```
    /// use render_cache::RenderCache;
    ///
    /// let cache = RenderCache::new("interactive", 32);
    /// assert_eq!(cache.capacity(), 32);
    /// ```
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            capacity,
            state: Arc::new(Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                in_flight: HashMap::new(),
                retired: HashSet::new(),
            })),
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> &Arc<CacheStats> {
        &self.stats
    }

    /// Return the cached artifact for `key`, or produce it exactly once
    /// across all concurrent callers.
    ///
    /// `producer` is only called on a miss. Its future runs on its own task
    /// and must not depend on the caller staying alive.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, producer: F) -> RenderResult<CacheLookup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RenderResult<Artifact>> + Send + 'static,
    {
        let mut state = self.state.lock().await;

        if let Some(artifact) = state.entries.get(&key) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(CacheLookup {
                artifact: artifact.clone(),
                status: CacheStatus::Hit,
            });
        }

        if let Some(pending) = state.in_flight.get(&key).cloned() {
            drop(state);
            self.stats.coalesced.fetch_add(1, Ordering::Relaxed);
            debug!(cache = self.name, key = %key, "Joining in-flight render");
            let artifact = pending.await?;
            return Ok(CacheLookup {
                artifact,
                status: CacheStatus::Coalesced,
            });
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, key = %key, "Starting render");

        let production = self.spawn_production(key, producer());
        state.in_flight.insert(key, production.clone());
        drop(state);

        let artifact = production.await?;
        Ok(CacheLookup {
            artifact,
            status: CacheStatus::Miss,
        })
    }

    fn spawn_production<Fut>(&self, key: CacheKey, work: Fut) -> Production
    where
        Fut: Future<Output = RenderResult<Artifact>> + Send + 'static,
    {
        let state = Arc::clone(&self.state);
        let stats = Arc::clone(&self.stats);
        let name = self.name;

        let task = tokio::spawn(async move {
            let result = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(RenderError::Internal("render producer panicked".to_string())),
            };

            let mut state = state.lock().await;
            state.in_flight.remove(&key);
            match &result {
                Ok(artifact) => {
                    state.store(key, artifact.clone(), &stats, name);
                }
                Err(e) => {
                    stats.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(cache = name, key = %key, error = %e, "Render failed; not caching");
                }
            }
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(RenderError::Internal(format!("render task aborted: {}", e)))
            })
        }
        .boxed()
        .shared()
    }

    /// Look up `key`, bumping its recency on a hit.
    pub async fn get(&self, key: &CacheKey) -> Option<Artifact> {
        let mut state = self.state.lock().await;
        match state.entries.get(key) {
            Some(artifact) => {
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(artifact.clone())
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Look up `key` without touching recency or statistics.
    pub async fn peek(&self, key: &CacheKey) -> Option<Artifact> {
        self.state.lock().await.entries.peek(key).cloned()
    }

    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.state.lock().await.entries.contains(key)
    }

    /// Store an artifact directly. Returns false when the key's dataset has
    /// been retired.
    pub async fn insert(&self, key: CacheKey, artifact: Artifact) -> bool {
        let mut state = self.state.lock().await;
        state.store(key, artifact, &self.stats, self.name)
    }

    /// Drop every entry rendered from `dataset` and retire it.
    ///
    /// Returns the number of entries removed.
    pub async fn invalidate_dataset(&self, dataset: DatasetId) -> usize {
        let mut state = self.state.lock().await;
        state.retired.insert(dataset);

        let stale: Vec<CacheKey> = state
            .entries
            .iter()
            .filter(|(key, _)| key.dataset() == dataset)
            .map(|(key, _)| *key)
            .collect();
        for key in &stale {
            state.entries.pop(key);
        }

        let pending = state
            .in_flight
            .keys()
            .filter(|key| key.dataset() == dataset)
            .count();

        self.stats
            .invalidated
            .fetch_add(stale.len() as u64, Ordering::Relaxed);
        self.stats
            .entry_count
            .store(state.entries.len() as u64, Ordering::Relaxed);

        info!(
            cache = self.name,
            dataset = %dataset,
            removed = stale.len(),
            pending,
            "Invalidated dataset"
        );
        stale.len()
    }

    /// Remove all stored entries. In-flight productions are unaffected.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let removed = state.entries.len();
        state.entries.clear();
        self.stats.entry_count.store(0, Ordering::Relaxed);
        info!(cache = self.name, removed, "Cleared render cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use test_utils::quokka_handle;
    use viz_common::DatasetHandle;
    use viz_protocol::{ParameterResolver, RawRenderRequest, RenderPurpose};

    fn key_for(handle: &DatasetHandle, dpi: u32) -> CacheKey {
        let dpi = dpi.to_string();
        let raw = RawRenderRequest::from_pairs([("dpi", dpi.as_str())]);
        let params = ParameterResolver::default()
            .resolve(&raw, handle.catalog(), RenderPurpose::Interactive)
            .unwrap();
        CacheKey::build(handle.identity(), &params)
    }

    fn artifact(body: &'static str) -> Artifact {
        Artifact::png(Bytes::from_static(body.as_bytes()))
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = RenderCache::new("test", 4);
        let handle = quokka_handle("plt00000");
        let key = key_for(&handle, 100);

        let first = cache
            .get_or_compute(key, || async { Ok(artifact("one")) })
            .await
            .unwrap();
        assert_eq!(first.status, CacheStatus::Miss);

        let second = cache
            .get_or_compute(key, || async { Ok(artifact("two")) })
            .await
            .unwrap();
        assert_eq!(second.status, CacheStatus::Hit);
        assert_eq!(second.artifact.data, Bytes::from_static(b"one"));

        assert_eq!(cache.stats().hits(), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(cache.stats().entry_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_misses_collapse() {
        let cache = Arc::new(RenderCache::new("test", 4));
        let handle = quokka_handle("plt00000");
        let key = key_for(&handle, 100);
        let runs = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..50 {
            let cache = Arc::clone(&cache);
            let runs = Arc::clone(&runs);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_compute(key, move || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(artifact("shared"))
                    })
                    .await
            }));
        }

        for task in tasks {
            let lookup = task.await.unwrap().unwrap();
            assert_eq!(lookup.artifact.data, Bytes::from_static(b"shared"));
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().misses(), 1);
        assert_eq!(
            cache.stats().hits() + cache.stats().coalesced(),
            49
        );
    }

    #[tokio::test]
    async fn test_failure_is_shared_but_not_cached() {
        let cache = RenderCache::new("test", 4);
        let handle = quokka_handle("plt00000");
        let key = key_for(&handle, 100);

        let err = cache
            .get_or_compute(key, || async {
                Err(RenderError::Internal("boom".to_string()))
            })
            .await
            .unwrap_err();
        assert_eq!(err, RenderError::Internal("boom".to_string()));
        assert!(!cache.contains(&key).await);
        assert_eq!(cache.stats().failures(), 1);

        let retry = cache
            .get_or_compute(key, || async { Ok(artifact("ok")) })
            .await
            .unwrap();
        assert_eq!(retry.status, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn test_panicking_producer_clears_pending_entry() {
        let cache = RenderCache::new("test", 4);
        let handle = quokka_handle("plt00000");
        let key = key_for(&handle, 100);

        let err = cache
            .get_or_compute(key, || async { panic!("producer bug") })
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::Internal(_)));

        let retry = cache
            .get_or_compute(key, || async { Ok(artifact("ok")) })
            .await
            .unwrap();
        assert_eq!(retry.status, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn test_lru_eviction_respects_recency() {
        let cache = RenderCache::new("test", 2);
        let handle = quokka_handle("plt00000");
        let (a, b, c) = (key_for(&handle, 100), key_for(&handle, 200), key_for(&handle, 300));

        cache.insert(a, artifact("a")).await;
        cache.insert(b, artifact("b")).await;
        // Touch `a` so that `b` is the least recently used.
        assert!(cache.get(&a).await.is_some());
        cache.insert(c, artifact("c")).await;

        assert!(cache.contains(&a).await);
        assert!(!cache.contains(&b).await);
        assert!(cache.contains(&c).await);
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[tokio::test]
    async fn test_peek_does_not_bump_recency() {
        let cache = RenderCache::new("test", 2);
        let handle = quokka_handle("plt00000");
        let (a, b, c) = (key_for(&handle, 100), key_for(&handle, 200), key_for(&handle, 300));

        cache.insert(a, artifact("a")).await;
        cache.insert(b, artifact("b")).await;
        assert!(cache.peek(&a).await.is_some());
        cache.insert(c, artifact("c")).await;

        assert!(!cache.contains(&a).await);
        assert_eq!(cache.stats().hits(), 0);
    }

    #[tokio::test]
    async fn test_reinsert_is_not_an_eviction() {
        let cache = RenderCache::new("test", 2);
        let handle = quokka_handle("plt00000");
        let a = key_for(&handle, 100);

        cache.insert(a, artifact("a")).await;
        cache.insert(a, artifact("a2")).await;
        assert_eq!(cache.stats().evictions(), 0);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_invalidate_dataset() {
        let cache = RenderCache::new("test", 8);
        let old = quokka_handle("plt00000");
        let new = quokka_handle("plt00000");

        cache.insert(key_for(&old, 100), artifact("a")).await;
        cache.insert(key_for(&old, 200), artifact("b")).await;
        cache.insert(key_for(&new, 100), artifact("c")).await;

        assert_eq!(cache.invalidate_dataset(old.id()).await, 2);
        assert_eq!(cache.len().await, 1);
        assert!(cache.contains(&key_for(&new, 100)).await);
        assert_eq!(cache.stats().invalidated(), 2);

        // Late results for a retired dataset are not stored.
        assert!(!cache.insert(key_for(&old, 300), artifact("late")).await);
    }

    #[tokio::test]
    async fn test_in_flight_render_for_retired_dataset_is_not_stored() {
        let cache = Arc::new(RenderCache::new("test", 8));
        let handle = quokka_handle("plt00000");
        let key = key_for(&handle, 100);
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let pending = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_compute(key, move || async move {
                        let _ = rx.await;
                        Ok(artifact("late"))
                    })
                    .await
            })
        };

        while cache.stats().misses() == 0 {
            tokio::task::yield_now().await;
        }
        cache.invalidate_dataset(handle.id()).await;
        let _ = tx.send(());

        let lookup = pending.await.unwrap().unwrap();
        assert_eq!(lookup.artifact.data, Bytes::from_static(b"late"));
        assert!(!cache.contains(&key).await);
    }

    #[tokio::test]
    async fn test_dropped_caller_does_not_cancel_production() {
        let cache = Arc::new(RenderCache::new("test", 8));
        let handle = quokka_handle("plt00000");
        let key = key_for(&handle, 100);

        let caller = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_compute(key, || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(artifact("done"))
                    })
                    .await
            })
        };
        while cache.stats().misses() == 0 {
            tokio::task::yield_now().await;
        }
        caller.abort();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(cache.contains(&key).await);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = RenderCache::new("test", 0);
        assert_eq!(cache.capacity(), 1);
        assert!(tokio_test::block_on(cache.is_empty()));
    }
}
