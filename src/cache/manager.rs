//! Single-flight, TTL-bounded resource cache.
//!
//! One `ResourceCache` instance is the shared entry for one resource type:
//! however many consumers hold clones of it, there is at most one cached
//! snapshot and at most one fetch in flight. Concurrent `acquire` calls made
//! while a fetch is outstanding all join the same shared future and resolve
//! to the same snapshot; repeated calls inside the TTL window are served from
//! memory with no network traffic at all.
//!
//! The cache is an explicit value to construct and pass around, not module
//! state, so tests build isolated instances instead of resetting globals.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tracing::{debug, info, warn};

use super::fetch::FetchRecords;
use super::store::DiskStore;

/// Point-in-time view of a resource list.
///
/// `records` is the best list available: the latest successful fetch, even
/// when the fetch after it failed. A failed fetch only ever sets `error`;
/// it never discards previously-fetched records.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub records: Arc<Vec<T>>,
    pub fetched_at: DateTime<Utc>,
    pub error: Option<String>,
}

// Manual impl: cloning shares the records Arc, so T itself need not be Clone
impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            fetched_at: self.fetched_at,
            error: self.error.clone(),
        }
    }
}

impl<T> Snapshot<T> {
    fn success(records: Vec<T>) -> Self {
        Self {
            records: Arc::new(records),
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// Failure snapshot carrying forward the previous records, if any
    fn failure(prior: Option<&Snapshot<T>>, error: String) -> Self {
        Self {
            records: prior.map_or_else(|| Arc::new(Vec::new()), |p| Arc::clone(&p.records)),
            fetched_at: Utc::now(),
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew (negative age)
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// What subscribers observe: the current snapshot (if any) plus whether a
/// fetch is outstanding. Consumers that do not care about spinners simply
/// ignore `loading`.
#[derive(Debug)]
pub struct CacheView<T> {
    pub snapshot: Option<Snapshot<T>>,
    pub loading: bool,
}

impl<T> Clone for CacheView<T> {
    fn clone(&self) -> Self {
        Self {
            snapshot: self.snapshot.clone(),
            loading: self.loading,
        }
    }
}

/// Raised by whatever layer knows the app regained attention (tab became
/// visible, window focused). Coalesces: raising while a revalidation check
/// is pending does not queue extra work.
#[derive(Clone, Default)]
pub struct VisibilitySignal {
    notify: Arc<Notify>,
}

impl VisibilitySignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.notify.notify_one();
    }
}

/// Handle to a background revalidation task. Dropping it aborts the task,
/// so subscription teardown is tied to the handle's scope.
pub struct RevalidatorHandle {
    task: tokio::task::JoinHandle<()>,
}

impl Drop for RevalidatorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

type SharedFetch<T> = Shared<BoxFuture<'static, Snapshot<T>>>;

type PersistFn<T> = Arc<dyn Fn(&Snapshot<T>) + Send + Sync>;
type PurgeFn = Arc<dyn Fn() + Send + Sync>;

struct Inner<T> {
    entry: Option<Snapshot<T>>,
    in_flight: Option<SharedFetch<T>>,
    /// Bumped on `clear()`; a fetch that started under an older epoch may
    /// finish, but its result is discarded instead of written back.
    epoch: u64,
}

struct CacheShared<T> {
    name: &'static str,
    ttl: Duration,
    state: Mutex<Inner<T>>,
    fetcher: Arc<dyn FetchRecords<T>>,
    persist: Option<PersistFn<T>>,
    purge: Option<PurgeFn>,
    tx: watch::Sender<CacheView<T>>,
}

impl<T> CacheShared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.state.lock().expect("cache state lock poisoned")
    }

    fn publish(&self, inner: &Inner<T>) {
        self.tx.send_replace(CacheView {
            snapshot: inner.entry.clone(),
            loading: inner.in_flight.is_some(),
        });
    }
}

/// Shared cache for one remote resource list.
/// Clone is cheap - all clones share the same state via Arc.
pub struct ResourceCache<T> {
    shared: Arc<CacheShared<T>>,
}

impl<T> Clone for ResourceCache<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + Sync + 'static> ResourceCache<T> {
    pub fn new(name: &'static str, ttl_minutes: i64, fetcher: impl FetchRecords<T>) -> Self {
        Self::build(name, ttl_minutes, fetcher, None, None, None)
    }

    /// Durable variant: seeds the entry from the disk copy (TTL-checked on
    /// load), writes it back on every successful fetch, and removes it on
    /// `clear()`.
    pub fn with_store(
        name: &'static str,
        ttl_minutes: i64,
        fetcher: impl FetchRecords<T>,
        store: DiskStore,
    ) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        let seeded = store
            .load::<Vec<T>>(name, ttl_minutes)
            .map(|stored| Snapshot {
                records: Arc::new(stored.data),
                fetched_at: stored.cached_at,
                error: None,
            });
        if seeded.is_some() {
            debug!(resource = name, "Seeded cache from durable copy");
        }

        let persist_store = store.clone();
        let persist: PersistFn<T> = Arc::new(move |snapshot: &Snapshot<T>| {
            if let Err(e) = persist_store.save(name, &*snapshot.records) {
                debug!(resource = name, error = %e, "Failed to persist durable copy");
            }
        });
        let purge: PurgeFn = Arc::new(move || store.remove(name));

        Self::build(name, ttl_minutes, fetcher, seeded, Some(persist), Some(purge))
    }

    fn build(
        name: &'static str,
        ttl_minutes: i64,
        fetcher: impl FetchRecords<T>,
        entry: Option<Snapshot<T>>,
        persist: Option<PersistFn<T>>,
        purge: Option<PurgeFn>,
    ) -> Self {
        let (tx, _rx) = watch::channel(CacheView {
            snapshot: entry.clone(),
            loading: false,
        });
        Self {
            shared: Arc::new(CacheShared {
                name,
                ttl: Duration::minutes(ttl_minutes),
                state: Mutex::new(Inner {
                    entry,
                    in_flight: None,
                    epoch: 0,
                }),
                fetcher: Arc::new(fetcher),
                persist,
                purge,
                tx,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.name
    }

    /// Current snapshot without touching the network
    pub fn cached(&self) -> Option<Snapshot<T>> {
        self.shared.lock().entry.clone()
    }

    /// True when there is no entry or the entry has outlived its TTL
    pub fn is_stale(&self) -> bool {
        match &self.shared.lock().entry {
            Some(entry) => Utc::now() - entry.fetched_at >= self.shared.ttl,
            None => true,
        }
    }

    /// Observe the cache as it changes. Dropping the receiver detaches the
    /// observer; the cache itself keeps updating.
    pub fn subscribe(&self) -> watch::Receiver<CacheView<T>> {
        self.shared.tx.subscribe()
    }

    /// Resolve the current record list.
    ///
    /// Decision order: a fresh entry is returned as-is with no network call;
    /// an outstanding fetch is joined rather than duplicated; otherwise a new
    /// fetch starts. Fetch failures never surface as `Err` - every caller
    /// gets a snapshot, with the failure recorded in `Snapshot::error` and
    /// any previously-fetched records carried forward.
    pub async fn acquire(&self, force: bool) -> Snapshot<T> {
        let fetch = {
            let mut inner = self.shared.lock();

            if !force {
                if let Some(entry) = &inner.entry {
                    if Utc::now() - entry.fetched_at < self.shared.ttl {
                        debug!(resource = self.shared.name, "Cache hit");
                        return entry.clone();
                    }
                }
            }

            match &inner.in_flight {
                Some(fetch) => {
                    debug!(resource = self.shared.name, "Joining in-flight fetch");
                    fetch.clone()
                }
                None => {
                    debug!(resource = self.shared.name, force, "Starting fetch");
                    let fetch = Self::start_fetch(&self.shared, inner.epoch);
                    inner.in_flight = Some(fetch.clone());
                    self.shared.publish(&inner);
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Drop the cached entry, the in-flight marker, and the durable copy.
    /// The next `acquire` always fetches; a fetch currently in flight will
    /// complete for its awaiters but its result is not written back.
    pub fn clear(&self) {
        let mut inner = self.shared.lock();
        inner.entry = None;
        inner.in_flight = None;
        inner.epoch += 1;
        if let Some(purge) = &self.shared.purge {
            purge();
        }
        info!(resource = self.shared.name, "Cache cleared");
        self.shared.publish(&inner);
    }

    /// Spawn a task that re-fetches in the background whenever the signal is
    /// raised while the entry is missing or stale. Consumers already holding
    /// a snapshot keep rendering it; only `loading` subscribers notice.
    pub fn spawn_revalidator(&self, signal: VisibilitySignal) -> RevalidatorHandle {
        let cache = self.clone();
        let task = tokio::spawn(async move {
            loop {
                signal.notify.notified().await;
                if cache.is_stale() {
                    debug!(resource = cache.shared.name, "Revalidating on visibility");
                    let _ = cache.acquire(true).await;
                }
            }
        });
        RevalidatorHandle { task }
    }

    /// Spawn the fetch as its own task so it runs to completion and writes
    /// the shared entry even if every awaiter goes away mid-flight.
    fn start_fetch(shared: &Arc<CacheShared<T>>, epoch: u64) -> SharedFetch<T> {
        let task = tokio::spawn(Self::run_fetch(Arc::clone(shared), epoch));
        let recover = Arc::clone(shared);
        async move {
            match task.await {
                Ok(snapshot) => snapshot,
                // Task panicked before writing back; unwedge the in-flight
                // marker so the cache is not stuck in FETCHING.
                Err(e) => Self::settle_failure(&recover, epoch, format!("fetch task failed: {}", e)),
            }
        }
        .boxed()
        .shared()
    }

    async fn run_fetch(shared: Arc<CacheShared<T>>, epoch: u64) -> Snapshot<T> {
        let result = shared.fetcher.fetch().await;

        let mut inner = shared.lock();
        if inner.epoch != epoch {
            // Cleared while in flight: resolve the awaiters, leave state alone
            debug!(resource = shared.name, "Discarding fetch result from cleared epoch");
            return match result {
                Ok(records) => Snapshot::success(records),
                Err(e) => Snapshot::failure(None, e.to_string()),
            };
        }

        let snapshot = match result {
            Ok(records) => {
                info!(resource = shared.name, count = records.len(), "Fetch complete");
                let snapshot = Snapshot::success(records);
                if let Some(persist) = &shared.persist {
                    persist(&snapshot);
                }
                snapshot
            }
            Err(e) => {
                warn!(resource = shared.name, error = %e, "Fetch failed");
                Snapshot::failure(inner.entry.as_ref(), e.to_string())
            }
        };

        inner.entry = Some(snapshot.clone());
        inner.in_flight = None;
        shared.publish(&inner);
        snapshot
    }

    fn settle_failure(shared: &Arc<CacheShared<T>>, epoch: u64, error: String) -> Snapshot<T> {
        let mut inner = shared.lock();
        if inner.epoch != epoch {
            return Snapshot::failure(None, error);
        }
        let snapshot = Snapshot::failure(inner.entry.as_ref(), error);
        inner.entry = Some(snapshot.clone());
        inner.in_flight = None;
        shared.publish(&inner);
        snapshot
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::FetchError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    /// Fetcher returning a fixed list, counting calls
    fn counting_fetcher(
        calls: Arc<AtomicUsize>,
        records: Vec<String>,
    ) -> impl FetchRecords<String> {
        move || {
            let calls = Arc::clone(&calls);
            let records = records.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(records)
            }
        }
    }

    /// Fetcher that waits at a gate before resolving, counting calls
    fn gated_fetcher(
        calls: Arc<AtomicUsize>,
        gate: Arc<Notify>,
        records: Vec<String>,
    ) -> impl FetchRecords<String> {
        move || {
            let calls = Arc::clone(&calls);
            let gate = Arc::clone(&gate);
            let records = records.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Ok(records)
            }
        }
    }

    fn backdate(cache: &ResourceCache<String>, minutes: i64) {
        let mut inner = cache.shared.lock();
        let entry = inner.entry.as_mut().expect("entry to backdate");
        entry.fetched_at = Utc::now() - Duration::minutes(minutes);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_flight_coalesces_concurrent_acquires() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let cache = ResourceCache::new(
            "test",
            10,
            gated_fetcher(Arc::clone(&calls), Arc::clone(&gate), vec!["a".into()]),
        );

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.acquire(false).await }));
        }

        // Let all four consumers reach the in-flight fetch before releasing it
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        gate.notify_one();

        let mut snapshots = Vec::new();
        for handle in handles {
            snapshots.push(handle.await.expect("consumer task"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for snapshot in &snapshots {
            assert!(snapshot.is_ok());
            assert_eq!(*snapshot.records, vec!["a".to_string()]);
            // Same result object, not just equivalent data
            assert!(Arc::ptr_eq(&snapshot.records, &snapshots[0].records));
        }
    }

    #[tokio::test]
    async fn test_ttl_fresh_hit_makes_no_network_call() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ResourceCache::new("test", 10, counting_fetcher(Arc::clone(&calls), vec!["a".into()]));

        cache.acquire(false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Just inside the TTL window
        backdate(&cache, 9);
        let snapshot = cache.acquire(false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*snapshot.records, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_ttl_expired_entry_triggers_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ResourceCache::new("test", 10, counting_fetcher(Arc::clone(&calls), vec!["a".into()]));

        cache.acquire(false).await;
        backdate(&cache, 11);
        assert!(cache.is_stale());

        cache.acquire(false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_force_bypasses_fresh_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ResourceCache::new("test", 10, counting_fetcher(Arc::clone(&calls), vec!["a".into()]));

        cache.acquire(false).await;
        cache.acquire(true).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_records_preserved_on_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = {
            let calls = Arc::clone(&calls);
            move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Ok(vec!["a".to_string(), "b".to_string()])
                    } else {
                        Err(FetchError::RateLimited)
                    }
                }
            }
        };
        let cache = ResourceCache::new("test", 10, fetcher);

        let first = cache.acquire(false).await;
        assert!(first.is_ok());
        assert_eq!(first.records.len(), 2);

        let second = cache.acquire(true).await;
        assert!(!second.is_ok());
        assert_eq!(*second.records, *first.records);
        assert!(second.error.as_deref().unwrap().contains("Rate limited"));

        // The shared entry carries the same forward
        let cached = cache.cached().expect("entry");
        assert_eq!(cached.records.len(), 2);
        assert!(cached.error.is_some());
    }

    #[tokio::test]
    async fn test_error_with_no_prior_data_yields_empty_records() {
        let cache: ResourceCache<String> = ResourceCache::new("test", 10, || async {
            Err::<Vec<String>, _>(FetchError::RateLimited)
        });

        let snapshot = cache.acquire(false).await;
        assert!(snapshot.records.is_empty());
        assert!(snapshot.error.is_some());
    }

    #[tokio::test]
    async fn test_clear_then_refetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ResourceCache::new("test", 10, counting_fetcher(Arc::clone(&calls), vec!["a".into()]));

        cache.acquire(false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Entry is still fresh, but clear() must force the next fetch
        cache.clear();
        assert!(cache.cached().is_none());

        cache.acquire(false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_discards_result_of_in_flight_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let cache = ResourceCache::new(
            "test",
            10,
            gated_fetcher(Arc::clone(&calls), Arc::clone(&gate), vec!["a".into()]),
        );

        let consumer = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.acquire(false).await })
        };
        tokio::time::sleep(StdDuration::from_millis(10)).await;

        cache.clear();
        gate.notify_one();

        // The awaiter still resolves with the fetched data...
        let snapshot = consumer.await.expect("consumer task");
        assert_eq!(*snapshot.records, vec!["a".to_string()]);

        // ...but the cleared cache did not resurrect the entry
        tokio::time::sleep(StdDuration::from_millis(10)).await;
        assert!(cache.cached().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_subscriber_does_not_block_cache_write() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let cache = ResourceCache::new(
            "test",
            10,
            gated_fetcher(Arc::clone(&calls), Arc::clone(&gate), vec!["a".into()]),
        );

        let rx = cache.subscribe();
        let consumer = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.acquire(false).await })
        };
        tokio::time::sleep(StdDuration::from_millis(10)).await;

        // Consumer unmounts mid-fetch
        drop(rx);
        consumer.abort();

        gate.notify_one();
        tokio::time::sleep(StdDuration::from_millis(10)).await;

        // The shared write proceeded anyway
        let cached = cache.cached().expect("entry written after unmount");
        assert_eq!(*cached.records, vec!["a".to_string()]);
        assert!(cache.shared.lock().in_flight.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_observes_loading_transitions() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());
        let cache = ResourceCache::new(
            "test",
            10,
            gated_fetcher(Arc::clone(&calls), Arc::clone(&gate), vec!["a".into()]),
        );

        let mut rx = cache.subscribe();
        assert!(rx.borrow().snapshot.is_none());
        assert!(!rx.borrow().loading);

        let consumer = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.acquire(false).await })
        };

        rx.changed().await.expect("loading update");
        assert!(rx.borrow().loading);

        gate.notify_one();
        rx.changed().await.expect("ready update");
        {
            let view = rx.borrow();
            assert!(!view.loading);
            let snapshot = view.snapshot.as_ref().expect("snapshot");
            assert_eq!(*snapshot.records, vec!["a".to_string()]);
        }

        consumer.await.expect("consumer task");
    }

    #[tokio::test(start_paused = true)]
    async fn test_revalidator_fetches_only_when_stale() {
        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ResourceCache::new("test", 10, counting_fetcher(Arc::clone(&calls), vec!["a".into()]));
        let signal = VisibilitySignal::new();
        let handle = cache.spawn_revalidator(signal.clone());

        cache.acquire(false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Fresh entry: focus does nothing
        signal.raise();
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Stale entry: focus triggers a background fetch
        backdate(&cache, 11);
        signal.raise();
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Dropped handle unsubscribes
        drop(handle);
        backdate(&cache, 11);
        signal.raise();
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_with_store_persists_and_reseeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskStore::open(dir.path().to_path_buf()).expect("store");

        let calls = Arc::new(AtomicUsize::new(0));
        let cache = ResourceCache::with_store(
            "team",
            5,
            counting_fetcher(Arc::clone(&calls), vec!["ada".into()]),
            store.clone(),
        );
        cache.acquire(false).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // A second cache over the same store starts READY without fetching
        let reseeded: ResourceCache<String> = ResourceCache::with_store(
            "team",
            5,
            counting_fetcher(Arc::new(AtomicUsize::new(0)), vec![]),
            store.clone(),
        );
        let seeded = reseeded.cached().expect("seeded entry");
        assert_eq!(*seeded.records, vec!["ada".to_string()]);

        // clear() removes the durable copy too
        cache.clear();
        let empty: ResourceCache<String> = ResourceCache::with_store(
            "team",
            5,
            counting_fetcher(Arc::new(AtomicUsize::new(0)), vec![]),
            store,
        );
        assert!(empty.cached().is_none());
    }

    #[test]
    fn test_snapshot_age_display() {
        let fresh = Snapshot::success(vec![1]);
        assert_eq!(fresh.age_display(), "just now");

        let mut old = Snapshot::success(vec![1]);
        old.fetched_at = Utc::now() - Duration::minutes(5);
        assert_eq!(old.age_display(), "5m ago");

        old.fetched_at = Utc::now() - Duration::hours(3);
        assert_eq!(old.age_display(), "3h ago");

        old.fetched_at = Utc::now() - Duration::days(2);
        assert_eq!(old.age_display(), "2d ago");
    }
}
