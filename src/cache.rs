//! Keyed query cache
//!
//! Each key owns a `watch` channel carrying its latest [`QuerySnapshot`], so
//! pages can read a snapshot synchronously while long-lived streams subscribe
//! to changes. Fetches for the same key are serialized: a caller that waited
//! behind another fetch reuses its result instead of issuing a second request.

use crate::error::{MosqueTimesError, Result};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error};

/// State of one cached query
#[derive(Debug)]
pub struct QuerySnapshot<T> {
    /// Last successfully fetched value, kept when a later refetch fails
    pub data: Option<Arc<T>>,
    /// Message of the most recent failed fetch, cleared on success
    pub error: Option<String>,
    pub is_loading: bool,
    pub updated_at: Option<Instant>,
}

impl<T> Default for QuerySnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            updated_at: None,
        }
    }
}

impl<T> Clone for QuerySnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.is_loading,
            updated_at: self.updated_at,
        }
    }
}

impl<T> QuerySnapshot<T> {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        self.data.is_some()
            && self
                .updated_at
                .is_some_and(|updated| updated.elapsed() < stale_time)
    }
}

struct CacheEntry<T> {
    state: watch::Sender<QuerySnapshot<T>>,
    fetch_lock: tokio::sync::Mutex<()>,
    last_access: Mutex<Instant>,
}

impl<T> CacheEntry<T> {
    fn new() -> Self {
        let (state, _) = watch::channel(QuerySnapshot::default());
        Self {
            state,
            fetch_lock: tokio::sync::Mutex::new(()),
            last_access: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        if let Ok(mut last_access) = self.last_access.lock() {
            *last_access = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_access
            .lock()
            .map(|last_access| last_access.elapsed())
            .unwrap_or_default()
    }
}

/// Cache of fetched values keyed by request identity
pub struct QueryCache<T> {
    name: &'static str,
    entries: RwLock<HashMap<String, Arc<CacheEntry<T>>>>,
    stale_time: Duration,
    gc_time: Duration,
}

impl<T> QueryCache<T> {
    #[must_use]
    pub fn new(name: &'static str, stale_time: Duration, gc_time: Duration) -> Self {
        Self {
            name,
            entries: RwLock::new(HashMap::new()),
            stale_time,
            gc_time,
        }
    }

    /// Current state for `key`; unknown keys report an empty snapshot
    #[must_use]
    pub fn snapshot(&self, key: &str) -> QuerySnapshot<T> {
        self.existing(key)
            .map(|entry| entry.state.borrow().clone())
            .unwrap_or_default()
    }

    /// Receiver that observes every state change of `key`
    ///
    /// # Errors
    ///
    /// Returns an error if the cache lock is poisoned
    pub fn subscribe(&self, key: &str) -> Result<watch::Receiver<QuerySnapshot<T>>> {
        let entry = self.entry(key)?;
        entry.touch();
        Ok(entry.state.subscribe())
    }

    /// Returns the cached value while fresh, otherwise runs `fetcher`
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error; the previous value stays cached
    pub async fn fetch<F, Fut>(&self, key: &str, fetcher: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(key, false, fetcher).await
    }

    /// Runs `fetcher` even when the cached value is still fresh
    ///
    /// # Errors
    ///
    /// Returns the fetcher's error; the previous value stays cached
    pub async fn refetch<F, Fut>(&self, key: &str, fetcher: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run(key, true, fetcher).await
    }

    async fn run<F, Fut>(&self, key: &str, force: bool, fetcher: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let entry = self.entry(key)?;
        entry.touch();

        if !force {
            if let Some(data) = fresh_data(&entry, self.stale_time) {
                debug!("{} cache hit for {key}", self.name);
                return Ok(data);
            }
        }

        let requested_at = Instant::now();
        let _in_flight = entry.fetch_lock.lock().await;

        // Another caller may have completed a fetch while this one waited.
        {
            let current = entry.state.borrow();
            let finished_meanwhile = current
                .updated_at
                .is_some_and(|updated| updated >= requested_at);
            if finished_meanwhile || (!force && current.is_fresh(self.stale_time)) {
                if let Some(data) = current.data.clone() {
                    return Ok(data);
                }
            }
        }

        debug!("{} cache fetching {key}", self.name);
        entry.state.send_modify(|state| state.is_loading = true);

        match fetcher().await {
            Ok(value) => {
                let data = Arc::new(value);
                entry.state.send_modify(|state| {
                    state.data = Some(data.clone());
                    state.error = None;
                    state.is_loading = false;
                    state.updated_at = Some(Instant::now());
                });
                Ok(data)
            }
            Err(e) => {
                error!("{} fetch for {key} failed: {e}", self.name);
                let message = e.to_string();
                entry.state.send_modify(|state| {
                    state.error = Some(message);
                    state.is_loading = false;
                });
                Err(e)
            }
        }
    }

    /// Marks `key` stale so the next [`fetch`](Self::fetch) goes to the network
    pub fn invalidate(&self, key: &str) {
        if let Some(entry) = self.existing(key) {
            entry.state.send_modify(|state| state.updated_at = None);
        }
    }

    /// Drops entries idle for longer than the GC window that nobody watches
    ///
    /// An entry still held by a caller of [`fetch`](Self::fetch) or
    /// [`refetch`](Self::refetch) is kept, even before that caller has taken
    /// the fetch lock. Returns the number of evicted entries.
    pub fn collect_garbage(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            error!("Failed to acquire {} cache write lock", self.name);
            return 0;
        };

        let before = entries.len();
        entries.retain(|key, entry| {
            // the map holds one reference; any other belongs to a caller
            let keep = Arc::strong_count(entry) > 1
                || entry.state.receiver_count() > 0
                || entry.idle_for() < self.gc_time;
            if !keep {
                debug!("Evicting {key} from {} cache", self.name);
            }
            keep
        });
        before - entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn existing(&self, key: &str) -> Option<Arc<CacheEntry<T>>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn entry(&self, key: &str) -> Result<Arc<CacheEntry<T>>> {
        if let Some(entry) = self.existing(key) {
            return Ok(entry);
        }

        let mut entries = self.entries.write().map_err(|_| {
            MosqueTimesError::from(format!("Failed to acquire {} cache write lock", self.name))
        })?;
        Ok(entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(CacheEntry::new()))
            .clone())
    }
}

fn fresh_data<T>(entry: &CacheEntry<T>, stale_time: Duration) -> Option<Arc<T>> {
    let state = entry.state.borrow();
    if state.is_fresh(stale_time) {
        state.data.clone()
    } else {
        None
    }
}
