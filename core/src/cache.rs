//! Shared read cache with per-key request deduplication.
//!
//! # Design
//! Entries are keyed by `CacheKey` and hold type-erased data so one cache can
//! serve every resource. A revalidation is a `Shared` future whose body
//! writes the outcome into the entry before yielding it, so anyone awaiting
//! the result observes the updated entry. At most one revalidation per key is
//! in flight; later requests for the same key join it. The future is also
//! spawned onto the runtime so it completes even when every consumer has gone
//! away.
//!
//! Results are applied in settle order, so a slower request that finishes last
//! overwrites a faster one that finished first.

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

use crate::error::ApiError;
use crate::key::CacheKey;

pub(crate) type CachedValue = Arc<dyn Any + Send + Sync>;
pub(crate) type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<CachedValue, ApiError>> + Send + Sync>;

/// Outcome of one revalidation, tagged with its request id.
#[derive(Clone)]
pub(crate) struct Settled {
    pub id: u64,
    pub result: Result<CachedValue, ApiError>,
}

pub(crate) type Inflight = Shared<BoxFuture<'static, Settled>>;

/// Called once for every request that settles on a subscribed key.
pub(crate) type Listener = dyn Fn(&Settled) + Send + Sync;

#[derive(Default)]
struct CacheEntry {
    data: Option<CachedValue>,
    error: Option<ApiError>,
    inflight: Option<(u64, Inflight)>,
    fetcher: Option<Fetcher>,
    listeners: Vec<Weak<Listener>>,
    /// Invalidated while a request was in flight; fetch again once it settles.
    refetch_after_settle: bool,
}

/// Point-in-time view of an entry.
#[derive(Clone, Default)]
pub(crate) struct EntrySnapshot {
    pub data: Option<CachedValue>,
    pub error: Option<ApiError>,
    pub is_validating: bool,
}

#[derive(Default)]
struct Inner {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    next_request: AtomicU64,
}

/// Cache shared by every fetch and mutation handle created from it.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, CacheEntry>> {
        self.inner.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Install `fetcher` as the revalidator for `key`, creating the entry.
    pub(crate) fn register(&self, key: &CacheKey, fetcher: Fetcher) {
        let mut entries = self.entries();
        entries.entry(key.clone()).or_default().fetcher = Some(fetcher);
    }

    /// Notify `listener` of every settle on `key` for as long as it is alive.
    pub(crate) fn subscribe(&self, key: &CacheKey, listener: &Arc<Listener>) {
        let mut entries = self.entries();
        entries
            .entry(key.clone())
            .or_default()
            .listeners
            .push(Arc::downgrade(listener));
    }

    /// Start a revalidation for `key`, or join the one already in flight.
    ///
    /// Returns `None` when no fetcher is registered for the key.
    pub(crate) fn revalidate(&self, key: &CacheKey) -> Option<Inflight> {
        let mut entries = self.entries();
        let entry = entries.get_mut(key)?;

        if let Some((id, inflight)) = &entry.inflight {
            debug!(%key, request = id, "joining in-flight request");
            return Some(inflight.clone());
        }

        let fetcher = entry.fetcher.clone()?;
        let id = self.inner.next_request.fetch_add(1, Ordering::Relaxed) + 1;
        let cache = self.clone();
        let settle_key = key.clone();
        let inflight = async move {
            let result = fetcher().await;
            cache.settle(&settle_key, id, &result);
            Settled { id, result }
        }
        .boxed()
        .shared();

        entry.inflight = Some((id, inflight.clone()));
        drop(entries);

        debug!(%key, request = id, "revalidating");
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(inflight.clone().map(|_| ()));
        }
        Some(inflight)
    }

    fn settle(&self, key: &CacheKey, id: u64, result: &Result<CachedValue, ApiError>) {
        let settled = Settled {
            id,
            result: result.clone(),
        };
        let (listeners, refetch) = {
            let mut entries = self.entries();
            let Some(entry) = entries.get_mut(key) else {
                return;
            };
            match result {
                Ok(value) => {
                    entry.data = Some(value.clone());
                    entry.error = None;
                }
                Err(error) => entry.error = Some(error.clone()),
            }
            if entry.inflight.as_ref().is_some_and(|(current, _)| *current == id) {
                entry.inflight = None;
            }
            entry.listeners.retain(|l| l.strong_count() > 0);
            let listeners: Vec<Arc<Listener>> =
                entry.listeners.iter().filter_map(Weak::upgrade).collect();
            (listeners, std::mem::take(&mut entry.refetch_after_settle))
        };

        for listener in listeners {
            listener(&settled);
        }
        if refetch {
            debug!(%key, "refetching after invalidation during flight");
            self.revalidate(key);
        }
    }

    pub(crate) fn snapshot(&self, key: &CacheKey) -> EntrySnapshot {
        let entries = self.entries();
        entries
            .get(key)
            .map(|entry| EntrySnapshot {
                data: entry.data.clone(),
                error: entry.error.clone(),
                is_validating: entry.inflight.is_some(),
            })
            .unwrap_or_default()
    }

    pub(crate) fn inflight(&self, key: &CacheKey) -> Option<Inflight> {
        let entries = self.entries();
        entries
            .get(key)
            .and_then(|entry| entry.inflight.as_ref().map(|(_, f)| f.clone()))
    }

    /// Drop cached data for every entry `key` covers and revalidate the ones
    /// that have a registered fetcher. Does not wait for the refetch.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut restart = Vec::new();
        {
            let mut entries = self.entries();
            for (entry_key, entry) in entries.iter_mut().filter(|(k, _)| key.covers(k)) {
                entry.data = None;
                entry.error = None;
                if entry.fetcher.is_none() {
                    continue;
                }
                if entry.inflight.is_some() {
                    entry.refetch_after_settle = true;
                } else {
                    restart.push(entry_key.clone());
                }
            }
        }

        debug!(%key, restarted = restart.len(), "invalidated");
        for entry_key in restart {
            self.revalidate(&entry_key);
        }
    }

    pub fn invalidate_all(&self, keys: &[CacheKey]) {
        for key in keys {
            self.invalidate(key);
        }
    }

    /// Whether `key` currently holds data.
    pub fn has_data(&self, key: &CacheKey) -> bool {
        self.entries().get(key).is_some_and(|e| e.data.is_some())
    }

    pub fn keys(&self) -> Vec<CacheKey> {
        let mut keys: Vec<CacheKey> = self.entries().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Forget every entry. In-flight requests still complete but their
    /// results are discarded.
    pub fn clear(&self) {
        self.entries().clear();
    }
}
