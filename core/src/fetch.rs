//! Read hook: subscribe a query to the shared cache.

use std::fmt;
use std::sync::Arc;

use futures::future::FutureExt;

use crate::cache::{CachedValue, Fetcher, Listener, QueryCache, Settled};
use crate::error::{ApiError, ErrorDetails};
use crate::key::CacheKey;
use crate::operation::QueryFn;

type Transform<R, T> = Arc<dyn Fn(&R) -> T + Send + Sync>;
type SuccessCallback<R> = Arc<dyn Fn(&R) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// What to fetch and how to present it.
pub struct FetchOptions<P, R, T = R> {
    api_fn: QueryFn<P, R>,
    params: P,
    should_fetch: bool,
    transform: Transform<R, T>,
    on_success: Option<SuccessCallback<R>>,
    on_error: Option<ErrorCallback>,
}

impl<P, R: Clone + 'static> FetchOptions<P, R, R> {
    pub fn new(api_fn: QueryFn<P, R>, params: P) -> Self {
        Self {
            api_fn,
            params,
            should_fetch: true,
            transform: Arc::new(|data: &R| data.clone()),
            on_success: None,
            on_error: None,
        }
    }
}

impl<P, R, T> FetchOptions<P, R, T> {
    /// When false the handle stays idle: no key, no request.
    pub fn should_fetch(mut self, should_fetch: bool) -> Self {
        self.should_fetch = should_fetch;
        self
    }

    pub fn transform<U, F>(self, transform: F) -> FetchOptions<P, R, U>
    where
        F: Fn(&R) -> U + Send + Sync + 'static,
    {
        FetchOptions {
            api_fn: self.api_fn,
            params: self.params,
            should_fetch: self.should_fetch,
            transform: Arc::new(transform),
            on_success: self.on_success,
            on_error: self.on_error,
        }
    }

    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: Fn(&R) + Send + Sync + 'static,
    {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ApiError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }
}

/// Everything a consumer renders from, read in one go.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchState<R, T = R> {
    pub data: Option<R>,
    pub transformed_data: Option<T>,
    pub is_loading: bool,
    pub is_validating: bool,
    pub error: Option<ErrorDetails>,
}

/// A consumer's view of one cache entry.
///
/// Reads always reflect the shared entry, so two handles on the same key see
/// the same data. Dropping the handle unsubscribes its callbacks; the cached
/// entry and any in-flight request are unaffected.
pub struct FetchHandle<R, T = R> {
    cache: QueryCache,
    key: Option<CacheKey>,
    transform: Transform<R, T>,
    _listener: Option<Arc<Listener>>,
}

impl QueryCache {
    pub fn use_fetch<P, R, T>(&self, options: FetchOptions<P, R, T>) -> FetchHandle<R, T>
    where
        P: Clone + Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
        T: 'static,
    {
        let FetchOptions {
            api_fn,
            params,
            should_fetch,
            transform,
            on_success,
            on_error,
        } = options;

        if !should_fetch {
            return FetchHandle {
                cache: self.clone(),
                key: None,
                transform,
                _listener: None,
            };
        }

        let key = api_fn.get_key(&params);
        let fetcher: Fetcher = Arc::new(move || {
            let request = api_fn.call(params.clone());
            async move { request.await.map(|data| Arc::new(data) as CachedValue) }.boxed()
        });
        self.register(&key, fetcher);

        let listener = (on_success.is_some() || on_error.is_some()).then(|| {
            let listener: Arc<Listener> = Arc::new(move |settled: &Settled| match &settled.result {
                Ok(data) => {
                    if let (Some(callback), Some(data)) = (&on_success, data.downcast_ref::<R>()) {
                        callback(data);
                    }
                }
                Err(error) => {
                    if let Some(callback) = &on_error {
                        callback(error);
                    }
                }
            });
            self.subscribe(&key, &listener);
            listener
        });

        self.revalidate(&key);
        FetchHandle {
            cache: self.clone(),
            key: Some(key),
            transform,
            _listener: listener,
        }
    }
}

impl<R, T> FetchHandle<R, T>
where
    R: Clone + Send + Sync + 'static,
{
    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    /// Raw cached value. `None` while loading, when idle, or when the entry
    /// holds a value of another type.
    pub fn data(&self) -> Option<R> {
        let key = self.key.as_ref()?;
        downcast(&self.cache.snapshot(key).data)
    }

    pub fn transformed_data(&self) -> Option<T> {
        self.data().map(|data| (self.transform)(&data))
    }

    /// In flight with nothing to show yet.
    pub fn is_loading(&self) -> bool {
        self.key.as_ref().is_some_and(|key| {
            let snapshot = self.cache.snapshot(key);
            snapshot.is_validating && snapshot.data.is_none()
        })
    }

    pub fn is_validating(&self) -> bool {
        self.key
            .as_ref()
            .is_some_and(|key| self.cache.snapshot(key).is_validating)
    }

    pub fn error(&self) -> Option<ErrorDetails> {
        let key = self.key.as_ref()?;
        self.cache.snapshot(key).error.as_ref().map(ErrorDetails::from)
    }

    pub fn state(&self) -> FetchState<R, T> {
        let Some(key) = &self.key else {
            return FetchState {
                data: None,
                transformed_data: None,
                is_loading: false,
                is_validating: false,
                error: None,
            };
        };
        let snapshot = self.cache.snapshot(key);
        let data: Option<R> = downcast(&snapshot.data);
        FetchState {
            transformed_data: data.as_ref().map(|d| (self.transform)(d)),
            is_loading: snapshot.is_validating && snapshot.data.is_none(),
            is_validating: snapshot.is_validating,
            error: snapshot.error.as_ref().map(ErrorDetails::from),
            data,
        }
    }

    /// Wait for the request currently in flight, if any.
    pub async fn settled(&self) {
        if let Some(inflight) = self.key.as_ref().and_then(|key| self.cache.inflight(key)) {
            inflight.await;
        }
    }

    /// Revalidate now and return the fresh value. Failures are recorded on the
    /// entry and yield `None`.
    ///
    /// A request already in flight may have started before the caller's last
    /// write, so it is awaited and a new one issued after it.
    pub async fn refetch(&self) -> Option<R> {
        let key = self.key.as_ref()?;
        if let Some(inflight) = self.cache.inflight(key) {
            inflight.await;
        }
        let settled = self.cache.revalidate(key)?.await;
        settled.result.ok().and_then(|data| data.downcast_ref::<R>().cloned())
    }
}

impl<R, T> fmt::Debug for FetchHandle<R, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FetchHandle").field("key", &self.key).finish_non_exhaustive()
    }
}

fn downcast<R: Clone + 'static>(data: &Option<CachedValue>) -> Option<R> {
    data.as_ref().and_then(|d| d.downcast_ref::<R>().cloned())
}
