//! Write hook: run a mutation, track its state and invalidate what it touched.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::cache::QueryCache;
use crate::error::{ApiError, DEFAULT_ERROR_MESSAGE};
use crate::key::CacheKey;
use crate::operation::MutationFn;

type SuccessCallback<R> = Arc<dyn Fn(&R) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

pub struct MutateOptions<I, R> {
    mutation: MutationFn<I, R>,
    invalidate_keys: Option<Vec<CacheKey>>,
    on_success: Option<SuccessCallback<R>>,
    on_error: Option<ErrorCallback>,
}

impl<I, R> MutateOptions<I, R> {
    pub fn new(mutation: MutationFn<I, R>) -> Self {
        Self {
            mutation,
            invalidate_keys: None,
            on_success: None,
            on_error: None,
        }
    }

    /// Keys to invalidate on success instead of the mutation's own. An empty
    /// list invalidates nothing.
    pub fn invalidate_keys(mut self, keys: Vec<CacheKey>) -> Self {
        self.invalidate_keys = Some(keys);
        self
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

#[derive(Debug, Clone, PartialEq)]
pub struct MutationState<R> {
    pub is_loading: bool,
    pub error: Option<String>,
    pub data: Option<R>,
}

impl<R> Default for MutationState<R> {
    fn default() -> Self {
        Self {
            is_loading: false,
            error: None,
            data: None,
        }
    }
}

/// Handle returned by [`QueryCache::use_mutate`]. Clones share state.
pub struct Mutation<I, R> {
    cache: QueryCache,
    mutation: MutationFn<I, R>,
    invalidate_keys: Option<Vec<CacheKey>>,
    on_success: Option<SuccessCallback<R>>,
    on_error: Option<ErrorCallback>,
    state: Arc<Mutex<MutationState<R>>>,
}

impl QueryCache {
    pub fn use_mutate<I, R>(&self, options: MutateOptions<I, R>) -> Mutation<I, R> {
        Mutation {
            cache: self.clone(),
            mutation: options.mutation,
            invalidate_keys: options.invalidate_keys,
            on_success: options.on_success,
            on_error: options.on_error,
            state: Arc::new(Mutex::new(MutationState::default())),
        }
    }
}

impl<I, R> Mutation<I, R>
where
    I: 'static,
    R: Clone + Send + 'static,
{
    /// Run the mutation with `input`.
    ///
    /// `is_loading` is set and the previous error cleared before this
    /// returns. The future never fails: the outcome lands in `data` or
    /// `error` and the matching callback runs.
    pub fn save(&self, input: I) -> impl Future<Output = ()> + Send + 'static {
        {
            let mut state = lock(&self.state);
            state.is_loading = true;
            state.error = None;
        }

        let keys = self
            .invalidate_keys
            .clone()
            .unwrap_or_else(|| self.mutation.get_key(&input));
        let request = self.mutation.call(input);
        let cache = self.cache.clone();
        let state = self.state.clone();
        let on_success = self.on_success.clone();
        let on_error = self.on_error.clone();

        async move {
            match request.await {
                Ok(data) => {
                    {
                        let mut state = lock(&state);
                        state.data = Some(data.clone());
                        state.is_loading = false;
                    }
                    debug!(keys = keys.len(), "mutation succeeded, invalidating");
                    cache.invalidate_all(&keys);
                    if let Some(callback) = on_success {
                        callback(&data);
                    }
                }
                Err(error) => {
                    let message = error.to_string();
                    {
                        let mut state = lock(&state);
                        state.error = Some(if message.is_empty() {
                            DEFAULT_ERROR_MESSAGE.to_string()
                        } else {
                            message
                        });
                        state.is_loading = false;
                    }
                    if let Some(callback) = on_error {
                        callback(&error);
                    }
                }
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).is_loading
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    pub fn data(&self) -> Option<R> {
        lock(&self.state).data.clone()
    }

    pub fn state(&self) -> MutationState<R> {
        lock(&self.state).clone()
    }
}

impl<I, R> Clone for Mutation<I, R> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            mutation: self.mutation.clone(),
            invalidate_keys: self.invalidate_keys.clone(),
            on_success: self.on_success.clone(),
            on_error: self.on_error.clone(),
            state: self.state.clone(),
        }
    }
}

impl<I, R> fmt::Debug for Mutation<I, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutation")
            .field("invalidate_keys", &self.invalidate_keys)
            .finish_non_exhaustive()
    }
}

fn lock<R>(state: &Mutex<MutationState<R>>) -> MutexGuard<'_, MutationState<R>> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}
