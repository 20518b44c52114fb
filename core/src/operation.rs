//! Operation records: an async call paired with its cache key function.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::error::ApiError;
use crate::key::CacheKey;

type ExecuteFn<P, R> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<R, ApiError>> + Send + Sync>;

/// A read operation and the key its result is cached under.
pub struct QueryFn<P, R> {
    execute: ExecuteFn<P, R>,
    get_key: Arc<dyn Fn(&P) -> CacheKey + Send + Sync>,
}

impl<P: 'static, R: 'static> QueryFn<P, R> {
    pub fn new<F, Fut, K>(execute: F, get_key: K) -> Self
    where
        F: Fn(P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
        K: Fn(&P) -> CacheKey + Send + Sync + 'static,
    {
        Self {
            execute: Arc::new(move |params| execute(params).boxed()),
            get_key: Arc::new(get_key),
        }
    }

    pub fn call(&self, params: P) -> BoxFuture<'static, Result<R, ApiError>> {
        (self.execute)(params)
    }

    pub fn get_key(&self, params: &P) -> CacheKey {
        (self.get_key)(params)
    }
}

impl<P, R> Clone for QueryFn<P, R> {
    fn clone(&self) -> Self {
        Self {
            execute: self.execute.clone(),
            get_key: self.get_key.clone(),
        }
    }
}

/// A write operation and the cache keys its success makes stale.
pub struct MutationFn<I, R> {
    execute: ExecuteFn<I, R>,
    get_key: Arc<dyn Fn(&I) -> Vec<CacheKey> + Send + Sync>,
}

impl<I: 'static, R: 'static> MutationFn<I, R> {
    pub fn new<F, Fut, K>(execute: F, get_key: K) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ApiError>> + Send + 'static,
        K: Fn(&I) -> Vec<CacheKey> + Send + Sync + 'static,
    {
        Self {
            execute: Arc::new(move |input| execute(input).boxed()),
            get_key: Arc::new(get_key),
        }
    }

    pub fn call(&self, input: I) -> BoxFuture<'static, Result<R, ApiError>> {
        (self.execute)(input)
    }

    pub fn get_key(&self, input: &I) -> Vec<CacheKey> {
        (self.get_key)(input)
    }
}

impl<I, R> Clone for MutationFn<I, R> {
    fn clone(&self) -> Self {
        Self {
            execute: self.execute.clone(),
            get_key: self.get_key.clone(),
        }
    }
}
