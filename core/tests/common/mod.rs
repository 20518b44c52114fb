//! Shared fixtures: a live mock server and transports that record traffic.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mock_server::{AuthConfig, Store};
use taskboard_core::{
    ApiClient, AuthStorage, HttpRequest, HttpResponse, MemoryStorage, ReqwestTransport, Transport,
    TransportError,
};

/// Start the mock server on an ephemeral port and return its base URL.
pub async fn spawn_server(store: Store) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
    tokio::spawn(mock_server::run_with(listener, store));
    format!("http://{addr}")
}

pub async fn spawn_default_server() -> String {
    spawn_server(Store::new(AuthConfig::default())).await
}

/// Forwards to an inner transport and records every request.
pub struct Recording {
    inner: Arc<dyn Transport>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl Recording {
    pub fn wrap(inner: Arc<dyn Transport>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.url.clone()).collect()
    }
}

#[async_trait]
impl Transport for Recording {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.inner.send(request).await
    }
}

/// Replies with a fixed response after an optional delay.
pub struct Canned {
    response: HttpResponse,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl Canned {
    pub fn new(response: HttpResponse) -> Arc<Self> {
        Self::delayed(response, Duration::ZERO)
    }

    pub fn delayed(response: HttpResponse, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            response,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for Canned {
    async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(self.response.clone())
    }
}

/// Client against `base_url` with a recording reqwest transport.
pub fn live_client(base_url: &str) -> (ApiClient, Arc<Recording>, Arc<MemoryStorage>) {
    let transport = Recording::wrap(Arc::new(ReqwestTransport::new(None).unwrap()));
    let storage = Arc::new(MemoryStorage::new());
    let client = ApiClient::new(base_url, transport.clone(), storage.clone());
    (client, transport, storage)
}

pub fn canned_client(transport: Arc<Canned>) -> (ApiClient, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::new());
    let client = ApiClient::new("http://api.test", transport, storage.clone());
    (client, storage)
}

pub fn storage_token(storage: &MemoryStorage) -> Option<String> {
    storage.get(taskboard_core::storage::AUTH_TOKEN_KEY)
}
