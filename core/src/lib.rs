//! Client core for the task board API.
//!
//! # Overview
//! A request pipeline (`ApiClient`) that validates payloads against schemas,
//! applies transformers and maps every failure to an `ApiError`; a shared
//! read cache (`QueryCache::use_fetch`) with per-key request deduplication and
//! stale-while-revalidate reads; a mutation layer (`QueryCache::use_mutate`)
//! that invalidates cache keys on success; and typed services for the todo,
//! user and auth resources.
//!
//! # Design
//! - Requests are described by `ApiRequest` and split into `build_request`
//!   and `parse_response`, so the I/O boundary is the `Transport` trait.
//!   `ReqwestTransport` is the production implementation.
//! - Operations are plain records `{execute, get_key}` (`QueryFn`,
//!   `MutationFn`) so cache keys are derived from the same parameters the
//!   request is built from.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod key;
pub mod mutate;
pub mod operation;
pub mod request;
pub mod resources;
pub mod schema;
pub mod storage;
pub mod transport;
pub mod types;
pub mod validators;

pub use cache::QueryCache;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use error::{ApiError, ErrorDetails, ErrorKind, TransportError};
pub use fetch::{FetchHandle, FetchOptions, FetchState};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use key::{list_key, CacheKey};
pub use mutate::{MutateOptions, Mutation, MutationState};
pub use operation::{MutationFn, QueryFn};
pub use request::{ApiRequest, RequestOptions, Transformer};
pub use resources::auth::{AuthService, LoginError, StoredAuthData};
pub use resources::todo::TodoService;
pub use resources::user::UserService;
pub use schema::{Schema, ValidationIssue};
pub use storage::{AuthStorage, FileStorage, MemoryStorage, StorageError};
pub use transport::{ReqwestTransport, Transport};
pub use types::*;
