//! Resource services: typed endpoints plus the `{execute, get_key}` records
//! the cache and mutation hooks consume.

pub mod auth;
pub mod todo;
pub mod user;

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use url::form_urlencoded;

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Client-side id for new records: the current time in milliseconds, bumped
/// so that ids handed out by this process are strictly increasing.
pub fn next_client_id() -> String {
    let now = Utc::now().timestamp_millis();
    let previous = LAST_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        .unwrap_or_else(|last| last);
    now.max(previous + 1).to_string()
}

/// `{collection}/{id}` with the id escaped so it stays a single path segment.
pub(crate) fn item_path(collection: &str, id: &str) -> String {
    let segment: String = form_urlencoded::byte_serialize(id.as_bytes()).collect();
    // form encoding turns spaces into `+`, which a path would keep literally
    format!("{collection}/{}", segment.replace('+', "%20"))
}

/// Append a non-empty query string to `path`.
pub(crate) fn with_query(path: &str, query: String) -> String {
    if query.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{query}")
    }
}
