//! Cache keys.
//!
//! List keys are derived from filter parameters canonically: every non-empty
//! field rendered as `name:value`, sorted by name and joined with `|` after a
//! resource sentinel. Equivalent filter sets therefore always produce the same
//! key regardless of how they were assembled.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

pub const KEY_SEPARATOR: char = '|';

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    Single(String),
    /// Order-significant composite key.
    Composite(Vec<String>),
}

impl CacheKey {
    pub fn single(key: impl Into<String>) -> Self {
        CacheKey::Single(key.into())
    }

    pub fn composite<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CacheKey::Composite(parts.into_iter().map(Into::into).collect())
    }

    /// Whether invalidating `self` should also invalidate `other`.
    ///
    /// A key covers itself and every key that extends it: `todos-list`
    /// covers `todos-list|status:done`, and a composite covers any composite
    /// it is a prefix of.
    pub fn covers(&self, other: &CacheKey) -> bool {
        match (self, other) {
            (CacheKey::Single(a), CacheKey::Single(b)) => {
                a == b
                    || b.strip_prefix(a.as_str())
                        .is_some_and(|rest| rest.starts_with(KEY_SEPARATOR))
            }
            (CacheKey::Composite(a), CacheKey::Composite(b)) => b.starts_with(a),
            (CacheKey::Single(a), CacheKey::Composite(b)) => b.first() == Some(a),
            (CacheKey::Composite(_), CacheKey::Single(_)) => false,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Single(key) => f.write_str(key),
            CacheKey::Composite(parts) => write!(f, "[{}]", parts.join(", ")),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        CacheKey::Single(key.to_string())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        CacheKey::Single(key)
    }
}

/// Build a canonical list key from `sentinel` and the serialized form of
/// `params`. Null and empty-string fields are skipped.
pub fn list_key<P: Serialize>(sentinel: &str, params: &P) -> CacheKey {
    let Ok(Value::Object(fields)) = serde_json::to_value(params) else {
        return CacheKey::single(sentinel);
    };

    let mut parts: Vec<(String, String)> = fields
        .into_iter()
        .filter_map(|(name, value)| render(&value).map(|text| (name, text)))
        .collect();
    parts.sort_by(|a, b| a.0.cmp(&b.0));

    let mut key = sentinel.to_string();
    for (name, value) in parts {
        key.push(KEY_SEPARATOR);
        key.push_str(&name);
        key.push(':');
        key.push_str(&value);
    }
    CacheKey::Single(key)
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(render)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}
