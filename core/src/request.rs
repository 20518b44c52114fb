//! Request descriptors consumed by `ApiClient::execute`.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::schema::Schema;

/// Value-to-value rewrite applied to a payload or a response body.
pub type Transformer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Per-call transport overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Extra headers; these replace pipeline defaults with the same name.
    pub headers: Vec<(String, String)>,
}

/// Everything the pipeline needs to perform one call.
#[derive(Clone, Default)]
pub struct ApiRequest {
    pub url: String,
    pub payload: Option<Value>,
    pub request_schema: Option<Schema>,
    pub response_schema: Option<Schema>,
    pub request_transformer: Option<Transformer>,
    pub response_transformer: Option<Transformer>,
    pub options: RequestOptions,
}

impl ApiRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Serialize a typed payload into the descriptor.
    pub fn json<T: Serialize>(self, payload: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(payload)
            .map_err(|e| ApiError::unknown(format!("failed to serialize payload: {e}")))?;
        Ok(self.payload(value))
    }

    pub fn request_schema(mut self, schema: Schema) -> Self {
        self.request_schema = Some(schema);
        self
    }

    pub fn response_schema(mut self, schema: Schema) -> Self {
        self.response_schema = Some(schema);
        self
    }

    pub fn request_transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.request_transformer = Some(Arc::new(f));
        self
    }

    pub fn response_transformer<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.response_transformer = Some(Arc::new(f));
        self
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.options.headers.push((key.to_string(), value.to_string()));
        self
    }
}

impl fmt::Debug for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiRequest")
            .field("url", &self.url)
            .field("payload", &self.payload)
            .field("request_schema", &self.request_schema.is_some())
            .field("response_schema", &self.response_schema.is_some())
            .field("request_transformer", &self.request_transformer.is_some())
            .field("response_transformer", &self.response_transformer.is_some())
            .field("options", &self.options)
            .finish()
    }
}
