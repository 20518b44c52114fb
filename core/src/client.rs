//! The request pipeline.
//!
//! # Design
//! `ApiClient` holds the base URL, a `Transport` and the auth storage port.
//! Each call is split the same way for every method: `build_request`
//! validates and transforms the outbound payload and produces an
//! `HttpRequest`, the transport performs the round-trip, and
//! `parse_response` maps the `HttpResponse` to a value or an `ApiError`.
//! Failures are never retried.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::request::ApiRequest;
use crate::schema::ValidationIssue;
use crate::storage::{AuthStorage, AUTH_TOKEN_KEY};
use crate::transport::{ReqwestTransport, Transport};

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    storage: Arc<dyn AuthStorage>,
}

impl ApiClient {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, storage: Arc<dyn AuthStorage>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            storage,
        }
    }

    /// Client backed by `reqwest`, configured from `config`.
    pub fn from_config(config: &ClientConfig, storage: Arc<dyn AuthStorage>) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(config.timeout())?;
        Ok(Self::new(&config.base_url, Arc::new(transport), storage))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn storage(&self) -> &Arc<dyn AuthStorage> {
        &self.storage
    }

    pub fn resolve_url(&self, url: &str) -> String {
        if url.contains("://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{url}", self.base_url)
        } else {
            format!("{}/{url}", self.base_url)
        }
    }

    /// Validate, transform and serialize `request` into an `HttpRequest`.
    pub fn build_request(&self, method: HttpMethod, request: &ApiRequest) -> Result<HttpRequest, ApiError> {
        let payload = request.payload.as_ref().filter(|p| !p.is_null());

        let validated = match (payload, &request.request_schema) {
            (Some(payload), Some(schema)) => Some(schema.validate(payload).map_err(|issues| {
                ApiError::RequestValidation {
                    endpoint: request.url.clone(),
                    issues,
                    received: payload.clone(),
                }
            })?),
            (payload, _) => payload.cloned(),
        };

        let outbound = match (validated, &request.request_transformer) {
            (Some(value), Some(transform)) => Some(transform(value)),
            (value, _) => value,
        };

        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = self.storage.get(AUTH_TOKEN_KEY).filter(|t| !t.is_empty()) {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        for (key, value) in &request.options.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(key));
            headers.push((key.clone(), value.clone()));
        }

        let body = match outbound {
            Some(value) if method != HttpMethod::Get && !value.is_null() => Some(value.to_string()),
            _ => None,
        };

        Ok(HttpRequest {
            method,
            url: self.resolve_url(&request.url),
            headers,
            body,
        })
    }

    /// Interpret a response for `request`.
    pub fn parse_response(&self, request: &ApiRequest, response: HttpResponse) -> Result<Value, ApiError> {
        if !response.is_success() {
            return Err(map_status(response));
        }

        let data = if response.is_json() && !response.body.trim().is_empty() {
            serde_json::from_str::<Value>(&response.body).map_err(|e| ApiError::Unknown {
                status: Some(response.status),
                message: e.to_string(),
                response: Some(response.clone()),
            })?
        } else {
            Value::Object(Map::new())
        };

        let validated = match &request.response_schema {
            Some(schema) => schema.validate(&data).map_err(|issues| {
                let message = response_issue_message(&issues);
                ApiError::ResponseValidation {
                    endpoint: request.url.clone(),
                    message,
                    issues,
                    received: data.clone(),
                }
            })?,
            None => data.clone(),
        };

        Ok(match &request.response_transformer {
            Some(transform) => transform(data),
            None => validated,
        })
    }

    pub async fn execute(&self, method: HttpMethod, request: ApiRequest) -> Result<Value, ApiError> {
        let http_request = self.build_request(method, &request)?;
        debug!(%method, url = %http_request.url, "sending request");

        let response = self.transport.send(http_request).await.map_err(ApiError::from)?;
        self.parse_response(&request, response).inspect_err(|e| {
            warn!(%method, url = %request.url, code = e.code(), status = e.status(), "request failed: {e}");
        })
    }

    /// `execute`, then deserialize the result into `T`.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        let endpoint = request.url.clone();
        let value = self.execute(method, request).await?;
        serde_json::from_value(value.clone()).map_err(|e| ApiError::ResponseValidation {
            endpoint,
            message: format!("Invalid data. {e}"),
            issues: vec![ValidationIssue::new(&[], e.to_string())],
            received: value,
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.execute_as(HttpMethod::Get, request).await
    }

    pub async fn post<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.execute_as(HttpMethod::Post, request).await
    }

    pub async fn put<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.execute_as(HttpMethod::Put, request).await
    }

    pub async fn patch<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.execute_as(HttpMethod::Patch, request).await
    }

    pub async fn delete(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(HttpMethod::Delete, request).await.map(|_| ())
    }
}

/// Map a non-2xx response to the matching `ApiError` variant.
fn map_status(response: HttpResponse) -> ApiError {
    let body: Value = serde_json::from_str(&response.body)
        .unwrap_or_else(|_| json!({ "message": response.body }));
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    match response.status {
        400 => {
            let errors = match body.get("errors").and_then(Value::as_array) {
                Some(errors) => errors.clone(),
                None => message.map(Value::String).into_iter().collect(),
            };
            ApiError::Validation { errors, response }
        }
        401 | 403 => ApiError::Authentication {
            status: response.status,
            response,
        },
        404 => ApiError::NotFound {
            message: message.unwrap_or_else(|| "Resource not found".to_string()),
            response,
        },
        status => ApiError::Unknown {
            status: Some(status),
            message: message.unwrap_or_else(|| format!("HTTP error! status: {status}")),
            response: Some(response),
        },
    }
}

fn response_issue_message(issues: &[ValidationIssue]) -> String {
    match issues.first() {
        Some(issue) if issue.path.is_empty() => format!("Invalid data. {}", issue.message),
        Some(issue) => format!("Invalid data in {}. {}", issue.path_display(), issue.message),
        None => "Response validation failed".to_string(),
    }
}
