//! Error types for the API client.
//!
//! # Design
//! `ApiError` is a closed taxonomy: every failure the pipeline can surface maps
//! to exactly one variant. Variants produced from an HTTP response keep the
//! response so callers can inspect the raw body. The type is `Clone` because a
//! single in-flight fetch hands its result to every consumer sharing it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::http::HttpResponse;
use crate::schema::ValidationIssue;

/// Failure raised by a `Transport` implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The request could not be sent or no response arrived.
    #[error("network request failed: {0}")]
    Unreachable(String),

    /// A response arrived but could not be read.
    #[error("failed to read response: {0}")]
    Body(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Network,
    Authentication,
    Validation,
    RequestValidation,
    ResponseValidation,
    NotFound,
    Unknown,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::RequestValidation => "REQUEST_VALIDATION_ERROR",
            ErrorKind::ResponseValidation => "RESPONSE_VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Unknown => "UNKNOWN_API_ERROR",
        }
    }
}

/// Errors returned by the request pipeline.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The transport could not reach the server.
    #[error("Network error occurred")]
    Network {
        #[source]
        source: TransportError,
    },

    /// The server answered 401 or 403.
    #[error("Authentication failed")]
    Authentication { status: u16, response: HttpResponse },

    /// The server answered 400; `errors` holds its structured field errors.
    #[error("Validation failed")]
    Validation {
        errors: Vec<Value>,
        response: HttpResponse,
    },

    /// The outbound payload failed its schema; nothing was sent.
    #[error("Request validation failed")]
    RequestValidation {
        endpoint: String,
        issues: Vec<ValidationIssue>,
        received: Value,
    },

    /// The inbound payload failed its schema.
    #[error("{message}")]
    ResponseValidation {
        endpoint: String,
        message: String,
        issues: Vec<ValidationIssue>,
        received: Value,
    },

    #[error("{message}")]
    NotFound {
        message: String,
        response: HttpResponse,
    },

    #[error("{message}")]
    Unknown {
        status: Option<u16>,
        message: String,
        response: Option<HttpResponse>,
    },
}

impl ApiError {
    pub fn unknown(message: impl Into<String>) -> Self {
        ApiError::Unknown {
            status: None,
            message: message.into(),
            response: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Network { .. } => ErrorKind::Network,
            ApiError::Authentication { .. } => ErrorKind::Authentication,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::RequestValidation { .. } => ErrorKind::RequestValidation,
            ApiError::ResponseValidation { .. } => ErrorKind::ResponseValidation,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind().code()
    }

    /// HTTP status associated with the error: 0 for network failures, -1 when
    /// no status applies.
    pub fn status(&self) -> i32 {
        match self {
            ApiError::Network { .. } => 0,
            ApiError::Authentication { status, .. } => i32::from(*status),
            ApiError::Validation { .. } | ApiError::RequestValidation { .. } => 400,
            ApiError::ResponseValidation { .. } => 500,
            ApiError::NotFound { .. } => 404,
            ApiError::Unknown { status, .. } => status.map(i32::from).unwrap_or(-1),
        }
    }

    /// The response that produced this error, if one was received.
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            ApiError::Authentication { response, .. }
            | ApiError::Validation { response, .. }
            | ApiError::NotFound { response, .. } => Some(response),
            ApiError::Unknown { response, .. } => response.as_ref(),
            _ => None,
        }
    }

    /// Schema issues for request/response validation failures.
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ApiError::RequestValidation { issues, .. }
            | ApiError::ResponseValidation { issues, .. } => issues,
            _ => &[],
        }
    }
}

impl From<TransportError> for ApiError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Unreachable(_) => ApiError::Network { source: error },
            TransportError::Body(message) => ApiError::unknown(message),
        }
    }
}

/// Error shape exposed by the read cache: a numeric code and display message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: i32,
    pub message: String,
}

pub(crate) const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

impl From<&ApiError> for ErrorDetails {
    fn from(error: &ApiError) -> Self {
        let status = error.status();
        let message = error.to_string();
        Self {
            code: if status > 0 { status } else { -1 },
            message: if message.is_empty() {
                DEFAULT_ERROR_MESSAGE.to_string()
            } else {
                message
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn unreachable_transport_is_network() {
        let err = ApiError::from(TransportError::Unreachable("connection refused".into()));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(err.status(), 0);
        assert!(err.source().is_some());
    }

    #[test]
    fn body_failure_is_unknown_with_message() {
        let err = ApiError::from(TransportError::Body("stream closed".into()));
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.to_string(), "stream closed");
        assert_eq!(err.status(), -1);
    }

    #[test]
    fn details_use_status_when_present() {
        let err = ApiError::NotFound {
            message: "Resource not found".into(),
            response: HttpResponse::new(404, "{}"),
        };
        let details = ErrorDetails::from(&err);
        assert_eq!(details.code, 404);
        assert_eq!(details.message, "Resource not found");
    }

    #[test]
    fn details_default_code_and_message() {
        let network = ApiError::from(TransportError::Unreachable("down".into()));
        assert_eq!(ErrorDetails::from(&network).code, -1);

        let blank = ApiError::unknown("");
        let details = ErrorDetails::from(&blank);
        assert_eq!(details.code, -1);
        assert_eq!(details.message, DEFAULT_ERROR_MESSAGE);
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::RequestValidation.code(), "REQUEST_VALIDATION_ERROR");
        assert_eq!(
            serde_json::to_value(ErrorKind::NotFound).unwrap(),
            serde_json::json!("NOT_FOUND")
        );
    }
}
