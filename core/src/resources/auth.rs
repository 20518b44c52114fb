//! Mock authentication against the backend's `/auth` resource.
//!
//! The backend exposes its single accepted credential pair in plaintext and
//! the client compares locally, then stores a fixed token. This is a
//! development stand-in and provides no security.

use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::key::CacheKey;
use crate::operation::QueryFn;
use crate::request::ApiRequest;
use crate::schema::ValidationIssue;
use crate::storage::{StorageError, AUTH_TOKEN_KEY, USER_DATA_KEY};
use crate::types::{AuthConfig, AuthCredentials, AuthUser};
use crate::validators::{auth_response_schema, login_form_schema};

pub const MOCK_TOKEN: &str = "mock-jwt-token";
const AUTH_PATH: &str = "/auth";

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("{}", .0.first().map(|i| i.message.as_str()).unwrap_or("Invalid login form"))]
    InvalidForm(Vec<ValidationIssue>),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Token and user as read back from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredAuthData {
    pub token: Option<String>,
    pub user: Option<AuthUser>,
}

#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn config_request(&self) -> ApiRequest {
        ApiRequest::new(AUTH_PATH).response_schema(auth_response_schema())
    }

    pub async fn get_auth_config(&self) -> Result<AuthConfig, ApiError> {
        self.client.get(self.config_request()).await
    }

    /// Whether `credentials` match the backend's pair. Any failure to fetch
    /// the pair is logged and counts as a mismatch.
    pub async fn authenticate(&self, credentials: &AuthCredentials) -> bool {
        match self.get_auth_config().await {
            Ok(config) => {
                config.username == credentials.username && config.password == credentials.password
            }
            Err(e) => {
                error!(code = e.code(), "authentication failed: {e}");
                false
            }
        }
    }

    pub fn validate_token(&self, token: &str) -> bool {
        token == MOCK_TOKEN
    }

    /// Read the stored token and user. A user entry that does not parse is
    /// removed and reported as absent.
    pub fn get_stored_auth_data(&self) -> StoredAuthData {
        let storage = self.client.storage();
        let token = storage.get(AUTH_TOKEN_KEY);
        let user = storage
            .get(USER_DATA_KEY)
            .and_then(|raw| match serde_json::from_str::<AuthUser>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!("discarding stored user data: {e}");
                    if let Err(e) = storage.remove(USER_DATA_KEY) {
                        warn!("could not remove stored user data: {e}");
                    }
                    None
                }
            });
        StoredAuthData { token, user }
    }

    pub fn store_auth_data(&self, token: &str, user: &AuthUser) -> Result<(), StorageError> {
        let storage = self.client.storage();
        storage.set(AUTH_TOKEN_KEY, token)?;
        storage.set(USER_DATA_KEY, &serde_json::to_string(user)?)
    }

    pub fn clear_auth_data(&self) -> Result<(), StorageError> {
        let storage = self.client.storage();
        storage.remove(AUTH_TOKEN_KEY)?;
        storage.remove(USER_DATA_KEY)
    }

    /// Check the form, authenticate, and persist the session on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthUser, LoginError> {
        login_form_schema()
            .validate(&json!({ "username": username, "password": password }))
            .map_err(LoginError::InvalidForm)?;

        let credentials = AuthCredentials {
            username: username.to_string(),
            password: password.to_string(),
        };
        if !self.authenticate(&credentials).await {
            return Err(LoginError::InvalidCredentials);
        }

        let user = AuthUser {
            id: "1".to_string(),
            username: username.to_string(),
            email: format!("{username}@example.com"),
        };
        self.store_auth_data(MOCK_TOKEN, &user)?;
        Ok(user)
    }

    pub fn logout(&self) -> Result<(), StorageError> {
        self.clear_auth_data()
    }

    /// The signed-in user, if storage holds a valid token and user.
    pub fn restore_session(&self) -> Option<AuthUser> {
        let StoredAuthData { token, user } = self.get_stored_auth_data();
        token.filter(|t| self.validate_token(t)).and(user)
    }

    pub fn config(&self) -> QueryFn<(), AuthConfig> {
        let service = self.clone();
        QueryFn::new(
            move |_: ()| {
                let service = service.clone();
                async move { service.get_auth_config().await }
            },
            |_: &()| CacheKey::single("auth-config"),
        )
    }
}
