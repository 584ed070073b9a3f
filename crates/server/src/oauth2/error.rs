//! OAuth2 failure kinds and their wire representation.
//!
//! Every failure inside the engine is an [`OAuth2Error`]. The token endpoint
//! renders it as an RFC 6749 §5.2 JSON body, the authorization endpoint either
//! as a direct JSON error or as `error`/`error_description` query parameters
//! on the redirect (RFC 6749 §4.1.2.1).

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use utoipa::ToSchema;

/// Persistence failures surfaced by the code and token stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a record with this value already exists")]
    AlreadyExists,
    #[error("database error: {0}")]
    Database(DbErr),
    #[error("failed to hash credential: {0}")]
    Hashing(#[from] argon2::Error),
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::AlreadyExists,
            _ => StoreError::Database(err),
        }
    }
}

/// A required request field was missing or malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("redirect_uri is not a valid absolute URI: {0}")]
    InvalidRedirectUri(String),
    #[error("redirect_uri does not match the registered redirect URI")]
    RedirectUriMismatch,
    #[error("Malformed request: {0}")]
    MalformedRequest(String),
    #[error("Client credentials in the Authorization header conflict with the request body")]
    ConflictingClientCredentials,
}

/// Client authentication failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("Unknown client: {client_id}")]
    UnknownClient { client_id: String },
    #[error("Client authentication failed")]
    InvalidSecret { client_id: String },
}

/// The grant could not be honoured.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrantError {
    #[error("Invalid authorization code: {code}")]
    InvalidCode { code: String },
    #[error("Invalid username or password")]
    InvalidUserCredentials,
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType { grant_type: String },
    #[error("Unsupported response type: {response_type}")]
    UnsupportedResponseType { response_type: String },
    #[error("response_type is required")]
    MissingResponseType,
}

#[derive(Debug, Error)]
pub enum OAuth2Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Grant(#[from] GrantError),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// OAuth2 error body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl OAuth2Error {
    /// The RFC 6749 error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            OAuth2Error::Validation(_) => "invalid_request",
            OAuth2Error::Client(_) => "invalid_client",
            OAuth2Error::Grant(GrantError::InvalidCode { .. })
            | OAuth2Error::Grant(GrantError::InvalidUserCredentials) => "invalid_grant",
            OAuth2Error::Grant(GrantError::UnsupportedGrantType { .. }) => "unsupported_grant_type",
            OAuth2Error::Grant(GrantError::UnsupportedResponseType { .. })
            | OAuth2Error::Grant(GrantError::MissingResponseType) => "unsupported_response_type",
            OAuth2Error::Storage(_) => "server_error",
        }
    }

    /// Human-readable description. Storage details never leave the process.
    pub fn description(&self) -> Option<String> {
        match self {
            OAuth2Error::Storage(_) => None,
            other => Some(other.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            OAuth2Error::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn to_body(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_code().to_string(),
            error_description: self.description(),
        }
    }

    /// Append this error to a validated redirect target.
    pub fn to_redirect(&self, mut redirect_uri: Url, state: Option<&str>) -> Url {
        {
            let mut query = redirect_uri.query_pairs_mut();
            query.append_pair("error", self.error_code());
            if let Some(desc) = self.description() {
                query.append_pair("error_description", &desc);
            }
            if let Some(s) = state {
                query.append_pair("state", s);
            }
        }
        redirect_uri
    }
}

impl IntoResponse for OAuth2Error {
    fn into_response(self) -> Response {
        if let OAuth2Error::Storage(ref e) = self {
            tracing::error!("Storage fault while handling OAuth2 request: {}", e);
        }
        (
            self.status(),
            [(header::CACHE_CONTROL, "no-store")],
            Json(self.to_body()),
        )
            .into_response()
    }
}
