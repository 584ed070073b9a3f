//! Axum extractors for the two kinds of callers the OAuth2 routes see.
//!
//! - [`ResourceOwner`]: the end user approving an authorization request,
//!   authenticated with HTTP Basic `email:password`.
//! - [`BearerUser`]: a caller presenting an access token issued by this server.

use crate::oauth2::credentials::{verify_secret, verify_unknown_account};
use crate::oauth2::error::ErrorResponse;
use crate::oauth2::state::OAuth2State;
use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
};
use base64::Engine;

/// Decode `Authorization: Basic <base64(id:secret)>`.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .ok()?;
    let creds = String::from_utf8(decoded).ok()?;
    let (id, secret) = creds.split_once(':')?;
    Some((id.to_string(), secret.to_string()))
}

/// Decode client credentials sent with HTTP Basic authentication.
///
/// Clients form-encode their id and secret before base64, so both halves are
/// form-decoded here. Resource owner credentials are taken as sent.
pub fn basic_client_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let (id, secret) = basic_credentials(headers)?;
    Some((form_decode(&id)?, form_decode(&secret)?))
}

fn form_decode(value: &str) -> Option<String> {
    urlencoding::decode(&value.replace('+', " "))
        .ok()
        .map(|decoded| decoded.into_owned())
}

/// Why a caller could not be identified.
#[derive(Debug)]
pub enum AuthRejection {
    /// Basic credentials missing or wrong
    Unauthenticated,
    /// Bearer token missing, unknown, expired or revoked
    InvalidToken(&'static str),
    ServerError,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"oauth2\"")],
                Json(ErrorResponse {
                    error: "unauthorized".to_string(),
                    error_description: Some("Resource owner authentication required".to_string()),
                }),
            )
                .into_response(),
            AuthRejection::InvalidToken(description) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer error=\"invalid_token\"")],
                Json(ErrorResponse {
                    error: "invalid_token".to_string(),
                    error_description: Some(description.to_string()),
                }),
            )
                .into_response(),
            AuthRejection::ServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "server_error".to_string(),
                    error_description: None,
                }),
            )
                .into_response(),
        }
    }
}

/// The authenticated end user on whose behalf credentials are issued.
#[derive(Debug, Clone)]
pub struct ResourceOwner {
    pub user_id: String,
}

impl FromRequestParts<OAuth2State> for ResourceOwner {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &OAuth2State,
    ) -> Result<Self, Self::Rejection> {
        let (email, password) =
            basic_credentials(&parts.headers).ok_or(AuthRejection::Unauthenticated)?;

        let user = state
            .users
            .find_user_by_email(&email)
            .await
            .map_err(|e| {
                tracing::error!("Database error looking up resource owner: {}", e);
                AuthRejection::ServerError
            })?;

        let verified = match user {
            Some(user) if verify_secret(&password, &user.hashed_password, &user.salt) => {
                Some(user.user_id)
            }
            Some(_) => None,
            None => {
                verify_unknown_account(&password);
                None
            }
        };

        verified.map(|user_id| ResourceOwner { user_id }).ok_or_else(|| {
            tracing::debug!("Resource owner authentication failed");
            AuthRejection::Unauthenticated
        })
    }
}

/// The user an `Authorization: Bearer` token was issued to.
#[derive(Debug, Clone)]
pub struct BearerUser {
    pub user_id: String,
}

impl FromRequestParts<OAuth2State> for BearerUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &OAuth2State,
    ) -> Result<Self, Self::Rejection> {
        let token = match parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        {
            Some(header) => header
                .strip_prefix("Bearer ")
                .ok_or(AuthRejection::InvalidToken(
                    "Authorization header must use Bearer scheme",
                ))?,
            None => return Err(AuthRejection::InvalidToken("Missing Authorization header")),
        };

        let user_id = state
            .tokens
            .resolve(token)
            .await
            .map_err(|e| {
                tracing::error!("Database error looking up access token: {}", e);
                AuthRejection::ServerError
            })?
            .ok_or(AuthRejection::InvalidToken("Token is invalid or expired"))?;

        Ok(BearerUser { user_id })
    }
}
