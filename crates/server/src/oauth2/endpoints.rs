//! OAuth2 HTTP endpoints.
//!
//! Implements the OAuth2 authorization server endpoints:
//! - Authorization endpoint
//! - Token endpoint
//! - Token revocation
//! - UserInfo

use crate::oauth2::authorize::AuthorizeRequest;
use crate::oauth2::error::{ErrorResponse, OAuth2Error, ValidationError};
use crate::oauth2::extract::{BearerUser, ResourceOwner, basic_client_credentials};
use crate::oauth2::grant::{TokenRequest, TokenResponse};
use crate::oauth2::{OAUTH2_TAG, state::OAuth2State};
use axum::{
    Form, Json,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Creates the OAuth2 router.
pub fn router(state: OAuth2State) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(authorize))
        .routes(routes!(token))
        .routes(routes!(revoke))
        .routes(routes!(userinfo))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RevokeRequest {
    pub token: Option<String>,
    pub token_type_hint: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserInfoResponse {
    pub sub: String,
}

/// OAuth2 Authorization endpoint.
#[tracing::instrument(skip(state, owner, params), fields(user_id = %owner.user_id))]
#[utoipa::path(
    get,
    path = "/authorization",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Authorize",
    summary = "Issue an authorization code or access token to a registered client",
    description = "Issues credentials on behalf of the authenticated resource owner (HTTP Basic `email:password`) \
                   and redirects back to the client.\n\n\
                   - `response_type=code`: the redirect carries `code`\n\
                   - `response_type=token`: the redirect carries `access_token` and `expires_in`\n\n\
                   `redirect_uri` must be a valid absolute URI equal to the one registered for the client. \
                   If it is not, the error is returned directly and nothing is issued. Later failures are \
                   reported as `error` and `error_description` query parameters on the redirect.",
    params(AuthorizeRequest),
    security(("basic_auth" = [])),
    responses(
        (status = 302, description = "Redirect to the client with the issued credential or an error"),
        (status = 400, description = "Malformed query, missing or invalid redirect_uri, unknown client", body = ErrorResponse),
        (status = 401, description = "Resource owner not authenticated", body = ErrorResponse),
    )
)]
pub async fn authorize(
    State(state): State<OAuth2State>,
    owner: ResourceOwner,
    params: Result<Query<AuthorizeRequest>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return malformed(rejection.body_text()),
    };

    match state.authorization.authorize(params, &owner.user_id).await {
        Ok(location) => (
            StatusCode::FOUND,
            [(header::LOCATION, location.to_string())],
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// OAuth2 Token endpoint.
#[tracing::instrument(skip(state, headers, params))]
#[utoipa::path(
    post,
    path = "/token",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Token",
    summary = "Exchange an authorization code or user credentials for an access token",
    description = "**Supported grant types:**\n\
                   - `authorization_code`: exchange a code from the authorization endpoint (single use)\n\
                   - `password`: exchange the resource owner's email and password\n\n\
                   `refresh_token` and `client_credentials` are rejected with `unsupported_grant_type`.\n\n\
                   **Client authentication:** `client_id` and `client_secret` in the body, or HTTP Basic auth \
                   with form-encoded id and secret. Using both is rejected with `invalid_request`.",
    request_body(
        content = TokenRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Token request parameters"
    ),
    responses(
        (status = 200, description = "Access token issued", body = TokenResponse),
        (status = 400, description = "invalid_request, invalid_client, invalid_grant or unsupported_grant_type", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn token(
    State(state): State<OAuth2State>,
    headers: HeaderMap,
    params: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let Form(mut params) = match params {
        Ok(params) => params,
        Err(rejection) => return malformed(rejection.body_text()),
    };
    if let Some((client_id, client_secret)) = basic_client_credentials(&headers) {
        params = match params.with_basic_credentials(client_id, client_secret) {
            Ok(params) => params,
            Err(e) => return OAuth2Error::from(e).into_response(),
        };
    }

    match state.grants.process(params).await {
        Ok(response) => (
            StatusCode::OK,
            [
                (header::CACHE_CONTROL, "no-store"),
                (header::PRAGMA, "no-cache"),
            ],
            Json(response),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Token revocation endpoint (RFC 7009).
#[tracing::instrument(skip(state, params))]
#[utoipa::path(
    post,
    path = "/revoke",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 Revoke Token",
    summary = "Revoke an access token",
    description = "Deletes an access token so it can no longer be used.\n\n\
                   Returns 200 OK even if the token was already revoked or never existed (RFC 7009 §2.2). \
                   `token_type_hint` is accepted and ignored.",
    request_body(
        content = RevokeRequest,
        content_type = "application/x-www-form-urlencoded",
        description = "Token revocation request"
    ),
    responses(
        (status = 200, description = "Token revoked (or was already invalid)"),
        (status = 400, description = "Malformed body or missing token parameter", body = ErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse),
    )
)]
pub async fn revoke(
    State(state): State<OAuth2State>,
    params: Result<Form<RevokeRequest>, FormRejection>,
) -> Response {
    let Form(params) = match params {
        Ok(params) => params,
        Err(rejection) => return malformed(rejection.body_text()),
    };
    let Some(token) = params.token.filter(|t| !t.trim().is_empty()) else {
        return OAuth2Error::from(ValidationError::MissingField("token")).into_response();
    };

    match state.tokens.revoke(&token).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => OAuth2Error::from(e).into_response(),
    }
}

/// Report a body or query the framework could not parse as `invalid_request`.
fn malformed(reason: String) -> Response {
    tracing::debug!("Rejecting malformed request: {}", reason);
    OAuth2Error::from(ValidationError::MalformedRequest(reason)).into_response()
}

/// UserInfo endpoint.
#[tracing::instrument(skip(user), fields(user_id = %user.user_id))]
#[utoipa::path(
    get,
    path = "/userinfo",
    tag = OAUTH2_TAG,
    operation_id = "OAuth2 UserInfo",
    summary = "Identify the user an access token belongs to",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Subject of the presented token", body = UserInfoResponse),
        (status = 401, description = "Missing, unknown, expired or revoked token", body = ErrorResponse),
    )
)]
pub async fn userinfo(user: BearerUser) -> Json<UserInfoResponse> {
    Json(UserInfoResponse { sub: user.user_id })
}
