//! Token endpoint state machine.
//!
//! A token request moves through three stages: the client is authenticated,
//! the grant is resolved to a user id, and an access token is issued for that
//! user. Any stage may stop the request with an [`OAuth2Error`]; nothing is
//! written before the grant resolves, and a storage fault never yields a token.

use crate::oauth2::credentials::{verify_secret, verify_unknown_account};
use crate::oauth2::error::{ClientError, GrantError, OAuth2Error, ValidationError};
use crate::oauth2::registry::{ClientCredential, ClientRegistry, UserRegistry};
use crate::oauth2::store::{AccessTokens, AuthorizationCodes};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Form body of `POST /auth/token`.
///
/// Every field is optional at the parsing level so a missing field is reported
/// as an OAuth2 `invalid_request` rather than a framework rejection.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// `authorization_code`, `password`, `refresh_token` or `client_credentials`
    pub grant_type: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Required for `authorization_code`
    pub code: Option<String>,
    /// Resource owner email, required for `password`
    pub username: Option<String>,
    /// Required for `password`
    pub password: Option<String>,
}

impl TokenRequest {
    /// Apply client credentials sent with HTTP Basic authentication.
    ///
    /// A client must use one authentication method per request, so a body
    /// secret or a differing body `client_id` alongside the header is rejected.
    pub fn with_basic_credentials(
        mut self,
        client_id: String,
        client_secret: String,
    ) -> Result<Self, ValidationError> {
        let body_secret = required(self.client_secret.as_deref()).is_some();
        let body_id_differs =
            required(self.client_id.as_deref()).is_some_and(|id| id != client_id);
        if body_secret || body_id_differs {
            return Err(ValidationError::ConflictingClientCredentials);
        }

        self.client_id = Some(client_id);
        self.client_secret = Some(client_secret);
        Ok(self)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `bearer`
    pub token_type: String,
    pub expires_in: i64,
}

/// The grant types this server recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    Password,
    RefreshToken,
    ClientCredentials,
}

impl GrantType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "authorization_code" => Some(GrantType::AuthorizationCode),
            "password" => Some(GrantType::Password),
            "refresh_token" => Some(GrantType::RefreshToken),
            "client_credentials" => Some(GrantType::ClientCredentials),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct GrantProcessor {
    clients: Arc<dyn ClientRegistry>,
    users: Arc<dyn UserRegistry>,
    codes: AuthorizationCodes,
    tokens: AccessTokens,
}

impl GrantProcessor {
    pub fn new(
        clients: Arc<dyn ClientRegistry>,
        users: Arc<dyn UserRegistry>,
        codes: AuthorizationCodes,
        tokens: AccessTokens,
    ) -> Self {
        Self {
            clients,
            users,
            codes,
            tokens,
        }
    }

    /// Run a token request to completion.
    #[tracing::instrument(skip_all, fields(grant_type = request.grant_type.as_deref(), client_id = request.client_id.as_deref()))]
    pub async fn process(&self, request: TokenRequest) -> Result<TokenResponse, OAuth2Error> {
        let grant_type =
            required(request.grant_type.as_deref()).ok_or(ValidationError::MissingField("grant_type"))?;
        let client_id =
            required(request.client_id.as_deref()).ok_or(ValidationError::MissingField("client_id"))?;

        self.authenticate_client(client_id, request.client_secret.as_deref())
            .await?;

        let user_id = match GrantType::parse(grant_type) {
            Some(GrantType::AuthorizationCode) => {
                self.authorization_code_grant(request.code.as_deref()).await?
            }
            Some(GrantType::Password) => {
                self.password_grant(request.username.as_deref(), request.password.as_deref())
                    .await?
            }
            Some(GrantType::RefreshToken) | Some(GrantType::ClientCredentials) | None => {
                return Err(GrantError::UnsupportedGrantType {
                    grant_type: grant_type.to_string(),
                }
                .into());
            }
        };

        let access_token = self.tokens.issue(&user_id).await?;
        tracing::info!(client_id, user_id = %user_id, "Access token granted");

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.tokens.expires_in(),
        })
    }

    async fn authenticate_client(
        &self,
        client_id: &str,
        client_secret: Option<&str>,
    ) -> Result<ClientCredential, OAuth2Error> {
        let client = self
            .clients
            .find_client(client_id)
            .await?
            .ok_or_else(|| ClientError::UnknownClient {
                client_id: client_id.to_string(),
            })?;

        let authenticated = required(client_secret)
            .is_some_and(|secret| verify_secret(secret, &client.hashed_secret, &client.salt));
        if !authenticated {
            tracing::warn!(client_id, "Client authentication failed");
            return Err(ClientError::InvalidSecret {
                client_id: client_id.to_string(),
            }
            .into());
        }

        Ok(client)
    }

    async fn authorization_code_grant(&self, code: Option<&str>) -> Result<String, OAuth2Error> {
        let code = required(code).ok_or(ValidationError::MissingField("code"))?;
        match self.codes.redeem(code).await? {
            Some(user_id) => Ok(user_id),
            None => Err(GrantError::InvalidCode {
                code: code.to_string(),
            }
            .into()),
        }
    }

    async fn password_grant(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<String, OAuth2Error> {
        let username = required(username).ok_or(ValidationError::MissingField("username"))?;
        let password = required(password).ok_or(ValidationError::MissingField("password"))?;

        match self.users.find_user_by_email(username).await? {
            Some(user) if verify_secret(password, &user.hashed_password, &user.salt) => {
                Ok(user.user_id)
            }
            Some(_) => Err(GrantError::InvalidUserCredentials.into()),
            None => {
                verify_unknown_account(password);
                Err(GrantError::InvalidUserCredentials.into())
            }
        }
    }
}

/// Treat absent and blank values alike.
fn required(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
