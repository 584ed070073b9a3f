//! Authorization endpoint logic.
//!
//! The redirect target is validated before anything is issued. Until it is
//! known to be a well-formed URI registered for the client, failures are
//! returned directly; afterwards they travel back to the client as query
//! parameters on the redirect.

use crate::oauth2::error::{ClientError, GrantError, OAuth2Error, ValidationError};
use crate::oauth2::registry::ClientRegistry;
use crate::oauth2::store::{AccessTokens, AuthorizationCodes};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;
use utoipa::IntoParams;

/// Query parameters of `GET /auth/authorization`.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuthorizeRequest {
    /// `code` or `token`
    pub response_type: Option<String>,
    /// Client identifier issued during registration
    pub client_id: Option<String>,
    /// Must equal the redirect URI registered for the client
    pub redirect_uri: Option<String>,
    /// Opaque value returned unchanged in the redirect
    pub state: Option<String>,
}

#[derive(Clone)]
pub struct AuthorizationEndpoint {
    clients: Arc<dyn ClientRegistry>,
    codes: AuthorizationCodes,
    tokens: AccessTokens,
}

impl AuthorizationEndpoint {
    pub fn new(
        clients: Arc<dyn ClientRegistry>,
        codes: AuthorizationCodes,
        tokens: AccessTokens,
    ) -> Self {
        Self {
            clients,
            codes,
            tokens,
        }
    }

    /// Handle an authorization request on behalf of `user_id`.
    ///
    /// `Ok` carries the URL to redirect to, which may itself describe an
    /// error. `Err` means the redirect target cannot be trusted and the error
    /// must be shown directly.
    #[tracing::instrument(skip(self, request), fields(client_id = request.client_id.as_deref(), response_type = request.response_type.as_deref()))]
    pub async fn authorize(
        &self,
        request: AuthorizeRequest,
        user_id: &str,
    ) -> Result<Url, OAuth2Error> {
        let raw_redirect = request
            .redirect_uri
            .as_deref()
            .filter(|uri| !uri.trim().is_empty())
            .ok_or(ValidationError::MissingField("redirect_uri"))?;
        let redirect =
            Url::parse(raw_redirect).map_err(|e| ValidationError::InvalidRedirectUri(e.to_string()))?;

        let client_id = request
            .client_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ValidationError::MissingField("client_id"))?;
        let client = self
            .clients
            .find_client(client_id)
            .await?
            .ok_or_else(|| ClientError::UnknownClient {
                client_id: client_id.to_string(),
            })?;
        if client.redirect_uri != raw_redirect {
            tracing::warn!(client_id, "redirect_uri does not match registration");
            return Err(ValidationError::RedirectUriMismatch.into());
        }

        let state = request.state.as_deref();
        let outcome = match request.response_type.as_deref() {
            Some("code") => self
                .codes
                .issue(user_id)
                .await
                .map(|code| vec![("code", code)]),
            Some("token") => self.tokens.issue(user_id).await.map(|token| {
                vec![
                    ("access_token", token),
                    ("expires_in", self.tokens.expires_in().to_string()),
                ]
            }),
            Some(other) => {
                let error: OAuth2Error = GrantError::UnsupportedResponseType {
                    response_type: other.to_string(),
                }
                .into();
                return Ok(error.to_redirect(redirect, state));
            }
            None => {
                let error: OAuth2Error = GrantError::MissingResponseType.into();
                return Ok(error.to_redirect(redirect, state));
            }
        };

        match outcome {
            Ok(params) => Ok(append_query(redirect, &params, state)),
            Err(e) => {
                tracing::error!("Failed to issue credential for authorization request: {}", e);
                Ok(OAuth2Error::from(e).to_redirect(redirect, state))
            }
        }
    }
}

fn append_query(mut url: Url, params: &[(&str, String)], state: Option<&str>) -> Url {
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
        if let Some(s) = state {
            query.append_pair("state", s);
        }
    }
    url
}
