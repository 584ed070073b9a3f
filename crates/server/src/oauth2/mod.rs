//! OAuth2 Authorization Server module.
//!
//! Issues bearer access tokens for the shopping list API.
//!
//! ## Supported Flows
//!
//! - Authorization Code (single-use codes, 10 minute default lifetime)
//! - Implicit (`response_type=token`)
//! - Resource Owner Password Credentials
//!
//! `refresh_token` and `client_credentials` are recognised and rejected with
//! `unsupported_grant_type`.
//!
//! ## Endpoints
//!
//! - `GET /auth/authorization` - Authorization endpoint
//! - `POST /auth/token` - Token endpoint
//! - `POST /auth/revoke` - Token revocation
//! - `GET /auth/userinfo` - Subject of a bearer token

pub mod authorize;
pub mod credentials;
pub mod endpoints;
pub mod error;
pub mod extract;
pub mod grant;
pub mod registry;
pub mod state;
pub mod store;

pub use authorize::{AuthorizationEndpoint, AuthorizeRequest};
pub use credentials::{generate_salt, hash_secret, verify_secret};
pub use endpoints::router;
pub use error::{OAuth2Error, StoreError};
pub use grant::{GrantProcessor, TokenRequest, TokenResponse};
pub use state::OAuth2State;

/// OpenAPI tag for OAuth2 endpoints
pub const OAUTH2_TAG: &str = "OAuth2";
