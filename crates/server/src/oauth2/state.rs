//! OAuth2 state management.
//!
//! Wires the registries and stores into the grant processor and the
//! authorization endpoint shared by all OAuth2 handlers.

use crate::config::OAuth2Config;
use crate::oauth2::authorize::AuthorizationEndpoint;
use crate::oauth2::grant::GrantProcessor;
use crate::oauth2::registry::{ClientRegistry, DbClientRegistry, DbUserRegistry, UserRegistry};
use crate::oauth2::store::{
    AccessTokenStore, AccessTokens, AuthorizationCodeStore, AuthorizationCodes,
    DbAccessTokenStore, DbAuthorizationCodeStore,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use time::Duration;

/// OAuth2 state containing all components needed for the authorization server.
#[derive(Clone)]
pub struct OAuth2State {
    pub grants: GrantProcessor,
    pub authorization: AuthorizationEndpoint,
    pub users: Arc<dyn UserRegistry>,
    pub codes: AuthorizationCodes,
    pub tokens: AccessTokens,
}

impl OAuth2State {
    /// Build the state on top of the SeaORM-backed registries and stores.
    pub fn new(db: Arc<DatabaseConnection>, config: &OAuth2Config) -> Self {
        Self::with_backends(
            Arc::new(DbClientRegistry::new(db.clone())),
            Arc::new(DbUserRegistry::new(db.clone())),
            Arc::new(DbAuthorizationCodeStore::new(db.clone())),
            Arc::new(DbAccessTokenStore::new(db)),
            config,
        )
    }

    pub fn with_backends(
        clients: Arc<dyn ClientRegistry>,
        users: Arc<dyn UserRegistry>,
        code_store: Arc<dyn AuthorizationCodeStore>,
        token_store: Arc<dyn AccessTokenStore>,
        config: &OAuth2Config,
    ) -> Self {
        let codes = AuthorizationCodes::new(
            code_store,
            Duration::seconds(config.authorization_code_lifetime),
        );
        let tokens = AccessTokens::new(
            token_store,
            Duration::seconds(config.access_token_lifetime),
        );

        Self {
            grants: GrantProcessor::new(
                clients.clone(),
                users.clone(),
                codes.clone(),
                tokens.clone(),
            ),
            authorization: AuthorizationEndpoint::new(clients, codes.clone(), tokens.clone()),
            users,
            codes,
            tokens,
        }
    }
}
