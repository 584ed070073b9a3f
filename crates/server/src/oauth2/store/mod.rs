//! Authorization code and access token storage.
//!
//! Each record kind has a narrow storage trait implemented once per backing
//! store ([`database`] for SeaORM, [`memory`] for a process-local map). The
//! [`AuthorizationCodes`] and [`AccessTokens`] wrappers own generation, input
//! validation and lifetime checks so every backend behaves the same.

use crate::oauth2::credentials::random_token;
use crate::oauth2::error::StoreError;
use async_trait::async_trait;
use std::sync::Arc;
use time::{Duration, OffsetDateTime};

pub mod database;
pub mod memory;

pub use crate::entity::oauth2_access_token::Model as AccessToken;
pub use crate::entity::oauth2_authorization_code::Model as AuthorizationCode;
pub use database::{DbAccessTokenStore, DbAuthorizationCodeStore};
pub use memory::{MemoryAccessTokenStore, MemoryAuthorizationCodeStore};

/// Persistence for authorization codes.
#[async_trait]
pub trait AuthorizationCodeStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::AlreadyExists`] if the code is taken.
    async fn insert(&self, record: AuthorizationCode) -> Result<(), StoreError>;

    async fn find(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError>;

    /// Remove the record and return it in one atomic step.
    ///
    /// Of any number of concurrent callers for the same code, at most one gets `Some`.
    async fn take(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError>;

    /// Delete the record if present.
    async fn delete(&self, code: &str) -> Result<(), StoreError>;

    /// Delete every record issued before `cutoff`, returning how many were removed.
    async fn delete_issued_before(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError>;
}

/// Persistence for access tokens.
#[async_trait]
pub trait AccessTokenStore: Send + Sync {
    /// Insert a new record. Fails with [`StoreError::AlreadyExists`] if the token is taken.
    async fn insert(&self, record: AccessToken) -> Result<(), StoreError>;

    async fn find(&self, token: &str) -> Result<Option<AccessToken>, StoreError>;

    /// Delete the record if present.
    async fn delete(&self, token: &str) -> Result<(), StoreError>;
}

/// Issues, resolves and consumes single-use authorization codes.
#[derive(Clone)]
pub struct AuthorizationCodes {
    store: Arc<dyn AuthorizationCodeStore>,
    lifetime: Duration,
}

impl AuthorizationCodes {
    pub fn new(store: Arc<dyn AuthorizationCodeStore>, lifetime: Duration) -> Self {
        Self { store, lifetime }
    }

    /// Issue a fresh code for `user_id`.
    #[tracing::instrument(skip(self))]
    pub async fn issue(&self, user_id: &str) -> Result<String, StoreError> {
        let code = random_token();
        self.store
            .insert(AuthorizationCode {
                id: uuid::Uuid::new_v4().to_string(),
                code: code.clone(),
                user_id: user_id.to_string(),
                issued_at: OffsetDateTime::now_utc(),
            })
            .await?;
        tracing::debug!(user_id, "Issued authorization code");
        Ok(code)
    }

    /// Look up the user a code was issued to without consuming it.
    ///
    /// Blank, unknown and expired codes resolve to `None`.
    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, code: &str) -> Result<Option<String>, StoreError> {
        if code.trim().is_empty() {
            return Ok(None);
        }
        Ok(self
            .store
            .find(code)
            .await?
            .filter(|record| !self.is_expired(record, OffsetDateTime::now_utc()))
            .map(|record| record.user_id))
    }

    /// Delete a code. Unknown codes are ignored.
    #[tracing::instrument(skip_all)]
    pub async fn consume(&self, code: &str) -> Result<(), StoreError> {
        if code.trim().is_empty() {
            return Ok(());
        }
        self.store.delete(code).await
    }

    /// Resolve and consume a code in a single atomic step.
    ///
    /// An expired code is removed as well but still resolves to `None`.
    #[tracing::instrument(skip_all)]
    pub async fn redeem(&self, code: &str) -> Result<Option<String>, StoreError> {
        if code.trim().is_empty() {
            return Ok(None);
        }
        let Some(record) = self.store.take(code).await? else {
            return Ok(None);
        };
        if self.is_expired(&record, OffsetDateTime::now_utc()) {
            tracing::debug!(user_id = %record.user_id, "Rejected expired authorization code");
            return Ok(None);
        }
        Ok(Some(record.user_id))
    }

    /// Remove every code whose lifetime has elapsed.
    #[tracing::instrument(skip(self))]
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let cutoff = OffsetDateTime::now_utc() - self.lifetime;
        self.store.delete_issued_before(cutoff).await
    }

    fn is_expired(&self, record: &AuthorizationCode, now: OffsetDateTime) -> bool {
        now >= record.issued_at + self.lifetime
    }
}

/// Issues, resolves and revokes bearer access tokens.
#[derive(Clone)]
pub struct AccessTokens {
    store: Arc<dyn AccessTokenStore>,
    lifetime: Duration,
}

impl AccessTokens {
    pub fn new(store: Arc<dyn AccessTokenStore>, lifetime: Duration) -> Self {
        Self { store, lifetime }
    }

    /// Token lifetime in whole seconds, as reported in `expires_in`.
    pub fn expires_in(&self) -> i64 {
        self.lifetime.whole_seconds()
    }

    #[tracing::instrument(skip(self))]
    pub async fn issue(&self, user_id: &str) -> Result<String, StoreError> {
        let token = random_token();
        self.store
            .insert(AccessToken {
                id: uuid::Uuid::new_v4().to_string(),
                token: token.clone(),
                user_id: user_id.to_string(),
                issued_at: OffsetDateTime::now_utc(),
                refresh_count: 0,
            })
            .await?;
        tracing::debug!(user_id, "Issued access token");
        Ok(token)
    }

    /// Look up the user a token belongs to. Never modifies the record.
    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, token: &str) -> Result<Option<String>, StoreError> {
        if token.trim().is_empty() {
            return Ok(None);
        }
        let now = OffsetDateTime::now_utc();
        Ok(self
            .store
            .find(token)
            .await?
            .filter(|record| now < record.issued_at + self.lifetime)
            .map(|record| record.user_id))
    }

    /// Delete a token. Unknown tokens are ignored.
    #[tracing::instrument(skip_all)]
    pub async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        if token.trim().is_empty() {
            return Ok(());
        }
        self.store.delete(token).await
    }
}

/// Periodically delete expired authorization codes.
pub fn spawn_code_purge_task(codes: AuthorizationCodes, every: std::time::Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match codes.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::info!(removed, "Purged expired authorization codes"),
                Err(e) => tracing::error!("Failed to purge expired authorization codes: {}", e),
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(lifetime: Duration) -> AuthorizationCodes {
        AuthorizationCodes::new(Arc::new(MemoryAuthorizationCodeStore::default()), lifetime)
    }

    fn tokens(lifetime: Duration) -> AccessTokens {
        AccessTokens::new(Arc::new(MemoryAccessTokenStore::default()), lifetime)
    }

    #[tokio::test]
    async fn test_issue_then_resolve_returns_user() {
        let codes = codes(Duration::minutes(10));
        let code = codes.issue("user-1").await.unwrap();

        assert_eq!(codes.resolve(&code).await.unwrap().as_deref(), Some("user-1"));
        // resolve does not consume
        assert_eq!(codes.resolve(&code).await.unwrap().as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_resolve_blank_and_unknown_codes() {
        let codes = codes(Duration::minutes(10));
        assert!(codes.resolve("").await.unwrap().is_none());
        assert!(codes.resolve("   ").await.unwrap().is_none());
        assert!(codes.resolve("never-issued").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_consume_is_idempotent() {
        let codes = codes(Duration::minutes(10));
        let code = codes.issue("user-1").await.unwrap();

        codes.consume(&code).await.unwrap();
        codes.consume(&code).await.unwrap();
        codes.consume("never-issued").await.unwrap();

        assert!(codes.resolve(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redeem_is_single_use() {
        let codes = codes(Duration::minutes(10));
        let code = codes.issue("user-1").await.unwrap();

        assert_eq!(codes.redeem(&code).await.unwrap().as_deref(), Some("user-1"));
        assert!(codes.redeem(&code).await.unwrap().is_none());
        assert!(codes.resolve(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_code_is_not_resolved_or_redeemed() {
        let codes = codes(Duration::ZERO);
        let code = codes.issue("user-1").await.unwrap();

        assert!(codes.resolve(&code).await.unwrap().is_none());
        assert!(codes.redeem(&code).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired_codes() {
        let store = Arc::new(MemoryAuthorizationCodeStore::default());
        let codes = AuthorizationCodes::new(store.clone(), Duration::minutes(10));

        let fresh = codes.issue("user-1").await.unwrap();
        store
            .insert(AuthorizationCode {
                id: "old".into(),
                code: "old-code".into(),
                user_id: "user-2".into(),
                issued_at: OffsetDateTime::now_utc() - Duration::minutes(11),
            })
            .await
            .unwrap();

        assert_eq!(codes.purge_expired().await.unwrap(), 1);
        assert!(store.find("old-code").await.unwrap().is_none());
        assert!(store.find(&fresh).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_redeem_has_exactly_one_winner() {
        let codes = codes(Duration::minutes(10));
        let code = codes.issue("user-1").await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let codes = codes.clone();
                let code = code.clone();
                tokio::spawn(async move { codes.redeem(&code).await.unwrap() })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_token_resolve_is_non_destructive_until_revoked() {
        let tokens = tokens(Duration::hours(1));
        let token = tokens.issue("user-1").await.unwrap();

        for _ in 0..3 {
            assert_eq!(tokens.resolve(&token).await.unwrap().as_deref(), Some("user-1"));
        }

        tokens.revoke(&token).await.unwrap();
        assert!(tokens.resolve(&token).await.unwrap().is_none());
        // second revoke is a no-op
        tokens.revoke(&token).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_token_is_not_resolved() {
        let tokens = tokens(Duration::ZERO);
        let token = tokens.issue("user-1").await.unwrap();
        assert!(tokens.resolve(&token).await.unwrap().is_none());
    }

    #[test]
    fn test_expires_in_reports_seconds() {
        assert_eq!(tokens(Duration::hours(1)).expires_in(), 3600);
    }
}
