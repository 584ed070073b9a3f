//! Process-local code and token stores backed by `DashMap`.
//!
//! Suitable for single-instance deployments and tests. Records are keyed by
//! their opaque value, so every operation is a single-shard map operation.

use super::{AccessToken, AccessTokenStore, AuthorizationCode, AuthorizationCodeStore};
use crate::oauth2::error::StoreError;
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use time::OffsetDateTime;

#[derive(Debug, Default)]
pub struct MemoryAuthorizationCodeStore {
    codes: DashMap<String, AuthorizationCode>,
}

impl MemoryAuthorizationCodeStore {
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl AuthorizationCodeStore for MemoryAuthorizationCodeStore {
    async fn insert(&self, record: AuthorizationCode) -> Result<(), StoreError> {
        match self.codes.entry(record.code.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn find(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        Ok(self.codes.get(code).map(|r| r.value().clone()))
    }

    async fn take(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        Ok(self.codes.remove(code).map(|(_, record)| record))
    }

    async fn delete(&self, code: &str) -> Result<(), StoreError> {
        self.codes.remove(code);
        Ok(())
    }

    async fn delete_issued_before(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        let mut removed = 0;
        self.codes.retain(|_, record| {
            let keep = record.issued_at >= cutoff;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }
}

#[derive(Debug, Default)]
pub struct MemoryAccessTokenStore {
    tokens: DashMap<String, AccessToken>,
}

impl MemoryAccessTokenStore {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl AccessTokenStore for MemoryAccessTokenStore {
    async fn insert(&self, record: AccessToken) -> Result<(), StoreError> {
        match self.tokens.entry(record.token.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn find(&self, token: &str) -> Result<Option<AccessToken>, StoreError> {
        Ok(self.tokens.get(token).map(|r| r.value().clone()))
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        self.tokens.remove(token);
        Ok(())
    }
}

/// A store whose backend is always unreachable.
#[cfg(test)]
pub(crate) struct UnavailableStore;

#[cfg(test)]
impl UnavailableStore {
    fn fault() -> StoreError {
        StoreError::Database(sea_orm::DbErr::Custom("connection refused".into()))
    }
}

#[cfg(test)]
#[async_trait]
impl AuthorizationCodeStore for UnavailableStore {
    async fn insert(&self, _record: AuthorizationCode) -> Result<(), StoreError> {
        Err(Self::fault())
    }

    async fn find(&self, _code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        Err(Self::fault())
    }

    async fn take(&self, _code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        Err(Self::fault())
    }

    async fn delete(&self, _code: &str) -> Result<(), StoreError> {
        Err(Self::fault())
    }

    async fn delete_issued_before(&self, _cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        Err(Self::fault())
    }
}

#[cfg(test)]
#[async_trait]
impl AccessTokenStore for UnavailableStore {
    async fn insert(&self, _record: AccessToken) -> Result<(), StoreError> {
        Err(Self::fault())
    }

    async fn find(&self, _token: &str) -> Result<Option<AccessToken>, StoreError> {
        Err(Self::fault())
    }

    async fn delete(&self, _token: &str) -> Result<(), StoreError> {
        Err(Self::fault())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_record(code: &str) -> AuthorizationCode {
        AuthorizationCode {
            id: uuid::Uuid::new_v4().to_string(),
            code: code.to_string(),
            user_id: "user-1".to_string(),
            issued_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_code_is_rejected() {
        let store = MemoryAuthorizationCodeStore::default();
        store.insert(code_record("dup")).await.unwrap();

        let err = store.insert(code_record("dup")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_take_removes_record() {
        let store = MemoryAuthorizationCodeStore::default();
        store.insert(code_record("abc")).await.unwrap();

        assert!(store.take("abc").await.unwrap().is_some());
        assert!(store.take("abc").await.unwrap().is_none());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_token_is_rejected() {
        let store = MemoryAccessTokenStore::default();
        let record = AccessToken {
            id: "1".into(),
            token: "tok".into(),
            user_id: "user-1".into(),
            issued_at: OffsetDateTime::now_utc(),
            refresh_count: 0,
        };
        store.insert(record.clone()).await.unwrap();

        let err = store
            .insert(AccessToken {
                id: "2".into(),
                ..record
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists));
    }
}
