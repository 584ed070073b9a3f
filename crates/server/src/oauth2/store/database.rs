//! SeaORM-backed code and token stores.

use super::{AccessToken, AccessTokenStore, AuthorizationCode, AuthorizationCodeStore};
use crate::entity::{oauth2_access_token, oauth2_authorization_code};
use crate::oauth2::error::StoreError;
use async_trait::async_trait;
use sea_orm::{ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use time::OffsetDateTime;

#[derive(Clone)]
pub struct DbAuthorizationCodeStore {
    db: Arc<DatabaseConnection>,
}

impl DbAuthorizationCodeStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AuthorizationCodeStore for DbAuthorizationCodeStore {
    async fn insert(&self, record: AuthorizationCode) -> Result<(), StoreError> {
        let active = oauth2_authorization_code::ActiveModel {
            id: Set(record.id),
            code: Set(record.code),
            user_id: Set(record.user_id),
            issued_at: Set(record.issued_at),
        };
        oauth2_authorization_code::Entity::insert(active)
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn find(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        Ok(oauth2_authorization_code::Entity::find()
            .filter(oauth2_authorization_code::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await?)
    }

    async fn take(&self, code: &str) -> Result<Option<AuthorizationCode>, StoreError> {
        // DELETE ... RETURNING: the row goes to whichever statement deletes it first.
        let removed = oauth2_authorization_code::Entity::delete_many()
            .filter(oauth2_authorization_code::Column::Code.eq(code))
            .exec_with_returning(self.db.as_ref())
            .await?;
        Ok(removed.into_iter().next())
    }

    async fn delete(&self, code: &str) -> Result<(), StoreError> {
        oauth2_authorization_code::Entity::delete_many()
            .filter(oauth2_authorization_code::Column::Code.eq(code))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete_issued_before(&self, cutoff: OffsetDateTime) -> Result<u64, StoreError> {
        let result = oauth2_authorization_code::Entity::delete_many()
            .filter(oauth2_authorization_code::Column::IssuedAt.lt(cutoff))
            .exec(self.db.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}

#[derive(Clone)]
pub struct DbAccessTokenStore {
    db: Arc<DatabaseConnection>,
}

impl DbAccessTokenStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccessTokenStore for DbAccessTokenStore {
    async fn insert(&self, record: AccessToken) -> Result<(), StoreError> {
        let active = oauth2_access_token::ActiveModel {
            id: Set(record.id),
            token: Set(record.token),
            user_id: Set(record.user_id),
            issued_at: Set(record.issued_at),
            refresh_count: Set(record.refresh_count),
        };
        oauth2_access_token::Entity::insert(active)
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<AccessToken>, StoreError> {
        Ok(oauth2_access_token::Entity::find()
            .filter(oauth2_access_token::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await?)
    }

    async fn delete(&self, token: &str) -> Result<(), StoreError> {
        oauth2_access_token::Entity::delete_many()
            .filter(oauth2_access_token::Column::Token.eq(token))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}
