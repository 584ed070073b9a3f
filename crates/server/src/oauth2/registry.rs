//! Client and user credential lookup.
//!
//! The OAuth2 engine only reads credentials. Registration lives here as well
//! because the registry is the owner that generates each credential's salt.

use crate::entity::{oauth2_client, oauth2_user};
use crate::oauth2::credentials::{generate_salt, hash_secret};
use crate::oauth2::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
};
use std::sync::Arc;
use time::OffsetDateTime;

/// A registered client as seen by the token and authorization endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientCredential {
    pub client_id: String,
    pub hashed_secret: String,
    pub salt: String,
    pub redirect_uri: String,
}

/// A resource owner's login credential.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserCredential {
    pub user_id: String,
    pub email: String,
    pub hashed_password: String,
    pub salt: String,
}

impl From<oauth2_client::Model> for ClientCredential {
    fn from(model: oauth2_client::Model) -> Self {
        Self {
            client_id: model.id,
            hashed_secret: model.hashed_secret,
            salt: model.salt,
            redirect_uri: model.redirect_uri,
        }
    }
}

impl From<oauth2_user::Model> for UserCredential {
    fn from(model: oauth2_user::Model) -> Self {
        Self {
            user_id: model.id,
            email: model.email,
            hashed_password: model.hashed_password,
            salt: model.salt,
        }
    }
}

#[async_trait]
pub trait ClientRegistry: Send + Sync {
    async fn find_client(&self, client_id: &str) -> Result<Option<ClientCredential>, StoreError>;
}

#[async_trait]
pub trait UserRegistry: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredential>, StoreError>;
}

/// Database-backed client registry.
#[derive(Clone)]
pub struct DbClientRegistry {
    db: Arc<DatabaseConnection>,
}

impl DbClientRegistry {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Register a confidential client with a freshly salted secret.
    #[tracing::instrument(skip(self, secret))]
    pub async fn register(
        &self,
        client_id: &str,
        secret: &str,
        redirect_uri: &str,
    ) -> Result<ClientCredential, StoreError> {
        let salt = generate_salt();
        let client = oauth2_client::ActiveModel {
            id: Set(client_id.to_string()),
            hashed_secret: Set(hash_secret(secret, &salt)?),
            salt: Set(salt),
            redirect_uri: Set(redirect_uri.to_string()),
            created_at: Set(OffsetDateTime::now_utc()),
        };
        Ok(client.insert(self.db.as_ref()).await?.into())
    }
}

#[async_trait]
impl ClientRegistry for DbClientRegistry {
    async fn find_client(&self, client_id: &str) -> Result<Option<ClientCredential>, StoreError> {
        Ok(oauth2_client::Entity::find_by_id(client_id)
            .one(self.db.as_ref())
            .await?
            .map(Into::into))
    }
}

/// Database-backed user registry.
#[derive(Clone)]
pub struct DbUserRegistry {
    db: Arc<DatabaseConnection>,
}

impl DbUserRegistry {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Register a user with a freshly salted password.
    #[tracing::instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<UserCredential, StoreError> {
        let salt = generate_salt();
        let user = oauth2_user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            email: Set(email.to_string()),
            hashed_password: Set(hash_secret(password, &salt)?),
            salt: Set(salt),
            created_at: Set(OffsetDateTime::now_utc()),
        };
        Ok(user.insert(self.db.as_ref()).await?.into())
    }
}

#[async_trait]
impl UserRegistry for DbUserRegistry {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredential>, StoreError> {
        Ok(oauth2_user::Entity::find()
            .filter(oauth2_user::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await?
            .map(Into::into))
    }
}

/// In-memory client registry.
#[derive(Debug, Default)]
pub struct MemoryClientRegistry {
    clients: DashMap<String, ClientCredential>,
}

impl MemoryClientRegistry {
    pub fn register(
        &self,
        client_id: &str,
        secret: &str,
        redirect_uri: &str,
    ) -> Result<ClientCredential, StoreError> {
        let salt = generate_salt();
        let client = ClientCredential {
            client_id: client_id.to_string(),
            hashed_secret: hash_secret(secret, &salt)?,
            salt,
            redirect_uri: redirect_uri.to_string(),
        };
        self.clients.insert(client_id.to_string(), client.clone());
        Ok(client)
    }
}

#[async_trait]
impl ClientRegistry for MemoryClientRegistry {
    async fn find_client(&self, client_id: &str) -> Result<Option<ClientCredential>, StoreError> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }
}

/// In-memory user registry keyed by email.
#[derive(Debug, Default)]
pub struct MemoryUserRegistry {
    users: DashMap<String, UserCredential>,
}

impl MemoryUserRegistry {
    pub fn register(&self, email: &str, password: &str) -> Result<UserCredential, StoreError> {
        let salt = generate_salt();
        let user = UserCredential {
            user_id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            hashed_password: hash_secret(password, &salt)?,
            salt,
        };
        self.users.insert(email.to_string(), user.clone());
        Ok(user)
    }
}

#[async_trait]
impl UserRegistry for MemoryUserRegistry {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserCredential>, StoreError> {
        Ok(self.users.get(email).map(|u| u.value().clone()))
    }
}
