//! SeaORM entities for the OAuth2 tables.

pub mod oauth2_access_token;
pub mod oauth2_authorization_code;
pub mod oauth2_client;
pub mod oauth2_user;
