//! OAuth2 authorization and token service for the shopping list backend.
//!
//! Issues single-use authorization codes and bearer access tokens to
//! registered clients, authenticating clients and users with salted hashes.

pub mod api;
pub mod config;
pub mod entity;
pub mod oauth2;
