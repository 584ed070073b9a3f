//! API module providing the HTTP surface of the service.
//!
//! This module is organized into submodules:
//! - `health` - Health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration
//!
//! The OAuth2 endpoints live in [`crate::oauth2::endpoints`] and are nested at `/auth`.

pub mod health;
pub mod openapi;

pub use health::MISC_TAG;

use crate::config::AppConfig;
use crate::oauth2::{self, OAuth2State};
use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

/// Build the application router with all routes and middleware attached.
pub fn router(oauth2_state: OAuth2State) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .nest("/auth", oauth2::router(oauth2_state))
        .routes(routes!(health::health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(oauth2_state, config))]
pub async fn start_webserver(
    oauth2_state: OAuth2State,
    config: &AppConfig,
) -> color_eyre::Result<()> {
    let router = router(oauth2_state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "Server running");
    axum::serve(listener, router)
        .await
        .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
