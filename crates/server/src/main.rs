use sea_orm::Database;
use shopping_list_server::api::start_webserver;
use shopping_list_server::config::load_config;
use shopping_list_server::oauth2::{OAuth2State, store::spawn_code_purge_task};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "shopping_list_server=info,tower_http=info,sea_orm=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_level(true))
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    initialize_tracing();

    let config = load_config()?;

    let db = Arc::new(Database::connect(&config.database_url).await?);

    let oauth2_state = OAuth2State::new(db, &config.oauth2);
    tracing::info!(
        code_lifetime = config.oauth2.authorization_code_lifetime,
        token_lifetime = config.oauth2.access_token_lifetime,
        "OAuth2 configuration"
    );

    // Expired codes are already rejected on use; the sweep only reclaims storage.
    spawn_code_purge_task(
        oauth2_state.codes.clone(),
        Duration::from_secs(config.oauth2.purge_interval),
    );

    start_webserver(oauth2_state, &config).await?;
    Ok(())
}
