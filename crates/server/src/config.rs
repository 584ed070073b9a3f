use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuth2Config {
    /// Authorization code lifetime in seconds
    #[serde(default = "default_authorization_code_lifetime")]
    pub authorization_code_lifetime: i64,
    /// Access token lifetime in seconds
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime: i64,
    /// Seconds between sweeps that delete expired authorization codes
    #[serde(default = "default_purge_interval")]
    pub purge_interval: u64,
}

impl Default for OAuth2Config {
    fn default() -> Self {
        Self {
            authorization_code_lifetime: default_authorization_code_lifetime(),
            access_token_lifetime: default_access_token_lifetime(),
            purge_interval: default_purge_interval(),
        }
    }
}

fn default_authorization_code_lifetime() -> i64 {
    600 // 10 minutes
}

fn default_access_token_lifetime() -> i64 {
    3600 // 1 hour
}

fn default_purge_interval() -> u64 {
    300
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default)]
    pub oauth2: OAuth2Config,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.oauth2.authorization_code_lifetime <= 0 {
            return Err(ConfigError::Validation(
                "oauth2.authorization_code_lifetime must be > 0".into(),
            ));
        }
        if self.oauth2.access_token_lifetime <= 0 {
            return Err(ConfigError::Validation(
                "oauth2.access_token_lifetime must be > 0".into(),
            ));
        }
        if self.oauth2.purge_interval == 0 {
            return Err(ConfigError::Validation(
                "oauth2.purge_interval must be > 0".into(),
            ));
        }
        Ok(())
    }
}

/// Load application configuration from `config.yaml` + environment overrides.
///
/// Any environment variable matching the key path separated by double
/// underscores (e.g. `OAUTH2__ACCESS_TOKEN_LIFETIME`) overrides the file value.
/// The file is optional when everything is supplied through the environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    use config::{Config, Environment, File};
    let cfg = Config::builder()
        .add_source(File::with_name("config.yaml").required(false))
        .add_source(Environment::default().separator("__"))
        .build()?;

    let app: AppConfig = cfg.try_deserialize()?;
    app.validate()?;
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(code: i64, token: i64) -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".into(),
            listen_addr: default_listen_addr(),
            oauth2: OAuth2Config {
                authorization_code_lifetime: code,
                access_token_lifetime: token,
                purge_interval: 60,
            },
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(config(600, 3600).validate().is_ok());
        let defaults = OAuth2Config::default();
        assert_eq!(defaults.authorization_code_lifetime, 600);
        assert_eq!(defaults.access_token_lifetime, 3600);
    }

    #[test]
    fn rejects_non_positive_lifetimes() {
        assert!(config(0, 3600).validate().is_err());
        assert!(config(600, -1).validate().is_err());
    }
}
