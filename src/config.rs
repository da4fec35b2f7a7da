use std::{path::Path, sync::Arc};

use axum::{Router, extract::DefaultBodyLimit};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use crate::{
    error::ConfigError,
    state::{AppState, DbPool},
    tournaments::rounds::import::http::upload_routes,
};

/// Multipart framing around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub database_url: String,
    pub bind: String,
    /// The largest spreadsheet accepted by the upload endpoint, in bytes.
    pub max_upload_bytes: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: ":memory:".to_string(),
            bind: "0.0.0.0:8000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Reads `path` if given (otherwise starts from the defaults), then lets
    /// `DATABASE_URL` override the database location.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| {
                    ConfigError::Read {
                        path: path.display().to_string(),
                        source,
                    }
                })?;
                Self::from_toml(&text)?
            }
            None => Self::default(),
        };

        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }

        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Falls back to `info` when `log_level` is not a level name.
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

pub fn create_app(pool: DbPool, config: Config) -> Router {
    let body_limit = config.max_upload_bytes + MULTIPART_OVERHEAD;
    let state = AppState {
        pool,
        config: Arc::new(config),
    };

    Router::new()
        .merge(upload_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            database_url = "league.sqlite"
            max_upload_bytes = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.database_url, "league.sqlite");
        assert_eq!(config.max_upload_bytes, 1024);
        assert_eq!(config.bind, Config::default().bind);
        assert_eq!(config.tracing_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::from_toml("databse_url = \"x\"").is_err());
    }
}
