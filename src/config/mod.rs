use std::env;
use thiserror::Error;

// Identity handling is decided once at startup. Integrated delegates to
// the external identity provider; DevBypass pins every request to one
// configured user for local development. No ambient global default user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMode {
    Integrated,
    DevBypass { user_id: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub auth_mode: AuthMode,
    pub refresh_interval_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown AUTH_MODE: {0} (expected 'integrated' or 'dev-bypass')")]
    UnknownAuthMode(String),
    #[error("AUTH_MODE=dev-bypass requires AUTH_DEV_USER")]
    MissingDevUser,
    #[error("REFRESH_INTERVAL_SECS must be a positive integer: {0}")]
    BadRefreshInterval(String),
}

const DEFAULT_DATABASE_URL: &str = "sqlite:soy_el_mejor.db";
const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60;

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::build(
            env::var("DATABASE_URL").ok(),
            env::var("AUTH_MODE").ok(),
            env::var("AUTH_DEV_USER").ok(),
            env::var("REFRESH_INTERVAL_SECS").ok(),
        )
    }

    fn build(
        database_url: Option<String>,
        auth_mode: Option<String>,
        dev_user: Option<String>,
        refresh_interval: Option<String>,
    ) -> Result<Self, ConfigError> {
        let database_url = database_url.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let auth_mode = match auth_mode.as_deref() {
            None | Some("integrated") => AuthMode::Integrated,
            Some("dev-bypass") => match dev_user {
                Some(user_id) if !user_id.trim().is_empty() => AuthMode::DevBypass { user_id },
                _ => return Err(ConfigError::MissingDevUser),
            },
            Some(other) => return Err(ConfigError::UnknownAuthMode(other.to_string())),
        };

        let refresh_interval_secs = match refresh_interval {
            None => DEFAULT_REFRESH_INTERVAL_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::BadRefreshInterval(raw)),
            },
        };

        Ok(Self {
            database_url,
            auth_mode,
            refresh_interval_secs,
        })
    }
}
