// src/config.rs
use std::{env, fmt::Display, net::IpAddr, str::FromStr};

use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    pub max_connections: u32,
    /// Header the upstream identity provider fills with the user handle.
    pub auth_user_header: String,
    pub login_url: String,
    /// Admin routes reject every request while this is unset.
    pub admin_token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            host: try_load("HOST", "0.0.0.0")?,
            port: try_load("PORT", "3030")?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5")?,
            auth_user_header: try_load::<String>("AUTH_USER_HEADER", "x-authenticated-user")?
                .to_ascii_lowercase(),
            login_url: try_load("LOGIN_URL", "/accounts/login")?,
            admin_token: var("ADMIN_TOKEN").filter(|token| !token.is_empty()),
        })
    }

    /// Settings for tests and tooling that never open a database.
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            host: IpAddr::from([127, 0, 0, 1]),
            port: 0,
            max_connections: 1,
            auth_user_header: "x-authenticated-user".into(),
            login_url: "/accounts/login".into(),
            admin_token: Some("test-admin-token".into()),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        })
}
