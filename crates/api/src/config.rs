//! Process configuration read from the environment.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use fiscalhub_observability::LogFormat;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TOKEN_TTL_MINUTES: i64 = 24 * 60;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("BIND_ADDR is not a socket address: {0}")]
    BindAddr(String),

    #[error("TOKEN_TTL_MINUTES must be a positive integer: {0}")]
    TokenTtl(String),

    #[error("LOG_FORMAT: {0}")]
    LogFormat(String),

    #[error("ADMIN_USERNAME and ADMIN_PASSWORD must be set together")]
    PartialAdmin,
}

/// Credentials of an administrator created at startup if missing.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_secret_defaulted: bool,
    pub token_ttl: Duration,
    pub log_format: LogFormat,
    pub admin: Option<AdminBootstrap>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::BindAddr(e.to_string()))?;

        let token_ttl = match get("TOKEN_TTL_MINUTES") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(minutes) if minutes > 0 => Duration::minutes(minutes),
                _ => return Err(ConfigError::TokenTtl(raw)),
            },
            None => Duration::minutes(DEFAULT_TOKEN_TTL_MINUTES),
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => raw.parse().map_err(|e: fiscalhub_observability::ParseLogFormatError| {
                ConfigError::LogFormat(e.to_string())
            })?,
            None => LogFormat::default(),
        };

        let (jwt_secret, jwt_secret_defaulted) = match get("JWT_SECRET") {
            Some(secret) => (secret, false),
            None => (DEV_JWT_SECRET.to_string(), true),
        };

        let admin = match (get("ADMIN_USERNAME"), get("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminBootstrap { username, password }),
            (None, None) => None,
            _ => return Err(ConfigError::PartialAdmin),
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            jwt_secret,
            jwt_secret_defaulted,
            token_ttl,
            log_format,
            admin,
        })
    }

    /// Log warnings for settings that are unsafe outside development.
    pub fn warn_on_insecure_defaults(&self) {
        if self.jwt_secret_defaulted {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
        }
        if self.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (data is lost on exit)");
        }
    }
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("jwt_secret_defaulted", &self.jwt_secret_defaulted)
            .field("token_ttl_minutes", &self.token_ttl.num_minutes())
            .field("log_format", &self.log_format)
            .field("admin", &self.admin.as_ref().map(|a| a.username.as_str()))
            .finish()
    }
}
