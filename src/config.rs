use chrono::Duration;
use std::{env, fmt, net::SocketAddr};
use thiserror::Error;

/// AppConfig
///
/// Holds the application's entire configuration state. Built once at startup and
/// immutable afterwards; handlers and extractors reach it through `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and whether a database is mandatory.
    pub env: Env,
    // Postgres connection string. `None` (local only) selects the in-memory store.
    pub database_url: Option<String>,
    // Signing secrets and lifetimes for both token kinds.
    pub tokens: TokenSettings,
    // Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
    // Origins allowed by CORS. Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
}

/// Env
///
/// Defines the runtime context. Local favours developer convenience (pretty logs,
/// optional database); Production requires the full infrastructure.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// TokenSettings
///
/// Secrets and lifetimes for the access and refresh signing domains.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Lifetime of access tokens minted by the refresh endpoint.
    pub refreshed_access_ttl: Duration,
}

impl fmt::Debug for TokenSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSettings")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("refreshed_access_ttl", &self.refreshed_access_ttl)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} is not valid: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("JWT_SECRET and JWT_REFRESH_SECRET must differ")]
    SharedSecret,
}

const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;
const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_REFRESHED_ACCESS_TTL_SECS: i64 = 15 * 60;
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";

impl Default for AppConfig {
    /// default
    ///
    /// A complete, non-panicking configuration for test setup: in-memory store,
    /// fixed secrets and the standard lifetimes.
    fn default() -> Self {
        Self {
            env: Env::Local,
            database_url: None,
            tokens: TokenSettings {
                access_secret: "local-access-secret-for-tests".to_string(),
                refresh_secret: "local-refresh-secret-for-tests".to_string(),
                access_ttl: Duration::seconds(DEFAULT_ACCESS_TTL_SECS),
                refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TTL_SECS),
                refreshed_access_ttl: Duration::seconds(DEFAULT_REFRESHED_ACCESS_TTL_SECS),
            },
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment. Fails fast: a missing
    /// secret or a malformed value is returned as a `ConfigError` and `main` refuses
    /// to start.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// from_lookup
    ///
    /// Builds the configuration from an arbitrary key lookup. Empty values are
    /// treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let env = match get("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let database_url = get("DATABASE_URL");
        if env == Env::Production && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let access_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        let refresh_secret =
            get("JWT_REFRESH_SECRET").ok_or(ConfigError::Missing("JWT_REFRESH_SECRET"))?;
        if access_secret == refresh_secret {
            return Err(ConfigError::SharedSecret);
        }

        let tokens = TokenSettings {
            access_secret,
            refresh_secret,
            access_ttl: ttl(&get, "ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TTL_SECS)?,
            refresh_ttl: ttl(&get, "REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TTL_SECS)?,
            refreshed_access_ttl: ttl(
                &get,
                "REFRESHED_ACCESS_TOKEN_TTL_SECS",
                DEFAULT_REFRESHED_ACCESS_TTL_SECS,
            )?,
        };

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                key: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            env,
            database_url,
            tokens,
            bind_addr,
            cors_allowed_origins,
        })
    }
}

fn ttl(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default_secs: i64,
) -> Result<Duration, ConfigError> {
    let secs = match get(key) {
        Some(raw) => raw.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })?,
        None => default_secs,
    };
    if secs <= 0 {
        return Err(ConfigError::Invalid {
            key,
            reason: "must be a positive number of seconds".to_string(),
        });
    }
    Ok(Duration::seconds(secs))
}
