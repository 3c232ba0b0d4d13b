use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Longest accepted session lifetime (one year)
pub const MAX_SESSION_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub stores: StoreConfig,
    pub tokens: TokenConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory of the durable log. When unset, durable requests fail with 500.
    pub durable_path: Option<PathBuf>,
    /// Directory of the ephemeral token store (required)
    pub ephemeral_path: PathBuf,
    /// Deadline for a single store call
    pub timeout_ms: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub cleanup_interval_seconds: u64,
    pub session_ttl_seconds: u64,
}

impl TokenConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_seconds: 60,
            session_ttl_seconds: 86400, // 24 hours
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ephemeral_path = get("EPHEMERAL_STORE_PATH")
            .map(PathBuf::from)
            .ok_or(ConfigError::Missing("EPHEMERAL_STORE_PATH"))?;
        let durable_path = get("DURABLE_STORE_PATH").map(PathBuf::from);

        let bind_address = get("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let defaults = TokenConfig::default();
        let config = Config {
            server: ServerConfig { bind_address },
            stores: StoreConfig {
                durable_path,
                ephemeral_path,
                timeout_ms: parse_or(&get, "STORE_TIMEOUT_MS", 2_000)?,
            },
            tokens: TokenConfig {
                cleanup_interval_seconds: parse_or(
                    &get,
                    "CLEANUP_INTERVAL_SECONDS",
                    defaults.cleanup_interval_seconds,
                )?,
                session_ttl_seconds: parse_or(
                    &get,
                    "SESSION_TTL_SECONDS",
                    defaults.session_ttl_seconds,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.session_ttl_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "SESSION_TTL_SECONDS must be greater than 0".to_string(),
            ));
        }
        if self.tokens.session_ttl_seconds > MAX_SESSION_TTL_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "SESSION_TTL_SECONDS must be at most {MAX_SESSION_TTL_SECONDS}"
            )));
        }
        if self.tokens.cleanup_interval_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "CLEANUP_INTERVAL_SECONDS must be greater than 0".to_string(),
            ));
        }
        if self.stores.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "STORE_TIMEOUT_MS must be greater than 0".to_string(),
            ));
        }

        if self.stores.durable_path.is_none() {
            tracing::warn!(
                "DURABLE_STORE_PATH is not set. Login, presence and message requests will fail."
            );
        }

        Ok(())
    }
}

fn parse_or<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::ValidationError(format!("{key} must be an integer, got {raw:?}"))
        }),
        None => Ok(default),
    }
}
