//! Server configuration.
//!
//! Values come from defaults, then an optional TOML file, then `TEMPO_*`
//! environment variables, then command-line flags applied by the binary.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tempo_core::StoreConfig;

pub const ENV_BIND_ADDRESS: &str = "TEMPO_BIND_ADDRESS";
pub const ENV_CORS_ORIGIN: &str = "TEMPO_CORS_ORIGIN";
pub const ENV_TICK_INTERVAL_MS: &str = "TEMPO_TICK_INTERVAL_MS";
pub const ENV_TOKEN_SECRET: &str = "TEMPO_TOKEN_SECRET";
pub const ENV_STORE_URL: &str = "TEMPO_STORE_URL";

/// Secret used when none is configured. Only suitable for local development.
pub const DEV_TOKEN_SECRET: &str = "tempo-dev-secret";

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Web server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "127.0.0.1:3000")
    pub bind_address: String,
    /// Allowed CORS origin (e.g., "http://localhost:5173")
    pub cors_origin: String,
    /// Reconciliation tick period in milliseconds
    pub tick_interval_ms: u64,
    /// Secret used to sign and verify bearer tokens
    pub token_secret: String,
    /// Timer store connection. Defaults to `mem://`; set `url` to
    /// `rocksdb://<path>` (or `TEMPO_STORE_URL`) to keep live timers across
    /// restarts.
    pub store: StoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            cors_origin: "http://localhost:5173".to_string(),
            tick_interval_ms: 1000,
            token_secret: DEV_TOKEN_SECRET.to_string(),
            store: StoreConfig::in_memory(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Defaults, overlaid with `path` when given, then the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or an environment value is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env(|key| std::env::var(key).ok())?.validated()
    }

    /// Apply `TEMPO_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` if the tick interval is not a number.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(bind) = lookup(ENV_BIND_ADDRESS) {
            self.bind_address = bind;
        }

        if let Some(origin) = lookup(ENV_CORS_ORIGIN) {
            self.cors_origin = origin;
        }

        if let Some(ms) = lookup(ENV_TICK_INTERVAL_MS) {
            self.tick_interval_ms = ms
                .trim()
                .parse()
                .map_err(|e| ConfigError::invalid(ENV_TICK_INTERVAL_MS, format!("{e}")))?;
        }

        if let Some(secret) = lookup(ENV_TOKEN_SECRET) {
            self.token_secret = secret;
        }

        if let Some(url) = lookup(ENV_STORE_URL) {
            self.store = self.store.with_url(url);
        }

        Ok(self)
    }

    /// Set the bind address.
    #[must_use]
    pub fn bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    /// Check the configuration and return it unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for an unparsable bind address, a zero tick interval
    /// or an empty token secret.
    pub fn validated(self) -> Result<Self, ConfigError> {
        self.socket_addr()?;
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::invalid("tick_interval_ms", "must be greater than zero"));
        }
        if self.token_secret.is_empty() {
            return Err(ConfigError::invalid("token_secret", "must not be empty"));
        }
        Ok(self)
    }

    /// The bind address as a socket address.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` if the address does not parse.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address
            .parse()
            .map_err(|e| ConfigError::invalid("bind_address", format!("{e}")))
    }

    /// Reconciliation tick period.
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Check if the development secret is still in use.
    #[must_use]
    pub fn uses_dev_secret(&self) -> bool {
        self.token_secret == DEV_TOKEN_SECRET
    }
}
