//! Application configuration.
//!
//! Read once at startup from an optional TOML file; every field has a
//! default so an empty (or absent) file is a valid configuration.
//!
//! ```toml
//! addr = "0.0.0.0:4000"
//! static_dir = "./ui/static"
//! session_lifetime_secs = 43200
//! secure_cookies = true
//! log_filter = "snippetbox=debug,info"
//! max_body_bytes = 1048576
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid listen address `{0}`")]
    InvalidAddr(String),
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Listen address (`host:port`).
    pub addr: String,

    /// Directory served under `/static/`.
    pub static_dir: PathBuf,

    /// Session lifetime, also the cookie's `Max-Age`.
    pub session_lifetime_secs: u64,

    /// Mark the session cookie `Secure` (set when serving behind TLS).
    pub secure_cookies: bool,

    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins if set.
    pub log_filter: String,

    /// Largest request body read before answering `413`.
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:4000".to_owned(),
            static_dir: PathBuf::from("./ui/static"),
            session_lifetime_secs: 12 * 60 * 60,
            secure_cookies: false,
            log_filter: "info".to_owned(),
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    /// Loads `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|source| ConfigError::Io { path: path.to_owned(), source })?;
                Self::from_toml(&raw)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr().map(|_| ())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.addr.parse().map_err(|_| ConfigError::InvalidAddr(self.addr.clone()))
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::from_secs(self.session_lifetime_secs)
    }
}
