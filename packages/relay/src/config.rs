//! Relay configuration.
//!
//! Only the listen port and the data directory come from the environment
//! (`PORT`, `DATA_DIR`); every other value is fixed at its default. Tests build
//! a `RelayConfig` directly with short intervals.

use std::{num::ParseIntError, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::domain::MAX_PAYLOAD_BYTES;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8787;
pub const DEFAULT_DATA_DIR: &str = "./data";

pub const ENV_PORT: &str = "PORT";
pub const ENV_DATA_DIR: &str = "DATA_DIR";

/// 設定読み込みのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid PORT '{value}': {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Heartbeat tick; a connection silent for twice this long is dropped.
    pub heartbeat_interval: Duration,
    /// Coalescing window between a state change and its snapshot write.
    pub debounce: Duration,
    /// Period of the forced flush.
    pub flush_interval: Duration,
    pub max_payload_bytes: usize,
    /// Per-connection outbound queue capacity, in frames.
    pub outbound_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            heartbeat_interval: Duration::from_secs(30),
            debounce: Duration::from_secs(2),
            flush_interval: Duration::from_secs(5),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            outbound_buffer: 256,
        }
    }
}

impl RelayConfig {
    /// Read `PORT` and `DATA_DIR` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_PORT) {
            let parsed = value.trim().parse::<u16>();
            config.port = parsed.map_err(|source| ConfigError::InvalidPort { value, source })?;
        }
        if let Some(value) = lookup(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(value);
        }
        Ok(config)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
