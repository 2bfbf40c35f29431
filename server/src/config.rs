//! Server configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Mirrors the LLM config: every knob has a default, and only values that
//! cannot be recovered from (an unparseable `PORT`) are hard errors. A
//! `.env` file is loaded by `main` before this runs.

use std::path::PathBuf;
use std::time::Duration;

use crate::store::StoreLimits;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
pub const DEFAULT_STORE_TTL_SECS: u64 = 86_400;
pub const DEFAULT_STORE_CAPACITY: usize = 10_000;
pub const DEFAULT_STORE_SWEEP_INTERVAL_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Directory holding a built web client, served as the router fallback.
    pub static_dir: Option<PathBuf>,
    pub store: StoreLimits,
    pub sweep_interval: Duration,
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `BIND_ADDR`: default `0.0.0.0`
    /// - `STATIC_DIR`: unset disables static file serving
    /// - `STORE_TTL_SECS`: idle lifetime of a conversation entry, default 86400
    /// - `STORE_CAPACITY`: max tracked conversations, default 10000
    /// - `STORE_SWEEP_INTERVAL_SECS`: expired-entry sweep period, default 300
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `PORT` is set but not a valid port,
    /// or if `STORE_TTL_SECS` is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT", value: raw.clone() })?,
            Err(_) => DEFAULT_PORT,
        };
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let static_dir = std::env::var("STATIC_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        // A zero TTL would expire every entry on write and silently drop
        // conversation continuity.
        let ttl_secs = env_parse("STORE_TTL_SECS", DEFAULT_STORE_TTL_SECS);
        if ttl_secs == 0 {
            return Err(ConfigError::Invalid { var: "STORE_TTL_SECS", value: "0".to_string() });
        }
        let store = StoreLimits {
            ttl: Duration::from_secs(ttl_secs),
            capacity: env_parse("STORE_CAPACITY", DEFAULT_STORE_CAPACITY).max(1),
        };
        let sweep_interval =
            Duration::from_secs(env_parse("STORE_SWEEP_INTERVAL_SECS", DEFAULT_STORE_SWEEP_INTERVAL_SECS).max(1));

        Ok(Self { bind_addr, port, static_dir, store, sweep_interval })
    }

    /// `host:port` string handed to the TCP listener.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Serializes tests that mutate process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
