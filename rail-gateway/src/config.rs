//! Runtime configuration from environment variables.

use std::net::SocketAddr;

use tracing::warn;

use crate::darwin::{DEFAULT_STAFF_BASE_URL, DarwinConfig};
use crate::delays::DEFAULT_DELAY_THRESHOLD_MINUTES;
use crate::stations::StationClientConfig;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Error returned for configuration that can't be used at all.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid BIND_ADDR {value:?}: {source}")]
    BindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    pub darwin: DarwinConfig,
    /// Staff endpoint, enabled when `DARWIN_STAFF_API_KEY` is set
    pub staff: Option<DarwinConfig>,
    pub stations: StationClientConfig,
    pub delay_threshold_minutes: i64,
    /// Token callers must send to be served with the gateway's own keys
    pub client_access_token: Option<String>,
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout_secs = parse_or(&var, "UPSTREAM_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS);
        let max_concurrent = parse_or(&var, "UPSTREAM_MAX_CONCURRENT", DEFAULT_MAX_CONCURRENT);

        let api_key = var("DARWIN_API_KEY").unwrap_or_else(|| {
            warn!("DARWIN_API_KEY not set, only requests carrying their own key will work");
            String::new()
        });

        let mut darwin = DarwinConfig::new(api_key.clone())
            .with_timeout(timeout_secs)
            .with_max_concurrent(max_concurrent);
        if let Some(url) = var("DARWIN_BASE_URL") {
            darwin = darwin.with_base_url(url);
        }

        let staff = var("DARWIN_STAFF_API_KEY").map(|key| {
            DarwinConfig::staff(key)
                .with_base_url(
                    var("DARWIN_STAFF_BASE_URL").unwrap_or_else(|| DEFAULT_STAFF_BASE_URL.into()),
                )
                .with_timeout(timeout_secs)
                .with_max_concurrent(max_concurrent)
        });

        let mut stations = StationClientConfig::new(var("STATIONS_API_KEY").unwrap_or(api_key))
            .with_timeout(timeout_secs);
        if let Some(url) = var("STATIONS_BASE_URL") {
            stations = stations.with_base_url(url);
        }

        let delay_threshold_minutes = parse_or(
            &var,
            "DELAY_MINUTES_THRESHOLD",
            DEFAULT_DELAY_THRESHOLD_MINUTES,
        );

        let client_access_token = var("CLIENT_ACCESS_TOKEN");

        let bind = var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse()
            .map_err(|source| ConfigError::BindAddr {
                value: bind.clone(),
                source,
            })?;

        Ok(Self {
            darwin,
            staff,
            stations,
            delay_threshold_minutes,
            client_access_token,
            bind_addr,
        })
    }
}

/// Parse a variable, falling back to `default` with a warning when invalid.
fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match var(key) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, %default, "invalid value, using default");
            default
        }),
    }
}
