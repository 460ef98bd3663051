//! Configuration management for the sync client.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the REST API, without a trailing slash
    pub api_base_url: String,
    /// Bearer token sent with every request, if any
    pub api_token: Option<String>,
    /// Directory holding the cache and queue files
    pub cache_dir: PathBuf,
    /// Byte limit for the cache directory
    pub cache_quota_bytes: Option<u64>,
    /// Upper bound on every network call
    pub request_timeout: Duration,
    /// Path polled to detect reachability
    pub probe_path: String,
    /// Delay between reachability probes
    pub probe_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("SKUL_API_BASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::MissingBaseUrl)?
            .trim_end_matches('/')
            .to_string();

        let api_token = lookup("SKUL_API_TOKEN").filter(|token| !token.is_empty());

        let cache_dir = lookup("SKUL_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".skul-cache"));

        let cache_quota_bytes = match lookup("SKUL_CACHE_QUOTA_BYTES") {
            Some(raw) => Some(raw.parse().map_err(|_| ConfigError::InvalidQuota(raw))?),
            None => None,
        };

        let request_timeout = seconds(&lookup, "SKUL_REQUEST_TIMEOUT_SECS", 10)?;

        let probe_path = lookup("SKUL_PROBE_PATH").unwrap_or_else(|| "/health".to_string());

        let probe_interval = seconds(&lookup, "SKUL_PROBE_INTERVAL_SECS", 15)?;

        Ok(Self {
            api_base_url,
            api_token,
            cache_dir,
            cache_quota_bytes,
            request_timeout,
            probe_path,
            probe_interval,
        })
    }
}

fn seconds<F>(lookup: &F, name: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let secs = match lookup(name) {
        Some(raw) => raw
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidDuration { name, value: raw })?,
        None => default,
    };
    Ok(Duration::from_secs(secs))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SKUL_API_BASE_URL environment variable is required")]
    MissingBaseUrl,

    #[error("Invalid {name} value '{value}': expected a positive number of seconds")]
    InvalidDuration { name: &'static str, value: String },

    #[error("Invalid SKUL_CACHE_QUOTA_BYTES value '{0}'")]
    InvalidQuota(String),
}
