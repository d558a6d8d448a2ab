//! Runtime configuration
//!
//! Defaults come from [`constants`](crate::constants); each one can be
//! overridden by an environment variable (a `.env` file is honored).

use crate::{
    constants::{
        COINCAP_API_URL, COINCAP_WS_URL, DEFAULT_DATA_DIR, DEFAULT_FETCH_ATTEMPTS,
        REQUEST_TIMEOUT_SECS,
    },
    error::ConfigError,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_API_URL: &str = "COINCAP_API_URL";
pub const ENV_WS_URL: &str = "COINCAP_WS_URL";
pub const ENV_API_KEY: &str = "COINCAP_API_KEY";
pub const ENV_DATA_DIR: &str = "DASHBOARD_DATA_DIR";
pub const ENV_REQUEST_TIMEOUT: &str = "DASHBOARD_REQUEST_TIMEOUT_SECS";
pub const ENV_FETCH_ATTEMPTS: &str = "DASHBOARD_FETCH_ATTEMPTS";
pub const ENV_LOG_LEVEL: &str = "DASHBOARD_LOG_LEVEL";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub api_base_url: String,
    pub ws_url: String,
    /// Optional bearer token for the REST API
    pub api_key: Option<String>,
    /// Directory of the file-backed favorites store
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
    /// Attempts per REST call (1 = no retry)
    pub fetch_attempts: u32,
    pub log_level: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: COINCAP_API_URL.to_string(),
            ws_url: COINCAP_WS_URL.to_string(),
            api_key: None,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            log_level: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    /// Loads `.env` (if any), then reads overrides from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Builds a config from explicit key/value pairs; unknown keys are ignored
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();
        let mut config = Self::default();

        if let Some(url) = vars.get(ENV_API_URL) {
            config.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(url) = vars.get(ENV_WS_URL) {
            config.ws_url = url.trim().to_string();
        }
        if let Some(key) = vars.get(ENV_API_KEY) {
            config.api_key = Some(key.trim().to_string());
        }
        if let Some(dir) = vars.get(ENV_DATA_DIR) {
            config.data_dir = PathBuf::from(dir.trim());
        }
        if let Some(raw) = vars.get(ENV_REQUEST_TIMEOUT) {
            let secs: u64 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_REQUEST_TIMEOUT, raw.as_str()))?;
            if secs == 0 {
                return Err(ConfigError::invalid(ENV_REQUEST_TIMEOUT, raw.as_str()));
            }
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = vars.get(ENV_FETCH_ATTEMPTS) {
            let attempts: u32 = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid(ENV_FETCH_ATTEMPTS, raw.as_str()))?;
            if attempts == 0 {
                return Err(ConfigError::invalid(ENV_FETCH_ATTEMPTS, raw.as_str()));
            }
            config.fetch_attempts = attempts;
        }
        if let Some(level) = vars.get(ENV_LOG_LEVEL) {
            config.log_level = level.trim().to_string();
        }

        Ok(config)
    }
}
