//! Environment Configuration Loader
//!
//! Loads environment variables from the canonical location: `/etc/flowpoll/environment`
//! and builds the engine configuration from them.
//!
//! ## Usage
//!
//! Call `load_environment()` early in main() before reading any config:
//!
//! ```rust
//! use fp_core::config::{load_environment, EngineConfig};
//!
//! load_environment();
//! let engine = EngineConfig::from_env();
//! assert!(engine.history_page_size >= 1);
//! ```

use crate::{Error, Result};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Alternative paths to check (in order of priority)
pub const ENV_FILE_PATHS: &[&str] = &["/etc/flowpoll/environment", "/etc/flowpoll.env", ".env"];

pub const ENV_ENGINE_ENDPOINT: &str = "FLOWPOLL_ENGINE_ENDPOINT";
pub const ENV_STATE_MACHINE_ARN: &str = "FLOWPOLL_STATE_MACHINE_ARN";
pub const ENV_ENGINE_TIMEOUT_SECS: &str = "FLOWPOLL_ENGINE_TIMEOUT_SECS";
pub const ENV_HISTORY_PAGE_SIZE: &str = "FLOWPOLL_HISTORY_PAGE_SIZE";
pub const ENV_ENGINE_TOKEN: &str = "FLOWPOLL_ENGINE_TOKEN";

pub const DEFAULT_ENGINE_ENDPOINT: &str = "https://states.us-east-1.amazonaws.com";
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 100;

/// Upper bound the engine accepts for `maxResults`
pub const MAX_HISTORY_PAGE_SIZE: u32 = 1000;

/// Load environment variables from the first configuration file found.
///
/// `FLOWPOLL_ENV_FILE` wins over the built-in paths. Variables that are
/// already set are never overridden.
///
/// Returns the path that was loaded, or None if no file was found.
pub fn load_environment() -> Option<String> {
    if let Ok(custom_path) = std::env::var("FLOWPOLL_ENV_FILE") {
        if let Some(path) = try_load_env_file(&custom_path) {
            return Some(path);
        }
    }

    for path in ENV_FILE_PATHS {
        if let Some(loaded_path) = try_load_env_file(path) {
            return Some(loaded_path);
        }
    }

    debug!("No environment file found, using existing environment");
    None
}

fn try_load_env_file(path: &str) -> Option<String> {
    let path_obj = Path::new(path);
    if !path_obj.exists() {
        return None;
    }

    match fs::read_to_string(path_obj) {
        Ok(content) => {
            let mut loaded_count = 0;
            let mut skipped_count = 0;

            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some((key, value)) = parse_env_line(line) {
                    if std::env::var(&key).is_err() {
                        std::env::set_var(&key, &value);
                        loaded_count += 1;
                        debug!(
                            "Loaded: {}={}",
                            key,
                            if key.contains("TOKEN") || key.contains("SECRET") {
                                "***"
                            } else {
                                &value
                            }
                        );
                    } else {
                        skipped_count += 1;
                    }
                }
            }

            info!(
                "Loaded {} environment variables from {} ({} skipped - already set)",
                loaded_count, path, skipped_count
            );
            Some(path.to_string())
        }
        Err(e) => {
            warn!("Failed to read environment file {}: {}", path, e);
            None
        }
    }
}

/// Parse a single `KEY=VALUE` line. Surrounding quotes on the value are removed.
fn parse_env_line(line: &str) -> Option<(String, String)> {
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();

    if key.is_empty() {
        return None;
    }

    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);

    Some((key.to_string(), value.to_string()))
}

/// Get a configuration value with a default.
pub fn get_config(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get an optional configuration value. Empty values count as unset.
pub fn get_config_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get a boolean configuration value.
pub fn get_config_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
        .unwrap_or(default)
}

/// Get an integer configuration value.
pub fn get_config_int(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Connection settings for the workflow engine
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Base URL of the Step Functions compatible endpoint
    pub endpoint: String,
    /// Workflow definition that POST requests start
    pub state_machine_arn: Option<String>,
    /// Per-request timeout for engine calls
    pub timeout: Duration,
    /// `maxResults` sent with each history page request
    pub history_page_size: u32,
    /// Bearer token forwarded to a signing proxy
    pub token: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENGINE_ENDPOINT.to_string(),
            state_machine_arn: None,
            timeout: Duration::from_secs(DEFAULT_ENGINE_TIMEOUT_SECS),
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            token: None,
        }
    }
}

impl EngineConfig {
    /// Build the configuration from `FLOWPOLL_*` environment variables
    pub fn from_env() -> Self {
        let timeout_secs = get_config_int(ENV_ENGINE_TIMEOUT_SECS, DEFAULT_ENGINE_TIMEOUT_SECS as i64);
        let page_size = get_config_int(ENV_HISTORY_PAGE_SIZE, DEFAULT_HISTORY_PAGE_SIZE as i64);

        Self {
            endpoint: get_config(ENV_ENGINE_ENDPOINT, DEFAULT_ENGINE_ENDPOINT),
            state_machine_arn: get_config_opt(ENV_STATE_MACHINE_ARN),
            timeout: Duration::from_secs(timeout_secs.max(1) as u64),
            history_page_size: clamp_page_size(page_size),
            token: get_config_opt(ENV_ENGINE_TOKEN),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_state_machine_arn(mut self, arn: impl Into<String>) -> Self {
        self.state_machine_arn = Some(arn.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_history_page_size(mut self, size: u32) -> Self {
        self.history_page_size = clamp_page_size(size as i64);
        self
    }

    /// The configured state machine, or a configuration error
    pub fn require_state_machine_arn(&self) -> Result<&str> {
        self.state_machine_arn
            .as_deref()
            .ok_or_else(|| Error::config(format!("{} is not set", ENV_STATE_MACHINE_ARN)))
    }
}

fn clamp_page_size(size: i64) -> u32 {
    size.clamp(1, MAX_HISTORY_PAGE_SIZE as i64) as u32
}
