//! Configuration loading from `~/.govsight/config.toml` with defaults.
//!
//! Order of precedence, lowest first: built-in defaults, the TOML file,
//! `GOVSIGHT_*` environment variables.

use crate::error::{KernelError, KernelResult};
use govsight_types::config::GovsightConfig;
use govsight_types::error::GovsightError;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Load configuration from a TOML file, with defaults and env overrides.
///
/// A missing or invalid file is not an error: defaults are used and a
/// warning is logged.
pub fn load_config(path: Option<&Path>) -> GovsightConfig {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);

    let mut config = if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<GovsightConfig>(&contents) {
                Ok(config) => {
                    info!(path = %config_path.display(), "Loaded configuration");
                    config
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        path = %config_path.display(),
                        "Failed to parse config, using defaults"
                    );
                    GovsightConfig::default()
                }
            },
            Err(e) => {
                warn!(
                    error = %e,
                    path = %config_path.display(),
                    "Failed to read config file, using defaults"
                );
                GovsightConfig::default()
            }
        }
    } else {
        info!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
        GovsightConfig::default()
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    sanitize(&mut config);
    config
}

/// The configured log level, read without logging anything.
///
/// Used before a tracing subscriber exists; `load_config` runs afterwards so
/// its warnings are not lost.
pub fn configured_log_level(path: Option<&Path>) -> String {
    resolve_log_level(path, |key| std::env::var(key).ok())
}

fn resolve_log_level(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> String {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(default_config_path);
    let from_file = std::fs::read_to_string(&config_path)
        .ok()
        .and_then(|text| toml::from_str::<GovsightConfig>(&text).ok())
        .map(|config| config.log_level);
    lookup("GOVSIGHT_LOG_LEVEL")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or(from_file)
        .unwrap_or_else(|| GovsightConfig::default().log_level)
}

/// Apply `GOVSIGHT_*` overrides read through `lookup`.
///
/// Unparseable values are ignored with a warning.
pub fn apply_overrides(config: &mut GovsightConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(home) = get("GOVSIGHT_HOME") {
        config.home_dir = PathBuf::from(home);
    }
    if let Some(db) = get("GOVSIGHT_DB_PATH") {
        config.memory.db_path = Some(PathBuf::from(db));
    }
    if let Some(level) = get("GOVSIGHT_LOG_LEVEL") {
        config.log_level = level;
    }
    if let Some(raw) = get("GOVSIGHT_VECTOR_THRESHOLD") {
        match raw.parse::<f32>() {
            Ok(v) => config.cascade.vector_threshold = v,
            Err(_) => warn!(value = %raw, "Ignoring invalid GOVSIGHT_VECTOR_THRESHOLD"),
        }
    }
    if let Some(raw) = get("GOVSIGHT_QUERY_TIMEOUT_SECS") {
        match raw.parse::<u64>() {
            Ok(v) => config.cascade.query_timeout_secs = v,
            Err(_) => warn!(value = %raw, "Ignoring invalid GOVSIGHT_QUERY_TIMEOUT_SECS"),
        }
    }
    if let Some(raw) = get("GOVSIGHT_AUTO_WEB") {
        match parse_bool(&raw) {
            Some(v) => config.web.enabled = v,
            None => warn!(value = %raw, "Ignoring invalid GOVSIGHT_AUTO_WEB"),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Clamp values that would make the cascade misbehave.
fn sanitize(config: &mut GovsightConfig) {
    let threshold = config.cascade.vector_threshold;
    if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
        let fixed = if threshold.is_finite() {
            threshold.clamp(0.0, 1.0)
        } else {
            0.75
        };
        warn!(threshold, fixed, "vector_threshold out of range");
        config.cascade.vector_threshold = fixed;
    }
    if config.cascade.top_k == 0 {
        config.cascade.top_k = 1;
    }
}

/// Write the default configuration to `path` unless a file already exists.
///
/// Returns `true` if a file was written.
pub fn write_default_config(path: &Path) -> KernelResult<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| KernelError::Govsight(e.into()))?;
    }
    let text = toml::to_string_pretty(&GovsightConfig::default())
        .map_err(|e| KernelError::Govsight(GovsightError::Serialization(e.to_string())))?;
    std::fs::write(path, text).map_err(|e| KernelError::Govsight(e.into()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(true)
}

/// Get the default config file path.
pub fn default_config_path() -> PathBuf {
    govsight_home().join("config.toml")
}

/// Get the default GovSight home directory.
pub fn govsight_home() -> PathBuf {
    govsight_types::config::default_home_dir()
}
