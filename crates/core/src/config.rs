//! Persisted device configuration.
//!
//! Loaded once at startup from a JSON file written by the provisioning
//! script. A missing or malformed file is fatal: the service cannot run
//! without a token and poll interval, and this is the one failure class the
//! scheduler never tries to recover from at runtime.

use std::path::Path;

use inkview_api::ViewType;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum allowed poll cadence; protects the remote API from tight loops.
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;

/// Errors raised while loading the device configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    Missing(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// How frames are packed for the panel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    Mono,
    #[default]
    Gray4,
}

/// Device identity and runtime tunables.
///
/// Immutable for the process lifetime; the scheduler and API client hold
/// read-only references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    /// Bearer token identifying this device to the service.
    pub token: String,
    /// Base URL of the remote service.
    pub api_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default)]
    pub view_type: ViewType,
    #[serde(default)]
    pub display_mode: DisplayMode,
    /// Re-present even unchanged content after this long, to clear ghosting.
    #[serde(default = "default_full_refresh")]
    pub full_refresh_interval_secs: u64,
    /// Cap on the exponential fetch backoff.
    #[serde(default = "default_backoff_ceiling")]
    pub backoff_ceiling_secs: u64,
    /// Fixed re-check cadence after a 401/403 (token presumed revoked).
    #[serde(default = "default_unauthorized_retry")]
    pub unauthorized_retry_secs: u64,
    /// Present the "disconnected" frame after this many consecutive fetch
    /// failures, so the panel never shows stale content without warning.
    #[serde(default = "default_disconnected_after")]
    pub disconnected_after_failures: u32,
    /// Where the simulator driver writes the latest frame.
    #[serde(default = "default_frame_output")]
    pub frame_output_path: String,
}

fn default_poll_interval() -> u64 {
    60
}

fn default_full_refresh() -> u64 {
    6 * 60 * 60
}

fn default_backoff_ceiling() -> u64 {
    900
}

fn default_unauthorized_retry() -> u64 {
    900
}

fn default_disconnected_after() -> u32 {
    10
}

fn default_frame_output() -> String {
    "/var/lib/inkview/frame.pgm".to_string()
}

impl DeviceConfig {
    /// Read and validate the configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::Missing(path.display().to_string())
            } else {
                ConfigError::Invalid(format!("{}: {}", path.display(), e))
            }
        })?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::Invalid("token must not be empty".to_string()));
        }
        if self.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "apiUrl must not be empty".to_string(),
            ));
        }
        if self.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            return Err(ConfigError::Invalid(format!(
                "pollIntervalSecs must be >= {}",
                MIN_POLL_INTERVAL_SECS
            )));
        }
        if self.backoff_ceiling_secs < self.poll_interval_secs {
            return Err(ConfigError::Invalid(
                "backoffCeilingSecs must be >= pollIntervalSecs".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> String {
        r#"{ "token": "tok-123", "apiUrl": "https://cal.example.org" }"#.to_string()
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let config: DeviceConfig = serde_json::from_str(&minimal_json()).unwrap();
        config.validate().unwrap();
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.view_type, ViewType::Weekly);
        assert_eq!(config.display_mode, DisplayMode::Gray4);
        assert_eq!(config.full_refresh_interval_secs, 21_600);
        assert_eq!(config.disconnected_after_failures, 10);
    }

    #[test]
    fn poll_interval_floor_is_enforced() {
        let raw = r#"{ "token": "t", "apiUrl": "https://x", "pollIntervalSecs": 5 }"#;
        let config: DeviceConfig = serde_json::from_str(raw).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn empty_token_is_rejected() {
        let raw = r#"{ "token": " ", "apiUrl": "https://x" }"#;
        let config: DeviceConfig = serde_json::from_str(raw).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn missing_file_is_distinguished_from_malformed() {
        let missing = DeviceConfig::load(Path::new("/nonexistent/inkview.json"));
        assert!(matches!(missing, Err(ConfigError::Missing(_))));

        let path = std::env::temp_dir().join("inkview-config-malformed-test.json");
        std::fs::write(&path, "{ not json").unwrap();
        let malformed = DeviceConfig::load(&path);
        assert!(matches!(malformed, Err(ConfigError::Invalid(_))));
    }
}
