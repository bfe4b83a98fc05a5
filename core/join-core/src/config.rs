//! Configuration loading for the join controller and its HTTP service.
//!
//! Reads `~/.bambinos/join.toml` (or an explicit path). A missing file yields
//! defaults; a file that fails to parse is an error rather than a silent
//! fallback, so a typo in the base URL does not quietly poll localhost.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{JoinError, Result};

const DEFAULT_CONFIG_RELATIVE_PATH: &str = ".bambinos/join.toml";
const API_URL_ENV: &str = "BAMBINOS_API_URL";
const TOKEN_ENV: &str = "BAMBINOS_TOKEN";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_STARTING_SOON_MINUTES: u64 = 30;
pub const DEFAULT_RETRY_NOTICE: &str = "Could not check the class status. Retrying shortly.";

pub const MAX_POLL_INTERVAL_SECS: u64 = 24 * 60 * 60;
pub const MAX_STARTING_SOON_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JoinConfig {
    pub api_base_url: String,
    pub auth_token: Option<String>,
    pub poll_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub starting_soon_minutes: u64,
    pub retry_notice: String,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_token: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            starting_soon_minutes: DEFAULT_STARTING_SOON_MINUTES,
            retry_notice: DEFAULT_RETRY_NOTICE.to_string(),
        }
    }
}

/// Polling parameters handed to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub retry_notice: String,
}

impl Default for PollSettings {
    fn default() -> Self {
        JoinConfig::default().poll_settings()
    }
}

impl JoinConfig {
    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: Duration::seconds(
                self.poll_interval_secs.clamp(1, MAX_POLL_INTERVAL_SECS) as i64,
            ),
            retry_notice: self.retry_notice.clone(),
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn starting_soon_window(&self) -> Duration {
        Duration::minutes(self.starting_soon_minutes.min(MAX_STARTING_SOON_MINUTES) as i64)
    }

    /// Rejects values too large to schedule with.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(format!(
                "poll_interval_secs must be at most {} (got {})",
                MAX_POLL_INTERVAL_SECS, self.poll_interval_secs
            ));
        }
        if self.starting_soon_minutes > MAX_STARTING_SOON_MINUTES {
            return Err(format!(
                "starting_soon_minutes must be at most {} (got {})",
                MAX_STARTING_SOON_MINUTES, self.starting_soon_minutes
            ));
        }
        Ok(())
    }

    /// Applies `BAMBINOS_API_URL` / `BAMBINOS_TOKEN` on top of file values.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(API_URL_ENV).filter(|value| !value.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|value| !value.trim().is_empty()) {
            self.auth_token = Some(token.trim().to_string());
        }
    }

    /// Copy safe to print: the token is replaced with a marker.
    pub fn redacted(&self) -> Self {
        Self {
            auth_token: self.auth_token.as_ref().map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_RELATIVE_PATH))
}

/// Loads the file config, then layers environment overrides on top.
pub fn load_config(path: Option<PathBuf>) -> Result<JoinConfig> {
    let mut config = load_config_file(path)?;
    config.apply_env_overrides(|key| env::var(key).ok());
    Ok(config)
}

pub fn load_config_file(path: Option<PathBuf>) -> Result<JoinConfig> {
    let Some(config_path) = path.or_else(default_config_path) else {
        return Ok(JoinConfig::default());
    };

    if !config_path.exists() {
        return Ok(JoinConfig::default());
    }

    let content = fs_err::read_to_string(&config_path).map_err(|err| JoinError::Io {
        context: format!("reading {}", config_path.display()),
        source: err,
    })?;
    let config =
        toml::from_str::<JoinConfig>(&content).map_err(|err| JoinError::ConfigMalformed {
            path: config_path.clone(),
            details: err.to_string(),
        })?;
    config
        .validate()
        .map_err(|details| JoinError::ConfigMalformed {
            path: config_path,
            details,
        })?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn load_config_defaults_when_file_missing() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("missing.toml");
        let config = load_config_file(Some(path)).expect("load config");
        assert_eq!(config, JoinConfig::default());
        assert_eq!(config.poll_interval_secs, 60);
        assert_eq!(config.starting_soon_minutes, 30);
    }

    #[test]
    fn load_config_parses_partial_file() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("join.toml");
        fs_err::write(
            &path,
            r#"
api_base_url = "https://api.bambinos.example/v1"
poll_interval_secs = 30
retry_notice = "Hang tight"
"#,
        )
        .expect("write config");

        let config = load_config_file(Some(path)).expect("load config");
        assert_eq!(config.api_base_url, "https://api.bambinos.example/v1");
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.retry_notice, "Hang tight");
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn load_config_rejects_unknown_keys() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("join.toml");
        fs_err::write(&path, "poll_intervall_secs = 5\n").expect("write config");

        let err = load_config_file(Some(path)).unwrap_err();
        assert!(matches!(err, JoinError::ConfigMalformed { .. }));
    }

    #[test]
    fn env_overrides_replace_url_and_token() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("BAMBINOS_API_URL", " https://staging.example/api "),
            ("BAMBINOS_TOKEN", "secret"),
        ]);
        let mut config = JoinConfig::default();
        config.apply_env_overrides(|key| vars.get(key).map(|value| value.to_string()));

        assert_eq!(config.api_base_url, "https://staging.example/api");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.redacted().auth_token.as_deref(), Some("<redacted>"));
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let config = JoinConfig {
            poll_interval_secs: 0,
            ..JoinConfig::default()
        };
        assert_eq!(config.poll_settings().interval, Duration::seconds(1));
    }

    #[test]
    fn load_config_rejects_oversized_intervals() {
        let temp_dir = tempfile::tempdir().expect("temp dir");
        let path = temp_dir.path().join("join.toml");

        fs_err::write(&path, "poll_interval_secs = 9000000000000\n").expect("write config");
        let Err(JoinError::ConfigMalformed { details, .. }) = load_config_file(Some(path.clone()))
        else {
            panic!("expected ConfigMalformed for poll_interval_secs");
        };
        assert!(details.contains("poll_interval_secs"), "{}", details);

        fs_err::write(&path, "starting_soon_minutes = 9223372036854775807\n")
            .expect("write config");
        let Err(JoinError::ConfigMalformed { details, .. }) = load_config_file(Some(path)) else {
            panic!("expected ConfigMalformed for starting_soon_minutes");
        };
        assert!(details.contains("starting_soon_minutes"), "{}", details);
    }

    #[test]
    fn oversized_in_memory_values_are_capped() {
        let config = JoinConfig {
            poll_interval_secs: u64::MAX,
            starting_soon_minutes: u64::MAX,
            ..JoinConfig::default()
        };
        assert_eq!(config.poll_settings().interval, Duration::seconds(86_400));
        assert_eq!(config.starting_soon_window(), Duration::minutes(10_080));
    }
}
