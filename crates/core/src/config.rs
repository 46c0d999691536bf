//! Engine configuration.
//!
//! Configuration is read from `OEMBED_CONFIG_PATH` when set, otherwise from
//! `<config_dir>/oembed/config.json`. A missing file yields the defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use oembed_util::resolve_config_path;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ProviderTableError};
use crate::providers::{ProviderTable, load_provider_table};

pub const CONFIG_PATH_ENV: &str = "OEMBED_CONFIG_PATH";

/// How non-2xx responses are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusPolicy {
    /// Log the status and carry on parsing the body.
    #[default]
    Lenient,
    /// Fail with a transport error on any non-2xx status.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Total time budget for a single HTTP exchange.
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
    pub status_policy: StatusPolicy,
    /// Maximum number of body characters kept in decode errors. Zero keeps the whole body.
    pub max_body_preview: usize,
    /// Provider table file replacing the built-in table.
    pub providers_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            connect_timeout_secs: 10,
            user_agent: format!("oembed-resolver/{}", env!("CARGO_PKG_VERSION")),
            status_policy: StatusPolicy::Lenient,
            max_body_preview: 4096,
            providers_path: None,
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Load the provider table this configuration points at.
    pub fn load_providers(&self) -> Result<ProviderTable, ProviderTableError> {
        load_provider_table(self.providers_path.as_deref())
    }
}

/// Returns the default path for the engine configuration file.
pub fn default_config_path() -> PathBuf {
    resolve_config_path(CONFIG_PATH_ENV, "config.json")
}

/// Loads the engine configuration from the default path.
pub fn load_config() -> Result<EngineConfig, ConfigError> {
    load_config_from_path(&default_config_path())
}

/// Loads the engine configuration from a specific path.
pub fn load_config_from_path(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let config = load_config_from_path(Path::new("/definitely/not/here/config.json")).expect("defaults");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.status_policy, StatusPolicy::Lenient);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"timeoutSecs": 5, "statusPolicy": "strict"}"#).expect("write");

        let config = load_config_from_path(&path).expect("config");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.status_policy, StatusPolicy::Strict);
        assert_eq!(config.max_body_preview, 4096);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"timeout": 5}"#).expect("write");

        let error = load_config_from_path(&path).expect_err("must fail");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn default_path_honors_environment_override() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("/etc/oembed/config.json"), || {
            assert_eq!(default_config_path(), PathBuf::from("/etc/oembed/config.json"));
        });
    }
}
