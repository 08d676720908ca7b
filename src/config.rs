//! Client configuration.
//!
//! Resolution order for every setting: command-line flag, then environment
//! variable, then `~/.affinity/config.json`, then the built-in default. The
//! config file is optional; an unreadable or malformed file logs at debug
//! and is treated as absent.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const API_KEY_ENV: &str = "AFFINITY_API_KEY";
pub const AUTH_MODE_ENV: &str = "AFFINITY_AUTH_MODE";
pub const BASE_URL_ENV: &str = "AFFINITY_BASE_URL";

pub const DEFAULT_BASE_URL: &str = "https://api.affinity.co";

/// How the API key is presented to the server.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// HTTP Basic with an empty username and the key as password.
    #[default]
    Basic,
    /// `Authorization: Bearer <key>`.
    Bearer,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "basic" => Ok(AuthMode::Basic),
            "bearer" => Ok(AuthMode::Bearer),
            other => Err(format!("unknown auth mode {other:?} (expected basic|bearer)")),
        }
    }
}

/// Optional on-disk configuration.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConfigFile {
    pub api_key: Option<String>,
    pub auth_mode: Option<AuthMode>,
    pub base_url: Option<String>,
}

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: Option<String>,
    pub auth_mode: AuthMode,
    pub base_url: String,
}

/// Settings taken from command-line flags; `None` defers to the environment
/// and config file.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub api_key: Option<String>,
    pub auth_mode: Option<AuthMode>,
    pub base_url: Option<String>,
}

pub fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_default()
        .join(".affinity")
        .join("config.json")
}

pub fn load_config_file(path: &Path) -> ConfigFile {
    let Ok(content) = std::fs::read_to_string(path) else {
        return ConfigFile::default();
    };
    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(error) => {
            log::debug!("ignoring malformed config file {}: {error}", path.display());
            ConfigFile::default()
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Resolve the effective configuration from flag overrides, the process
/// environment, and a config file.
pub fn resolve_with_file(overrides: &ConfigOverrides, file: &ConfigFile) -> ApiConfig {
    let api_key = overrides
        .api_key
        .clone()
        .or_else(|| env_var(API_KEY_ENV))
        .or_else(|| file.api_key.clone());

    let auth_mode = overrides
        .auth_mode
        .or_else(|| env_var(AUTH_MODE_ENV).and_then(|value| value.parse().ok()))
        .or(file.auth_mode)
        .unwrap_or_default();

    let base_url = overrides
        .base_url
        .clone()
        .or_else(|| env_var(BASE_URL_ENV))
        .or_else(|| file.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    ApiConfig {
        api_key,
        auth_mode,
        base_url,
    }
}

pub fn resolve(overrides: &ConfigOverrides) -> ApiConfig {
    resolve_with_file(overrides, &load_config_file(&config_path()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mode_parsing() {
        assert_eq!("basic".parse::<AuthMode>().unwrap(), AuthMode::Basic);
        assert_eq!("Bearer".parse::<AuthMode>().unwrap(), AuthMode::Bearer);
        assert!("token".parse::<AuthMode>().is_err());
    }

    #[test]
    fn test_flag_overrides_win_over_file() {
        let file = ConfigFile {
            api_key: Some("file-key".to_string()),
            auth_mode: Some(AuthMode::Bearer),
            base_url: Some("https://file.example".to_string()),
        };
        let overrides = ConfigOverrides {
            api_key: Some("flag-key".to_string()),
            auth_mode: None,
            base_url: None,
        };

        let config = resolve_with_file(&overrides, &file);
        assert_eq!(config.api_key.as_deref(), Some("flag-key"));
        assert_eq!(config.auth_mode, AuthMode::Bearer);
        assert_eq!(config.base_url, "https://file.example");
    }

    #[test]
    fn test_defaults_apply_when_nothing_is_set() {
        let config = resolve_with_file(&ConfigOverrides::default(), &ConfigFile::default());
        assert_eq!(config.auth_mode, AuthMode::Basic);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_load_config_file_tolerates_bad_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let missing = load_config_file(&path);
        assert!(missing.api_key.is_none());

        std::fs::write(&path, "not json").unwrap();
        let malformed = load_config_file(&path);
        assert!(malformed.api_key.is_none());

        std::fs::write(&path, r#"{ "api_key": "k", "auth_mode": "bearer" }"#).unwrap();
        let loaded = load_config_file(&path);
        assert_eq!(loaded.api_key.as_deref(), Some("k"));
        assert_eq!(loaded.auth_mode, Some(AuthMode::Bearer));
    }
}
