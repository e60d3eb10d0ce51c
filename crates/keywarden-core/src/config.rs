//! Application configuration management.
//!
//! Configuration is stored at `~/.config/keywarden/config.json`. Every field
//! has a default, so a missing or partial file works, and the two backend
//! URLs can be overridden through the environment
//! (`KEYWARDEN_IDENTITY_URL`, `KEYWARDEN_RESOURCE_URL`) for local setups
//! where a `.env` file drives everything.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::identity::REQUEST_TIMEOUT_SECS;
use crate::auth::verifier::DEFAULT_REFRESH_GRACE_SECS;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "keywarden";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Both backends default to the development server address.
const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Environment override for the identity backend URL.
const ENV_IDENTITY_URL: &str = "KEYWARDEN_IDENTITY_URL";

/// Environment override for the resource API URL.
const ENV_RESOURCE_URL: &str = "KEYWARDEN_RESOURCE_URL";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    REQUEST_TIMEOUT_SECS
}

fn default_grace_secs() -> i64 {
    DEFAULT_REFRESH_GRACE_SECS
}

fn default_protected_prefixes() -> Vec<String> {
    vec!["/dashboard".to_string(), "/profile".to_string()]
}

fn default_sign_in_path() -> String {
    "/auth/signin".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub identity_base_url: String,
    #[serde(default = "default_base_url")]
    pub resource_base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_grace_secs")]
    pub refresh_grace_secs: i64,
    #[serde(default = "default_protected_prefixes")]
    pub protected_prefixes: Vec<String>,
    #[serde(default = "default_sign_in_path")]
    pub sign_in_path: String,
    #[serde(default)]
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            identity_base_url: default_base_url(),
            resource_base_url: default_base_url(),
            request_timeout_secs: default_timeout_secs(),
            refresh_grace_secs: default_grace_secs(),
            protected_prefixes: default_protected_prefixes(),
            sign_in_path: default_sign_in_path(),
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var(ENV_IDENTITY_URL) {
            if !url.is_empty() {
                self.identity_base_url = url;
            }
        }
        if let Ok(url) = std::env::var(ENV_RESOURCE_URL) {
            if !url.is_empty() {
                self.resource_base_url = url;
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}
