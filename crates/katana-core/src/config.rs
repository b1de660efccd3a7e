//! Host settings: the TOML file the CLI owns, plus environment overrides

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::ClientConfig;

/// Production backend.
pub const DEFAULT_BACKEND_URL: &str = "https://cost-katana-backend.store/api";

/// Settings file, relative to the working directory: .cost-katana.toml
pub const SETTINGS_FILE: &str = ".cost-katana.toml";

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Model label attached to automatically tracked edits.
pub const DEFAULT_MODEL: &str = "cursor-ai";

pub const ENV_BACKEND_URL: &str = "COST_KATANA_BACKEND_URL";
pub const ENV_API_KEY: &str = "COST_KATANA_API_KEY";
pub const ENV_USER_ID: &str = "COST_KATANA_USER_ID";

/// Get the settings file path under `root`
pub fn settings_path(root: &Path) -> PathBuf {
    root.join(SETTINGS_FILE)
}

/// Everything the host persists for the extension.
///
/// Keys are camelCase to match the editor configuration surface
/// (`backendUrl`, `apiKey`, `autoTrack`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub backend_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(alias = "automaticTracking")]
    pub auto_track: bool,
    pub show_notifications: bool,
    pub poll_interval_secs: u64,
    pub default_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            api_key: None,
            user_id: None,
            auto_track: true,
            show_notifications: true,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }
}

impl Settings {
    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Settings loaded from: {}", path.display());
        Ok(settings)
    }

    /// Load settings, then apply `.env` and process environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", env_file.display());
        }

        let mut settings = Self::load(path)?;
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Override file values with whatever `lookup` returns for the
    /// `COST_KATANA_*` variables. Blank values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(user) = lookup(ENV_USER_ID) {
            self.user_id = Some(user);
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self)?;
        std::fs::write(path, raw).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::debug!("Settings saved: {}", path.display());
        Ok(())
    }

    /// Build the client configuration these settings describe.
    pub fn client_config(&self) -> Result<ClientConfig, ConfigError> {
        let mut config = ClientConfig::new(&self.backend_url)?;
        if let Some(key) = &self.api_key {
            config = config.with_api_key(key);
        }
        if let Some(user) = &self.user_id {
            config = config.with_user_id(user);
        }
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}
