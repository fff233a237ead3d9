//! Application configuration management.
//!
//! This module handles loading and saving the application configuration:
//! where the Task Store lives, how the session is persisted, board paging
//! and the theme preference.
//!
//! Configuration is stored at `~/.config/taskboard/config.json`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{FileSlotStore, KeyringSlotStore, MemorySlotStore, SlotStore};
use crate::models::DEFAULT_LIMIT;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "taskboard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Session file name inside the cache directory
const SESSION_FILE: &str = "session.json";

/// Base URL used when neither the environment nor the config names one
pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Environment variable overriding the configured base URL
pub const API_URL_ENV: &str = "TASKBOARD_API_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Where the persisted session record lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn toggled(&self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ThemeMode::Light => "Light",
            ThemeMode::Dark => "Dark",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    /// Per-request timeout applied by the terminal client; 0 disables it
    pub request_timeout_secs: u64,
    pub storage: StorageBackend,
    pub page_size: u32,
    pub theme: ThemeMode,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage: StorageBackend::default(),
            page_size: DEFAULT_LIMIT,
            theme: ThemeMode::default(),
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir() -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn session_path() -> Result<PathBuf> {
        Ok(Self::cache_dir()?.join(SESSION_FILE))
    }

    /// Base URL: environment first, then config, then the default
    pub fn api_url(&self) -> String {
        let from_env = std::env::var(API_URL_ENV).ok();
        Self::resolve_api_url(from_env.as_deref(), self.api_url.as_deref())
    }

    fn resolve_api_url(from_env: Option<&str>, configured: Option<&str>) -> String {
        [from_env, configured]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|url| !url.is_empty())
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    /// Page size, never zero
    pub fn page_size(&self) -> u32 {
        self.page_size.max(1)
    }

    /// Open the slot store selected by `storage`
    pub fn open_storage(&self) -> Result<Box<dyn SlotStore>> {
        Ok(match self.storage {
            StorageBackend::File => Box::new(FileSlotStore::new(Self::session_path()?)),
            StorageBackend::Keyring => Box::new(KeyringSlotStore::new()),
            StorageBackend::Memory => Box::new(MemorySlotStore::new()),
        })
    }
}
