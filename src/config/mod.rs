//! Configuration management for Prepdeck

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::auth::Identity;
use crate::ingest::DEFAULT_BATCH_SIZE;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Overrides the platform data directory (where the store snapshot lives)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// Questions written per catalog batch during ingestion
    pub ingest_batch_size: usize,

    /// LeetCode GraphQL settings
    pub leetcode: LeetCodeConfig,

    /// The account commands act as, if signed in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            ingest_batch_size: DEFAULT_BATCH_SIZE,
            leetcode: LeetCodeConfig::default(),
            user: None,
        }
    }
}

/// LeetCode GraphQL settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LeetCodeConfig {
    pub endpoint: String,
    /// Problems per page
    pub page_size: u32,
    /// Pause between pages, in milliseconds
    pub request_delay_ms: u64,
    /// Page ceiling per fetch
    pub max_pages: usize,
    /// Per-request timeout, in seconds
    pub timeout_secs: u64,
}

impl Default for LeetCodeConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://leetcode.com/graphql".to_string(),
            page_size: 100,
            request_delay_ms: 500,
            max_pages: 100,
            timeout_secs: 30,
        }
    }
}

/// Signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserConfig {
    pub user_id: String,
    pub email: String,
}

impl From<UserConfig> for Identity {
    fn from(user: UserConfig) -> Self {
        Identity { user_id: user.user_id, email: user.email }
    }
}

impl Config {
    /// Load configuration from disk, or create default if not exists
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, creating it with defaults if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {:?}", path))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {:?}", path))
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let contents =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs =
            ProjectDirs::from("", "", "prepdeck").context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.json"))
    }

    /// Get the data directory path, honoring the override
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let proj_dirs =
            ProjectDirs::from("", "", "prepdeck").context("Failed to determine data directory")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Get the store snapshot path
    pub fn store_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("store.json"))
    }

    /// The configured identity, if any
    pub fn identity(&self) -> Option<Identity> {
        self.user.clone().map(Identity::from)
    }
}
