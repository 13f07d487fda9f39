//! Client configuration.
//!
//! Reads/writes `~/.rede/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_SERVER: &str = "http://localhost:8000";

/// Client configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend origin (e.g. "http://localhost:8000").
    #[serde(default = "default_server")]
    pub server: String,

    /// Items per page for feed and profile lists.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Where the session file lives (default: ~/.rede).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_dir: String,
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_page_size() -> u32 {
    rede_app::DEFAULT_PAGE_SIZE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            page_size: default_page_size(),
            data_dir: String::new(),
        }
    }
}

impl ClientConfig {
    /// Default config file path: ~/.rede/config.toml.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }

    /// Load config from disk, or return default if file doesn't exist.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save config to disk.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn data_dir(&self) -> PathBuf {
        if self.data_dir.is_empty() {
            dirs_path()
        } else {
            PathBuf::from(&self.data_dir)
        }
    }

    /// The redb file holding the session slots.
    pub fn session_path(&self) -> PathBuf {
        self.data_dir().join("session.redb")
    }
}

/// Return the Rede config directory (~/.rede).
fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".rede")
}
