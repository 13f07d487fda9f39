//! `rede config` commands.

use std::path::Path;

use anyhow::Result;
use rede_client::parse_origin;

use crate::config::ClientConfig;

/// Set configuration values and save.
pub fn set(
    config_path: &Path,
    server: Option<String>,
    page_size: Option<u32>,
    data_dir: Option<String>,
) -> Result<()> {
    let mut config = ClientConfig::load(config_path)?;

    if let Some(s) = server {
        if parse_origin(&s).is_err() {
            anyhow::bail!("Server must be an http:// or https:// URL.");
        }
        config.server = s.trim().trim_end_matches('/').to_string();
    }
    if let Some(n) = page_size {
        if n == 0 {
            anyhow::bail!("Page size must be at least 1.");
        }
        config.page_size = n;
    }
    if let Some(d) = data_dir {
        config.data_dir = d;
    }

    config.save(config_path)?;
    println!("Config saved to {}.", config_path.display());
    Ok(())
}

pub fn show(config_path: &Path) -> Result<()> {
    let config = ClientConfig::load(config_path)?;
    println!("{:12} {}", "config", config_path.display());
    println!("{:12} {}", "server", config.server);
    println!("{:12} {}", "page_size", config.page_size);
    println!("{:12} {}", "session", config.session_path().display());
    Ok(())
}
