pub mod feed;
pub mod inbox;
pub mod profile;
pub mod publish;
pub mod session;
pub mod settings;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use rede_app::App;
use rede_kv::{KVStore, RedbStore};
use tracing::debug;

use crate::config::ClientConfig;

/// A configured app with its stored session restored.
pub struct Shell {
    pub app: App,
    pub json: bool,
}

impl Shell {
    pub async fn open(config_path: &Path, server: Option<&str>, json: bool) -> Result<Self> {
        let config = ClientConfig::load(config_path)?;
        let server = server.unwrap_or(&config.server);
        let store: Arc<dyn KVStore> = Arc::new(RedbStore::open(&config.session_path())?);
        let app = App::with_page_size(server, store, config.page_size)?;
        match app.restore().await {
            Some(session) => debug!(user_id = session.identity.id, "using stored session"),
            None => debug!("no stored session"),
        }
        Ok(Self { app, json })
    }

    pub fn require_session(&self) -> Result<()> {
        if !self.app.session().is_signed_in() {
            anyhow::bail!("Not signed in. Run `rede login`.");
        }
        Ok(())
    }
}

/// Read one line from stdin after printing `label` to stderr.
pub fn prompt(label: &str) -> Result<String> {
    eprint!("{}", label);
    std::io::stderr().flush()?;
    let mut s = String::new();
    std::io::stdin().read_line(&mut s)?;
    Ok(s.trim().to_string())
}
