//! Profile command.

use anyhow::Result;
use rede_app::LoadOutcome;

use super::Shell;
use crate::render;

pub async fn profile(shell: &Shell, pages: u32) -> Result<()> {
    shell.require_session()?;
    let screen = shell
        .app
        .profile()
        .map_err(|e| anyhow::anyhow!("{}", shell.app.report(e)))?;
    screen.load().await.map_err(|n| anyhow::anyhow!("{}", n))?;

    for _ in 1..pages {
        match screen.load_more().await {
            Ok(LoadOutcome::Loaded(_)) => {}
            Ok(_) => break,
            Err(notice) => {
                eprintln!("{}", notice);
                break;
            }
        }
    }

    render::profile(shell, &screen.state())
}
