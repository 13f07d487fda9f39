//! Notification commands.

use anyhow::Result;

use super::Shell;
use crate::render;

/// List notifications, or mark one / all of them read.
pub async fn notifications(shell: &Shell, read: Option<u64>, all: bool) -> Result<()> {
    shell.require_session()?;
    let screen = shell.app.notifications();
    screen.load().await.map_err(|n| anyhow::anyhow!("{}", n))?;

    if all {
        screen.mark_all_read().await.map_err(|n| anyhow::anyhow!("{}", n))?;
        println!("All notifications marked read.");
        return Ok(());
    }
    if let Some(id) = read {
        if !screen.items().iter().any(|n| n.id == id) {
            anyhow::bail!("Notification {} not found.", id);
        }
        screen.mark_read(id).await.map_err(|n| anyhow::anyhow!("{}", n))?;
        println!("Notification {} marked read.", id);
        return Ok(());
    }

    let unread = match screen.unread_count().await {
        Ok(n) => n,
        Err(_) => screen.unread() as u64,
    };
    render::notifications(shell, &screen.state(), unread)
}
