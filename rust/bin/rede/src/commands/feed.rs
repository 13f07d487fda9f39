//! Feed, post and reaction commands.

use anyhow::Result;
use rede_app::LoadOutcome;

use super::Shell;
use crate::render;

/// Load up to `pages` pages of the home feed and print them.
pub async fn feed(shell: &Shell, pages: u32) -> Result<()> {
    shell.require_session()?;
    let feed = shell.app.feed();
    feed.load().await.map_err(|n| anyhow::anyhow!("{}", n))?;

    for _ in 1..pages {
        match feed.load_more().await {
            Ok(LoadOutcome::Loaded(_)) => {}
            Ok(_) => break,
            Err(notice) => {
                eprintln!("{}", notice);
                break;
            }
        }
    }

    render::feed(shell, &feed.state())
}

/// Toggle the like on a post and print the result.
pub async fn like(shell: &Shell, post_id: u64) -> Result<()> {
    shell.require_session()?;
    let detail = shell.app.post_detail(post_id);
    detail.load().await.map_err(|n| anyhow::anyhow!("{}", n))?;

    let shown = detail
        .toggle_like()
        .await
        .map_err(|n| anyhow::anyhow!("{}", n))?;
    if shown.reacted {
        println!("Liked post {} ({} likes).", post_id, shown.count);
    } else {
        println!("Unliked post {} ({} likes).", post_id, shown.count);
    }
    Ok(())
}

pub async fn show_post(shell: &Shell, post_id: u64) -> Result<()> {
    shell.require_session()?;
    let detail = shell.app.post_detail(post_id);
    detail.load().await.map_err(|n| anyhow::anyhow!("{}", n))?;
    render::post_detail(shell, &detail.state())
}

pub async fn comment(shell: &Shell, post_id: u64, text: &str) -> Result<()> {
    shell.require_session()?;
    let detail = shell.app.post_detail(post_id);
    detail.load().await.map_err(|n| anyhow::anyhow!("{}", n))?;

    match detail.send_comment(text).await {
        Ok(Some(comment)) => {
            println!("Comment {} added to post {}.", comment.id, post_id);
            Ok(())
        }
        Ok(None) => anyhow::bail!("Comment cannot be empty."),
        Err(notice) => anyhow::bail!("{}", notice),
    }
}
