//! Posting and stories.

use std::path::Path;

use anyhow::{Context as _, Result};
use rede_app::screens::{PostDraft, StoryDraft};
use rede_client::MediaFile;

use super::Shell;
use crate::render;

/// Read a file for upload, guessing its MIME type from the extension.
fn read_media(path: &Path) -> Result<MediaFile> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());
    Ok(MediaFile {
        file_name,
        mime: mime.essence_str().to_string(),
        bytes,
    })
}

pub async fn compose(shell: &Shell, text: String, media: Option<&Path>) -> Result<()> {
    shell.require_session()?;
    let mut draft = PostDraft::text(text);
    if let Some(path) = media {
        draft = draft.with_media(read_media(path)?);
    }

    let post = shell
        .app
        .composer()
        .create_post(draft)
        .await
        .map_err(|n| anyhow::anyhow!("{}", n))?;
    println!("Published post {}.", post.id);
    Ok(())
}

pub async fn stories(shell: &Shell, view: Option<u64>) -> Result<()> {
    shell.require_session()?;
    let screen = shell.app.stories();

    if let Some(id) = view {
        screen.view(id).await;
        println!("Viewed story {}.", id);
        return Ok(());
    }

    screen.load().await.map_err(|n| anyhow::anyhow!("{}", n))?;
    render::stories(shell, &screen.stories())
}

pub async fn story(
    shell: &Shell,
    text: String,
    media: Option<&Path>,
    hours: u32,
    background: Option<String>,
) -> Result<()> {
    shell.require_session()?;
    let draft = StoryDraft {
        content: text,
        media: media.map(read_media).transpose()?,
        background_color: background,
        duration_hours: hours,
        ..StoryDraft::default()
    };

    let story = shell
        .app
        .stories()
        .create(draft)
        .await
        .map_err(|n| anyhow::anyhow!("{}", n))?;
    println!("Published story {}.", story.id);
    Ok(())
}
