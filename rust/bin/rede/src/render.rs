//! Terminal output for screen state.

use anyhow::Result;
use chrono::Utc;
use rede_app::format::{avatar_url, time_ago};
use rede_app::screens::{FeedState, NotificationsState, PostDetailState, ProfileState};
use rede_app::Identity;
use rede_client::{Post, Story, User, UserStats};
use serde::Serialize;

use crate::commands::Shell;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn author_name(author: Option<&User>) -> String {
    author.map(User::display_name).unwrap_or_else(|| "Unknown".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    let line = s.lines().next().unwrap_or_default();
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn post_row(shell: &Shell, post: &Post) {
    let now = Utc::now();
    let heart = if post.liked() { "♥" } else { "♡" };
    println!(
        "{:>6}  {:20} {:>4}  {} {:<4} 💬 {:<4} {}",
        post.id,
        truncate(&author_name(post.author.as_ref()), 20),
        time_ago(&post.created_at, now),
        heart,
        post.reactions_count,
        post.comments_count,
        truncate(post.content.as_deref().unwrap_or_default(), 50),
    );
    if let Some(url) = post
        .media_url
        .as_deref()
        .and_then(|m| shell.app.media_url(m))
    {
        println!("{:8}[{}] {}", "", post.media_type.as_deref().unwrap_or("media"), url);
    }
}

pub fn feed(shell: &Shell, state: &FeedState) -> Result<()> {
    if shell.json {
        return print_json(state);
    }
    if !state.stories.is_empty() {
        let names: Vec<String> = state
            .stories
            .iter()
            .map(|s| author_name(s.author.as_ref()))
            .collect();
        println!("Stories: {}", names.join(", "));
        println!();
    }
    if state.posts.is_empty() {
        println!("No posts yet.");
        return Ok(());
    }
    println!("{:>6}  {:20} {:>4}  {:6} {:7} {}", "ID", "AUTHOR", "AGE", "LIKES", "REPLIES", "CONTENT");
    for post in &state.posts {
        post_row(shell, post);
    }
    if state.cursor.has_more {
        println!("\n(more available: --pages {})", state.cursor.page + 1);
    }
    Ok(())
}

pub fn post_detail(shell: &Shell, state: &PostDetailState) -> Result<()> {
    if shell.json {
        return print_json(state);
    }
    let Some(post) = &state.post else {
        println!("Post not loaded.");
        return Ok(());
    };
    let now = Utc::now();
    println!("{} · {}", author_name(post.author.as_ref()), time_ago(&post.created_at, now));
    if let Some(content) = &post.content {
        println!("{}", content);
    }
    if let Some(url) = post
        .media_url
        .as_deref()
        .and_then(|m| shell.app.media_url(m))
    {
        println!("[{}] {}", post.media_type.as_deref().unwrap_or("media"), url);
    }
    println!(
        "{} {} likes · {} comments",
        if post.liked() { "♥" } else { "♡" },
        post.reactions_count,
        post.comments_count
    );
    println!();
    for c in &state.comments {
        println!(
            "  {} ({}): {}",
            author_name(c.author.as_ref()),
            time_ago(&c.created_at, now),
            c.content
        );
    }
    Ok(())
}

pub fn notifications(shell: &Shell, state: &NotificationsState, unread: u64) -> Result<()> {
    if shell.json {
        return print_json(state);
    }
    println!("{} unread", unread);
    if state.items.is_empty() {
        println!("No notifications.");
        return Ok(());
    }
    let now = Utc::now();
    for n in &state.items {
        let marker = if n.read { " " } else { "*" };
        let actor = n.sender.as_ref().map(User::display_name).unwrap_or_default();
        println!(
            "{} {:>6}  {:8} {:>4}  {} {}",
            marker,
            n.id,
            n.kind,
            time_ago(&n.created_at, now),
            actor,
            n.message.as_deref().unwrap_or_default()
        );
    }
    Ok(())
}

pub fn identity(shell: &Shell, identity: &Identity, stats: Option<UserStats>) -> Result<()> {
    if shell.json {
        return print_json(identity);
    }
    println!("{:10} {}", "name", identity.name);
    println!("{:10} {}", "email", identity.email);
    if let Some(u) = &identity.username {
        println!("{:10} @{}", "username", u);
    }
    if let Some(bio) = &identity.bio {
        println!("{:10} {}", "bio", bio);
    }
    println!(
        "{:10} {}",
        "avatar",
        avatar_url(shell.app.origin(), identity.avatar.as_deref(), &identity.name)
    );
    if let Some(s) = stats {
        println!(
            "{:10} {} posts · {} followers · {} following",
            "stats", s.posts, s.followers, s.following
        );
    }
    Ok(())
}

pub fn profile(shell: &Shell, state: &ProfileState) -> Result<()> {
    if shell.json {
        return print_json(state);
    }
    if let Some(who) = &state.identity {
        identity(shell, who, state.stats)?;
        println!();
    }
    if state.posts.is_empty() {
        println!("No posts yet.");
        return Ok(());
    }
    for post in &state.posts {
        post_row(shell, post);
    }
    Ok(())
}

pub fn stories(shell: &Shell, stories: &[Story]) -> Result<()> {
    if shell.json {
        return print_json(stories);
    }
    if stories.is_empty() {
        println!("No active stories.");
        return Ok(());
    }
    let now = Utc::now();
    for s in stories {
        println!(
            "{:>6}  {:20} {:>4}  {:>4} views  {}",
            s.id,
            truncate(&author_name(s.author.as_ref()), 20),
            time_ago(&s.created_at, now),
            s.views_count,
            truncate(s.content.as_deref().unwrap_or_default(), 40),
        );
        if let Some(url) = s
            .media_url
            .as_deref()
            .and_then(|m| shell.app.media_url(m))
        {
            println!("{:8}[{}] {}", "", s.media_type.as_deref().unwrap_or("media"), url);
        }
    }
    Ok(())
}
