//! `rede`: command-line client for the Rede social network.
//!
//! Signs in, reads the feed, likes and comments, manages notifications
//! and publishes posts and stories against a Rede backend.

mod commands;
mod config;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::Shell;

/// Rede CLI tool.
#[derive(Parser, Debug)]
#[command(name = "rede", about = "Rede CLI client")]
struct Cli {
    /// Path to client config file (default: ~/.rede/config.toml).
    #[arg(long = "config", global = true)]
    config: Option<String>,

    /// Backend origin, overriding the config file for this run.
    #[arg(long = "server", global = true)]
    server: Option<String>,

    /// Output format: table or json.
    #[arg(long = "output", short = 'o', global = true, default_value = "table")]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Client configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Sign in.
    Login {
        #[arg(long)]
        email: Option<String>,
        /// Password (prefer the interactive prompt).
        #[arg(long)]
        password: Option<String>,
    },

    /// Create an account and sign in.
    Register {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: Option<String>,
    },

    /// Sign out and forget the stored credential.
    Logout,

    /// Show the signed-in user.
    Whoami,

    /// Show the home feed.
    Feed {
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Toggle the like on a post.
    Like { post: u64 },

    /// Show a post and its comments.
    Post { id: u64 },

    /// Comment on a post.
    Comment { post: u64, text: String },

    /// List notifications, or mark them read.
    Notifications {
        /// Mark one notification read.
        #[arg(long, conflicts_with = "all")]
        read: Option<u64>,
        /// Mark every notification read.
        #[arg(long)]
        all: bool,
    },

    /// Show your profile and posts.
    Profile {
        /// Number of pages of posts to load.
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// List active stories, or record a view.
    Stories {
        #[arg(long)]
        view: Option<u64>,
    },

    /// Publish a story.
    Story {
        text: String,
        /// Photo, video or audio file to attach.
        #[arg(long)]
        media: Option<PathBuf>,
        /// Hours before the story expires.
        #[arg(long, default_value_t = 24)]
        hours: u32,
        /// Background color for text stories (e.g. "#4F46E5").
        #[arg(long)]
        background: Option<String>,
    },

    /// Publish a post.
    Compose {
        text: String,
        /// Photo, video or audio file to attach.
        #[arg(long)]
        media: Option<PathBuf>,
    },

    /// Show version.
    Version,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Set configuration values.
    Set {
        #[arg(long)]
        server: Option<String>,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        data_dir: Option<String>,
    },
    /// Print the configuration in effect.
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .map(PathBuf::from)
        .unwrap_or_else(config::ClientConfig::default_path);
    let json = cli.output == "json";

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Set {
                server,
                page_size,
                data_dir,
            } => {
                commands::settings::set(&config_path, server, page_size, data_dir)?;
            }
            ConfigAction::Show => {
                commands::settings::show(&config_path)?;
            }
        },

        Commands::Version => {
            println!("rede cli v{}", env!("CARGO_PKG_VERSION"));
        }

        command => {
            let shell = Shell::open(&config_path, cli.server.as_deref(), json).await?;
            run(&shell, command).await?;
        }
    }

    Ok(())
}

async fn run(shell: &Shell, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Login { email, password } => {
            let email = match email {
                Some(e) => e,
                None => commands::prompt("Email: ")?,
            };
            let password = match password {
                Some(p) => p,
                None => rpassword::prompt_password("Password: ")?,
            };
            commands::session::login(shell, &email, &password).await
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            username,
        } => {
            let password = rpassword::prompt_password("Password: ")?;
            let confirm = rpassword::prompt_password("Confirm password: ")?;
            let form = rede_app::SignUpForm {
                first_name,
                last_name,
                email,
                password,
                confirm_password: confirm,
                username,
            };
            commands::session::register(shell, &form).await
        }
        Commands::Logout => commands::session::logout(shell),
        Commands::Whoami => commands::session::whoami(shell),
        Commands::Feed { pages } => commands::feed::feed(shell, pages).await,
        Commands::Like { post } => commands::feed::like(shell, post).await,
        Commands::Post { id } => commands::feed::show_post(shell, id).await,
        Commands::Comment { post, text } => commands::feed::comment(shell, post, &text).await,
        Commands::Notifications { read, all } => commands::inbox::notifications(shell, read, all).await,
        Commands::Profile { pages } => commands::profile::profile(shell, pages).await,
        Commands::Stories { view } => commands::publish::stories(shell, view).await,
        Commands::Story {
            text,
            media,
            hours,
            background,
        } => commands::publish::story(shell, text, media.as_deref(), hours, background).await,
        Commands::Compose { text, media } => commands::publish::compose(shell, text, media.as_deref()).await,
        Commands::Config { .. } | Commands::Version => Ok(()),
    }
}
