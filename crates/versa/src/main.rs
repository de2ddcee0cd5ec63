//! Versa - content version control for CMS systems.
//!
//! This is the main entry point for the versa CLI.

mod commands;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use versa_core::VersaConfig;
use versa_diff::ContentFormat;
use versa_util::LogConfig;

#[derive(Parser)]
#[command(name = "versa")]
#[command(author, version, about = "Content version control for CMS systems", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory to look for a project versa.json(c) in
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Data directory for the JSON storage backend
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Keep everything in memory (nothing is persisted)
    #[arg(long, global = true, conflicts_with = "data_dir")]
    memory: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one JSON API request and print the response
    Request {
        /// Request JSON; read from stdin when omitted or "-"
        json: Option<String>,
    },
    /// Compare two files
    Diff {
        old: PathBuf,
        new: PathBuf,
        /// Content format: text, html or structured
        #[arg(short, long, default_value = "text")]
        format: ContentFormat,
        /// Print the diff and statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete versions older than the given number of days
    Cleanup {
        #[arg(short, long, default_value = "90")]
        days: u32,
    },
    /// Offer a file's content to the auto-versioning policy
    Autosave {
        #[arg(short, long)]
        content_id: i64,
        #[arg(short, long)]
        user_id: i64,
        file: PathBuf,
    },
    /// Show version counts and storage use for a content item
    Usage {
        #[arg(short, long)]
        content_id: i64,
    },
    /// Start the HTTP server
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "127.0.0.1:3100")]
        address: SocketAddr,
    },
    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = VersaConfig::load(cli.project.as_deref()).await?;
    if let Some(dir) = &cli.data_dir {
        config.storage.get_or_insert_with(Default::default).data_dir = Some(dir.clone());
    }

    let level = if cli.verbose {
        Some("debug")
    } else {
        config.log_level.as_deref()
    };
    versa_util::log::init(LogConfig::default().with_level_name(level));
    for source in &sources {
        tracing::debug!(path = %source.display(), "Loaded configuration");
    }

    match cli.command {
        Commands::Request { json } => commands::request::run(&config, cli.memory, json).await,
        Commands::Diff {
            old,
            new,
            format,
            json,
        } => commands::diff::run(&config, &old, &new, format, json).await,
        Commands::Cleanup { days } => {
            commands::maintenance::cleanup(&config, cli.memory, days).await
        }
        Commands::Autosave {
            content_id,
            user_id,
            file,
        } => commands::maintenance::autosave(&config, cli.memory, content_id, user_id, &file).await,
        Commands::Usage { content_id } => {
            commands::maintenance::usage(&config, cli.memory, content_id).await
        }
        Commands::Serve { address } => commands::serve::run(&config, cli.memory, address).await,
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
