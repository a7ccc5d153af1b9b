//! # clipvault CLI
//!
//! The `clipvault` binary is the primary interface for the clip service.
//! It provides commands for database initialization, file capture, search,
//! removal, statistics, and starting the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! clipvault --config ./clipvault.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `clipvault init` | Create the SQLite database and run schema migrations |
//! | `clipvault ingest <path>` | Capture a local file: analyze, store blob + metadata |
//! | `clipvault search [query]` | List clips, optionally filtered |
//! | `clipvault rm <id>` | Remove a clip and its blob |
//! | `clipvault stats` | Show clip counts and sizes |
//! | `clipvault serve` | Start the HTTP API server |

mod analysis;
mod config;
mod db;
mod error;
mod extract;
mod ingest;
mod migrate;
mod models;
mod repo;
mod server;
mod service;
mod stats;
mod store;
mod tags;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::models::{ClipFilter, FileType};
use crate::repo::SqliteClipRepository;
use crate::service::ClipService;
use crate::store::FsBlobStore;

/// clipvault — a self-hosted content-capture service with AI tagging.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Every section has defaults, so a minimal file is enough to start.
#[derive(Parser)]
#[command(
    name = "clipvault",
    about = "clipvault — capture, tag, and browse images, PDFs, and text",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./clipvault.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the clips table. This command
    /// is idempotent — running it multiple times is safe.
    Init,

    /// Capture a local file as a clip.
    ///
    /// Reads the file, derives its type from the extension, extracts text
    /// for PDFs and text files, calls the configured analysis provider for
    /// a summary/tags/category, and stores the blob plus a metadata row.
    /// Fails without writing anything if the analysis call fails.
    Ingest {
        /// File to capture (image, PDF, or text).
        path: PathBuf,

        /// Explicit clip id; a UUID is generated when omitted.
        #[arg(long)]
        id: Option<String>,
    },

    /// List clips, newest first.
    Search {
        /// Substring matched against filename, summary, tags, and category.
        query: Option<String>,

        /// Restrict results to one type: image, pdf, or text.
        #[arg(long = "file-type")]
        file_type: Option<String>,
    },

    /// Remove a clip and its stored blob.
    Rm {
        /// Clip id.
        id: String,
    },

    /// Show clip counts and content sizes.
    Stats,

    /// Start the HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// clip API plus uploaded blobs under `/uploads`.
    Serve,
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("CLIPVAULT_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Wire up the service from configuration: database pool, migrations,
/// repository, and blob store. Constructed once per process.
async fn build_service(config: &config::Config) -> anyhow::Result<Arc<ClipService>> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;

    let repo = Arc::new(SqliteClipRepository::new(pool));
    let blobs = Arc::new(FsBlobStore::new(&config.storage)?);
    Ok(Arc::new(ClipService::new(repo, blobs)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_init(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { path, id } => {
            let service = build_service(&cfg).await?;
            ingest::run_ingest(&cfg, &service, &path, id).await?;
        }
        Commands::Search { query, file_type } => {
            let service = build_service(&cfg).await?;
            let filter = ClipFilter {
                query: query.filter(|q| !q.is_empty()),
                file_type: file_type.as_deref().map(FileType::parse).transpose()?,
            };
            let clips = service.search(&filter).await?;

            if clips.is_empty() {
                println!("No results.");
            } else {
                for clip in &clips {
                    println!(
                        "{}  {}  [{}]",
                        clip.created_at.format("%Y-%m-%d %H:%M"),
                        clip.id,
                        clip.file_type
                    );
                    println!("  {} ({} bytes)", clip.filename, clip.file_size);
                    println!("  {}", clip.ai_summary);
                    if !clip.ai_tags.is_empty() {
                        println!("  tags: {}", clip.ai_tags.join(", "));
                    }
                    if let Some(category) = &clip.ai_category {
                        println!("  category: {}", category);
                    }
                    println!();
                }
            }
        }
        Commands::Rm { id } => {
            let service = build_service(&cfg).await?;
            service.remove(&id).await?;
            println!("removed {}", id);
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            let service = build_service(&cfg).await?;
            server::run_server(&cfg, service).await?;
        }
    }

    Ok(())
}
