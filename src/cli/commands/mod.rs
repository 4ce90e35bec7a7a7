//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod crawl;
mod merge;
mod serve;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

pub use crawl::CrawlArgs;

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Incremental listing-site harvester and file merger")]
#[command(version)]
pub struct Cli {
    /// Config file path (defaults to ./harvest.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Record store path (.jsonl for line-delimited, anything else for a JSON array)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest records from a listing site, resuming from the checkpoint
    Crawl(CrawlArgs),

    /// Download files and merge them into one output file
    Merge {
        /// File URLs in merge order (at least 2)
        #[arg(required = true, num_args = 2..)]
        urls: Vec<String>,
        /// Output base name
        #[arg(short, long, default_value = crate::utils::DEFAULT_OUTPUT_NAME)]
        out: String,
        /// Directory for the merged file (overrides config)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Site profile whose file type and download keywords apply
        #[arg(short, long)]
        site: Option<String>,
    },

    /// Start the picker web server
    Serve {
        /// Address to bind: "8080", "0.0.0.0" or "0.0.0.0:8080"
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Show checkpoint and record store state
    Status {
        /// Checkpoint file (overrides config)
        #[arg(long)]
        checkpoint: Option<PathBuf>,
    },
}

/// Parse arguments, load settings and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).await?;
    if let Some(data) = cli.data {
        settings.data_path = data;
    }

    match cli.command {
        Commands::Crawl(args) => crawl::cmd_crawl(&settings, args).await,
        Commands::Merge {
            urls,
            out,
            output_dir,
            site,
        } => {
            if let Some(dir) = output_dir {
                settings.output_dir = dir;
            }
            merge::cmd_merge(&settings, &urls, &out, site.as_deref()).await
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            serve::cmd_serve(&settings, &bind).await
        }
        Commands::Status { checkpoint } => {
            if let Some(path) = checkpoint {
                settings.checkpoint_path = path;
            }
            status::cmd_status(&settings)
        }
    }
}
