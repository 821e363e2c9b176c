//! # Content Sync CLI (`csync`)
//!
//! Fetch, download, and push documents against a Jupyter contents server
//! through the same pipelines an editor would use.
//!
//! ## Usage
//!
//! ```bash
//! csync --config ./config/csync.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `csync fetch <path>` | Print the server's contents model for `path` |
//! | `csync download <path>` | Fetch `path` and write it under `[download].dir` |
//! | `csync push <file> [--to <path>]` | Save a local notebook or text file to the server |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (e.g. `RUST_LOG=content_sync=debug`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use content_sync::{commands, config};

/// Content Sync CLI: keep notebooks and files in sync with a Jupyter
/// contents server.
#[derive(Parser)]
#[command(
    name = "csync",
    about = "Fetch, download and push documents against a Jupyter contents server",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/csync.toml`.
    #[arg(long, global = true, default_value = "./config/csync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a path and print its contents model as JSON.
    Fetch {
        /// Server-side path (e.g. `work/analysis.ipynb`).
        path: String,
    },

    /// Fetch a path and save it into the download directory.
    ///
    /// Notebooks are written in canonical nbformat JSON with the
    /// configured app version stamped into their metadata.
    Download {
        /// Server-side path.
        path: String,
    },

    /// Save a local file to the server.
    ///
    /// Files ending in `.ipynb` are validated and saved as notebooks;
    /// anything else is saved as a text file.
    Push {
        /// Local file to upload.
        file: PathBuf,

        /// Server-side destination. Defaults to the local file name.
        #[arg(long)]
        to: Option<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Fetch { path } => {
            commands::run_fetch(&cfg, &path).await?;
        }
        Commands::Download { path } => {
            commands::run_download(&cfg, &path).await?;
        }
        Commands::Push { file, to } => {
            commands::run_push(&cfg, &file, to.as_deref()).await?;
        }
    }

    Ok(())
}
