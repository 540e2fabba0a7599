//! # Quote Harness CLI (`qh`)
//!
//! The `qh` binary initializes the quote database, runs the HTTP server,
//! and runs the extraction pipeline locally for a single quote.
//!
//! ## Usage
//!
//! ```bash
//! qh --config ./config/qh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `qh init` | Create the SQLite database and the `quotes` table |
//! | `qh serve` | Start the HTTP server |
//! | `qh parse` | Run the pipeline on text and/or a file, print the JSON result |
//! | `qh links` | Print the links found in a text |
//!
//! ## Examples
//!
//! ```bash
//! # Parse a PDF proposal with a cover note
//! qh parse --text "See attached, F&B minimum \$50,000" --file ./proposal.pdf
//!
//! # Which links would be fetched?
//! qh links --file ./email.txt
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use quote_harness::config::{self, Config};
use quote_harness::extract::{MIME_HTML, MIME_OCTET_STREAM, MIME_PDF, MIME_TEXT};
use quote_harness::links::harvest_links;
use quote_harness::migrate;
use quote_harness::models::{FileRef, FileSource, InputDocument};
use quote_harness::pipeline::QuotePipeline;
use quote_harness::server;

/// Quote Harness CLI: extract hotel group-booking totals from quotes.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/qh.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "qh",
    about = "Quote Harness: extract hotel group-booking totals from quotes",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// `parse` and `links` fall back to built-in defaults when the file
    /// does not exist.
    #[arg(long, global = true, default_value = "./config/qh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the `quotes` table.
    /// Running it again is a no-op.
    Init,

    /// Start the HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// `POST /api/parse` and `GET /health`.
    Serve,

    /// Run the full pipeline on one quote and print the response JSON.
    Parse {
        /// Quote text (email body or pasted proposal).
        #[arg(long)]
        text: Option<String>,

        /// Supporting document (PDF, HTML, or plain text).
        #[arg(long)]
        file: Option<PathBuf>,

        /// Media type of `--file`; guessed from the extension when omitted.
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Print the links harvested from a text, one per line.
    Links {
        /// Read the text from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let cfg = config::load_config(&cli.config)?;
            migrate::run_migrations(&cfg.db).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            let cfg = config::load_config(&cli.config)?;
            server::run_server(&cfg).await?;
        }
        Commands::Parse {
            text,
            file,
            media_type,
        } => {
            let cfg = load_or_minimal(&cli.config)?;
            run_parse(&cfg, text, file, media_type).await?;
        }
        Commands::Links { file } => {
            let text = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            for link in harvest_links(&text) {
                println!("{}", link);
            }
        }
    }

    Ok(())
}

/// Loads the config file when present, otherwise defaults.
fn load_or_minimal(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::minimal())
    }
}

async fn run_parse(
    cfg: &Config,
    text: Option<String>,
    file: Option<PathBuf>,
    media_type: Option<String>,
) -> anyhow::Result<()> {
    let uploaded_file = match file {
        Some(path) => {
            let size = tokio::fs::metadata(&path)
                .await
                .with_context(|| format!("Failed to stat {}", path.display()))?
                .len();
            let media_type = media_type.unwrap_or_else(|| guess_media_type(&path).to_string());
            Some(FileRef {
                file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
                media_type,
                size,
                source: FileSource::Path(path),
            })
        }
        None => None,
    };

    let input = InputDocument {
        source_text: text.unwrap_or_default(),
        uploaded_file,
    };

    let pipeline = QuotePipeline::from_config(cfg).await?;
    let response = pipeline.process(input).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn guess_media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("pdf") => MIME_PDF,
        Some("html") | Some("htm") => MIME_HTML,
        Some("txt") | Some("text") | Some("eml") => MIME_TEXT,
        _ => MIME_OCTET_STREAM,
    }
}
