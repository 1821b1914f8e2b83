//! # Saved Panel CLI (`saved`)
//!
//! Drives the saved-documents controller against the SQLite backend.
//!
//! ## Usage
//!
//! ```bash
//! saved --config ./config/saved.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `saved init` | Create the SQLite database and run schema migrations |
//! | `saved add <file>` | Import one document or an array of documents from JSON |
//! | `saved list` | Print the first page(s) of documents |
//! | `saved search "<query>"` | Exact id match, then full-text search |
//! | `saved rename <id> <name>` | Change a document's display name |
//! | `saved delete <id>...` | Delete documents |
//! | `saved clear --yes` | Delete every document |
//!
//! Logging goes to stderr and is controlled with `RUST_LOG`
//! (default `warn`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use saved_panel::{cli, config};

/// Saved Panel CLI: page, search and edit a local collection of saved
/// documents.
#[derive(Parser)]
#[command(
    name = "saved",
    about = "Page, search and edit a local collection of saved documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/saved.toml`.
    #[arg(long, global = true, default_value = "./config/saved.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Import documents from a JSON file.
    ///
    /// The file holds one document or an array of them. Documents without
    /// an `_id` get a random one.
    Add {
        /// Path to the JSON file.
        file: PathBuf,
    },

    /// List documents in key order.
    List {
        /// Number of pages to load.
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },

    /// Search documents.
    ///
    /// Ids containing the query are listed first, followed by full-text
    /// matches over the configured search fields.
    Search {
        /// The search query string.
        query: String,
    },

    /// Rename a document.
    Rename {
        /// Document id.
        id: String,
        /// New display name.
        name: String,
    },

    /// Delete one or more documents by id.
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Delete every saved document.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let cfg = config::load_config(&args.config)?;

    match args.command {
        Commands::Init => cli::run_init(&cfg).await?,
        Commands::Add { file } => cli::run_add(&cfg, &file).await?,
        Commands::List { pages } => cli::run_list(&cfg, pages).await?,
        Commands::Search { query } => cli::run_search(&cfg, &query).await?,
        Commands::Rename { id, name } => cli::run_rename(&cfg, &id, &name).await?,
        Commands::Delete { ids } => cli::run_delete(&cfg, &ids).await?,
        Commands::Clear { yes } => cli::run_clear(&cfg, yes).await?,
    }

    Ok(())
}
