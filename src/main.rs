//! # Memory Recall CLI (`recall`)
//!
//! ## Usage
//!
//! ```bash
//! recall --config ./config/recall.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `recall init` | Create the SQLite metadata table |
//! | `recall import <file>` | Load a JSON array of metadata records |
//! | `recall resolve "<query>"` | Resolve a query to one enriched record |
//! | `recall select "<query>"` | Run the vote only, without lookup or enrichment |
//! | `recall serve` | Start the HTTP server |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use memory_recall::{config, import, logging, migrate, resolve, server};

/// Memory Recall: resolve a free-text memory to a single media item.
#[derive(Parser)]
#[command(
    name = "recall",
    about = "Memory Recall — resolve a free-text memory to a single media item",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/recall.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the metadata table (sqlite backend). Safe to run repeatedly.
    Init,

    /// Import metadata records from a JSON file.
    ///
    /// The file must hold a JSON array of objects, each with the configured
    /// key column (`file_path` by default). Existing keys are overwritten.
    Import {
        /// Path to the JSON file.
        path: PathBuf,
    },

    /// Resolve a memory query and print the enriched record as JSON.
    Resolve {
        /// The free-text recall query.
        query: String,
    },

    /// Run normalization, retrieval, and the majority vote only.
    Select {
        /// The free-text recall query.
        query: String,

        /// Print every candidate group with its count and best score.
        #[arg(long)]
        explain: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.log_json);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Metadata table '{}' ready.", cfg.store.table);
        }
        Commands::Import { path } => {
            let count = import::run_import(&cfg, &path).await?;
            println!("imported records: {}", count);
        }
        Commands::Resolve { query } => {
            resolve::run_resolve(&cfg, &query).await?;
        }
        Commands::Select { query, explain } => {
            resolve::run_select(&cfg, &query, explain).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
