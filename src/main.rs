//! # Cartridge Shop CLI (`shop`)
//!
//! The `shop` binary imports the supplier price list into the catalog
//! database, inspects the result, and runs the storefront HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! shop --config ./config/shop.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `shop init` | Create the SQLite database and run schema migrations |
//! | `shop import` | Replace the catalog with the contents of the price list |
//! | `shop products` | Print the catalog |
//! | `shop stats` | Catalog, order and import overview |
//! | `shop serve` | Start the storefront HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! shop init
//! shop import --dry-run
//! shop import --source "./catalog/CARTRIDGE LIST.docx"
//! shop products --search 44A --all
//! shop serve
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr so
//! command output on stdout stays clean.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use cartridge_shop::{config, import, migrate, products, server, stats};

/// Cartridge Shop: printer-cartridge catalog import and storefront backend.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/shop.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "shop", version, about = "Cartridge catalog import and storefront backend")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/shop.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run more than once.
    Init,

    /// Import the price list, replacing the whole catalog.
    Import {
        /// Price-list document to read instead of `[catalog].source`.
        #[arg(long)]
        source: Option<PathBuf>,

        /// Parse and count without touching the database.
        #[arg(long)]
        dry_run: bool,
    },

    /// List catalog products.
    Products {
        /// Case-insensitive match against name and product code.
        #[arg(long)]
        search: Option<String>,

        /// Include products without a price (query-only).
        #[arg(long)]
        all: bool,
    },

    /// Show catalog, order and import statistics.
    Stats,

    /// Start the storefront HTTP server.
    Serve,
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
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { source, dry_run } => {
            import::run_import(&cfg, source, dry_run).await?;
        }
        Commands::Products { search, all } => {
            products::run_products(&cfg, search, all).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
