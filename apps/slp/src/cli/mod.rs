//! # Ledger CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show ledger metrics
//! - `submit` - Submit one concept
//! - `show` - Show one concept with its payload
//! - `lineage` - Show the lineage chain of a concept
//! - `shell` - Interactive submission shell
//! - `synthetic` - Run a payload file through a fresh in-memory ledger
//! - `export` - Export ledger snapshot to file
//! - `import` - Import ledger snapshot from file
//! - `init` - Initialize new database

mod commands;
mod shell;

use crate::config::LedgerConfig;
use clap::{Parser, Subcommand};
use slp_core::SlpError;
use std::path::PathBuf;

pub use commands::*;
pub use shell::{SHELL_AUTHOR, run_shell, write_admission, write_lineage};

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Semantic Ledger
///
/// Admits text submissions as concepts, scores their novelty against
/// everything admitted before, and records their lineage.
#[derive(Parser, Debug)]
#[command(name = "slp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (score components and neighbors)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the ledger database (redb)
    #[arg(short = 'D', long, global = true, default_value = "slp.redb")]
    pub database: PathBuf,

    /// Path to the TOML config file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show ledger status
    Status,

    /// Submit one concept
    Submit {
        /// Payload text
        #[arg(short, long)]
        text: String,

        /// Contributor identifier (repeatable)
        #[arg(short, long = "author", default_value = "cli-user")]
        authors: Vec<String>,

        /// External reference (repeatable)
        #[arg(short, long = "reference")]
        references: Vec<String>,

        /// Seconds since the Unix epoch (defaults to now)
        #[arg(long)]
        timestamp: Option<f64>,
    },

    /// Show one concept
    Show {
        /// Concept id
        #[arg(long)]
        id: String,
    },

    /// Show the lineage chain of a concept
    Lineage {
        /// Concept id
        #[arg(long)]
        id: String,
    },

    /// Interactive submission shell
    Shell,

    /// Run payloads (one per line) through a fresh in-memory ledger
    Synthetic {
        /// Path to the payload file
        #[arg(short, long)]
        file: PathBuf,

        /// Contributor identifier (repeatable)
        #[arg(short, long = "author", default_value = "synthetic")]
        authors: Vec<String>,
    },

    /// Export ledger snapshot
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import ledger snapshot (concepts already present are skipped)
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), SlpError> {
    let config = LedgerConfig::load(cli.config.as_deref())?;
    let db = &cli.database;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(db, &config, &host, port).await,
        Some(Commands::Status) => cmd_status(db, json_mode),
        Some(Commands::Submit {
            text,
            authors,
            references,
            timestamp,
        }) => cmd_submit(
            db,
            &config,
            json_mode,
            cli.verbose,
            SubmitArgs {
                text,
                authors,
                references,
                timestamp,
            },
        ),
        Some(Commands::Show { id }) => cmd_show(db, json_mode, &id),
        Some(Commands::Lineage { id }) => cmd_lineage(db, json_mode, &id),
        Some(Commands::Shell) => cmd_shell(db, &config, cli.verbose),
        Some(Commands::Synthetic { file, authors }) => {
            cmd_synthetic(&config, json_mode, &file, &authors)
        }
        Some(Commands::Export { output }) => cmd_export(db, &output),
        Some(Commands::Import { input }) => cmd_import(db, &input),
        Some(Commands::Init { force }) => cmd_init(db, force),
        None => cmd_status(db, json_mode),
    }
}
