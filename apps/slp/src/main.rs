//! # slp - Semantic Ledger
//!
//! The main binary for the Semantic Ledger concept integration pipeline.
//!
//! This application provides:
//! - CLI interface for submitting and inspecting concepts
//! - Interactive shell
//! - HTTP REST API server (axum-based)
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     apps/slp (THE BINARY)                   │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌────────────────┐  │
//! │  │   CLI       │    │   HTTP API  │    │  Shell         │  │
//! │  │  (clap)     │    │   (axum)    │    │  (stdin)       │  │
//! │  └──────┬──────┘    └──────┬──────┘    └───────┬────────┘  │
//! │         └──────────────────┼───────────────────┘           │
//! │                            ▼                               │
//! │                    ┌───────────────┐                       │
//! │                    │   slp-core    │                       │
//! │                    │  (THE LOGIC)  │                       │
//! │                    └───────────────┘                       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! slp submit --text "a new idea" --author alice
//! slp lineage --id c-...
//! slp shell
//! slp server --host 0.0.0.0 --port 8080
//! ```

use clap::Parser;
use slp::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // SLP_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("SLP_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "slp=info,tower_http=debug".into());

    // Logs go to stderr so command output on stdout stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ███████╗██╗     ██████╗
  ██╔════╝██║     ██╔══██╗
  ███████╗██║     ██████╔╝
  ╚════██║██║     ██╔═══╝
  ███████║███████╗██║
  ╚══════╝╚══════╝╚═╝

  Semantic Ledger v{}

  Novelty • Lineage • Deterministic ids
"#,
        env!("CARGO_PKG_VERSION")
    );
}
