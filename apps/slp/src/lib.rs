//! # slp
//!
//! Application layer of the Semantic Ledger: CLI, interactive shell, TOML
//! configuration and the HTTP API around `slp-core`.

pub mod api;
pub mod cli;
pub mod config;

/// Wall-clock seconds since the Unix epoch, or 0 if the clock is before it.
pub fn unix_timestamp() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
