//! # Formats Module
//!
//! Serialization formats for concept records and ledger snapshots.

mod persistence;

pub use persistence::*;
