//! # slp-core
//!
//! The deterministic Concept Integration Pipeline for the Semantic Ledger
//! Protocol - THE LOGIC.
//!
//! This crate admits text submissions as concepts into an append-only
//! ledger. Each admission embeds the payload, finds its nearest prior
//! concepts, scores how novel it is, records up to `p` parents, flags
//! near-duplicates and derives a content-addressed id.
//!
//! ## Layout
//!
//! - `types` / `primitives`: value types, errors, limits
//! - `embedding`: the `Embedder` contract and the hash reference backend
//! - `search` / `novelty` / `pipeline`: the integration pass itself
//! - `state` / `lineage`: the in-memory ledger and ancestry traversal
//! - `formats` / `storage` / `ledger`: records, snapshots, redb persistence
//! - `metrics` / `experiment`: read-only summaries and synthetic runs
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Holds state only in an explicit `CoreState` handed in by the caller
//! - Uses BTreeMap/Vec only, so iteration order never depends on hashing
//! - Has NO async, NO network dependencies, NO logging (pure Rust)
//! - Reports every failure through `Result<_, SlpError>`

// =============================================================================
// MODULES
// =============================================================================

pub mod embedding;
pub mod experiment;
pub mod formats;
pub mod ledger;
pub mod lineage;
pub mod metrics;
pub mod novelty;
pub mod pipeline;
pub mod primitives;
pub mod search;
pub mod state;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Concept, ConceptId, ConceptMetadata, EmbeddingVersion, SlpError, Submission};

// =============================================================================
// RE-EXPORTS: Pipeline
// =============================================================================

pub use embedding::{Embedder, HashEmbedder, l2_normalize, validate_embedding};
pub use experiment::{SyntheticRunResult, run_synthetic_sequence};
pub use ledger::{Ledger, StorageBackend};
pub use lineage::{lineage_chain, lineage_depth};
pub use metrics::LedgerMetrics;
pub use novelty::{NoveltyComponents, NoveltyParams, compute_novelty, cosine_distance};
pub use pipeline::{
    CoreParams, IntegrateResult, derive_concept_id, detect_near_duplicate, embed_submission,
    integrate_submission, prepare_concept, select_parents,
};
pub use search::{Neighbor, k_nearest};
pub use state::CoreState;
pub use storage::{ConceptStore, RedbStore};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{
    ConceptRecord, PersistenceHeader, records_from_bytes, records_to_bytes, state_from_bytes,
    state_to_bytes,
};
