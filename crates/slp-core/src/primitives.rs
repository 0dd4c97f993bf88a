//! # Innate Primitives
//!
//! Hardcoded runtime constants for the SLP core.
//!
//! The ledger starts empty but with fixed logic.
//! These values are compiled into the binary and are immutable at runtime.
//!
//! ## Primitives
//!
//! 1. **Identity Primitive**: how a concept id is derived from its inputs.
//! 2. **Embedding Primitive**: the contract tolerance for normalized vectors.
//! 3. **Validation Primitive**: bounds on submissions and persisted data.

/// Prefix carried by every derived concept id.
pub const CONCEPT_ID_PREFIX: &str = "c-";

/// Domain separation tag mixed into the id preimage.
///
/// Bump the suffix when the preimage layout changes.
pub const CONCEPT_ID_DOMAIN: &str = "slp.concept-id.v1";

/// Number of leading embedding components sampled into the id.
pub const ID_EMBEDDING_SAMPLE: usize = 8;

/// Scale applied before rounding floats into the id preimage.
///
/// `1e6` rounds timestamps and embedding components to 6 decimal places.
pub const ID_ROUNDING_SCALE: f64 = 1_000_000.0;

/// Maximum deviation of an embedding norm from 1.0 accepted from a backend.
pub const NORM_TOLERANCE: f64 = 1e-6;

/// Magic bytes for the ledger snapshot header.
///
/// - Snapshot = Magic Bytes ("SLPL") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"SLPL";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to `ConceptRecord`.
pub const FORMAT_VERSION: u8 = 1;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum payload length in bytes (256KB).
pub const MAX_PAYLOAD_LENGTH: usize = 262_144;

/// Maximum number of contributors on a single submission.
pub const MAX_AUTHORS: usize = 64;

/// Maximum length of a single contributor identifier.
pub const MAX_AUTHOR_LENGTH: usize = 256;

/// Maximum number of external references on a single submission.
pub const MAX_REFERENCES: usize = 256;

/// Maximum embedding dimensionality accepted for a version.
pub const MAX_DIMENSIONALITY: usize = 65_536;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_sample_matches_eight_components() {
        assert_eq!(ID_EMBEDDING_SAMPLE, 8);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"SLPL");
    }
}
