//! # Embedding Capability
//!
//! The core never vectorizes text itself. It depends on the `Embedder`
//! contract and checks every vector a backend hands back:
//! - exactly `version.dimensionality()` components
//! - all components finite
//! - L2 norm of 1 (within `NORM_TOLERANCE`), or the exact zero vector
//!
//! `HashEmbedder` is a deterministic reference backend. It is not
//! semantically meaningful; it gives a stable vectorization for exercising
//! the pipeline without any model.

use crate::primitives::NORM_TOLERANCE;
use crate::{EmbeddingVersion, SlpError};

/// A pluggable embedding backend.
///
/// Implementations must be deterministic for identical `(version, payload)`
/// pairs. `embed` may block (remote or compute-heavy backends); callers
/// must not hold a state lock while it runs.
pub trait Embedder: Send + Sync {
    /// The fixed scheme this backend produces vectors for.
    fn version(&self) -> &EmbeddingVersion;

    /// Return an L2-normalized vector of `version().dimensionality()` floats.
    ///
    /// Returns `SlpError::EmbeddingUnavailable` if no vector can be produced.
    fn embed(&self, payload: &str) -> Result<Vec<f64>, SlpError>;
}

/// Scale a vector to unit L2 norm. The zero vector stays zero.
#[must_use]
pub fn l2_normalize(vec: &[f64]) -> Vec<f64> {
    let norm_sq: f64 = vec.iter().map(|v| v * v).sum();
    if norm_sq <= 0.0 {
        return vec![0.0; vec.len()];
    }
    let norm = norm_sq.sqrt();
    vec.iter().map(|v| v / norm).collect()
}

/// Check a backend vector against the embedding contract for `version`.
pub fn validate_embedding(vec: &[f64], version: &EmbeddingVersion) -> Result<(), SlpError> {
    if vec.len() != version.dimensionality() {
        return Err(SlpError::InvalidInput(format!(
            "embedding has {} components, version {} declares {}",
            vec.len(),
            version.name(),
            version.dimensionality()
        )));
    }
    if vec.iter().any(|v| !v.is_finite()) {
        return Err(SlpError::InvalidInput(
            "embedding contains non-finite components".to_string(),
        ));
    }

    let norm_sq: f64 = vec.iter().map(|v| v * v).sum();
    if norm_sq == 0.0 {
        return Ok(());
    }
    if (norm_sq.sqrt() - 1.0).abs() > NORM_TOLERANCE {
        return Err(SlpError::InvalidInput(format!(
            "embedding is not L2-normalized (norm {})",
            norm_sq.sqrt()
        )));
    }
    Ok(())
}

// =============================================================================
// REFERENCE BACKEND
// =============================================================================

/// Domain tag for the hash embedder's output stream.
const HASH_EMBEDDER_DOMAIN: &[u8] = b"slp.hash-embedder.v1";

/// Deterministic hashing-based embedding backend.
///
/// The payload is whitespace-normalized (trimmed, runs collapsed to one
/// space), then `seed` and the text key a BLAKE3 extendable output stream.
/// Each component takes 8 bytes of the stream mapped uniformly to `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    version: EmbeddingVersion,
    seed: u64,
}

impl HashEmbedder {
    /// Create a backend with version name `toy-hash-dim{dim}`.
    pub fn new(dim: usize, seed: u64) -> Result<Self, SlpError> {
        Ok(Self {
            version: EmbeddingVersion::new(format!("toy-hash-dim{}", dim), dim)?,
            seed,
        })
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl Embedder for HashEmbedder {
    fn version(&self) -> &EmbeddingVersion {
        &self.version
    }

    fn embed(&self, payload: &str) -> Result<Vec<f64>, SlpError> {
        let text = payload.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut hasher = blake3::Hasher::new();
        hasher.update(HASH_EMBEDDER_DOMAIN);
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(text.as_bytes());
        let mut stream = hasher.finalize_xof();

        let mut raw = Vec::with_capacity(self.version.dimensionality());
        let mut buf = [0u8; 8];
        for _ in 0..self.version.dimensionality() {
            stream.fill(&mut buf);
            // 53 high bits give a uniform value in [0, 1)
            let unit = (u64::from_le_bytes(buf) >> 11) as f64 / (1u64 << 53) as f64;
            raw.push(unit * 2.0 - 1.0);
        }

        Ok(l2_normalize(&raw))
    }
}

// =============================================================================
// TESTS
// =============================================================================
