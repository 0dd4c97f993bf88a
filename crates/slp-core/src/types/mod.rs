//! # Core Type Definitions
//!
//! This module contains the data model of the semantic ledger:
//! - Identifiers (`ConceptId`) and embedding schemes (`EmbeddingVersion`)
//! - Pre-admission input (`Submission`)
//! - Admitted ledger entries (`Concept`, `ConceptMetadata`)
//! - Error types (`SlpError`)
//!
//! ## Value Semantics
//!
//! `Submission` and `Concept` are immutable once built. Their fields are
//! private and only readable through accessors; construction validates
//! every field so an invalid value never exists.

use crate::primitives::{
    MAX_AUTHOR_LENGTH, MAX_AUTHORS, MAX_DIMENSIONALITY, MAX_PAYLOAD_LENGTH, MAX_REFERENCES,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of an admitted concept.
///
/// Derived deterministically by the pipeline (see `pipeline::derive_concept_id`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(pub String);

impl ConceptId {
    /// Create a concept id from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named, fixed embedding scheme.
///
/// Concepts are only comparable to other concepts sharing the same version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmbeddingVersion {
    name: String,
    dimensionality: usize,
}

impl EmbeddingVersion {
    /// Create a version descriptor.
    ///
    /// Returns `SlpError::InvalidInput` for an empty name or a
    /// dimensionality outside `1..=MAX_DIMENSIONALITY`.
    pub fn new(name: impl Into<String>, dimensionality: usize) -> Result<Self, SlpError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SlpError::InvalidInput(
                "embedding version name is empty".to_string(),
            ));
        }
        if dimensionality == 0 || dimensionality > MAX_DIMENSIONALITY {
            return Err(SlpError::InvalidInput(format!(
                "embedding dimensionality {} outside 1..={}",
                dimensionality, MAX_DIMENSIONALITY
            )));
        }
        Ok(Self {
            name,
            dimensionality,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.dimensionality
    }
}

// =============================================================================
// SUBMISSION
// =============================================================================

/// A proposed concept before admission.
///
/// Transient: consumed by the pipeline, never stored directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    payload: String,
    authorship: Vec<String>,
    timestamp: f64,
    references: Option<Vec<String>>,
}

impl Submission {
    /// Build a validated submission.
    ///
    /// A submission is valid if:
    /// - the payload is non-blank and at most `MAX_PAYLOAD_LENGTH` bytes
    /// - authorship lists between 1 and `MAX_AUTHORS` non-blank contributors
    /// - the timestamp is finite
    pub fn new(
        payload: impl Into<String>,
        authorship: Vec<String>,
        timestamp: f64,
    ) -> Result<Self, SlpError> {
        let payload = payload.into();

        if payload.trim().is_empty() {
            return Err(SlpError::InvalidInput("payload is empty".to_string()));
        }
        if payload.len() > MAX_PAYLOAD_LENGTH {
            return Err(SlpError::InvalidInput(format!(
                "payload length {} exceeds maximum {} bytes",
                payload.len(),
                MAX_PAYLOAD_LENGTH
            )));
        }

        if authorship.is_empty() {
            return Err(SlpError::InvalidInput("authorship is missing".to_string()));
        }
        if authorship.len() > MAX_AUTHORS {
            return Err(SlpError::InvalidInput(format!(
                "{} contributors exceeds maximum {}",
                authorship.len(),
                MAX_AUTHORS
            )));
        }
        for author in &authorship {
            if author.trim().is_empty() || author.len() > MAX_AUTHOR_LENGTH {
                return Err(SlpError::InvalidInput(format!(
                    "invalid contributor identifier {:?}",
                    author
                )));
            }
        }

        if !timestamp.is_finite() {
            return Err(SlpError::InvalidInput("timestamp is not finite".to_string()));
        }

        Ok(Self {
            payload,
            authorship,
            timestamp,
            references: None,
        })
    }

    /// Attach external references to the submission.
    pub fn with_references(mut self, references: Vec<String>) -> Result<Self, SlpError> {
        if references.len() > MAX_REFERENCES {
            return Err(SlpError::InvalidInput(format!(
                "{} references exceeds maximum {}",
                references.len(),
                MAX_REFERENCES
            )));
        }
        self.references = Some(references);
        Ok(self)
    }

    #[must_use]
    pub fn payload(&self) -> &str {
        &self.payload
    }

    #[must_use]
    pub fn authorship(&self) -> &[String] {
        &self.authorship
    }

    /// Seconds since the epoch, as supplied by the caller.
    #[must_use]
    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// External references; empty when none were attached.
    #[must_use]
    pub fn references(&self) -> &[String] {
        self.references.as_deref().unwrap_or(&[])
    }
}

// =============================================================================
// CONCEPT
// =============================================================================

/// Admission metadata recorded alongside every concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptMetadata {
    /// Submission timestamp (seconds since epoch).
    pub timestamp: f64,
    /// Whether the nearest neighbor was within `delta` at admission.
    pub is_near_duplicate: bool,
    /// The nearest neighbor when flagged as a near-duplicate.
    pub primary_duplicate_id: Option<ConceptId>,
    /// External references carried over from the submission.
    pub submission_references: Vec<String>,
}

/// An admitted, immutable ledger entry.
///
/// Invariants:
/// - `embedding` is L2-normalized (or exactly zero)
/// - every id in `parents` existed in state with the same
///   `embedding_version` when this concept was created
/// - `id` is a pure function of payload, authorship, timestamp, parents
///   and an embedding sample
#[derive(Debug, Clone, PartialEq)]
pub struct Concept {
    id: ConceptId,
    embedding: Vec<f64>,
    embedding_version: String,
    authorship: Vec<String>,
    parents: Vec<ConceptId>,
    novelty_score: f64,
    metadata: ConceptMetadata,
}

impl Concept {
    /// Assemble a concept from already-validated parts.
    pub(crate) fn from_parts(
        id: ConceptId,
        embedding: Vec<f64>,
        embedding_version: String,
        authorship: Vec<String>,
        parents: Vec<ConceptId>,
        novelty_score: f64,
        metadata: ConceptMetadata,
    ) -> Self {
        Self {
            id,
            embedding,
            embedding_version,
            authorship,
            parents,
            novelty_score,
            metadata,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ConceptId {
        &self.id
    }

    #[must_use]
    pub fn embedding(&self) -> &[f64] {
        &self.embedding
    }

    #[must_use]
    pub fn embedding_version(&self) -> &str {
        &self.embedding_version
    }

    #[must_use]
    pub fn authorship(&self) -> &[String] {
        &self.authorship
    }

    /// Parent ids, nearest first.
    #[must_use]
    pub fn parents(&self) -> &[ConceptId] {
        &self.parents
    }

    /// The single nearest recorded parent, followed by lineage traversal.
    #[must_use]
    pub fn primary_parent(&self) -> Option<&ConceptId> {
        self.parents.first()
    }

    #[must_use]
    pub fn novelty_score(&self) -> f64 {
        self.novelty_score
    }

    #[must_use]
    pub fn metadata(&self) -> &ConceptMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn timestamp(&self) -> f64 {
        self.metadata.timestamp
    }

    #[must_use]
    pub fn is_near_duplicate(&self) -> bool {
        self.metadata.is_near_duplicate
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the SLP core.
///
/// - No silent failures
/// - Use `Result<T, SlpError>` for fallible operations
/// - A failed pipeline run never leaves state partially mutated
#[derive(Debug, Error)]
pub enum SlpError {
    /// Malformed submission, params, or vector shape. Rejected before any mutation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The embedding capability could not produce a vector.
    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// A selected parent is missing from state at the point of use.
    #[error("Dangling parent reference: {0}")]
    DanglingParentReference(ConceptId),

    /// A distinct submission derived an id that is already admitted.
    #[error("Concept id collision: {0}")]
    IdCollision(ConceptId),

    /// The requested concept was not found.
    #[error("Concept not found: {0}")]
    ConceptNotFound(ConceptId),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O or storage error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn authors() -> Vec<String> {
        vec!["alice".to_string()]
    }

    #[test]
    fn submission_rejects_missing_authorship() {
        let result = Submission::new("hello", Vec::new(), 1.0);
        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
    }

    #[test]
    fn submission_rejects_blank_payload() {
        let result = Submission::new("   ", authors(), 1.0);
        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
    }

    #[test]
    fn submission_rejects_blank_author() {
        let result = Submission::new("hello", vec![" ".to_string()], 1.0);
        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
    }

    #[test]
    fn submission_rejects_non_finite_timestamp() {
        let result = Submission::new("hello", authors(), f64::NAN);
        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
    }

    #[test]
    fn submission_rejects_oversized_payload() {
        let payload = "x".repeat(MAX_PAYLOAD_LENGTH + 1);
        let result = Submission::new(payload, authors(), 1.0);
        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
    }

    #[test]
    fn references_default_to_empty() {
        let submission = Submission::new("hello", authors(), 1.0).expect("valid");
        assert!(submission.references().is_empty());

        let submission = submission
            .with_references(vec!["doi:10/abc".to_string()])
            .expect("refs");
        assert_eq!(submission.references(), ["doi:10/abc".to_string()]);
    }

    #[test]
    fn embedding_version_validates_shape() {
        assert!(EmbeddingVersion::new("", 4).is_err());
        assert!(EmbeddingVersion::new("v", 0).is_err());
        let version = EmbeddingVersion::new("toy", 4).expect("valid");
        assert_eq!(version.name(), "toy");
        assert_eq!(version.dimensionality(), 4);
    }

    #[test]
    fn concept_id_displays_raw_string() {
        let id = ConceptId::new("c-abc");
        assert_eq!(id.to_string(), "c-abc");
        assert_eq!(id.as_str(), "c-abc");
    }
}
