//! # Persistence Format
//!
//! The field-for-field record shape of a persisted concept, and the binary
//! snapshot of a whole ledger.
//!
//! Snapshot format: Header (5 bytes) + postcard-serialized `Vec<ConceptRecord>`.
//! - 4 bytes: Magic ("SLPL")
//! - 1 byte: Version
//!
//! File I/O happens in the app layer; these are pure transformations.
//!
//! ## Limits
//!
//! Sizes are validated before deserialization:
//! - Maximum snapshot size (`MAX_SNAPSHOT_SIZE`)
//! - Header validation before payload parsing

use crate::embedding::validate_embedding;
use crate::{
    Concept, ConceptId, ConceptMetadata, CoreState, EmbeddingVersion, SlpError, primitives,
};
use serde::{Deserialize, Serialize};

/// Maximum allowed snapshot size (500 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 500 * 1024 * 1024;

/// Header length in bytes.
const HEADER_LEN: usize = 5;

// =============================================================================
// CONCEPT RECORD
// =============================================================================

/// A persisted concept.
///
/// `payload` is an optional pass-through of the raw submission text for
/// display; the core never reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptRecord {
    pub id: ConceptId,
    pub embedding_version: String,
    pub embedding: Vec<f64>,
    pub authorship: Vec<String>,
    pub parents: Vec<ConceptId>,
    pub novelty_score: f64,
    pub timestamp: f64,
    pub is_near_duplicate: bool,
    pub primary_duplicate_id: Option<ConceptId>,
    pub submission_references: Vec<String>,
    pub payload: Option<String>,
}

impl ConceptRecord {
    /// Flatten a concept into its record.
    #[must_use]
    pub fn from_concept(concept: &Concept, payload: Option<String>) -> Self {
        let metadata = concept.metadata();
        Self {
            id: concept.id().clone(),
            embedding_version: concept.embedding_version().to_string(),
            embedding: concept.embedding().to_vec(),
            authorship: concept.authorship().to_vec(),
            parents: concept.parents().to_vec(),
            novelty_score: concept.novelty_score(),
            timestamp: metadata.timestamp,
            is_near_duplicate: metadata.is_near_duplicate,
            primary_duplicate_id: metadata.primary_duplicate_id.clone(),
            submission_references: metadata.submission_references.clone(),
            payload,
        }
    }

    /// Rebuild the concept, validating what storage may have corrupted.
    pub fn into_concept(self) -> Result<Concept, SlpError> {
        if self.id.as_str().is_empty() || self.embedding_version.is_empty() {
            return Err(SlpError::SerializationError(
                "record is missing its id or embedding version".to_string(),
            ));
        }
        if self.embedding.is_empty() {
            return Err(SlpError::SerializationError(format!(
                "record {} has an empty embedding",
                self.id
            )));
        }
        let version = EmbeddingVersion::new(&self.embedding_version, self.embedding.len())?;
        validate_embedding(&self.embedding, &version).map_err(|e| {
            SlpError::SerializationError(format!(
                "record {} has an invalid embedding: {}",
                self.id, e
            ))
        })?;
        if !self.timestamp.is_finite() || !self.novelty_score.is_finite() {
            return Err(SlpError::SerializationError(format!(
                "record {} has a non-finite timestamp or score",
                self.id
            )));
        }

        Ok(Concept::from_parts(
            self.id,
            self.embedding,
            self.embedding_version,
            self.authorship,
            self.parents,
            self.novelty_score,
            ConceptMetadata {
                timestamp: self.timestamp,
                is_near_duplicate: self.is_near_duplicate,
                primary_duplicate_id: self.primary_duplicate_id,
                submission_references: self.submission_references,
            },
        ))
    }
}

// =============================================================================
// FILE HEADER
// =============================================================================

/// The snapshot header precedes all record data.
#[derive(Debug, Clone, Copy)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), SlpError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(SlpError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(SlpError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SlpError> {
        if bytes.len() < HEADER_LEN {
            return Err(SlpError::SerializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SNAPSHOT FUNCTIONS
// =============================================================================

/// Serialize records to snapshot bytes (header + payload).
pub fn records_to_bytes(records: &[ConceptRecord]) -> Result<Vec<u8>, SlpError> {
    let payload = postcard::to_stdvec(records)
        .map_err(|e| SlpError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize records from snapshot bytes.
///
/// Size and header are validated before the payload is parsed.
pub fn records_from_bytes(bytes: &[u8]) -> Result<Vec<ConceptRecord>, SlpError> {
    if bytes.len() < HEADER_LEN {
        return Err(SlpError::SerializationError(
            "Data too short: minimum 5 bytes required".to_string(),
        ));
    }
    if bytes.len() > MAX_SNAPSHOT_SIZE {
        return Err(SlpError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_SIZE
        )));
    }

    PersistenceHeader::from_bytes(bytes)?.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        SlpError::SerializationError(format!("Failed to deserialize snapshot: {}", e))
    })
}

/// Serialize a state in insertion order. Payloads are not part of state.
pub fn state_to_bytes(state: &CoreState) -> Result<Vec<u8>, SlpError> {
    let records: Vec<ConceptRecord> = state
        .iter()
        .map(|c| ConceptRecord::from_concept(c, None))
        .collect();
    records_to_bytes(&records)
}

/// Rebuild a state from snapshot bytes, keeping snapshot order.
pub fn state_from_bytes(bytes: &[u8]) -> Result<CoreState, SlpError> {
    let concepts = records_from_bytes(bytes)?
        .into_iter()
        .map(ConceptRecord::into_concept)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(CoreState::from_concepts(concepts))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, parents: &[&str]) -> ConceptRecord {
        ConceptRecord {
            id: ConceptId::new(id),
            embedding_version: "v".to_string(),
            embedding: vec![0.6, 0.8],
            authorship: vec!["alice".to_string()],
            parents: parents.iter().map(|p| ConceptId::new(*p)).collect(),
            novelty_score: 1.25,
            timestamp: 42.5,
            is_near_duplicate: !parents.is_empty(),
            primary_duplicate_id: parents.first().map(|p| ConceptId::new(*p)),
            submission_references: vec!["ref-1".to_string()],
            payload: Some("text".to_string()),
        }
    }

    #[test]
    fn header_roundtrip() {
        let bytes = PersistenceHeader::new().to_bytes();
        let restored = PersistenceHeader::from_bytes(&bytes).expect("parse header");

        assert_eq!(restored.magic, *primitives::MAGIC_BYTES);
        assert_eq!(restored.version, primitives::FORMAT_VERSION);
    }

    #[test]
    fn record_survives_concept_conversion() {
        let original = record("c-2", &["c-1"]);
        let concept = original.clone().into_concept().expect("concept");
        let back = ConceptRecord::from_concept(&concept, original.payload.clone());
        assert_eq!(original, back);
    }

    #[test]
    fn snapshot_is_bit_exact_after_reload() {
        let state = CoreState::from_concepts([
            record("c-1", &[]).into_concept().expect("concept"),
            record("c-2", &["c-1"]).into_concept().expect("concept"),
        ]);

        let bytes1 = state_to_bytes(&state).expect("serialize");
        let restored = state_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = state_to_bytes(&restored).expect("serialize");

        assert_eq!(bytes1, bytes2, "save -> load -> save must produce identical bytes");
        let order: Vec<_> = restored.iter().map(|c| c.id().as_str()).collect();
        assert_eq!(order, ["c-1", "c-2"]);
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"XXXX");
        assert!(records_from_bytes(&bytes).is_err());
    }

    #[test]
    fn unnormalized_embedding_rejected() {
        let mut bad = record("c-1", &[]);
        bad.embedding = vec![5.0, 0.0, 0.0];
        assert!(matches!(
            bad.into_concept(),
            Err(SlpError::SerializationError(_))
        ));

        let mut zero = record("c-2", &[]);
        zero.embedding = vec![0.0, 0.0];
        assert!(zero.into_concept().is_ok());
    }

    #[test]
    fn corrupt_embedding_rejected() {
        let mut bad = record("c-1", &[]);
        bad.embedding = vec![f64::INFINITY];
        assert!(matches!(
            bad.into_concept(),
            Err(SlpError::SerializationError(_))
        ));
    }
}
