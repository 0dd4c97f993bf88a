//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use serde::{Deserialize, Serialize};
use slp_core::{Concept, LedgerMetrics, NoveltyComponents, SlpError, Submission};
use std::collections::BTreeMap;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Ledger status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub concept_count: usize,
    pub per_version: BTreeMap<String, usize>,
    pub root_count: usize,
    pub near_duplicate_count: usize,
    pub max_lineage_depth: usize,
    pub mean_novelty: Option<f64>,
}

impl From<LedgerMetrics> for StatusResponse {
    fn from(metrics: LedgerMetrics) -> Self {
        Self {
            concept_count: metrics.concept_count,
            per_version: metrics.per_version,
            root_count: metrics.root_count,
            near_duplicate_count: metrics.near_duplicate_count,
            max_lineage_depth: metrics.max_lineage_depth,
            mean_novelty: metrics.mean_novelty,
        }
    }
}

// =============================================================================
// CONCEPT JSON
// =============================================================================

/// Concept JSON representation. The embedding vector is left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptJson {
    pub id: String,
    pub embedding_version: String,
    pub authorship: Vec<String>,
    pub parents: Vec<String>,
    pub novelty_score: f64,
    pub timestamp: f64,
    pub is_near_duplicate: bool,
    pub primary_duplicate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submission_references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl ConceptJson {
    pub fn from_concept(concept: &Concept, payload: Option<String>) -> Self {
        let metadata = concept.metadata();
        Self {
            id: concept.id().to_string(),
            embedding_version: concept.embedding_version().to_string(),
            authorship: concept.authorship().to_vec(),
            parents: concept.parents().iter().map(ToString::to_string).collect(),
            novelty_score: concept.novelty_score(),
            timestamp: metadata.timestamp,
            is_near_duplicate: metadata.is_near_duplicate,
            primary_duplicate_id: metadata.primary_duplicate_id.as_ref().map(ToString::to_string),
            submission_references: metadata.submission_references.clone(),
            payload,
        }
    }
}

// =============================================================================
// SUBMIT REQUEST/RESPONSE
// =============================================================================

/// Concept submission request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub payload: String,
    pub authorship: Vec<String>,
    /// Seconds since the Unix epoch. Defaults to the server clock.
    #[serde(default)]
    pub timestamp: Option<f64>,
    #[serde(default)]
    pub references: Vec<String>,
}

impl SubmitRequest {
    /// Convert to a validated Submission, using `now` when no timestamp was sent.
    pub fn to_submission(&self, now: f64) -> Result<Submission, SlpError> {
        let submission = Submission::new(
            self.payload.as_str(),
            self.authorship.clone(),
            self.timestamp.unwrap_or(now),
        )?;
        if self.references.is_empty() {
            Ok(submission)
        } else {
            submission.with_references(self.references.clone())
        }
    }
}

/// Concept submission response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub success: bool,
    pub concept: Option<ConceptJson>,
    pub novelty: Option<NoveltyComponents>,
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn success(concept: ConceptJson, novelty: NoveltyComponents) -> Self {
        Self {
            success: true,
            concept: Some(concept),
            novelty: Some(novelty),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            concept: None,
            novelty: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// CONCEPT RESPONSE
// =============================================================================

/// Single concept lookup response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptResponse {
    pub success: bool,
    pub found: bool,
    pub concept: Option<ConceptJson>,
    pub error: Option<String>,
}

impl ConceptResponse {
    pub fn found(concept: ConceptJson) -> Self {
        Self {
            success: true,
            found: true,
            concept: Some(concept),
            error: None,
        }
    }

    pub fn not_found() -> Self {
        Self {
            success: true,
            found: false,
            concept: None,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            found: false,
            concept: None,
            error: Some(msg.into()),
        }
    }
}

// =============================================================================
// LINEAGE RESPONSE
// =============================================================================

/// One step of a lineage chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageEntry {
    pub id: String,
    pub novelty_score: f64,
    pub timestamp: f64,
}

/// Lineage chain response, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageResponse {
    pub success: bool,
    pub found: bool,
    pub chain: Vec<LineageEntry>,
}

impl LineageResponse {
    pub fn with_chain(chain: &[&Concept]) -> Self {
        Self {
            success: true,
            found: !chain.is_empty(),
            chain: chain
                .iter()
                .map(|c| LineageEntry {
                    id: c.id().to_string(),
                    novelty_score: c.novelty_score(),
                    timestamp: c.timestamp(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Export response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>, // Base64 encoded snapshot
    pub concept_count: Option<usize>,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(data: Vec<u8>, concept_count: usize) -> Self {
        Self {
            success: true,
            data: Some(base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                &data,
            )),
            concept_count: Some(concept_count),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            concept_count: None,
            error: Some(msg.into()),
        }
    }
}
