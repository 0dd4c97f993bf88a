//! # Concept Integration Pipeline
//!
//! One linear pass from a `Submission` to an admitted `Concept`:
//!
//! 1. Embed the payload (the only step with external failure modes)
//! 2. Select candidates sharing `params.embedding_version`
//! 3. Find the `k` nearest neighbors
//! 4. Score novelty from the neighbor distances
//! 5. Select parents: nearest-first neighbors within `tau`, at most `p`
//! 6. Flag a near-duplicate when the nearest neighbor is within `delta`
//! 7. Derive the concept id
//! 8. Construct the concept and insert it into state
//!
//! Nothing is retried. Insertion is the last step, so a failure at any
//! earlier step leaves state untouched.
//!
//! ## Split Form
//!
//! `integrate_submission` runs all steps at once. Callers sharing state
//! between threads run `embed_submission` first with no lock held, then take
//! the writer lock around `prepare_concept` and `CoreState::insert` so that
//! neighbor search and insertion happen as one atomic pair.
//!
//! ## Thresholds
//!
//! `tau` (parenthood) and `delta` (near-duplicate) are independent. A concept
//! can be flagged a near-duplicate while recording fewer than `p` parents, or
//! the reverse; no ordering between the two is enforced.

use crate::embedding::{Embedder, validate_embedding};
use crate::novelty::{NoveltyComponents, NoveltyParams, compute_novelty};
use crate::primitives::{
    CONCEPT_ID_DOMAIN, CONCEPT_ID_PREFIX, ID_EMBEDDING_SAMPLE, ID_ROUNDING_SCALE,
};
use crate::search::{Neighbor, k_nearest};
use crate::{Concept, ConceptId, ConceptMetadata, CoreState, SlpError, Submission};
use serde::{Deserialize, Serialize};

// =============================================================================
// PARAMETERS
// =============================================================================

/// Tunable configuration for one pipeline run.
///
/// Immutable per run. Different runs may use different params against the
/// same state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreParams {
    /// Which partition of state to search.
    pub embedding_version: String,
    /// Novelty function parameters.
    pub novelty: NoveltyParams,
    /// Neighbor count for search.
    pub k: usize,
    /// Maximum parents to attach.
    pub p: usize,
    /// Distance threshold for parenthood.
    pub tau: f64,
    /// Distance threshold for near-duplicate flagging.
    pub delta: f64,
}

impl Default for CoreParams {
    fn default() -> Self {
        Self {
            embedding_version: "toy-hash-dim64".to_string(),
            novelty: NoveltyParams::default(),
            k: 8,
            p: 4,
            tau: 0.6,
            delta: 0.1,
        }
    }
}

impl CoreParams {
    /// Reject params that cannot drive a run.
    pub fn validate(&self) -> Result<(), SlpError> {
        if self.embedding_version.trim().is_empty() {
            return Err(SlpError::InvalidInput(
                "params.embedding_version is empty".to_string(),
            ));
        }
        let floats = [
            ("tau", self.tau),
            ("delta", self.delta),
            ("novelty.r", self.novelty.r),
            ("novelty.alpha", self.novelty.alpha),
            ("novelty.beta", self.novelty.beta),
        ];
        for (name, value) in floats {
            if !value.is_finite() {
                return Err(SlpError::InvalidInput(format!(
                    "params.{} is not finite",
                    name
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// Output of one pipeline invocation.
///
/// The state the pipeline mutated stays with the caller that lent it.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrateResult {
    /// The newly admitted concept.
    pub concept: Concept,
    /// Score breakdown behind `concept.novelty_score()`.
    pub novelty: NoveltyComponents,
    /// The neighbors the concept was derived from, nearest first.
    pub neighbors: Vec<Neighbor>,
}

// =============================================================================
// PIPELINE
// =============================================================================

/// Run the full pipeline and insert the new concept into `state`.
pub fn integrate_submission<E: Embedder + ?Sized>(
    submission: &Submission,
    state: &mut CoreState,
    params: &CoreParams,
    embedder: &E,
) -> Result<IntegrateResult, SlpError> {
    let embedding = embed_submission(submission, params, embedder)?;
    let result = prepare_concept(submission, embedding, state, params)?;
    state.insert(result.concept.clone());
    Ok(result)
}

/// Step 1: embed the payload and check the vector against the contract.
///
/// Touches no state, so it may run without any lock held.
pub fn embed_submission<E: Embedder + ?Sized>(
    submission: &Submission,
    params: &CoreParams,
    embedder: &E,
) -> Result<Vec<f64>, SlpError> {
    params.validate()?;

    let version = embedder.version();
    if version.name() != params.embedding_version {
        return Err(SlpError::InvalidInput(format!(
            "embedder produces {} but params select {}",
            version.name(),
            params.embedding_version
        )));
    }

    let embedding = embedder.embed(submission.payload())?;
    validate_embedding(&embedding, version)?;
    Ok(embedding)
}

/// Steps 2-8 without the final insert.
///
/// Pure with respect to `state`: the caller inserts `result.concept` once any
/// further side effects (such as persistence) have succeeded.
pub fn prepare_concept(
    submission: &Submission,
    embedding: Vec<f64>,
    state: &CoreState,
    params: &CoreParams,
) -> Result<IntegrateResult, SlpError> {
    params.validate()?;
    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(SlpError::InvalidInput(
            "embedding contains non-finite components".to_string(),
        ));
    }

    let candidates = state.concepts_for_version(&params.embedding_version);
    let neighbors = k_nearest(&embedding, candidates, params.k)?;
    let distances: Vec<f64> = neighbors.iter().map(|n| n.distance).collect();

    let novelty = compute_novelty(&distances, &params.novelty);

    let parents = select_parents(&neighbors, params.tau, params.p);
    for parent in &parents {
        match state.get(parent) {
            Some(c) if c.embedding_version() == params.embedding_version => {}
            _ => return Err(SlpError::DanglingParentReference(parent.clone())),
        }
    }

    let primary_duplicate_id = detect_near_duplicate(&neighbors, params.delta);

    let id = derive_concept_id(
        submission.payload(),
        submission.authorship(),
        submission.timestamp(),
        &parents,
        &embedding,
    )?;
    if state.contains(&id) {
        return Err(SlpError::IdCollision(id));
    }

    let metadata = ConceptMetadata {
        timestamp: submission.timestamp(),
        is_near_duplicate: primary_duplicate_id.is_some(),
        primary_duplicate_id,
        submission_references: submission.references().to_vec(),
    };
    let concept = Concept::from_parts(
        id,
        embedding,
        params.embedding_version.clone(),
        submission.authorship().to_vec(),
        parents,
        novelty.score,
        metadata,
    );

    Ok(IntegrateResult {
        concept,
        novelty,
        neighbors,
    })
}

/// Nearest-first neighbor ids within `tau`, at most `p` of them.
///
/// `neighbors` must already be sorted ascending by distance.
#[must_use]
pub fn select_parents(neighbors: &[Neighbor], tau: f64, p: usize) -> Vec<ConceptId> {
    neighbors
        .iter()
        .filter(|n| n.distance <= tau)
        .take(p)
        .map(|n| n.concept.id().clone())
        .collect()
}

/// The nearest neighbor's id when it lies within `delta`.
#[must_use]
pub fn detect_near_duplicate(neighbors: &[Neighbor], delta: f64) -> Option<ConceptId> {
    neighbors
        .first()
        .filter(|nearest| nearest.distance <= delta)
        .map(|nearest| nearest.concept.id().clone())
}

// =============================================================================
// IDENTIFIER DERIVATION
// =============================================================================

/// Canonical id preimage. Field order is the serialization order.
#[derive(Serialize)]
struct IdPreimage<'a> {
    domain: &'a str,
    payload: &'a str,
    authorship: &'a [String],
    timestamp_micros: i64,
    parents: &'a [ConceptId],
    embedding_sample: Vec<i64>,
}

fn round_scaled(value: f64) -> i64 {
    (value * ID_ROUNDING_SCALE).round() as i64
}

/// Derive a concept id from its defining inputs.
///
/// The timestamp and the first `ID_EMBEDDING_SAMPLE` embedding components
/// are rounded to 6 decimal places, then the postcard encoding of the
/// preimage is hashed with BLAKE3. Identical inputs give identical ids on
/// every platform.
pub fn derive_concept_id(
    payload: &str,
    authorship: &[String],
    timestamp: f64,
    parents: &[ConceptId],
    embedding: &[f64],
) -> Result<ConceptId, SlpError> {
    let preimage = IdPreimage {
        domain: CONCEPT_ID_DOMAIN,
        payload,
        authorship,
        timestamp_micros: round_scaled(timestamp),
        parents,
        embedding_sample: embedding
            .iter()
            .take(ID_EMBEDDING_SAMPLE)
            .map(|&v| round_scaled(v))
            .collect(),
    };

    let bytes = postcard::to_allocvec(&preimage)
        .map_err(|e| SlpError::SerializationError(e.to_string()))?;
    let digest = blake3::hash(&bytes);

    Ok(ConceptId(format!("{}{}", CONCEPT_ID_PREFIX, digest.to_hex())))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EmbeddingVersion, HashEmbedder};

    /// Backend returning a fixed vector for every payload.
    struct FixedEmbedder {
        version: EmbeddingVersion,
        vector: Vec<f64>,
    }

    impl Embedder for FixedEmbedder {
        fn version(&self) -> &EmbeddingVersion {
            &self.version
        }

        fn embed(&self, _payload: &str) -> Result<Vec<f64>, SlpError> {
            Ok(self.vector.clone())
        }
    }

    /// Backend that is always down.
    struct OfflineEmbedder {
        version: EmbeddingVersion,
    }

    impl Embedder for OfflineEmbedder {
        fn version(&self) -> &EmbeddingVersion {
            &self.version
        }

        fn embed(&self, _payload: &str) -> Result<Vec<f64>, SlpError> {
            Err(SlpError::EmbeddingUnavailable("backend offline".to_string()))
        }
    }

    fn params_for(version: &str) -> CoreParams {
        CoreParams {
            embedding_version: version.to_string(),
            ..CoreParams::default()
        }
    }

    fn submission(payload: &str, timestamp: f64) -> Submission {
        Submission::new(payload, vec!["tester".to_string()], timestamp).expect("submission")
    }

    #[test]
    fn default_params_match_reference_backend() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        assert_eq!(CoreParams::default().embedding_version, embedder.version().name());
    }

    #[test]
    fn first_concept_is_root_and_maximally_novel() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let params = CoreParams::default();
        let mut state = CoreState::new();

        let result =
            integrate_submission(&submission("hello", 1.0), &mut state, &params, &embedder)
                .expect("integrate");

        assert!(result.neighbors.is_empty());
        assert!(result.concept.is_root());
        assert!(!result.concept.is_near_duplicate());
        assert_eq!(result.concept.metadata().primary_duplicate_id, None);
        assert_eq!(
            result.concept.novelty_score(),
            params.novelty.alpha + params.novelty.beta
        );
        assert!(result.concept.id().as_str().starts_with(CONCEPT_ID_PREFIX));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn identical_embedding_is_near_duplicate() {
        let version = EmbeddingVersion::new("fixed", 2).expect("version");
        let embedder = FixedEmbedder {
            version,
            vector: vec![0.6, 0.8],
        };
        let params = params_for("fixed");
        let mut state = CoreState::new();

        let first = integrate_submission(&submission("one", 1.0), &mut state, &params, &embedder)
            .expect("first");
        let second = integrate_submission(&submission("two", 2.0), &mut state, &params, &embedder)
            .expect("second");

        assert_eq!(second.novelty.d_min, Some(0.0));
        assert!(second.concept.is_near_duplicate());
        assert_eq!(
            second.concept.metadata().primary_duplicate_id.as_ref(),
            Some(first.concept.id())
        );
        assert_eq!(second.concept.parents(), [first.concept.id().clone()]);
    }

    #[test]
    fn embedding_failure_leaves_state_untouched() {
        let embedder = OfflineEmbedder {
            version: EmbeddingVersion::new("down", 4).expect("version"),
        };
        let mut state = CoreState::new();

        let result =
            integrate_submission(&submission("hello", 1.0), &mut state, &params_for("down"), &embedder);

        assert!(matches!(result, Err(SlpError::EmbeddingUnavailable(_))));
        assert!(state.is_empty());
    }

    #[test]
    fn version_mismatch_is_invalid_input() {
        let embedder = HashEmbedder::new(16, 0).expect("embedder");
        let mut state = CoreState::new();

        let result = integrate_submission(
            &submission("hello", 1.0),
            &mut state,
            &CoreParams::default(),
            &embedder,
        );
        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
        assert!(state.is_empty());
    }

    #[test]
    fn unnormalized_backend_output_is_rejected() {
        let embedder = FixedEmbedder {
            version: EmbeddingVersion::new("fixed", 2).expect("version"),
            vector: vec![3.0, 4.0],
        };
        let mut state = CoreState::new();

        let result =
            integrate_submission(&submission("hello", 1.0), &mut state, &params_for("fixed"), &embedder);
        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
        assert!(state.is_empty());
    }

    #[test]
    fn non_finite_params_are_rejected() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let params = CoreParams {
            tau: f64::NAN,
            ..CoreParams::default()
        };
        let mut state = CoreState::new();

        let result = integrate_submission(&submission("hello", 1.0), &mut state, &params, &embedder);
        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
    }

    #[test]
    fn other_versions_are_never_candidates() {
        let embedder_a = FixedEmbedder {
            version: EmbeddingVersion::new("a", 2).expect("version"),
            vector: vec![1.0, 0.0],
        };
        let embedder_b = FixedEmbedder {
            version: EmbeddingVersion::new("b", 3).expect("version"),
            vector: vec![1.0, 0.0, 0.0],
        };
        let mut state = CoreState::new();

        integrate_submission(&submission("x", 1.0), &mut state, &params_for("a"), &embedder_a)
            .expect("a");
        let result =
            integrate_submission(&submission("x", 2.0), &mut state, &params_for("b"), &embedder_b)
                .expect("b");

        assert!(result.neighbors.is_empty());
        assert!(result.concept.is_root());
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn prepare_does_not_mutate_state() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let params = CoreParams::default();
        let state = CoreState::new();

        let sub = submission("hello", 1.0);
        let embedding = embed_submission(&sub, &params, &embedder).expect("embed");
        let result = prepare_concept(&sub, embedding, &state, &params).expect("prepare");

        assert!(state.is_empty());
        assert!(!state.contains(result.concept.id()));
    }

    #[test]
    fn colliding_id_is_a_hard_error() {
        let embedder = FixedEmbedder {
            version: EmbeddingVersion::new("fixed", 2).expect("version"),
            vector: vec![1.0, 0.0],
        };
        // no parents can be recorded, so a resubmission derives the same id
        let params = CoreParams {
            p: 0,
            ..params_for("fixed")
        };
        let mut state = CoreState::new();
        let sub = submission("same", 1.0);

        integrate_submission(&sub, &mut state, &params, &embedder).expect("first");
        let result = integrate_submission(&sub, &mut state, &params, &embedder);

        assert!(matches!(result, Err(SlpError::IdCollision(_))));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn derived_id_is_deterministic_and_input_sensitive() {
        let authors = vec!["a".to_string(), "b".to_string()];
        let parents = vec![ConceptId::new("c-1")];
        let embedding = [0.6, 0.8];

        let id1 = derive_concept_id("p", &authors, 1.5, &parents, &embedding).expect("id");
        let id2 = derive_concept_id("p", &authors, 1.5, &parents, &embedding).expect("id");
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str().len(), CONCEPT_ID_PREFIX.len() + 64);

        let reordered = vec!["b".to_string(), "a".to_string()];
        let id3 = derive_concept_id("p", &reordered, 1.5, &parents, &embedding).expect("id");
        assert_ne!(id1, id3);

        let id4 = derive_concept_id("p", &authors, 1.5, &[], &embedding).expect("id");
        assert_ne!(id1, id4);
    }

    #[test]
    fn derived_id_ignores_sub_micro_timestamp_noise() {
        let authors = vec!["a".to_string()];
        let id1 = derive_concept_id("p", &authors, 10.000_000_1, &[], &[1.0]).expect("id");
        let id2 = derive_concept_id("p", &authors, 10.000_000_2, &[], &[1.0]).expect("id");
        assert_eq!(id1, id2);
    }

    #[test]
    fn derived_id_samples_only_leading_components() {
        let authors = vec!["a".to_string()];
        let mut a = vec![0.0; 10];
        let mut b = vec![0.0; 10];
        a[9] = 1.0;
        b[8] = 1.0;
        let id1 = derive_concept_id("p", &authors, 1.0, &[], &a).expect("id");
        let id2 = derive_concept_id("p", &authors, 1.0, &[], &b).expect("id");
        assert_eq!(id1, id2);
    }
}
