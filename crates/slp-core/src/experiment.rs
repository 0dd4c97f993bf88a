//! # Synthetic Experiment
//!
//! Runs a sequence of payloads through a fresh in-memory state and reports
//! the resulting ids and novelty scores, in submission order.

use crate::embedding::Embedder;
use crate::pipeline::{CoreParams, integrate_submission};
use crate::{ConceptId, CoreState, SlpError, Submission};
use serde::{Deserialize, Serialize};

/// Outcome of a synthetic run. Both vectors are parallel to the input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticRunResult {
    pub concept_ids: Vec<ConceptId>,
    pub novelty_scores: Vec<f64>,
}

/// Integrate `payloads` one by one into an empty state.
///
/// Submission `i` gets timestamp `base_timestamp + i`. The first failure
/// aborts the run.
pub fn run_synthetic_sequence<E: Embedder + ?Sized>(
    payloads: &[String],
    authorship: &[String],
    params: &CoreParams,
    embedder: &E,
    base_timestamp: f64,
) -> Result<SyntheticRunResult, SlpError> {
    let mut state = CoreState::new();
    let mut concept_ids = Vec::with_capacity(payloads.len());
    let mut novelty_scores = Vec::with_capacity(payloads.len());

    for (i, payload) in payloads.iter().enumerate() {
        let submission = Submission::new(
            payload.as_str(),
            authorship.to_vec(),
            base_timestamp + i as f64,
        )?;
        let result = integrate_submission(&submission, &mut state, params, embedder)?;
        concept_ids.push(result.concept.id().clone());
        novelty_scores.push(result.concept.novelty_score());
    }

    Ok(SyntheticRunResult {
        concept_ids,
        novelty_scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HashEmbedder;

    fn payloads(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_concept_is_maximally_novel_and_repeat_is_not() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let params = CoreParams::default();
        let result = run_synthetic_sequence(
            &payloads(&["seed idea", "other idea", "seed idea"]),
            &["synthetic".to_string()],
            &params,
            &embedder,
            0.0,
        )
        .expect("run");

        assert_eq!(result.concept_ids.len(), 3);
        assert_eq!(result.novelty_scores[0], 2.0);
        assert!(result.novelty_scores[2] < result.novelty_scores[0]);
    }

    #[test]
    fn runs_are_reproducible() {
        let embedder = HashEmbedder::new(32, 9).expect("embedder");
        let params = CoreParams {
            embedding_version: "toy-hash-dim32".to_string(),
            ..CoreParams::default()
        };
        let input = payloads(&["a", "b", "c", "a b"]);
        let authors = ["synthetic".to_string()];

        let first = run_synthetic_sequence(&input, &authors, &params, &embedder, 100.0)
            .expect("run");
        let second = run_synthetic_sequence(&input, &authors, &params, &embedder, 100.0)
            .expect("run");
        assert_eq!(first, second);
    }

    #[test]
    fn blank_payload_aborts_run() {
        let embedder = HashEmbedder::new(64, 0).expect("embedder");
        let result = run_synthetic_sequence(
            &payloads(&["ok", "   "]),
            &["synthetic".to_string()],
            &CoreParams::default(),
            &embedder,
            0.0,
        );
        assert!(matches!(result, Err(SlpError::InvalidInput(_))));
    }
}
