//! # Ledger Metrics
//!
//! Read-only summary of a `CoreState`, used by `slp status` and `GET /status`.

use crate::{ConceptId, CoreState};
use crate::lineage::lineage_depth;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary counts over all admitted concepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerMetrics {
    /// Total number of admitted concepts.
    pub concept_count: usize,
    /// Concept count per embedding version name.
    pub per_version: BTreeMap<String, usize>,
    /// Concepts with no parents.
    pub root_count: usize,
    /// Concepts flagged as near-duplicates.
    pub near_duplicate_count: usize,
    /// Longest lineage chain, counted in hops to the root.
    pub max_lineage_depth: usize,
    /// Mean novelty score (None for an empty state).
    pub mean_novelty: Option<f64>,
}

impl LedgerMetrics {
    /// Create metrics for an empty state.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            concept_count: 0,
            per_version: BTreeMap::new(),
            root_count: 0,
            near_duplicate_count: 0,
            max_lineage_depth: 0,
            mean_novelty: None,
        }
    }

    /// Compute metrics from a state.
    #[must_use]
    pub fn from_state(state: &CoreState) -> Self {
        if state.is_empty() {
            return Self::empty();
        }

        let mut metrics = Self::empty();
        let mut novelty_sum = 0.0;
        let depths = lineage_depths(state);

        for concept in state.iter() {
            metrics.concept_count += 1;
            *metrics
                .per_version
                .entry(concept.embedding_version().to_string())
                .or_insert(0) += 1;
            if concept.is_root() {
                metrics.root_count += 1;
            }
            if concept.is_near_duplicate() {
                metrics.near_duplicate_count += 1;
            }
            novelty_sum += concept.novelty_score();
        }

        metrics.max_lineage_depth = depths.values().copied().max().unwrap_or(0);
        metrics.mean_novelty = Some(novelty_sum / metrics.concept_count as f64);
        metrics
    }
}

/// Lineage depth of every concept, in one pass over insertion order.
///
/// A concept whose primary parent was inserted earlier reuses that parent's
/// depth. A parent inserted later (only possible in imported or hand-built
/// states) falls back to a full `lineage_depth` walk, and so do its
/// descendants, which keeps the cycle guard in force.
fn lineage_depths(state: &CoreState) -> BTreeMap<&ConceptId, usize> {
    let mut memo: BTreeMap<&ConceptId, usize> = BTreeMap::new();
    let mut depths = BTreeMap::new();

    for concept in state.iter() {
        let depth = match concept.primary_parent() {
            None => Some(0),
            Some(parent) if !state.contains(parent) => Some(0),
            Some(parent) => memo.get(parent).map(|d| d + 1),
        };
        match depth {
            Some(d) => {
                memo.insert(concept.id(), d);
                depths.insert(concept.id(), d);
            }
            None => {
                depths.insert(concept.id(), lineage_depth(state, concept.id()));
            }
        }
    }
    depths
}

impl Default for LedgerMetrics {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Concept, ConceptId, ConceptMetadata};

    fn concept(id: &str, version: &str, parents: &[&str], score: f64, dup: bool) -> Concept {
        Concept::from_parts(
            ConceptId::new(id),
            vec![1.0, 0.0],
            version.to_string(),
            vec!["alice".to_string()],
            parents.iter().map(|p| ConceptId::new(*p)).collect(),
            score,
            ConceptMetadata {
                timestamp: 0.0,
                is_near_duplicate: dup,
                primary_duplicate_id: None,
                submission_references: Vec::new(),
            },
        )
    }

    #[test]
    fn depths_agree_with_lineage_walk() {
        // "late" is inserted before its parent; "p" and "q" form a cycle.
        let state = CoreState::from_concepts([
            concept("late", "v1", &["b"], 1.0, false),
            concept("a", "v1", &[], 1.0, false),
            concept("b", "v1", &["a"], 1.0, false),
            concept("c", "v1", &["b"], 1.0, false),
            concept("d", "v1", &["gone"], 1.0, false),
            concept("p", "v1", &["q"], 1.0, false),
            concept("q", "v1", &["p"], 1.0, false),
        ]);

        let depths = lineage_depths(&state);

        for c in state.iter() {
            assert_eq!(depths.get(c.id()), Some(&lineage_depth(&state, c.id())));
        }
        assert_eq!(LedgerMetrics::from_state(&state).max_lineage_depth, 2);
    }

    #[test]
    fn long_duplicate_chain_depth() {
        let ids: Vec<String> = (0..2000).map(|i| format!("c-{}", i)).collect();
        let state = CoreState::from_concepts(ids.iter().enumerate().map(|(i, id)| {
            let parent: Vec<&str> = if i == 0 { Vec::new() } else { vec![ids[i - 1].as_str()] };
            concept(id, "v1", &parent, 0.0, i > 0)
        }));

        let metrics = LedgerMetrics::from_state(&state);

        assert_eq!(metrics.max_lineage_depth, 1999);
        assert_eq!(metrics.root_count, 1);
        assert_eq!(metrics.near_duplicate_count, 1999);
    }

    #[test]
    fn empty_state_has_no_mean() {
        let metrics = LedgerMetrics::from_state(&CoreState::new());
        assert_eq!(metrics, LedgerMetrics::empty());
        assert!(metrics.mean_novelty.is_none());
    }

    #[test]
    fn counts_roots_duplicates_and_depth() {
        let state = CoreState::from_concepts([
            concept("a", "v1", &[], 2.0, false),
            concept("b", "v1", &["a"], 1.0, false),
            concept("c", "v1", &["b", "a"], 0.0, true),
            concept("x", "v2", &[], 1.0, false),
        ]);

        let metrics = LedgerMetrics::from_state(&state);
        assert_eq!(metrics.concept_count, 4);
        assert_eq!(metrics.per_version.get("v1"), Some(&3));
        assert_eq!(metrics.per_version.get("v2"), Some(&1));
        assert_eq!(metrics.root_count, 2);
        assert_eq!(metrics.near_duplicate_count, 1);
        assert_eq!(metrics.max_lineage_depth, 2);
        assert_eq!(metrics.mean_novelty, Some(1.0));
    }
}
