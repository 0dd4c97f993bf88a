//! # Lineage Traversal
//!
//! Walks a concept's primary-parent chain (`parents[0]`) back to a root.
//!
//! Lineage is a display and analysis aid, so traversal never fails. It stops
//! at the first of:
//! - a root (no recorded parents)
//! - a dangling reference (id not in state)
//! - a revisited id (cycle guard)

use crate::{Concept, ConceptId, CoreState};
use std::collections::BTreeSet;

/// Return the chain from `concept_id` back to its root, newest first.
///
/// The first element is the queried concept when it exists. An unknown id
/// yields an empty chain.
#[must_use]
pub fn lineage_chain<'a>(state: &'a CoreState, concept_id: &ConceptId) -> Vec<&'a Concept> {
    let mut chain = Vec::new();
    let mut visited: BTreeSet<&ConceptId> = BTreeSet::new();
    let mut current = state.get(concept_id);

    while let Some(concept) = current {
        if !visited.insert(concept.id()) {
            break;
        }
        chain.push(concept);
        current = concept.primary_parent().and_then(|parent| state.get(parent));
    }

    chain
}

/// Number of primary-parent hops from `concept_id` to its root.
///
/// A root has depth 0. Unknown ids also report 0.
#[must_use]
pub fn lineage_depth(state: &CoreState, concept_id: &ConceptId) -> usize {
    lineage_chain(state, concept_id).len().saturating_sub(1)
}

// =============================================================================
// TESTS
// =============================================================================
