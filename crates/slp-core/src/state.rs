//! # Core State
//!
//! The in-memory registry of every admitted concept.
//!
//! - Keyed by `ConceptId` (`BTreeMap` index, no `HashMap`)
//! - Insertion order preserved for deterministic replay and enumeration
//! - Grows monotonically; the core never deletes an admitted concept
//!
//! The state is an explicit handle. There is no global instance: whoever
//! drives the pipeline owns it and passes `&mut CoreState` to the single
//! writer.

use crate::{Concept, ConceptId};
use std::collections::{BTreeMap, BTreeSet};

/// The full set of admitted concepts.
#[derive(Debug, Clone, Default)]
pub struct CoreState {
    /// Concepts in insertion order.
    concepts: Vec<Concept>,
    /// Reverse lookup: ConceptId -> position in `concepts`.
    index: BTreeMap<ConceptId, usize>,
}

impl CoreState {
    /// Create a new empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate a state from concepts in load order.
    #[must_use]
    pub fn from_concepts(concepts: impl IntoIterator<Item = Concept>) -> Self {
        let mut state = Self::new();
        for concept in concepts {
            state.insert(concept);
        }
        state
    }

    /// Insert a concept, replacing any existing concept with the same id.
    ///
    /// A replacement keeps the original insertion position.
    /// Returns the replaced concept, if any.
    pub fn insert(&mut self, concept: Concept) -> Option<Concept> {
        if let Some(&pos) = self.index.get(concept.id()) {
            return Some(std::mem::replace(&mut self.concepts[pos], concept));
        }
        self.index.insert(concept.id().clone(), self.concepts.len());
        self.concepts.push(concept);
        None
    }

    /// Lookup a concept by id.
    #[must_use]
    pub fn get(&self, id: &ConceptId) -> Option<&Concept> {
        self.index.get(id).map(|&pos| &self.concepts[pos])
    }

    /// Check if a concept exists.
    #[must_use]
    pub fn contains(&self, id: &ConceptId) -> bool {
        self.index.contains_key(id)
    }

    /// Concepts sharing an embedding version, in insertion order.
    pub fn concepts_for_version<'a>(
        &'a self,
        embedding_version: &'a str,
    ) -> impl Iterator<Item = &'a Concept> + 'a {
        self.concepts
            .iter()
            .filter(move |c| c.embedding_version() == embedding_version)
    }

    /// Embedding length of a version partition, taken from its first concept.
    #[must_use]
    pub fn dimensionality(&self, embedding_version: &str) -> Option<usize> {
        self.concepts_for_version(embedding_version)
            .next()
            .map(|c| c.embedding().len())
    }

    /// All concepts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.iter()
    }

    /// Distinct embedding version names present in state.
    #[must_use]
    pub fn versions(&self) -> BTreeSet<&str> {
        self.concepts
            .iter()
            .map(|c| c.embedding_version())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConceptMetadata;

    fn concept(id: &str, version: &str, score: f64) -> Concept {
        Concept::from_parts(
            ConceptId::new(id),
            vec![1.0, 0.0],
            version.to_string(),
            vec!["a".to_string()],
            Vec::new(),
            score,
            ConceptMetadata {
                timestamp: 0.0,
                is_near_duplicate: false,
                primary_duplicate_id: None,
                submission_references: Vec::new(),
            },
        )
    }

    #[test]
    fn insert_and_lookup() {
        let mut state = CoreState::new();
        assert!(state.insert(concept("c-1", "v", 1.0)).is_none());

        assert!(state.contains(&ConceptId::new("c-1")));
        assert_eq!(state.len(), 1);
        assert!(state.get(&ConceptId::new("c-2")).is_none());
    }

    #[test]
    fn replace_keeps_position() {
        let mut state = CoreState::new();
        state.insert(concept("c-1", "v", 1.0));
        state.insert(concept("c-2", "v", 1.0));

        let replaced = state.insert(concept("c-1", "v", 0.5));
        assert_eq!(replaced.map(|c| c.novelty_score()), Some(1.0));
        assert_eq!(state.len(), 2);

        let order: Vec<_> = state.iter().map(|c| c.id().as_str()).collect();
        assert_eq!(order, ["c-1", "c-2"]);
        let score = state.get(&ConceptId::new("c-1")).map(|c| c.novelty_score());
        assert_eq!(score, Some(0.5));
    }

    #[test]
    fn version_filter_preserves_insertion_order() {
        let state = CoreState::from_concepts([
            concept("c-3", "v1", 1.0),
            concept("c-1", "v2", 1.0),
            concept("c-2", "v1", 1.0),
        ]);

        let v1: Vec<_> = state
            .concepts_for_version("v1")
            .map(|c| c.id().as_str())
            .collect();
        assert_eq!(v1, ["c-3", "c-2"]);
        assert_eq!(state.concepts_for_version("v3").count(), 0);
        assert_eq!(state.dimensionality("v1"), Some(2));
        assert_eq!(state.dimensionality("v3"), None);
        assert_eq!(state.versions().into_iter().collect::<Vec<_>>(), ["v1", "v2"]);
    }
}
