//! # Neighbor Search
//!
//! Brute-force k-nearest-neighbor scan by cosine distance.
//!
//! Cost is O(n) distance evaluations per query. That is only acceptable for
//! small ledgers; an index would replace this scan at scale.
//!
//! Candidates must already be restricted to one embedding version.
//! Comparing vectors across versions is undefined.

use crate::novelty::cosine_distance;
use crate::{Concept, SlpError};

/// A prior concept paired with its distance to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub concept: Concept,
    pub distance: f64,
}

/// Return the `k` candidates nearest to `query`, nearest first.
///
/// Ties keep enumeration order (stable sort). Fewer than `k` candidates
/// yields fewer results, never an error. A candidate whose embedding length
/// differs from the query fails with `SlpError::InvalidInput`.
pub fn k_nearest<'a, I>(query: &[f64], candidates: I, k: usize) -> Result<Vec<Neighbor>, SlpError>
where
    I: IntoIterator<Item = &'a Concept>,
{
    let mut scored: Vec<(&Concept, f64)> = Vec::new();
    for concept in candidates {
        let distance = cosine_distance(query, concept.embedding())?;
        scored.push((concept, distance));
    }

    scored.sort_by(|a, b| a.1.total_cmp(&b.1));

    Ok(scored
        .into_iter()
        .take(k)
        .map(|(concept, distance)| Neighbor {
            concept: concept.clone(),
            distance,
        })
        .collect())
}

// =============================================================================
// TESTS
// =============================================================================
