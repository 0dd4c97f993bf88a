//! # Distance & Novelty Math
//!
//! Pure functions over normalized vectors and neighbor distances.
//!
//! The novelty score combines two components:
//! - `n_d`: how far the nearest neighbor sits beyond the density radius `r`
//! - `n_rho`: how sparse the `k` nearest neighbors are within `r`
//!
//! `score = alpha * n_d + beta * n_rho`. The weights are caller-supplied and
//! need not sum to one.

use crate::SlpError;
use serde::{Deserialize, Serialize};

/// Cosine distance between two L2-normalized vectors.
///
/// Computes `1 - clamp(dot(x, y), -1, 1)`, so the result lies in `[0, 2]`.
/// Inputs are assumed normalized; the clamp absorbs rounding drift.
///
/// Returns `SlpError::InvalidInput` when the lengths differ.
pub fn cosine_distance(x: &[f64], y: &[f64]) -> Result<f64, SlpError> {
    if x.len() != y.len() {
        return Err(SlpError::InvalidInput(format!(
            "vector length mismatch: {} vs {}",
            x.len(),
            y.len()
        )));
    }
    let dot: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    Ok(1.0 - dot.clamp(-1.0, 1.0))
}

/// Parameters of the novelty function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltyParams {
    /// Neighbors considered for density.
    pub k: usize,
    /// Density radius.
    pub r: f64,
    /// Weight of the distance component.
    pub alpha: f64,
    /// Weight of the density component.
    pub beta: f64,
}

impl Default for NoveltyParams {
    fn default() -> Self {
        Self {
            k: 8,
            r: 0.3,
            alpha: 1.0,
            beta: 1.0,
        }
    }
}

/// Score breakdown for one admitted concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoveltyComponents {
    /// Distance to the nearest neighbor; `None` with no neighbors.
    pub d_min: Option<f64>,
    /// Count of the `k` nearest neighbors within radius `r`.
    pub rho_r: usize,
    /// Normalized distance component in `[0, 1]`.
    pub n_d: f64,
    /// Normalized density component in `[0, 1]`.
    pub n_rho: f64,
    /// `alpha * n_d + beta * n_rho`.
    pub score: f64,
}

/// Compute the novelty score from neighbor distances.
///
/// `distances` may arrive in any order and should already be limited to the
/// top-k by the caller. An empty list is maximally novel by definition:
/// `n_d = n_rho = 1` and `score = alpha + beta`.
#[must_use]
pub fn compute_novelty(distances: &[f64], params: &NoveltyParams) -> NoveltyComponents {
    if distances.is_empty() {
        return NoveltyComponents {
            d_min: None,
            rho_r: 0,
            n_d: 1.0,
            n_rho: 1.0,
            score: params.alpha + params.beta,
        };
    }

    let mut sorted = distances.to_vec();
    sorted.sort_by(f64::total_cmp);

    let d_min = sorted[0];
    let rho_r = sorted
        .iter()
        .take(params.k)
        .filter(|&&d| d <= params.r)
        .count();

    let n_d = if params.r >= 1.0 {
        0.0
    } else {
        ((d_min - params.r) / (1.0 - params.r)).clamp(0.0, 1.0)
    };

    let n_rho = if params.k == 0 {
        0.0
    } else {
        1.0 - (rho_r as f64 / params.k as f64)
    };

    NoveltyComponents {
        d_min: Some(d_min),
        rho_r,
        n_d,
        n_rho,
        score: params.alpha * n_d + params.beta * n_rho,
    }
}

// =============================================================================
// TESTS
// =============================================================================
