// ============================================================
// Layer 5 — Sequence Similarity Scores
// ============================================================
// Validation compares the flattened greedy predictions with the
// flattened reference targets. Both are plain ID vectors here,
// no tensors involved.
//
// CorrelationDistance (default)
//   1 - pearson(u, v), the same quantity as
//   scipy.spatial.distance.correlation. Range [0, 2], 0 = perfect.
//   Token IDs are treated as magnitudes, so tokens 41 and 42
//   count as "close" even though they are unrelated words. It is
//   a coarse signal, kept because it is cheap and monotone-ish in
//   quality on copy-like tasks.
//
// ExactMatchError
//   Fraction of positions where the IDs differ. Range [0, 1].
//
// Both are distances: lower is better.

use serde::{Deserialize, Serialize};

/// Score used for `val_correlation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimilarityMetric {
    #[default]
    CorrelationDistance,
    ExactMatchError,
}

impl SimilarityMetric {
    /// Distance between two equal-length ID sequences.
    /// Empty inputs score 0.0.
    pub fn score(self, predicted: &[usize], reference: &[usize]) -> f64 {
        match self {
            SimilarityMetric::CorrelationDistance => {
                let u: Vec<f64> = predicted.iter().map(|&x| x as f64).collect();
                let v: Vec<f64> = reference.iter().map(|&x| x as f64).collect();
                correlation_distance(&u, &v)
            }
            SimilarityMetric::ExactMatchError => exact_match_error(predicted, reference),
        }
    }
}

/// `1 - pearson(u, v)`.
///
/// A zero-variance input has no defined correlation; it scores 0.0
/// when both vectors are identical and 1.0 (uncorrelated) otherwise.
pub fn correlation_distance(u: &[f64], v: &[f64]) -> f64 {
    debug_assert_eq!(u.len(), v.len());
    if u.is_empty() {
        return 0.0;
    }

    let n = u.len() as f64;
    let mean_u = u.iter().sum::<f64>() / n;
    let mean_v = v.iter().sum::<f64>() / n;

    let (mut dot, mut norm_u, mut norm_v) = (0.0, 0.0, 0.0);
    for (a, b) in u.iter().zip(v) {
        let (du, dv) = (a - mean_u, b - mean_v);
        dot    += du * dv;
        norm_u += du * du;
        norm_v += dv * dv;
    }

    let denom = (norm_u * norm_v).sqrt();
    if denom == 0.0 {
        return if u == v { 0.0 } else { 1.0 };
    }
    (1.0 - dot / denom).clamp(0.0, 2.0)
}

/// Fraction of mismatching positions.
pub fn exact_match_error(predicted: &[usize], reference: &[usize]) -> f64 {
    debug_assert_eq!(predicted.len(), reference.len());
    if reference.is_empty() {
        return 0.0;
    }
    let wrong = predicted.iter().zip(reference).filter(|(p, r)| p != r).count();
    wrong as f64 / reference.len() as f64
}
