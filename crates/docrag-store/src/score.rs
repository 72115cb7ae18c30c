//! Distance-to-score normalization policy.
//!
//! Every backend reports similarity in its own units; retrieval promises a
//! score in `[0, 1]` that is monotonically "higher is better". The conversion
//! depends on the metric the backend was configured with:
//!
//! - cosine distance `d ∈ [0, 2]` → `1 − d`, clamped
//! - L2 distance `d ∈ [0, ∞)` → `1 / (1 + d)`
//! - dot distance (negated inner product) → `−d`, clamped

use docrag_core::DistanceMetric;

/// Convert a backend-native distance into a normalized score.
#[must_use]
pub fn normalize(metric: DistanceMetric, distance: f32) -> f32 {
    match metric {
        DistanceMetric::Cosine => (1.0 - distance).clamp(0.0, 1.0),
        DistanceMetric::L2 => 1.0 / (1.0 + distance.max(0.0)),
        DistanceMetric::Dot => (-distance).clamp(0.0, 1.0),
    }
}

/// Cosine similarity between two vectors, clamped to `[0, 1]`.
///
/// Mismatched lengths and zero vectors score 0. Negative similarity clamps to
/// zero: "opposite" passages are simply irrelevant.
#[must_use]
pub fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}
