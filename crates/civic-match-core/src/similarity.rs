//! Stateless similarity primitives.
//!
//! Both functions are symmetric and never return NaN: zero norms and empty
//! unions are defined as zero similarity.

use std::collections::BTreeSet;

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` when either norm is zero or when the lengths differ.
/// Accumulates in `f64`, so `cosine(a, b) == cosine(b, a)` exactly.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return 0.0;
    }

    dot / denom
}

/// Jaccard index `|A ∩ B| / |A ∪ B|`, in `[0.0, 1.0]`.
///
/// Two empty sets have similarity `0.0`.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}
