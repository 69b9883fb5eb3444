use std::cmp::Ordering;

use crate::models::Recommendation;

pub mod metrics;
pub mod validation;

fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine of the angle between `a` and `b`; 0.0 for mismatched widths or a zero vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let denominator = l2_norm(a) * l2_norm(b);
    if denominator == 0.0 {
        return 0.0;
    }
    a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>() / denominator
}

/// Scales `vector` to unit length in place. Zero vectors are left alone.
pub fn normalize_vector(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > 0.0 {
        vector.iter_mut().for_each(|x| *x /= norm);
    }
}

/// Weighted mean of equally sized vectors. Vectors of a different width than the
/// first one are skipped.
pub fn weighted_average(vectors: &[(Vec<f32>, f32)]) -> Vec<f32> {
    if vectors.is_empty() {
        return Vec::new();
    }

    let dim = vectors[0].0.len();
    let mut result = vec![0.0; dim];
    let mut total_weight = 0.0;

    for (vector, weight) in vectors {
        if vector.len() != dim {
            continue;
        }

        for (acc, value) in result.iter_mut().zip(vector) {
            *acc += value * weight;
        }
        total_weight += weight;
    }

    if total_weight > 0.0 {
        for x in result.iter_mut() {
            *x /= total_weight;
        }
    }

    result
}

/// Min-max scales `values` into [0, 1]. A constant column maps to all zeros.
pub fn min_max_scale(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if !range.is_finite() || range == 0.0 {
        return vec![0.0; values.len()];
    }

    values.iter().map(|v| (v - min) / range).collect()
}

/// Stable descending sort by score; equal scores keep their incoming order.
pub fn sort_by_score_desc(recommendations: &mut [Recommendation]) {
    recommendations.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
}
