//! Cosine similarity mapped onto a 0-100 match percentage

use crate::error::{Result, ScoringError};

/// `(cos + 1) / 2 * 100`, with cosine clamped to [-1, 1].
///
/// Vectors must share a non-zero dimensionality. A zero-magnitude vector is
/// treated as orthogonal to everything and scores 50.
pub fn similarity_score(a: &[f32], b: &[f32]) -> Result<f64> {
    let cos = cosine_similarity(a, b)?;
    Ok((cos + 1.0) / 2.0 * 100.0)
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(ScoringError::invalid_input(format!(
            "Vector dimensionality mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    if a.is_empty() {
        return Err(ScoringError::invalid_input("Cannot compare zero-dimensional vectors"));
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() || !dot.is_finite() {
        return Ok(0.0);
    }

    Ok((dot / denominator).clamp(-1.0, 1.0))
}
