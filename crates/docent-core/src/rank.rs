//! Relevance ranking by cosine similarity.
//!
//! Brute-force scan of the whole corpus per query: O(records × dims).
//! Ties keep corpus order.

use crate::corpus::CorpusStore;
use crate::error::{DocentError, Result};
use crate::models::RankedResult;

pub const DEFAULT_TOP_N: usize = 100;

/// Cosine similarity between two vectors of equal length.
///
/// Returns a value in `[-1.0, 1.0]`; `0.0` when either vector has zero norm.
///
/// # Errors
///
/// [`DocentError::DimensionMismatch`] if the lengths differ.
///
/// ```text
///            a · b
/// cos(θ) = ─────────
///          ‖a‖ × ‖b‖
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(DocentError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f64::EPSILON {
        return Ok(0.0);
    }
    Ok((dot / denom).clamp(-1.0, 1.0) as f32)
}

/// Score every record in `corpus` against `query` and return the best `top_n`,
/// most similar first.
///
/// An empty corpus yields an empty result regardless of the query.
///
/// # Errors
///
/// [`DocentError::DimensionMismatch`] if the query length differs from the
/// corpus dimensionality, [`DocentError::EmbeddingFailed`] if the query
/// holds a NaN or infinite component.
pub fn rank<'a>(query: &[f32], corpus: &'a CorpusStore, top_n: usize) -> Result<Vec<RankedResult<'a>>> {
    if corpus.is_empty() {
        return Ok(Vec::new());
    }
    if query.len() != corpus.dims() {
        return Err(DocentError::DimensionMismatch {
            expected: corpus.dims(),
            actual: query.len(),
        });
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(DocentError::EmbeddingFailed(
            "query embedding contains non-finite values".to_string(),
        ));
    }

    let mut ranked = corpus
        .iter()
        .map(|record| {
            Ok(RankedResult {
                text: record.text.as_str(),
                score: cosine_similarity(query, &record.embedding)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(top_n);
    Ok(ranked)
}
