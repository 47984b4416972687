use simsimd::SpatialSimilarity;
use tracing::debug;

use super::{sort_hits, ScoredHit};
use crate::corpus::Corpus;

/// Oversampling factor applied before threshold filtering, so the final
/// cut still fills `top_k` after low-confidence candidates drop out.
const OVERSAMPLE_FACTOR: usize = 2;

pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> f32 {
    match f32::cosine(lhs, rhs) {
        Some(distance) => ((1.0 - distance) as f32).clamp(-1.0, 1.0),
        None => cosine_similarity_scalar(lhs, rhs),
    }
}

pub fn cosine_similarity_scalar(lhs: &[f32], rhs: &[f32]) -> f32 {
    let dot: f32 = lhs.iter().zip(rhs).map(|(a, b)| a * b).sum();
    let norm_l: f32 = lhs.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_r: f32 = rhs.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_l == 0.0 || norm_r == 0.0 {
        return 0.0;
    }
    (dot / (norm_l * norm_r)).clamp(-1.0, 1.0)
}

/// Nearest-neighbor search over the corpus embedding matrix.
pub struct VectorMatcher {
    threshold: f32,
}

impl VectorMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Score the query vector against every matrix row in one pass,
    /// keep the `2*top_k` best, drop below-threshold scores, and return
    /// up to `top_k` hits descending. Missing vectors, a dimensionality
    /// mismatch, or an empty query all yield an empty result set.
    pub fn search(&self, corpus: &Corpus, query: &[f32], top_k: usize) -> Vec<ScoredHit> {
        let Some(matrix) = corpus.matrix.as_ref() else {
            return Vec::new();
        };
        if top_k == 0 || matrix.rows() == 0 {
            return Vec::new();
        }
        if query.len() != matrix.dim() {
            debug!(
                "query vector has {} dims, corpus uses {}; skipping vector search",
                query.len(),
                matrix.dim()
            );
            return Vec::new();
        }

        // Row i of the matrix belongs to the i-th entry that carries an
        // embedding; recover the entry indices in row order.
        let row_to_entry: Vec<usize> = corpus
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.has_embedding())
            .map(|(i, _)| i)
            .collect();

        let mut hits: Vec<ScoredHit> = matrix
            .iter_rows()
            .zip(&row_to_entry)
            .map(|(row, &index)| ScoredHit {
                index,
                score: cosine_similarity(query, row),
            })
            .collect();

        let shortlist = top_k.saturating_mul(OVERSAMPLE_FACTOR);
        if hits.len() > shortlist {
            hits.select_nth_unstable_by(shortlist, |a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.index.cmp(&b.index))
            });
            hits.truncate(shortlist);
        }

        hits.retain(|h| h.score >= self.threshold);
        sort_hits(&mut hits);
        hits.truncate(top_k);
        hits
    }
}
