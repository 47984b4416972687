mod lexical;
mod vector;

pub use lexical::{extract_keywords, LexicalMatcher};
pub use vector::{cosine_similarity, VectorMatcher};

/// A matcher hit: an index into `corpus.entries` plus its score.
/// Matchers return empty result sets instead of errors; the coordinator
/// treats empty as "try the other path", never as a failure.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredHit {
    pub index: usize,
    pub score: f32,
}

/// Descending by score, ties broken by original corpus order.
pub(crate) fn sort_hits(hits: &mut [ScoredHit]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.index.cmp(&b.index))
    });
}
