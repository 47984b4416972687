use tracing::debug;

use crate::corpus::{Corpus, Entry};
use crate::matcher::{LexicalMatcher, ScoredHit, VectorMatcher};

/// Well-known comfort passages served when retrieval comes up empty,
/// tagged with the concern categories they speak to.
const POPULAR_REFERENCES: &[(&str, u32, u32, &[&str])] = &[
    ("시편", 23, 1, &["신앙", "감정"]),
    ("요한복음", 3, 16, &["신앙"]),
    ("로마서", 8, 28, &["신앙", "진로"]),
    ("빌립보서", 4, 13, &["진로", "건강"]),
    ("마태복음", 11, 28, &["감정", "건강"]),
    ("이사야", 40, 31, &["건강", "진로"]),
    ("예레미야", 29, 11, &["진로"]),
    ("고린도전서", 13, 4, &["관계"]),
    ("시편", 46, 1, &["감정", "신앙"]),
    ("디모데후서", 1, 7, &["감정"]),
];

/// A retrieval result: the matched entry plus its transient score.
/// Scores live here, never on the corpus entry itself, so concurrent
/// searches cannot trample each other.
#[derive(Debug, Clone)]
pub struct ScoredEntry {
    pub entry: Entry,
    pub score: f32,
}

/// Merges the vector and lexical paths behind the one public search
/// contract. Infallible by construction: both matchers signal trouble
/// with empty result sets, so the coordinator always returns a list.
pub struct RetrievalCoordinator {
    vector: VectorMatcher,
    lexical: LexicalMatcher,
    similarity_threshold: f32,
}

impl RetrievalCoordinator {
    pub fn new(similarity_threshold: f32, lexical_threshold: f32) -> Self {
        Self {
            vector: VectorMatcher::new(similarity_threshold),
            lexical: LexicalMatcher::new(lexical_threshold),
            similarity_threshold,
        }
    }

    /// Vector-first search with lexical backfill.
    ///
    /// The vector path runs when a query vector is supplied; if it
    /// yields fewer than `top_k` hits the lexical path fills the gap,
    /// skipping entries the vector path already returned. Vector-sourced
    /// results always precede lexical-sourced ones.
    pub fn search_entries(
        &self,
        corpus: &Corpus,
        query: &str,
        query_vector: Option<&[f32]>,
        top_k: usize,
    ) -> Vec<ScoredEntry> {
        if top_k == 0 || corpus.is_empty() {
            return Vec::new();
        }

        let mut hits: Vec<ScoredHit> = match query_vector {
            Some(vector) => self.vector.search(corpus, vector, top_k),
            None => Vec::new(),
        };

        if hits.len() < top_k {
            let needed = top_k - hits.len();
            let lexical = self.lexical.search(corpus, query, top_k);
            let mut appended = 0;
            for hit in lexical {
                if appended == needed {
                    break;
                }
                if hits.iter().any(|h| h.index == hit.index) {
                    continue;
                }
                hits.push(hit);
                appended += 1;
            }
        }

        // Lexical scores are on the same 0..=1 scale, so one global
        // floor applies to the merged list.
        hits.retain(|h| h.score >= self.similarity_threshold);
        hits.truncate(top_k);

        debug!("retrieval produced {} results for query", hits.len());
        hits.into_iter()
            .filter_map(|hit| {
                corpus.entries.get(hit.index).map(|entry| ScoredEntry {
                    entry: entry.clone(),
                    score: hit.score,
                })
            })
            .collect()
    }

    /// Curated fallback for the empty-result case. With a category, only
    /// passages tagged for it are considered; a category no passage is
    /// tagged for falls back to the full list rather than returning
    /// nothing. Scores are pinned to 1.0.
    pub fn popular_entries(
        &self,
        corpus: &Corpus,
        category: Option<&str>,
        count: usize,
    ) -> Vec<ScoredEntry> {
        let subset: Vec<&(&str, u32, u32, &[&str])> = match category {
            Some(cat) => {
                let tagged: Vec<_> = POPULAR_REFERENCES
                    .iter()
                    .filter(|(_, _, _, cats)| cats.contains(&cat))
                    .collect();
                if tagged.is_empty() {
                    POPULAR_REFERENCES.iter().collect()
                } else {
                    tagged
                }
            }
            None => POPULAR_REFERENCES.iter().collect(),
        };

        let mut results = Vec::new();
        for (group, coord1, coord2, _) in subset {
            if results.len() == count {
                break;
            }
            if let Some(entry) = corpus.find_by_location(group, *coord1, *coord2) {
                results.push(ScoredEntry {
                    entry: entry.clone(),
                    score: 1.0,
                });
            }
        }
        results
    }
}
