use tracing::debug;

use super::{sort_hits, ScoredHit};
use crate::corpus::Corpus;

/// Tokens shorter than this carry too little signal in Korean text,
/// where single syllables are mostly particles.
const MIN_KEYWORD_CHARS: usize = 2;
const MAX_QUERY_KEYWORDS: usize = 10;

/// Split the query into keywords: alphanumeric runs, lowercased, at
/// least two characters, deduplicated in first-seen order, capped at
/// [`MAX_QUERY_KEYWORDS`]. Lengths count characters, not bytes.
pub fn extract_keywords(text: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if token.chars().count() < MIN_KEYWORD_CHARS {
            continue;
        }
        let token = token.to_lowercase();
        if !keywords.contains(&token) {
            keywords.push(token);
        }
        if keywords.len() == MAX_QUERY_KEYWORDS {
            break;
        }
    }
    keywords
}

fn occurrence_count(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Keyword-overlap search, the fallback path when no query vector is
/// available or vector search comes up empty.
pub struct LexicalMatcher {
    threshold: f32,
}

impl LexicalMatcher {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Score every entry by keyword density: each keyword contributes
    /// `keyword_chars * occurrences / entry_chars * 100`, summed and
    /// clamped to 1.0. Zero-score entries are excluded; the rest come
    /// back descending, at most `top_k`.
    pub fn search(&self, corpus: &Corpus, query: &str, top_k: usize) -> Vec<ScoredHit> {
        if top_k == 0 {
            return Vec::new();
        }
        let keywords = extract_keywords(query);
        if keywords.is_empty() {
            debug!("no usable keywords in query, skipping lexical search");
            return Vec::new();
        }

        let mut hits: Vec<ScoredHit> = corpus
            .entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| {
                let score = score_entry(&entry.text, &keywords);
                (score > 0.0 && score >= self.threshold).then_some(ScoredHit { index, score })
            })
            .collect();

        sort_hits(&mut hits);
        hits.truncate(top_k);
        hits
    }
}

fn score_entry(text: &str, keywords: &[String]) -> f32 {
    let text_chars = text.chars().count();
    if text_chars == 0 {
        return 0.0;
    }
    let lowered = text.to_lowercase();

    let mut score = 0.0f32;
    for keyword in keywords {
        let count = occurrence_count(&lowered, keyword);
        if count == 0 {
            continue;
        }
        let kw_chars = keyword.chars().count() as f32;
        score += kw_chars * count as f32 / text_chars as f32 * 100.0;
    }
    score.min(1.0)
}
