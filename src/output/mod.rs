use std::time::Duration;

use serde::Serialize;

use crate::corpus::CorpusStats;
use crate::search::ScoredEntry;

/// One retrieval result flattened for external consumers. Scores are
/// rounded to three decimals at this boundary only; internal math keeps
/// full precision.
#[derive(Debug, Clone, Serialize)]
pub struct EntryRecord {
    pub id: String,
    pub text: String,
    pub group: String,
    pub coord1: u32,
    pub coord2: u32,
    pub reference: String,
    pub similarity_score: f32,
}

impl EntryRecord {
    pub fn from_scored(result: &ScoredEntry) -> Self {
        Self {
            id: result.entry.id.clone(),
            text: result.entry.text.clone(),
            group: result.entry.location.group.clone(),
            coord1: result.entry.location.coord1,
            coord2: result.entry.location.coord2,
            reference: result.entry.reference(),
            similarity_score: round3(result.score),
        }
    }
}

fn round3(score: f32) -> f32 {
    (score * 1000.0).round() / 1000.0
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub top_k: usize,
    pub duration_ms: u128,
    pub results: Vec<EntryRecord>,
    pub fallback_used: bool,
}

impl SearchResponse {
    pub fn from_results(
        query: &str,
        top_k: usize,
        results: &[ScoredEntry],
        fallback_used: bool,
        duration: Duration,
    ) -> Self {
        Self {
            query: query.to_string(),
            top_k,
            duration_ms: duration.as_millis(),
            results: results.iter().map(EntryRecord::from_scored).collect(),
            fallback_used,
        }
    }
}

#[derive(Serialize)]
pub struct ClassifyResponse {
    pub text: String,
    pub categories: Vec<CategoryScore>,
}

#[derive(Serialize)]
pub struct CategoryScore {
    pub category: String,
    pub score: f32,
}

impl ClassifyResponse {
    pub fn from_scores(text: &str, scores: &[(&'static str, f32)]) -> Self {
        Self {
            text: text.to_string(),
            categories: scores
                .iter()
                .map(|(category, score)| CategoryScore {
                    category: category.to_string(),
                    score: round3(*score),
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CorpusStats,
    pub similarity_threshold: f32,
    pub categories: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::test_entry;

    fn scored(id: &str, score: f32) -> ScoredEntry {
        ScoredEntry {
            entry: test_entry(id, "여호와는 나의 목자시니", "시편", 23, 1),
            score,
        }
    }

    #[test]
    fn record_flattens_location_and_rounds_score() {
        let record = EntryRecord::from_scored(&scored("ps", 0.87654));
        assert_eq!(record.group, "시편");
        assert_eq!(record.reference, "시편 23:1");
        assert_eq!(record.similarity_score, 0.877);
    }

    #[test]
    fn search_response_carries_query_and_results() {
        let results = vec![scored("a", 1.0), scored("b", 0.5)];
        let response =
            SearchResponse::from_results("외로워요", 5, &results, false, Duration::from_millis(3));

        assert_eq!(response.query, "외로워요");
        assert_eq!(response.results.len(), 2);
        assert!(!response.fallback_used);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["results"][0]["similarity_score"], 1.0);
    }

    #[test]
    fn classify_response_rounds_scores() {
        let response = ClassifyResponse::from_scores("가족", &[("관계", 2.33333)]);
        assert_eq!(response.categories[0].category, "관계");
        assert_eq!(response.categories[0].score, 2.333);
    }
}
