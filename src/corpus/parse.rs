use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::{Corpus, EmbeddingMatrix, Entry, SourceLocation};
use crate::error::LoadError;

/// Group name used when a record carries none.
const UNKNOWN_GROUP: &str = "알 수 없음";

/// One corpus record as it appears on the wire. Every field is optional;
/// validation happens in [`record_to_entry`], not during deserialization.
#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    book: Option<String>,
    #[serde(default)]
    chapter: Option<u32>,
    #[serde(default)]
    verse: Option<u32>,
    #[serde(default)]
    embedding: Option<Vec<f32>>,
}

/// Extract the record array from a parsed document. Accepts a bare array
/// or an object with a `verses` key; any other wrapper keys are ignored.
pub fn record_array(doc: Value) -> Result<Vec<Value>, LoadError> {
    match doc {
        Value::Array(records) => Ok(records),
        Value::Object(mut map) => match map.remove("verses") {
            Some(Value::Array(records)) => Ok(records),
            _ => Err(LoadError::UnsupportedShape),
        },
        _ => Err(LoadError::UnsupportedShape),
    }
}

/// Map one raw record to an entry, or `None` when it fails the validity
/// filter (missing or empty text). Never fails the batch.
fn record_to_entry(value: Value) -> Option<(Entry, Option<Vec<f32>>)> {
    let raw: RawRecord = match serde_json::from_value(value) {
        Ok(raw) => raw,
        Err(e) => {
            debug!("skipping malformed record: {e}");
            return None;
        }
    };

    let text = raw.text.filter(|t| !t.is_empty())?;

    let group = raw.book.unwrap_or_else(|| UNKNOWN_GROUP.to_string());
    let coord1 = raw.chapter.unwrap_or(0);
    let coord2 = raw.verse.unwrap_or(0);
    let id = raw
        .id
        .unwrap_or_else(|| format!("{}_{}_{}", group, coord1, coord2));

    let embedding = raw.embedding.filter(|e| !e.is_empty());

    let entry = Entry {
        id,
        text,
        location: SourceLocation {
            group,
            coord1,
            coord2,
        },
        row: None,
    };
    Some((entry, embedding))
}

/// Build a corpus from raw records: filter invalid records, stack the
/// surviving embeddings into the dense matrix, and enforce a single
/// dimensionality across the whole corpus.
///
/// Returns the corpus plus the number of skipped records. Zero valid
/// entries fails the load; a dimensionality mismatch fails it too, since
/// admitting the entry would corrupt every subsequent row offset.
pub fn build_corpus(records: Vec<Value>) -> Result<(Corpus, usize), LoadError> {
    let total = records.len();
    let mut entries = Vec::with_capacity(total);
    let mut matrix_data: Vec<f32> = Vec::new();
    let mut dim: Option<usize> = None;

    for value in records {
        let Some((mut entry, embedding)) = record_to_entry(value) else {
            continue;
        };

        if let Some(vector) = embedding {
            let expected = *dim.get_or_insert(vector.len());
            if vector.len() != expected {
                return Err(LoadError::DimensionalityMismatch {
                    id: entry.id,
                    expected,
                    found: vector.len(),
                });
            }
            entry.row = Some(matrix_data.len() / expected);
            matrix_data.extend_from_slice(&vector);
        }

        entries.push(entry);
    }

    let skipped = total - entries.len();
    if entries.is_empty() {
        return Err(LoadError::NoValidEntries { skipped });
    }
    if skipped > 0 {
        warn!("dropped {skipped} invalid corpus records out of {total}");
    }

    let matrix = dim.map(|d| EmbeddingMatrix::new(matrix_data, d));
    Ok((Corpus { entries, matrix }, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(value: Value) -> Vec<Value> {
        record_array(value).unwrap()
    }

    #[test]
    fn bare_array_and_verses_wrapper_both_parse() {
        let bare = json!([{"text": "말씀", "book": "시편"}]);
        let wrapped = json!({"verses": [{"text": "말씀", "book": "시편"}], "meta": 1});
        assert_eq!(records(bare).len(), 1);
        assert_eq!(records(wrapped).len(), 1);
    }

    #[test]
    fn scalar_document_is_rejected() {
        assert!(matches!(
            record_array(json!(42)),
            Err(LoadError::UnsupportedShape)
        ));
        assert!(matches!(
            record_array(json!({"entries": []})),
            Err(LoadError::UnsupportedShape)
        ));
    }

    #[test]
    fn missing_id_is_synthesized_from_location() {
        let recs = records(json!([{"text": "본문", "book": "시편", "chapter": 23, "verse": 1}]));
        let (corpus, skipped) = build_corpus(recs).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(corpus.entries[0].id, "시편_23_1");
    }

    #[test]
    fn missing_fields_default_and_empty_text_drops() {
        let recs = records(json!([
            {"text": "본문"},
            {"text": "", "book": "시편"},
            {"book": "시편", "chapter": 1, "verse": 1}
        ]));
        let (corpus, skipped) = build_corpus(recs).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(skipped, 2);
        assert_eq!(corpus.entries[0].location.group, UNKNOWN_GROUP);
        assert_eq!(corpus.entries[0].location.coord1, 0);
    }

    #[test]
    fn malformed_record_is_skipped_not_fatal() {
        let recs = records(json!([
            {"text": "좋은 본문"},
            {"text": 17},
            "not even an object"
        ]));
        let (corpus, skipped) = build_corpus(recs).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn embeddings_stack_in_entry_order() {
        let recs = records(json!([
            {"text": "가", "embedding": [1.0, 0.0]},
            {"text": "나"},
            {"text": "다", "embedding": [0.0, 1.0]}
        ]));
        let (corpus, _) = build_corpus(recs).unwrap();
        assert_eq!(corpus.vector_dim(), 2);
        assert_eq!(corpus.entries[0].row, Some(0));
        assert_eq!(corpus.entries[1].row, None);
        assert_eq!(corpus.entries[2].row, Some(1));
        let m = corpus.matrix.as_ref().unwrap();
        assert_eq!(m.row(1), Some(&[0.0, 1.0][..]));
    }

    #[test]
    fn empty_embedding_array_means_no_vector() {
        let recs = records(json!([{"text": "가", "embedding": []}]));
        let (corpus, _) = build_corpus(recs).unwrap();
        assert!(!corpus.has_vectors());
        assert_eq!(corpus.entries[0].row, None);
    }

    #[test]
    fn mixed_dimensionality_fails_the_load() {
        let recs = records(json!([
            {"id": "a", "text": "가", "embedding": [1.0, 0.0]},
            {"id": "b", "text": "나", "embedding": [1.0, 0.0, 0.0]}
        ]));
        let err = build_corpus(recs).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DimensionalityMismatch {
                expected: 2,
                found: 3,
                ..
            }
        ));
    }

    #[test]
    fn all_invalid_records_fail_the_load() {
        let recs = records(json!([{"book": "시편"}, {"text": ""}]));
        assert!(matches!(
            build_corpus(recs),
            Err(LoadError::NoValidEntries { skipped: 2 })
        ));
    }
}
