mod fetch;
mod parse;
mod store;

pub use fetch::CorpusSource;
pub use store::{invalidate_cached_corpus, CorpusStore, LoadReport};

use std::collections::BTreeMap;

use serde::Serialize;

/// Three-part locator of an entry inside the reference work,
/// e.g. book / chapter / verse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub group: String,
    pub coord1: u32,
    pub coord2: u32,
}

impl SourceLocation {
    pub fn reference(&self) -> String {
        format!("{} {}:{}", self.group, self.coord1, self.coord2)
    }
}

/// One immutable unit of the reference corpus.
///
/// `row` indexes this entry's embedding inside [`EmbeddingMatrix`];
/// `None` means the entry carries no vector and is only reachable
/// through lexical search.
#[derive(Debug, Clone)]
pub struct Entry {
    pub id: String,
    pub text: String,
    pub location: SourceLocation,
    pub row: Option<usize>,
}

impl Entry {
    pub fn reference(&self) -> String {
        self.location.reference()
    }

    pub fn has_embedding(&self) -> bool {
        self.row.is_some()
    }
}

/// Dense row-major stack of the embedding vectors, reduced to f32
/// to bound memory. Row i corresponds to the entry whose `row == Some(i)`.
#[derive(Debug, Clone)]
pub struct EmbeddingMatrix {
    data: Vec<f32>,
    dim: usize,
}

impl EmbeddingMatrix {
    pub fn new(data: Vec<f32>, dim: usize) -> Self {
        debug_assert!(dim > 0 && data.len() % dim == 0);
        Self { data, dim }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        let start = i.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// Iterate all rows in corpus order.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.dim)
    }
}

/// The fully loaded collection. Immutable once published; rebuilt
/// wholesale on reload, never patched in place.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub entries: Vec<Entry>,
    pub matrix: Option<EmbeddingMatrix>,
}

impl Corpus {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn vector_dim(&self) -> usize {
        self.matrix.as_ref().map(|m| m.dim()).unwrap_or(0)
    }

    pub fn has_vectors(&self) -> bool {
        self.matrix.as_ref().map(|m| m.rows() > 0).unwrap_or(false)
    }

    pub fn embedding_of(&self, entry: &Entry) -> Option<&[f32]> {
        let row = entry.row?;
        self.matrix.as_ref()?.row(row)
    }

    /// Entry count per group, ordered by group name.
    pub fn group_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.location.group.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn find_by_location(&self, group: &str, coord1: u32, coord2: u32) -> Option<&Entry> {
        self.entries.iter().find(|e| {
            e.location.group == group
                && e.location.coord1 == coord1
                && e.location.coord2 == coord2
        })
    }
}

/// Structured stats consumed by health reporting; cheap to produce.
#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub loaded: bool,
    pub entry_count: usize,
    pub group_count: usize,
    pub vector_dim: usize,
    pub per_group_counts: BTreeMap<String, usize>,
    pub memory_usage_mb: f64,
}

impl CorpusStats {
    pub fn unloaded() -> Self {
        Self {
            loaded: false,
            entry_count: 0,
            group_count: 0,
            vector_dim: 0,
            per_group_counts: BTreeMap::new(),
            memory_usage_mb: crate::memory::memory_usage_mb(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_entry(id: &str, text: &str, group: &str, c1: u32, c2: u32) -> Entry {
    Entry {
        id: id.to_string(),
        text: text.to_string(),
        location: SourceLocation {
            group: group.to_string(),
            coord1: c1,
            coord2: c2,
        },
        row: None,
    }
}
