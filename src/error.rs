use thiserror::Error;

/// Failure modes of a single corpus load attempt.
///
/// A `LoadError` is fatal to the attempt, never to the process: the store
/// keeps whatever corpus was previously published and the caller may retry.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("corpus source unreachable: {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("failed to read corpus file {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("gzip decompression failed: {0}")]
    Decompress(String),

    #[error("corpus document is not a record array or a verses wrapper")]
    UnsupportedShape,

    #[error("corpus parse failed: {0}")]
    Parse(String),

    #[error("no valid entries after filtering ({skipped} records skipped)")]
    NoValidEntries { skipped: usize },

    #[error("embedding for entry {id} has {found} dimensions, corpus uses {expected}")]
    DimensionalityMismatch {
        id: String,
        expected: usize,
        found: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_useful_messages() {
        let err = LoadError::NoValidEntries { skipped: 12 };
        assert!(err.to_string().contains("12"));

        let err = LoadError::DimensionalityMismatch {
            id: "ps_23_1".to_string(),
            expected: 384,
            found: 768,
        };
        let msg = err.to_string();
        assert!(msg.contains("ps_23_1"));
        assert!(msg.contains("384"));
        assert!(msg.contains("768"));
    }
}
