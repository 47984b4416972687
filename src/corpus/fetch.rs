use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::LoadError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const MAX_DOWNLOAD_ATTEMPTS: u32 = 3;
const LARGE_DOWNLOAD_WARN_MB: f64 = 50.0;

/// Where a corpus comes from, parsed from a locator string: a local path,
/// one HTTP(S) URL, or a comma-joined list of URLs for sharded corpora.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSource {
    Local(PathBuf),
    Remote(String),
    MultiRemote(Vec<String>),
}

impl CorpusSource {
    pub fn parse(locator: &str) -> Self {
        let locator = locator.trim();
        if !locator.starts_with("http") {
            return Self::Local(PathBuf::from(locator));
        }
        if locator.contains(',') {
            let urls: Vec<String> = locator
                .split(',')
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty())
                .collect();
            return Self::MultiRemote(urls);
        }
        Self::Remote(locator.to_string())
    }

    /// Cache key for the process-wide corpus cache.
    pub fn cache_key(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::Remote(url) => url.clone(),
            Self::MultiRemote(urls) => urls.join(","),
        }
    }
}

pub fn build_agent(timeout_secs: u64) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Fetch a URL body with retries and exponential backoff.
pub fn fetch_url(agent: &ureq::Agent, url: &str) -> Result<Vec<u8>, LoadError> {
    let mut last_reason = String::new();

    for attempt in 1..=MAX_DOWNLOAD_ATTEMPTS {
        info!("downloading corpus part (attempt {attempt}/{MAX_DOWNLOAD_ATTEMPTS}): {url}");
        match agent.get(url).call() {
            Ok(response) => {
                if let Some(len) = response
                    .header("content-length")
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    let size_mb = len as f64 / 1024.0 / 1024.0;
                    if size_mb > LARGE_DOWNLOAD_WARN_MB {
                        warn!("corpus part is large ({size_mb:.1} MB), transfer may be slow");
                    }
                }
                let mut body = Vec::new();
                match response.into_reader().read_to_end(&mut body) {
                    Ok(_) => return Ok(body),
                    Err(e) => last_reason = format!("read body: {e}"),
                }
            }
            Err(ureq::Error::Status(status, _)) => {
                last_reason = format!("status {status}");
            }
            Err(e) => last_reason = e.to_string(),
        }

        if attempt < MAX_DOWNLOAD_ATTEMPTS {
            std::thread::sleep(Duration::from_secs(1 << (attempt - 1)));
        }
    }

    Err(LoadError::Unreachable {
        url: url.to_string(),
        reason: last_reason,
    })
}

/// Download a URL to a deterministic local path unless already present.
pub fn download_if_missing(
    agent: &ureq::Agent,
    url: &str,
    dest: &Path,
) -> Result<(), LoadError> {
    if dest.exists() {
        info!("corpus file already present at {}", dest.display());
        return Ok(());
    }

    let body = fetch_url(agent, url)?;

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| LoadError::Io {
            path: parent.display().to_string(),
            reason: e.to_string(),
        })?;
    }
    fs::write(dest, body).map_err(|e| LoadError::Io {
        path: dest.display().to_string(),
        reason: e.to_string(),
    })?;

    info!("corpus downloaded to {}", dest.display());
    Ok(())
}

pub fn read_local(path: &Path) -> Result<Vec<u8>, LoadError> {
    fs::read(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn is_gzipped(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[..2] == GZIP_MAGIC
}

/// Decode a corpus byte stream into a JSON document, gunzipping when the
/// gzip magic header is present regardless of any file extension.
pub fn decode_document(bytes: &[u8]) -> Result<Value, LoadError> {
    let text = if is_gzipped(bytes) {
        let mut decoder = GzDecoder::new(bytes);
        let mut out = String::new();
        decoder
            .read_to_string(&mut out)
            .map_err(|e| LoadError::Decompress(e.to_string()))?;
        out
    } else {
        String::from_utf8(bytes.to_vec()).map_err(|e| LoadError::Parse(e.to_string()))?
    };

    serde_json::from_str(&text).map_err(|e| LoadError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn locator_parsing_covers_all_three_shapes() {
        assert_eq!(
            CorpusSource::parse("/data/corpus.json"),
            CorpusSource::Local(PathBuf::from("/data/corpus.json"))
        );
        assert_eq!(
            CorpusSource::parse("https://cdn.test/corpus.json.gz"),
            CorpusSource::Remote("https://cdn.test/corpus.json.gz".to_string())
        );
        assert_eq!(
            CorpusSource::parse("https://a.test/1.gz, https://a.test/2.gz"),
            CorpusSource::MultiRemote(vec![
                "https://a.test/1.gz".to_string(),
                "https://a.test/2.gz".to_string()
            ])
        );
    }

    #[test]
    fn empty_segments_in_multi_url_are_dropped() {
        let source = CorpusSource::parse("https://a.test/1.gz,,https://a.test/2.gz,");
        assert_eq!(
            source,
            CorpusSource::MultiRemote(vec![
                "https://a.test/1.gz".to_string(),
                "https://a.test/2.gz".to_string()
            ])
        );
    }

    #[test]
    fn plain_json_decodes_without_magic() {
        let doc = decode_document(br#"[{"text": "ok"}]"#).unwrap();
        assert!(doc.is_array());
    }

    #[test]
    fn gzipped_json_is_detected_by_magic_not_extension() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"verses": []}"#).unwrap();
        let bytes = encoder.finish().unwrap();

        assert!(is_gzipped(&bytes));
        let doc = decode_document(&bytes).unwrap();
        assert!(doc.get("verses").is_some());
    }

    #[test]
    fn truncated_gzip_reports_decompress_error() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"verses": []}"#).unwrap();
        let mut bytes = encoder.finish().unwrap();
        bytes.truncate(6);

        assert!(matches!(
            decode_document(&bytes),
            Err(LoadError::Decompress(_))
        ));
    }

    #[test]
    fn invalid_json_reports_parse_error() {
        assert!(matches!(
            decode_document(b"not json"),
            Err(LoadError::Parse(_))
        ));
    }

    #[test]
    fn cache_key_is_stable_per_source() {
        let a = CorpusSource::parse("https://a.test/1.gz,https://a.test/2.gz");
        let b = CorpusSource::parse("https://a.test/1.gz, https://a.test/2.gz");
        assert_eq!(a.cache_key(), b.cache_key());
    }
}
