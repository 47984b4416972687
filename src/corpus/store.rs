use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use moka::sync::Cache;
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::fetch::{
    build_agent, decode_document, download_if_missing, fetch_url, read_local, CorpusSource,
};
use super::parse::{build_corpus, record_array};
use super::{Corpus, CorpusStats};
use crate::error::LoadError;
use crate::memory;

/// Process-wide corpus cache so repeated loads of the same source
/// short-circuit. Keyed by explicit cache name, invalidated explicitly;
/// correctness never depends on it.
static CORPUS_CACHE: Lazy<Cache<String, Arc<Corpus>>> =
    Lazy::new(|| Cache::new(4));

pub fn invalidate_cached_corpus(cache_name: &str) {
    CORPUS_CACHE.invalidate(cache_name);
}

/// Outcome of one successful load, consumed by health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub entry_count: usize,
    pub group_count: usize,
    pub vector_dim: usize,
    pub skipped_records: usize,
    pub memory_delta_mb: f64,
    pub from_cache: bool,
}

/// Owns the published corpus. Loads serialize on an internal lock and
/// build the replacement corpus off to the side; readers see either the
/// fully-old or fully-new corpus via a single `Arc` swap, never a
/// partially overwritten one.
pub struct CorpusStore {
    published: RwLock<Option<Arc<Corpus>>>,
    load_lock: Mutex<()>,
    agent: ureq::Agent,
    download_path: PathBuf,
    cache_name: Option<String>,
}

impl CorpusStore {
    pub fn new(download_path: PathBuf, timeout_secs: u64, cache_name: Option<String>) -> Self {
        Self {
            published: RwLock::new(None),
            load_lock: Mutex::new(()),
            agent: build_agent(timeout_secs),
            download_path,
            cache_name,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.published
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// Snapshot of the currently published corpus. The read lock is held
    /// only for the `Arc` clone.
    pub fn corpus(&self) -> Option<Arc<Corpus>> {
        self.published.read().ok().and_then(|guard| guard.clone())
    }

    /// Load (or reload) the corpus from `source`. A failed load leaves
    /// the previously published corpus untouched.
    pub fn load(&self, source: &CorpusSource) -> Result<LoadReport, LoadError> {
        let _serialize = self.load_lock.lock().unwrap_or_else(|e| e.into_inner());
        let memory_before = memory::memory_usage_mb();

        if let Some(name) = &self.cache_name {
            if let Some(cached) = CORPUS_CACHE.get(name) {
                info!("corpus served from cache '{name}' ({} entries)", cached.len());
                let report = Self::report_for(&cached, 0, 0.0, true);
                self.publish(cached);
                return Ok(report);
            }
        }

        let records = self.gather_records(source)?;
        let (corpus, skipped) = build_corpus(records)?;
        let corpus = Arc::new(corpus);

        let memory_delta = (memory::memory_usage_mb() - memory_before).max(0.0);
        info!(
            "corpus loaded: {} entries, {} dims, +{:.1} MB",
            corpus.len(),
            corpus.vector_dim(),
            memory_delta
        );

        if let Some(name) = &self.cache_name {
            CORPUS_CACHE.insert(name.clone(), Arc::clone(&corpus));
        }

        let report = Self::report_for(&corpus, skipped, memory_delta, false);
        self.publish(corpus);
        Ok(report)
    }

    pub fn get_stats(&self) -> CorpusStats {
        match self.corpus() {
            Some(corpus) => {
                let per_group_counts = corpus.group_counts();
                CorpusStats {
                    loaded: true,
                    entry_count: corpus.len(),
                    group_count: per_group_counts.len(),
                    vector_dim: corpus.vector_dim(),
                    per_group_counts,
                    memory_usage_mb: memory::memory_usage_mb(),
                }
            }
            None => CorpusStats::unloaded(),
        }
    }

    fn publish(&self, corpus: Arc<Corpus>) {
        match self.published.write() {
            Ok(mut guard) => *guard = Some(corpus),
            Err(mut poisoned) => **poisoned.get_mut() = Some(corpus),
        }
    }

    fn report_for(
        corpus: &Corpus,
        skipped: usize,
        memory_delta_mb: f64,
        from_cache: bool,
    ) -> LoadReport {
        LoadReport {
            entry_count: corpus.len(),
            group_count: corpus.group_counts().len(),
            vector_dim: corpus.vector_dim(),
            skipped_records: skipped,
            memory_delta_mb,
            from_cache,
        }
    }

    fn gather_records(&self, source: &CorpusSource) -> Result<Vec<Value>, LoadError> {
        match source {
            CorpusSource::Local(path) => {
                let bytes = read_local(path)?;
                record_array(decode_document(&bytes)?)
            }
            CorpusSource::Remote(url) => {
                download_if_missing(&self.agent, url, &self.download_path)?;
                let bytes = read_local(&self.download_path)?;
                record_array(decode_document(&bytes)?)
            }
            CorpusSource::MultiRemote(urls) => {
                // Sharded corpus: each part is fetched and parsed
                // independently so one bad shard does not sink the rest.
                let mut all = Vec::new();
                for (i, url) in urls.iter().enumerate() {
                    match self.fetch_part(url) {
                        Ok(mut records) => {
                            info!(
                                "corpus part {}/{} loaded: {} records",
                                i + 1,
                                urls.len(),
                                records.len()
                            );
                            all.append(&mut records);
                        }
                        Err(e) => {
                            warn!("corpus part {}/{} failed: {e}", i + 1, urls.len());
                        }
                    }
                }
                if all.is_empty() {
                    return Err(LoadError::NoValidEntries { skipped: 0 });
                }
                Ok(all)
            }
        }
    }

    fn fetch_part(&self, url: &str) -> Result<Vec<Value>, LoadError> {
        let body = fetch_url(&self.agent, url)?;
        record_array(decode_document(&body)?)
    }
}
