use std::path::PathBuf;
use std::{env, fs};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Retrieval knobs. The two thresholds default to the same value but
/// are tuned independently: vector scores cluster high while lexical
/// density scores skew low.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    #[serde(default = "default_lexical_threshold")]
    pub lexical_threshold: f32,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: default_similarity_threshold(),
            lexical_threshold: default_lexical_threshold(),
            max_results: default_max_results(),
        }
    }
}

fn default_similarity_threshold() -> f32 {
    0.3
}

fn default_lexical_threshold() -> f32 {
    0.3
}

fn default_max_results() -> usize {
    5
}

/// Where the corpus comes from and where downloads land.
#[derive(Debug, Clone, Deserialize)]
pub struct CorpusConfig {
    /// Locator string: local path, one URL, or comma-joined URLs.
    pub source: Option<String>,
    /// Local path downloads are written to; defaults next to the config.
    pub corpus_path: Option<PathBuf>,
    /// Named slot in the process-wide corpus cache; unset disables it.
    pub cache_name: Option<String>,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            source: None,
            corpus_path: None,
            cache_name: None,
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

fn default_download_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_memory_mb: default_max_memory_mb(),
        }
    }
}

fn default_max_memory_mb() -> f64 {
    410.0
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = env::var("VERSEGREP_CONFIG") {
            return PathBuf::from(path);
        }

        if let Ok(home) = env::var("VERSEGREP_HOME") {
            return PathBuf::from(home).join("config.toml");
        }

        if let Some(home) = env::var_os("HOME") {
            return PathBuf::from(home).join(".versegrep").join("config.toml");
        }

        PathBuf::from(".versegrep").join("config.toml")
    }

    /// Destination for downloaded corpus files: the configured path, or
    /// `corpus.json` next to the config file.
    pub fn download_path(&self) -> PathBuf {
        match &self.corpus.corpus_path {
            Some(path) => path.clone(),
            None => Self::config_path()
                .parent()
                .map(|dir| dir.join("corpus.json"))
                .unwrap_or_else(|| PathBuf::from("corpus.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    fn default_config_carries_documented_values() {
        let config = Config::default();
        assert_eq!(config.retrieval.similarity_threshold, 0.3);
        assert_eq!(config.retrieval.lexical_threshold, 0.3);
        assert_eq!(config.retrieval.max_results, 5);
        assert_eq!(config.memory.max_memory_mb, 410.0);
        assert_eq!(config.corpus.download_timeout_secs, 60);
        assert!(config.corpus.source.is_none());
    }

    #[test]
    fn empty_toml_matches_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.retrieval.similarity_threshold, 0.3);
        assert_eq!(config.memory.max_memory_mb, 410.0);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let toml = r#"
[retrieval]
similarity_threshold = 0.5
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.retrieval.similarity_threshold, 0.5);
        assert_eq!(config.retrieval.lexical_threshold, 0.3);
        assert_eq!(config.retrieval.max_results, 5);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[retrieval]
similarity_threshold = 0.4
lexical_threshold = 0.2
max_results = 3

[corpus]
source = "https://cdn.test/part1.json.gz,https://cdn.test/part2.json.gz"
corpus_path = "/data/corpus.json"
cache_name = "main"
download_timeout_secs = 30

[memory]
max_memory_mb = 256.0
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.retrieval.max_results, 3);
        assert_eq!(config.corpus.cache_name, Some("main".to_string()));
        assert_eq!(config.corpus.download_timeout_secs, 30);
        assert_eq!(config.memory.max_memory_mb, 256.0);
        assert_eq!(config.download_path(), PathBuf::from("/data/corpus.json"));
    }

    #[test]
    #[serial]
    fn load_missing_config_returns_default() {
        let temp = std::env::temp_dir().join(format!("versegrep_missing_{}", std::process::id()));
        env::set_var("VERSEGREP_CONFIG", temp.join("nonexistent.toml"));
        let config = Config::load().unwrap();
        assert_eq!(config.retrieval.similarity_threshold, 0.3);
        env::remove_var("VERSEGREP_CONFIG");
    }

    #[test]
    #[serial]
    fn config_path_respects_env() {
        let custom_path = "/custom/path/config.toml";
        env::set_var("VERSEGREP_CONFIG", custom_path);
        assert_eq!(Config::config_path(), PathBuf::from(custom_path));
        env::remove_var("VERSEGREP_CONFIG");
    }

    #[test]
    #[serial]
    fn config_path_uses_versegrep_home() {
        env::remove_var("VERSEGREP_CONFIG");
        let home_path = "/custom/versegrep/home";
        env::set_var("VERSEGREP_HOME", home_path);
        assert_eq!(
            Config::config_path(),
            PathBuf::from(home_path).join("config.toml")
        );
        env::remove_var("VERSEGREP_HOME");
    }

    #[test]
    #[serial]
    fn download_path_defaults_next_to_config() {
        env::set_var("VERSEGREP_CONFIG", "/custom/dir/config.toml");
        let config = Config::default();
        assert_eq!(config.download_path(), PathBuf::from("/custom/dir/corpus.json"));
        env::remove_var("VERSEGREP_CONFIG");
    }

    #[test]
    #[serial]
    fn load_valid_config_file() {
        let temp = tempfile::tempdir().unwrap();
        let config_file = temp.path().join("config.toml");
        std::fs::write(&config_file, "[retrieval]\nmax_results = 7\n").unwrap();
        env::set_var("VERSEGREP_CONFIG", &config_file);

        let config = Config::load().unwrap();
        assert_eq!(config.retrieval.max_results, 7);

        env::remove_var("VERSEGREP_CONFIG");
    }

    #[test]
    #[serial]
    fn malformed_config_file_reports_error() {
        let temp = tempfile::tempdir().unwrap();
        let config_file = temp.path().join("config.toml");
        std::fs::write(&config_file, "retrieval = \"not a table\"\n").unwrap();
        env::set_var("VERSEGREP_CONFIG", &config_file);

        assert!(Config::load().is_err());

        env::remove_var("VERSEGREP_CONFIG");
    }
}
