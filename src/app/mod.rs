use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use console::style;
use indicatif::HumanDuration;
use tracing::warn;

use crate::classifier::{category_names, TopicClassifier};
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::corpus::{invalidate_cached_corpus, Corpus, CorpusSource, CorpusStore};
use crate::memory;
use crate::output::{ClassifyResponse, EntryRecord, SearchResponse, StatsResponse};
use crate::search::{RetrievalCoordinator, ScoredEntry};

pub fn run() -> Result<()> {
    setup_tracing();
    let cli = parse_cli();
    run_with_cli(cli)
}

pub fn run_with_cli(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if cli.source.is_some() {
        config.corpus.source = cli.source.clone();
    }

    let store = CorpusStore::new(
        config.download_path(),
        config.corpus.download_timeout_secs,
        config.corpus.cache_name.clone(),
    );

    match cli.command {
        Commands::Load { refresh, json } => handle_load(&store, &config, refresh, json),
        Commands::Search {
            query,
            limit,
            vector_file,
            no_fallback,
            json,
        } => handle_search(
            &store,
            &config,
            &query,
            limit,
            vector_file.as_deref(),
            no_fallback,
            json,
        ),
        Commands::Classify { text, json } => handle_classify(&text, json),
        Commands::Popular {
            category,
            limit,
            json,
        } => handle_popular(&store, &config, category.as_deref(), limit, json),
        Commands::Stats { json } => handle_stats(&store, &config, json),
    }
}

fn corpus_source(config: &Config) -> Result<CorpusSource> {
    let locator = config.corpus.source.as_deref().ok_or_else(|| {
        anyhow!("No corpus source configured. Set [corpus].source or pass --source.")
    })?;
    Ok(CorpusSource::parse(locator))
}

fn ensure_loaded(store: &CorpusStore, config: &Config) -> Result<Arc<Corpus>> {
    if let Some(corpus) = store.corpus() {
        return Ok(corpus);
    }
    let source = corpus_source(config)?;
    store
        .load(&source)
        .with_context(|| format!("Failed to load corpus from {}", source.cache_key()))?;
    store
        .corpus()
        .ok_or_else(|| anyhow!("Corpus load finished but nothing was published"))
}

fn handle_load(store: &CorpusStore, config: &Config, refresh: bool, json: bool) -> Result<()> {
    if refresh {
        if let Some(name) = &config.corpus.cache_name {
            invalidate_cached_corpus(name);
        }
    }

    let start = Instant::now();
    let source = corpus_source(config)?;
    let report = store
        .load(&source)
        .with_context(|| format!("Failed to load corpus from {}", source.cache_key()))?;

    if memory::is_memory_critical(config.memory.max_memory_mb) {
        warn!(
            "memory usage {:.1} MB is close to the {:.0} MB limit",
            memory::memory_usage_mb(),
            config.memory.max_memory_mb
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "{} Loaded {} entries across {} groups ({} dims) in {}",
            style("✔").green(),
            report.entry_count,
            report.group_count,
            report.vector_dim,
            HumanDuration(start.elapsed())
        );
        if report.from_cache {
            println!("  Served from process cache");
        }
        if report.skipped_records > 0 {
            println!(
                "  {} {} invalid records skipped",
                style("⚠").yellow(),
                report.skipped_records
            );
        }
    }
    Ok(())
}

fn read_query_vector(path: &Path) -> Result<Vec<f32>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read vector file: {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Vector file is not a JSON float array: {}", path.display()))
}

fn handle_search(
    store: &CorpusStore,
    config: &Config,
    query: &str,
    limit: Option<usize>,
    vector_file: Option<&Path>,
    no_fallback: bool,
    json: bool,
) -> Result<()> {
    let start = Instant::now();
    let corpus = ensure_loaded(store, config)?;
    let top_k = limit.unwrap_or(config.retrieval.max_results);

    let query_vector = match vector_file {
        Some(path) => Some(read_query_vector(path)?),
        None => None,
    };

    let coordinator = RetrievalCoordinator::new(
        config.retrieval.similarity_threshold,
        config.retrieval.lexical_threshold,
    );
    let mut results = coordinator.search_entries(&corpus, query, query_vector.as_deref(), top_k);

    let mut fallback_used = false;
    if results.is_empty() && !no_fallback {
        let category = TopicClassifier::new()
            .classify(query)
            .first()
            .map(|(category, _)| *category);
        results = coordinator.popular_entries(&corpus, category, top_k);
        fallback_used = !results.is_empty();
    }

    if json {
        let response =
            SearchResponse::from_results(query, top_k, &results, fallback_used, start.elapsed());
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        render_results(&results, fallback_used);
    }
    Ok(())
}

fn render_results(results: &[ScoredEntry], fallback_used: bool) {
    if results.is_empty() {
        println!("{} No matches found", style("⚠").yellow());
        return;
    }
    if fallback_used {
        println!(
            "{} No direct matches; showing well-known passages instead",
            style("ℹ").cyan()
        );
    }
    for (idx, result) in results.iter().enumerate() {
        let record = EntryRecord::from_scored(result);
        let header = format!(
            "{}. {} ({:.3})",
            idx + 1,
            record.reference,
            record.similarity_score
        );
        println!("{} {}", style("→").cyan(), style(header).bold());
        println!("   {}", record.text);
        println!();
    }
}

fn handle_classify(text: &str, json: bool) -> Result<()> {
    let scores = TopicClassifier::new().classify(text);

    if json {
        let response = ClassifyResponse::from_scores(text, &scores);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if scores.is_empty() {
        println!("{} No category stood out", style("⚠").yellow());
    } else {
        for (category, score) in &scores {
            println!("{} {} ({:.2})", style("→").cyan(), style(category).bold(), score);
        }
    }
    Ok(())
}

fn handle_popular(
    store: &CorpusStore,
    config: &Config,
    category: Option<&str>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let start = Instant::now();
    let corpus = ensure_loaded(store, config)?;
    let count = limit.unwrap_or(config.retrieval.max_results);

    let coordinator = RetrievalCoordinator::new(
        config.retrieval.similarity_threshold,
        config.retrieval.lexical_threshold,
    );
    let results = coordinator.popular_entries(&corpus, category, count);

    if json {
        let label = category.unwrap_or("popular");
        let response = SearchResponse::from_results(label, count, &results, false, start.elapsed());
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        render_results(&results, false);
    }
    Ok(())
}

fn handle_stats(store: &CorpusStore, config: &Config, json: bool) -> Result<()> {
    if !store.is_loaded() {
        // Stats work on the published corpus only; load first when a
        // source is configured so the command is useful standalone.
        if config.corpus.source.is_some() {
            ensure_loaded(store, config)?;
        }
    }
    let stats = store.get_stats();

    if json {
        let response = StatsResponse {
            stats,
            similarity_threshold: config.retrieval.similarity_threshold,
            categories: category_names(),
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if !stats.loaded {
        println!("{} No corpus loaded", style("⚠").yellow());
    } else {
        println!("Corpus Statistics");
        println!("  Entries:       {}", stats.entry_count);
        println!("  Groups:        {}", stats.group_count);
        println!("  Vector dim:    {}", stats.vector_dim);
        println!("  Memory:        {:.1} MB", stats.memory_usage_mb);
        println!(
            "  Threshold:     {}",
            config.retrieval.similarity_threshold
        );
        println!("  Categories:    {}", category_names().join(", "));
    }
    Ok(())
}

fn parse_cli() -> Cli {
    if let Ok(raw) = env::var("VERSEGREP_TEST_ARGS") {
        let mut parts = vec!["versegrep".to_string()];
        parts.extend(raw.split_whitespace().map(|s| s.to_string()));
        return Cli::parse_from(parts);
    }
    Cli::parse()
}

fn setup_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "versegrep=info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
