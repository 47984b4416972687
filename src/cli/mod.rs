use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(name = "versegrep", version, about = "Retrieval-backed verse search and concern classification")]
pub struct Cli {
    /// Corpus locator: local path, one URL, or comma-joined URLs. Also reads VERSEGREP_SOURCE.
    #[arg(global = true, long, env = "VERSEGREP_SOURCE")]
    pub source: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Load the corpus and report what came in
    Load {
        /// Drop the named process cache entry before loading
        #[arg(long)]
        refresh: bool,
        /// Emit structured JSON output
        #[arg(long)]
        json: bool,
    },
    /// Search the corpus for entries matching a concern
    Search {
        /// Free-text query such as "가족과의 갈등이 힘들어요"
        query: String,
        /// Maximum results to return
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Query embedding as a JSON array file (omit for lexical-only search)
        #[arg(long)]
        vector_file: Option<PathBuf>,
        /// Skip the popular-entry fallback when nothing matches
        #[arg(long)]
        no_fallback: bool,
        /// Emit structured JSON output
        #[arg(long)]
        json: bool,
    },
    /// Classify a concern into topic categories
    Classify {
        /// Free text to classify
        text: String,
        /// Emit structured JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show curated popular entries, optionally for one category
    Popular {
        /// Restrict to one concern category (e.g. 감정)
        #[arg(long)]
        category: Option<String>,
        /// Number of entries to return
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Emit structured JSON output
        #[arg(long)]
        json: bool,
    },
    /// Report corpus and memory statistics
    Stats {
        /// Emit structured JSON output
        #[arg(long)]
        json: bool,
    },
}
