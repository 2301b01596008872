use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cpsearch_core::corpus::{clean_records, corpus_for, read_records};
use cpsearch_core::persist::{
    load_meta, save_matrix, save_meta, save_problems, save_vectorizer, MetaFile, PlatformPaths,
    DEFAULT_MAX_MATRIX_BYTES,
};
use cpsearch_core::tfidf::TfIdfVectorizer;
use cpsearch_core::Platform;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::Path;

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build TF-IDF artifacts for a judge platform's problem set", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the vectorizer, matrix and problem table from scraped JSON/JSONL
    Build {
        /// Platform the records belong to (leetcode, codeforces, codechef)
        #[arg(long)]
        platform: Platform,
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Data directory; artifacts land in <output>/<platform>/
        #[arg(long, default_value = "./data")]
        output: String,
        /// Matrix artifacts whose serialized size exceeds this are stored as a placeholder
        #[arg(long, default_value_t = DEFAULT_MAX_MATRIX_BYTES)]
        max_matrix_bytes: u64,
    },
    /// Print the metadata of a built platform index
    Inspect {
        #[arg(long)]
        platform: Platform,
        #[arg(long, default_value = "./data")]
        data: String,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { platform, input, output, max_matrix_bytes } => {
            build_index(platform, Path::new(&input), Path::new(&output), max_matrix_bytes)
        }
        Commands::Inspect { platform, data } => inspect(platform, Path::new(&data)),
    }
}

fn build_index(platform: Platform, input: &Path, output: &Path, max_matrix_bytes: u64) -> Result<()> {
    let raw = read_records(input).with_context(|| format!("reading records from {}", input.display()))?;
    let records = clean_records(raw);
    tracing::info!(%platform, num_docs = records.len(), "ingested problems");
    if records.is_empty() {
        anyhow::bail!("no usable problems in {}", input.display());
    }

    // Row i of the matrix, problems[i] and corpus[i] describe the same problem.
    let corpus = corpus_for(&records);
    let mut vectorizer = TfIdfVectorizer::new();
    let matrix = vectorizer.fit_transform(&corpus)?;
    tracing::info!(rows = matrix.rows(), vocabulary = vectorizer.vocabulary_size(), "fitted tf-idf");

    let paths = PlatformPaths::new(output, platform);
    save_vectorizer(&paths, &vectorizer)?;
    let degraded = save_matrix(&paths, &matrix, max_matrix_bytes)?;
    save_problems(&paths, &records)?;
    let meta = MetaFile::stamp(platform, records.len(), vectorizer.vocabulary_size(), degraded);
    save_meta(&paths, &meta)?;

    tracing::info!(output = %paths.root.display(), degraded, "index build complete");
    Ok(())
}

fn inspect(platform: Platform, data: &Path) -> Result<()> {
    let paths = PlatformPaths::new(data, platform);
    let missing = paths.missing();
    if !missing.is_empty() {
        tracing::warn!(%platform, missing = %missing.join(", "), "platform index is incomplete");
    }
    let meta = load_meta(&paths).with_context(|| format!("reading {}", paths.meta().display()))?;
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}
