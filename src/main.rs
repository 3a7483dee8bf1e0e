//! # emsearch CLI
//!
//! Thin front end over the `embed_search` library. Holds the glue the
//! pipeline deliberately does not: argument parsing, directory filtering,
//! presentation-level sorting, and result printing.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use embed_search::cache::EmbeddingCache;
use embed_search::completion::{CompletionClient, OpenAiCompletionBackend};
use embed_search::config::{load_or_default, Config};
use embed_search::embedding::{EmbeddingClient, OpenAiBackend};
use embed_search::search::{partition_paths, semantic_search, SearchParams};
use embed_search::transform::transform_files;

#[derive(Parser)]
#[command(
    name = "emsearch",
    about = "Semantic search and transformation over local text files",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./emsearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    /// Best match printed last (useful in a terminal).
    Ascending,
    /// Best match printed first.
    Descending,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank file fragments by similarity to a query.
    Search {
        /// The search query.
        query: String,
        /// Files to search. Directories are skipped with a notice.
        files: Vec<PathBuf>,
        /// Lines per fragment.
        #[arg(long)]
        fragment_lines: Option<usize>,
        /// Drop fragments shorter than this many lines.
        #[arg(long)]
        min_fragment_lines: Option<usize>,
        /// Minimum similarity (inclusive) a result must reach.
        #[arg(long)]
        threshold: Option<f32>,
        /// Keep at most this many results.
        #[arg(long)]
        top_n: Option<usize>,
        /// Display order of results.
        #[arg(long, value_enum, default_value = "ascending")]
        order: Order,
    },
    /// Transform files through the completion API, batched by token budget.
    Transform {
        /// Files to transform.
        files: Vec<PathBuf>,
        /// Instruction passed along with the files.
        #[arg(long)]
        prompt: String,
        /// Override the built-in system preamble.
        #[arg(long)]
        pre_prompt: Option<String>,
        /// Token budget per request batch.
        #[arg(long, default_value_t = 2000)]
        max_chunk_tokens: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("embed_search=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_or_default(&cli.config)?;

    match cli.command {
        Commands::Search {
            query,
            files,
            fragment_lines,
            min_fragment_lines,
            threshold,
            top_n,
            order,
        } => run_search(
            &config,
            &query,
            files,
            fragment_lines,
            min_fragment_lines,
            threshold,
            top_n,
            order,
        ),
        Commands::Transform {
            files,
            prompt,
            pre_prompt,
            max_chunk_tokens,
        } => run_transform(&config, files, &prompt, pre_prompt.as_deref(), max_chunk_tokens),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_search(
    config: &Config,
    query: &str,
    files: Vec<PathBuf>,
    fragment_lines: Option<usize>,
    min_fragment_lines: Option<usize>,
    threshold: Option<f32>,
    top_n: Option<usize>,
    order: Order,
) -> Result<()> {
    let (files, directories) = partition_paths(&files);
    if !directories.is_empty() {
        let skipped: Vec<String> = directories
            .iter()
            .map(|d| d.display().to_string())
            .collect();
        eprintln!("Ignoring directories: {}", skipped.join(", "));
    }
    if files.is_empty() {
        bail!("No files were provided");
    }

    let mut params = SearchParams::from(&config.search);
    if let Some(n) = fragment_lines {
        params.fragment_lines = n;
    }
    if let Some(n) = min_fragment_lines {
        params.min_fragment_lines = n;
    }
    if let Some(t) = threshold {
        params.threshold = t;
    }
    if top_n.is_some() {
        params.top_n = top_n;
    }

    let backend = OpenAiBackend::new(&config.embedding)?;
    let mut client = EmbeddingClient::new(
        Box::new(backend),
        config.retry.policy(),
        config.embedding.batch_size,
    );
    if let Some(path) = &config.embedding.cache_path {
        client = client.with_cache(EmbeddingCache::open(path));
    }

    eprintln!("Searching for '{}' in {} files", query, files.len());
    let mut results = semantic_search(&client, query, &files, &params)
        .with_context(|| format!("search for '{}' failed", query))?;

    // Presentation sorting happens here, not in the pipeline.
    results.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    eprintln!("Found {} results", results.len());

    let numbered: Vec<(usize, &embed_search::models::SimilarityResult)> =
        results.iter().enumerate().map(|(i, r)| (i + 1, r)).collect();
    let display: Box<dyn Iterator<Item = &(usize, &embed_search::models::SimilarityResult)>> =
        match order {
            Order::Ascending => Box::new(numbered.iter().rev()),
            Order::Descending => Box::new(numbered.iter()),
        };

    for (rank, result) in display {
        let fragment = &result.embedded_fragment.fragment;
        println!("{:-^80}", format!(" Result {} ", rank));
        println!("Similarity: {:.2}", result.similarity);
        println!(
            "Path: {} (lines {}-{})",
            fragment.path.display(),
            fragment.start_line + 1,
            fragment.end_line() + 1
        );
        println!("{}", fragment.contents);
        println!();
    }
    Ok(())
}

fn run_transform(
    config: &Config,
    files: Vec<PathBuf>,
    prompt: &str,
    pre_prompt: Option<&str>,
    max_chunk_tokens: usize,
) -> Result<()> {
    let (files, directories) = partition_paths(&files);
    if !directories.is_empty() {
        eprintln!("Ignoring {} directories", directories.len());
    }
    if files.is_empty() {
        bail!("No files were provided");
    }

    let backend = OpenAiCompletionBackend::new(&config.completion)?;
    let client = CompletionClient::new(
        Box::new(backend),
        config.retry.policy(),
        config.completion.clone(),
    );

    let responses = transform_files(&client, &files, prompt, pre_prompt, max_chunk_tokens)?;
    for response in responses {
        println!("{}", response);
    }
    Ok(())
}
