//! End-to-end semantic search: gather → fragment → embed → rank.

use std::path::PathBuf;

use crate::config::SearchConfig;
use crate::embedding::EmbeddingClient;
use crate::error::{Error, Result};
use crate::fragment::split_file;
use crate::models::{SimilarityResult, TextFile, TextFileFragment};
use crate::similarity::rank_fragments;

/// Per-query knobs for [`semantic_search`].
#[derive(Debug, Clone)]
pub struct SearchParams {
    /// Lines per fragment window.
    pub fragment_lines: usize,
    /// Fragments spanning fewer lines than this are dropped before embedding.
    pub min_fragment_lines: usize,
    /// Minimum similarity a result must reach (inclusive).
    pub threshold: f32,
    /// Keep at most this many results, in encountered order.
    pub top_n: Option<usize>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            fragment_lines: 10,
            min_fragment_lines: 0,
            threshold: 0.0,
            top_n: None,
        }
    }
}

impl From<&SearchConfig> for SearchParams {
    fn from(config: &SearchConfig) -> Self {
        Self {
            fragment_lines: config.fragment_lines,
            min_fragment_lines: config.min_fragment_lines,
            threshold: config.threshold,
            top_n: config.top_n,
        }
    }
}

/// Read each path fully into a [`TextFile`], dropping empty files.
///
/// Paths are assumed to be readable text files; directory filtering is the
/// caller's job (the CLI does it before invoking the pipeline).
pub fn gather_files(paths: &[PathBuf]) -> Result<Vec<TextFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        if contents.is_empty() {
            continue;
        }
        files.push(TextFile {
            path: path.clone(),
            contents,
        });
    }
    Ok(files)
}

/// Rank fragments of `paths` by embedding similarity to `query`.
///
/// Fragments each file into `fragment_lines`-line windows, drops fragments
/// shorter than `min_fragment_lines`, embeds all surviving fragments in one
/// batched call plus the query in a single call, and delegates filtering and
/// truncation to [`rank_fragments`]. Results come back in fragment order;
/// sorting by similarity for display is the caller's responsibility.
///
/// # Errors
///
/// [`Error::InvalidArgument`] when `paths` is empty or `fragment_lines` is
/// zero; I/O and service errors propagate unmodified.
pub fn semantic_search(
    client: &EmbeddingClient,
    query: &str,
    paths: &[PathBuf],
    params: &SearchParams,
) -> Result<Vec<SimilarityResult>> {
    if paths.is_empty() {
        return Err(Error::invalid_argument("no files were provided"));
    }

    let files = gather_files(paths)?;

    let mut fragments: Vec<TextFileFragment> = Vec::new();
    for file in &files {
        fragments.extend(split_file(file, params.fragment_lines, true)?);
    }
    fragments.retain(|f| f.line_count() >= params.min_fragment_lines);

    // Nothing survived (all files empty or every fragment too short): an
    // empty result, not a service round-trip.
    if fragments.is_empty() {
        tracing::info!("no fragments to search");
        return Ok(Vec::new());
    }

    tracing::info!(
        files = files.len(),
        fragments = fragments.len(),
        "embedding fragments"
    );
    let embedded_fragments = client.embed_fragments(fragments)?;

    tracing::info!("embedding query");
    let embedded_query = client.embed_text(query)?;

    Ok(rank_fragments(
        &embedded_query,
        embedded_fragments,
        params.threshold,
        params.top_n,
    ))
}

/// Helper for CLI front ends: partition paths into files and directories.
pub fn partition_paths(paths: &[PathBuf]) -> (Vec<PathBuf>, Vec<PathBuf>) {
    paths.iter().cloned().partition(|p| !p.is_dir())
}
