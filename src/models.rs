//! Core data models used throughout the search pipeline.
//!
//! These types represent the files, fragments, and scored results that flow
//! from gathering through embedding and ranking. All of them are plain value
//! types: created once, never mutated.

use std::path::PathBuf;

/// Whole-file content read once at gather time.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFile {
    pub path: PathBuf,
    pub contents: String,
}

/// A contiguous, newline-joined run of lines from a source file.
///
/// `start_line` is the 0-indexed line number of the fragment's first line in
/// the originating file. Fragments produced by [`crate::fragment::split_file`]
/// partition the file's lines (unless empty fragments are dropped).
#[derive(Debug, Clone, PartialEq)]
pub struct TextFileFragment {
    pub path: PathBuf,
    pub contents: String,
    pub start_line: usize,
}

impl TextFileFragment {
    /// 0-indexed line number of the fragment's last line.
    pub fn end_line(&self) -> usize {
        self.start_line + self.contents.matches('\n').count()
    }

    /// Number of lines the fragment spans.
    pub fn line_count(&self) -> usize {
        if self.contents.is_empty() {
            0
        } else {
            self.contents.matches('\n').count() + 1
        }
    }
}

/// A text paired with its embedding vector.
///
/// Embedding length is fixed per model; vectors from different models must
/// never be compared.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedText {
    pub text: String,
    pub embedding: Vec<f32>,
}

/// A fragment paired with its embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedTextFileFragment {
    pub fragment: TextFileFragment,
    pub embedding: Vec<f32>,
}

/// A ranked search result: a fragment and its cosine similarity to the query,
/// in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub embedded_fragment: EmbeddedTextFileFragment,
    pub similarity: f32,
}
