//! Cosine similarity and fragment ranking.

use crate::models::{EmbeddedText, EmbeddedTextFileFragment, SimilarityResult};

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. A zero-norm vector makes the cosine
/// undefined; by policy that case (and mismatched or empty vectors) yields
/// `0.0` rather than NaN or a panic.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let denom = norm(a) * norm(b);
    if denom < f32::EPSILON {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / denom
}

fn norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Score fragments against a query embedding, filter by threshold, and
/// optionally truncate.
///
/// Similarities are computed for every fragment in input order. Fragments
/// scoring strictly below `threshold` are excluded (a score exactly equal to
/// the threshold is kept). When `top_n` is set, the surviving results are
/// truncated to the first `top_n` **in input order** — not the `top_n` most
/// similar. Re-sorting by descending similarity is the presentation layer's
/// job; this asymmetry is deliberate and documented rather than fixed.
///
/// As a diagnostic, the similarity distribution (min, max, mean, median,
/// standard deviation) is logged; it never affects the returned results.
pub fn rank_fragments(
    query: &EmbeddedText,
    fragments: Vec<EmbeddedTextFileFragment>,
    threshold: f32,
    top_n: Option<usize>,
) -> Vec<SimilarityResult> {
    tracing::info!(
        fragments = fragments.len(),
        threshold,
        "scoring fragments against query"
    );

    let similarities: Vec<f32> = fragments
        .iter()
        .map(|f| cosine_similarity(&query.embedding, &f.embedding))
        .collect();

    log_distribution(&similarities);

    let mut results: Vec<SimilarityResult> = fragments
        .into_iter()
        .zip(similarities)
        .filter(|(_, similarity)| *similarity >= threshold)
        .map(|(embedded_fragment, similarity)| SimilarityResult {
            embedded_fragment,
            similarity,
        })
        .collect();

    if let Some(n) = top_n {
        results.truncate(n);
    }

    results
}

/// Log summary statistics of the similarity distribution.
fn log_distribution(similarities: &[f32]) {
    if similarities.is_empty() {
        return;
    }

    let n = similarities.len() as f32;
    let min = similarities.iter().copied().fold(f32::INFINITY, f32::min);
    let max = similarities
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let mean = similarities.iter().sum::<f32>() / n;
    let variance = similarities.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / n;

    let mut sorted = similarities.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if sorted.len() % 2 == 1 {
        sorted[sorted.len() / 2]
    } else {
        (sorted[sorted.len() / 2 - 1] + sorted[sorted.len() / 2]) / 2.0
    };

    tracing::info!(
        min,
        max,
        mean,
        median,
        std = variance.sqrt(),
        "similarity distribution"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn embedded_fragment(embedding: Vec<f32>, start_line: usize) -> EmbeddedTextFileFragment {
        EmbeddedTextFileFragment {
            fragment: crate::models::TextFileFragment {
                path: PathBuf::from("a.py"),
                contents: format!("fragment at {}", start_line),
                start_line,
            },
            embedding,
        }
    }

    fn query(embedding: Vec<f32>) -> EmbeddedText {
        EmbeddedText {
            text: "query".to_string(),
            embedding,
        }
    }

    #[test]
    fn test_cosine_scaled_copies_score_one() {
        // Cosine ignores magnitude: v and 3v point the same way.
        let v = [0.4, -1.3, 2.6];
        let scaled: Vec<f32> = v.iter().map(|x| x * 3.0).collect();
        assert!((cosine_similarity(&v, &scaled) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite_direction_scores_minus_one() {
        let a = [2.5, -0.5, 1.0];
        let b = [-5.0, 1.0, -2.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal_scores_zero() {
        assert!(cosine_similarity(&[1.0, 1.0], &[1.0, -1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector_is_zero_not_nan() {
        let sim = cosine_similarity(&[0.0, 0.0, 0.0], &[0.7, -0.2, 1.1]);
        assert_eq!(sim, 0.0);
        assert!(!sim.is_nan());
    }

    #[test]
    fn test_cosine_mismatched_or_empty_inputs() {
        assert_eq!(cosine_similarity(&[0.5, 0.5, 0.5], &[0.5]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_rank_boundary_fragment_included_at_threshold() {
        // Similarities 1.0, 0.0, -1.0 against [1, 0]; threshold 0.0 keeps
        // the orthogonal fragment (>=, not >).
        let fragments = vec![
            embedded_fragment(vec![1.0, 0.0], 0),
            embedded_fragment(vec![0.0, 1.0], 10),
            embedded_fragment(vec![-1.0, 0.0], 20),
        ];
        let results = rank_fragments(&query(vec![1.0, 0.0]), fragments, 0.0, None);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].similarity, 1.0);
        assert_eq!(results[1].similarity, 0.0);
        assert_eq!(results[1].embedded_fragment.fragment.start_line, 10);
    }

    #[test]
    fn test_rank_never_returns_below_threshold() {
        let fragments: Vec<_> = (0..8)
            .map(|i| embedded_fragment(vec![(i as f32) - 4.0, 1.0], i))
            .collect();
        for threshold in [-0.5, 0.0, 0.4, 0.9] {
            let results = rank_fragments(&query(vec![1.0, 0.0]), fragments.clone(), threshold, None);
            assert!(results.iter().all(|r| r.similarity >= threshold));
        }
    }

    #[test]
    fn test_rank_truncates_in_input_order() {
        // All pass the threshold; top_n keeps the first two encountered,
        // not the two highest-scoring.
        let fragments = vec![
            embedded_fragment(vec![1.0, 1.0], 0),
            embedded_fragment(vec![1.0, 2.0], 10),
            embedded_fragment(vec![1.0, 0.0], 20),
        ];
        let results = rank_fragments(&query(vec![1.0, 0.0]), fragments, -1.0, Some(2));
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].embedded_fragment.fragment.start_line, 0);
        assert_eq!(results[1].embedded_fragment.fragment.start_line, 10);
    }

    #[test]
    fn test_rank_empty_input() {
        let results = rank_fragments(&query(vec![1.0]), Vec::new(), 0.0, None);
        assert!(results.is_empty());
    }
}
