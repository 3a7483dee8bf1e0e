//! Token-budget–batched file transformation.
//!
//! Packs as many files as fit under a token budget into each completion
//! request, using the lazy [`chunker`](crate::chunker). Each batch is
//! processed and its response collected before the next batch is rendered,
//! so memory stays bounded by one batch.

use std::path::PathBuf;

use crate::chunker::{approx_token_len, chunk_by_budget};
use crate::completion::{CompletionClient, CompletionRequest};
use crate::error::Result;
use crate::search::gather_files;

const END_RESPONSE_TOKEN: &str = "<| END OF RESPONSE |>";

const DEFAULT_PRE_PROMPT: &str = "You are an advanced AI assistant. \
Respond to the user's requests with the appropriate text. \
If the input has a particular format, the response shall be faithful to that format.";

/// Transform `paths` with `prompt`, one completion request per batch.
///
/// Files are rendered to fenced blocks, grouped so each batch's rendered
/// length stays within `max_chunk_tokens` (a single oversized file still
/// goes through, alone in its batch), and sent in order. Returns one
/// response string per batch.
pub fn transform_files(
    completion: &CompletionClient,
    paths: &[PathBuf],
    prompt: &str,
    pre_prompt: Option<&str>,
    max_chunk_tokens: usize,
) -> Result<Vec<String>> {
    if paths.is_empty() {
        return Err(crate::error::Error::invalid_argument(
            "no files were provided",
        ));
    }

    let files = gather_files(paths)?;
    let rendered: Vec<String> = files.iter().map(render_file).collect();

    let pre_prompt = pre_prompt.unwrap_or(DEFAULT_PRE_PROMPT);
    let batches = chunk_by_budget(rendered, max_chunk_tokens, |s: &String| approx_token_len(s))?;

    let mut responses = Vec::new();
    for batch in batches {
        tracing::info!(files = batch.len(), "transforming batch");
        let request = CompletionRequest {
            prompt: assemble_prompt(pre_prompt, prompt, &batch.join("\n")),
            max_output_tokens: None,
            stop: vec![END_RESPONSE_TOKEN.to_string()],
        };
        responses.push(completion.complete(&request)?.trim().to_string());
    }
    Ok(responses)
}

fn render_file(file: &crate::models::TextFile) -> String {
    format!(
        "<!-- {} -->\n```\n{}\n```",
        file.path.display(),
        file.contents
    )
}

fn assemble_prompt(pre_prompt: &str, prompt: &str, input: &str) -> String {
    [
        pre_prompt,
        &format!(
            "Once you're finished responding, write {} on a line by itself.",
            END_RESPONSE_TOKEN
        ),
        "## Request",
        prompt,
        "## Input",
        input,
        "## Response",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::CompletionBackend;
    use crate::config::CompletionConfig;
    use crate::retry::{RemoteError, RetryPolicy};
    use std::sync::{Arc, Mutex};

    struct RecordingBackend {
        prompts: Arc<Mutex<Vec<String>>>,
    }

    impl CompletionBackend for RecordingBackend {
        fn complete_raw(
            &self,
            prompt: &str,
            _max_output_tokens: usize,
            _stop: &[String],
        ) -> std::result::Result<String, RemoteError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(format!("response {}", self.prompts.lock().unwrap().len()))
        }
    }

    fn recording_client() -> (CompletionClient, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let backend = RecordingBackend {
            prompts: prompts.clone(),
        };
        let config = CompletionConfig {
            max_model_tokens: 100_000,
            ..CompletionConfig::default()
        };
        let retry = RetryPolicy {
            max_attempts: 1,
            min_wait: std::time::Duration::from_millis(1),
            max_wait: std::time::Duration::from_millis(1),
        };
        (
            CompletionClient::new(Box::new(backend), retry, config),
            prompts,
        )
    }

    #[test]
    fn test_small_files_share_one_request() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "alpha\n").unwrap();
        std::fs::write(&b, "beta\n").unwrap();

        let (client, prompts) = recording_client();
        let responses =
            transform_files(&client, &[a, b], "uppercase everything", None, 10_000).unwrap();

        assert_eq!(responses, vec!["response 1"]);
        let sent = prompts.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("alpha"));
        assert!(sent[0].contains("beta"));
        assert!(sent[0].contains("## Request"));
    }

    #[test]
    fn test_budget_splits_into_multiple_requests() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "x".repeat(400)).unwrap();
        std::fs::write(&b, "y".repeat(400)).unwrap();

        let (client, prompts) = recording_client();
        // Each rendered file is ~100 tokens; a 150-token budget forces one
        // file per batch.
        let responses = transform_files(&client, &[a, b], "noop", None, 150).unwrap();

        assert_eq!(responses.len(), 2);
        assert_eq!(prompts.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_no_files_rejected() {
        let (client, _) = recording_client();
        let err = transform_files(&client, &[], "noop", None, 100).unwrap_err();
        assert!(matches!(err, crate::error::Error::InvalidArgument(_)));
    }
}
