//! Completion service boundary.
//!
//! The completion model is a black box (text in, text out) reached through
//! the [`CompletionBackend`] trait. This layer owns the parts the service
//! does not:
//!
//! - **Token budget validation** — a request whose prompt cannot fit in the
//!   model's window alongside the minimum output budget fails with
//!   [`Error::BudgetExceeded`] before any network call; it can never succeed
//!   with the same parameters, so it is never retried.
//! - **Stop-sequence truncation** — the response is cut at the first
//!   occurrence of a stop sequence.
//! - **Retry** — the same shared [`RetryPolicy`](crate::retry::RetryPolicy)
//!   and transient/permanent classification as the embedding client.
//!
//! Sampling is pinned for determinism: temperature 0, top_p 1.

use serde::Deserialize;

use crate::chunker::approx_token_len;
use crate::config::CompletionConfig;
use crate::error::{Error, Result};
use crate::retry::{RemoteError, RetryPolicy};

/// Token-length function used for budget accounting.
pub type TokenLenFn = Box<dyn Fn(&str) -> usize + Send + Sync>;

/// One completion request as seen by this layer.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    /// Output budget; `None` means "whatever fits in the model window".
    pub max_output_tokens: Option<usize>,
    /// Stop sequences; generation halts at the first occurrence.
    pub stop: Vec<String>,
}

/// Raw completion service: payload in, generated text out.
pub trait CompletionBackend: Send + Sync {
    fn complete_raw(
        &self,
        prompt: &str,
        max_output_tokens: usize,
        stop: &[String],
    ) -> std::result::Result<String, RemoteError>;
}

// ============ OpenAI backend ============

/// Completion backend for the OpenAI completions API.
pub struct OpenAiCompletionBackend {
    model: String,
    api_base: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl OpenAiCompletionBackend {
    pub fn new(config: &CompletionConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::Config("OPENAI_API_KEY environment variable not set".into()))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| Error::Config(format!("failed to build HTTP client: {}", err)))?;
        Ok(Self {
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            api_key,
            client,
        })
    }
}

#[derive(Deserialize)]
struct CompletionsResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

impl CompletionBackend for OpenAiCompletionBackend {
    fn complete_raw(
        &self,
        prompt: &str,
        max_output_tokens: usize,
        stop: &[String],
    ) -> std::result::Result<String, RemoteError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "max_tokens": max_output_tokens,
            "temperature": 0,
            "top_p": 1,
        });
        if !stop.is_empty() {
            body["stop"] = serde_json::json!(stop);
        }

        let response = self
            .client
            .post(format!("{}/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|err| RemoteError::transient(format!("request failed: {}", err)))?;

        let status = response.status();
        if status.as_u16() == 429 || status.is_server_error() {
            let text = response.text().unwrap_or_default();
            return Err(RemoteError::transient(format!("HTTP {}: {}", status, text)));
        }
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(RemoteError::permanent(format!("HTTP {}: {}", status, text)));
        }

        let parsed: CompletionsResponse = response
            .json()
            .map_err(|err| RemoteError::permanent(format!("invalid response body: {}", err)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or_else(|| RemoteError::permanent("response contained no choices"))
    }
}

// ============ Client ============

/// Budget-validating, retrying completion client.
pub struct CompletionClient {
    backend: Box<dyn CompletionBackend>,
    retry: RetryPolicy,
    config: CompletionConfig,
    token_len: TokenLenFn,
}

impl CompletionClient {
    pub fn new(
        backend: Box<dyn CompletionBackend>,
        retry: RetryPolicy,
        config: CompletionConfig,
    ) -> Self {
        Self {
            backend,
            retry,
            config,
            token_len: Box::new(approx_token_len),
        }
    }

    /// Replace the approximate token counter with an exact one.
    pub fn with_token_len(mut self, token_len: TokenLenFn) -> Self {
        self.token_len = token_len;
        self
    }

    /// Run one completion request.
    ///
    /// # Errors
    ///
    /// [`Error::BudgetExceeded`] — raised before any network I/O — when the
    /// prompt leaves less than `min_output_tokens` of the model window for
    /// output (or less than the explicitly requested output budget allows).
    pub fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let prompt_tokens = (self.token_len)(&request.prompt);
        let available = self.config.max_model_tokens.saturating_sub(prompt_tokens);
        let output_budget = request
            .max_output_tokens
            .map_or(available, |requested| requested.min(available));

        if output_budget < self.config.min_output_tokens {
            return Err(Error::BudgetExceeded {
                prompt_tokens,
                max_tokens: self.config.max_model_tokens,
            });
        }

        let text = self.retry.run("completion", || {
            self.backend
                .complete_raw(&request.prompt, output_budget, &request.stop)
        })?;

        Ok(truncate_at_stop(&text, &request.stop))
    }
}

/// Cut `text` at the first occurrence of any stop sequence.
fn truncate_at_stop(text: &str, stop: &[String]) -> String {
    let cut = stop
        .iter()
        .filter_map(|s| text.find(s.as_str()))
        .min()
        .unwrap_or(text.len());
    text[..cut].to_string()
}
