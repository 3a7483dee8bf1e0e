//! Error taxonomy for the search and transformation pipelines.
//!
//! Three caller-visible failure classes exist:
//!
//! - [`Error::InvalidArgument`] — the caller supplied parameters that can
//!   never succeed (zero files, zero fragment size, batch bounds). Never
//!   retried.
//! - [`Error::ServiceUnavailable`] — a remote service kept failing after the
//!   retry budget was exhausted. The caller may retry the whole operation.
//! - [`Error::BudgetExceeded`] — a completion request whose prompt alone
//!   does not fit the model's token window. Raised before any network call;
//!   retrying with the same parameters cannot succeed.
//!
//! Transient remote failures (timeouts, HTTP 429, 5xx) are handled inside the
//! retry layer and never reach callers unless retries run out. There are no
//! partial results: every operation returns complete output or an error.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Parameters that can never succeed; surfaced immediately.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A remote service failed after exhausting the retry budget.
    #[error("{service} unavailable after {attempts} attempts: {message}")]
    ServiceUnavailable {
        service: &'static str,
        attempts: u32,
        message: String,
    },

    /// A remote service rejected the request in a way retrying cannot fix
    /// (for example an HTTP 4xx other than 429).
    #[error("{service} rejected the request: {message}")]
    Remote {
        service: &'static str,
        message: String,
    },

    /// The prompt alone exceeds the completion model's token window.
    #[error("prompt ({prompt_tokens} tokens) does not fit in a {max_tokens}-token window")]
    BudgetExceeded {
        prompt_tokens: usize,
        max_tokens: usize,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}
