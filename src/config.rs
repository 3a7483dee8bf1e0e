use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Path to the on-disk response cache; `None` disables caching.
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            api_base: default_api_base(),
            batch_size: default_batch_size(),
            timeout_secs: default_timeout_secs(),
            cache_path: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CompletionConfig {
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Total token window of the model (prompt + output).
    #[serde(default = "default_max_model_tokens")]
    pub max_model_tokens: usize,
    /// Smallest output budget worth sending a request for.
    #[serde(default = "default_min_output_tokens")]
    pub min_output_tokens: usize,
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: default_completion_model(),
            api_base: default_api_base(),
            max_model_tokens: default_max_model_tokens(),
            min_output_tokens: default_min_output_tokens(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_fragment_lines")]
    pub fragment_lines: usize,
    #[serde(default)]
    pub min_fragment_lines: usize,
    #[serde(default)]
    pub threshold: f32,
    #[serde(default)]
    pub top_n: Option<usize>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fragment_lines: default_fragment_lines(),
            min_fragment_lines: 0,
            threshold: 0.0,
            top_n: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_min_wait_secs")]
    pub min_wait_secs: u64,
    #[serde(default = "default_max_wait_secs")]
    pub max_wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            min_wait_secs: default_min_wait_secs(),
            max_wait_secs: default_max_wait_secs(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            min_wait: Duration::from_secs(self.min_wait_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_completion_model() -> String {
    "gpt-3.5-turbo-instruct".to_string()
}
fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_completion_timeout_secs() -> u64 {
    120
}
fn default_max_model_tokens() -> usize {
    4097
}
fn default_min_output_tokens() -> usize {
    1
}
fn default_fragment_lines() -> usize {
    10
}
fn default_max_attempts() -> u32 {
    6
}
fn default_min_wait_secs() -> u64 {
    1
}
fn default_max_wait_secs() -> u64 {
    20
}

/// Load and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = toml::from_str(&content)
        .map_err(|err| Error::Config(format!("failed to parse {}: {}", path.display(), err)))?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to defaults.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        Ok(Config::default())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.search.fragment_lines == 0 {
        return Err(Error::Config("search.fragment_lines must be > 0".into()));
    }
    if config.embedding.batch_size == 0 {
        return Err(Error::Config("embedding.batch_size must be > 0".into()));
    }
    if !(-1.0..=1.0).contains(&config.search.threshold) {
        return Err(Error::Config("search.threshold must be in [-1.0, 1.0]".into()));
    }
    if config.retry.max_attempts == 0 {
        return Err(Error::Config("retry.max_attempts must be >= 1".into()));
    }
    if config.completion.max_model_tokens == 0 {
        return Err(Error::Config("completion.max_model_tokens must be > 0".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.search.fragment_lines, 10);
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.retry.max_attempts, 6);
        assert!(config.embedding.cache_path.is_none());
    }

    #[test]
    fn test_parse_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[search]\nfragment_lines = 20\n\n[embedding]\nmodel = \"text-embedding-ada-002\"\ncache_path = \"/tmp/em.json\"\n"
        )
        .unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.search.fragment_lines, 20);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert!(config.embedding.cache_path.is_some());
        // Unspecified sections keep defaults.
        assert_eq!(config.completion.max_model_tokens, 4097);
    }

    #[test]
    fn test_invalid_fragment_lines_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search]\nfragment_lines = 0\n").unwrap();
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            Error::Config(_)
        ));
    }

    #[test]
    fn test_load_or_default_for_missing_file() {
        let config = load_or_default(Path::new("/nonexistent/em.toml")).unwrap();
        assert_eq!(config.search.fragment_lines, 10);
    }
}
