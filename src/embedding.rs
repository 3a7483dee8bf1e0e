//! Embedding client adapter.
//!
//! Wraps an external embedding service behind the [`EmbeddingBackend`] trait
//! and adds the behavior the raw service lacks:
//!
//! - **Batching** — long input lists are partitioned into fixed-size
//!   contiguous sub-requests; results are concatenated in input order.
//! - **Order restoration** — services tag each result with its request
//!   index and may return them in any order; the adapter re-sorts by that
//!   tag before zipping results back to inputs.
//! - **Newline scrubbing** — internal newlines are replaced with a single
//!   space before sending, since embedding models are sensitive to them.
//! - **Retry** — transient failures (429, 5xx, network) go through the
//!   shared [`RetryPolicy`](crate::retry::RetryPolicy); exhausting it
//!   surfaces [`Error::ServiceUnavailable`].
//! - **Caching** — with a cache attached, a batch operation loads the cache
//!   once, serves valid hits, requests only the misses, and persists once.
//!
//! The concrete [`OpenAiBackend`] calls `POST /v1/embeddings` with the
//! configured model; the API key comes from `OPENAI_API_KEY`.

use std::sync::Mutex;

use serde::Deserialize;

use crate::cache::EmbeddingCache;
use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};
use crate::models::{EmbeddedText, EmbeddedTextFileFragment, TextFileFragment};
use crate::retry::{RemoteError, RetryPolicy};

/// Largest batch the embedding service accepts in one request.
pub const MAX_SERVICE_BATCH: usize = 2048;

/// One embedding from a service response, tagged with its request index.
#[derive(Debug, Clone)]
pub struct IndexedEmbedding {
    pub index: usize,
    pub embedding: Vec<f32>,
}

/// A raw embedding service: one request in, index-tagged vectors out.
///
/// Implementations perform no batching, ordering, retry, or caching — that
/// is all [`EmbeddingClient`]'s job. Results may be returned in any order.
pub trait EmbeddingBackend: Send + Sync {
    /// Backend kind, used as the cache-key namespace (e.g. `"openai"`).
    fn mode(&self) -> &str;
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model(&self) -> &str;
    /// Embed one request's worth of texts.
    fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<IndexedEmbedding>, RemoteError>;
}

// ============ OpenAI backend ============

/// Embedding backend for the OpenAI embeddings API.
pub struct OpenAiBackend {
    model: String,
    api_base: String,
    api_key: String,
    client: reqwest::blocking::Client,
}

impl OpenAiBackend {
    /// Build a backend from config; requires `OPENAI_API_KEY` in the
    /// environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
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
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingBackend for OpenAiBackend {
    fn mode(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn embed_batch(&self, texts: &[String]) -> std::result::Result<Vec<IndexedEmbedding>, RemoteError> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post(format!("{}/embeddings", self.api_base))
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

        let parsed: EmbeddingsResponse = response
            .json()
            .map_err(|err| RemoteError::permanent(format!("invalid response body: {}", err)))?;

        Ok(parsed
            .data
            .into_iter()
            .map(|d| IndexedEmbedding {
                index: d.index,
                embedding: d.embedding,
            })
            .collect())
    }
}

// ============ Client adapter ============

/// Caller-facing embedding client; see the module docs for behavior.
pub struct EmbeddingClient {
    backend: Box<dyn EmbeddingBackend>,
    retry: RetryPolicy,
    batch_size: usize,
    cache: Option<Mutex<EmbeddingCache>>,
}

impl EmbeddingClient {
    pub fn new(backend: Box<dyn EmbeddingBackend>, retry: RetryPolicy, batch_size: usize) -> Self {
        Self {
            backend,
            retry,
            batch_size,
            cache: None,
        }
    }

    /// Attach a durable response cache.
    pub fn with_cache(mut self, cache: EmbeddingCache) -> Self {
        self.cache = Some(Mutex::new(cache));
        self
    }

    /// Embed a single text.
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut results = self.embed_many(&[text.to_string()], None)?;
        results
            .pop()
            .ok_or_else(|| Error::Remote {
                service: "embedding",
                message: "empty embedding response".into(),
            })
    }

    /// Embed many texts; `results[i]` always corresponds to `texts[i]`.
    ///
    /// `batch_size` overrides the configured request size; each sub-request
    /// holds at most that many texts (the last may be shorter).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when `texts` is empty, exceeds
    /// [`MAX_SERVICE_BATCH`], or `batch_size` is zero.
    pub fn embed_many(&self, texts: &[String], batch_size: Option<usize>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Err(Error::invalid_argument("no texts to embed"));
        }
        if texts.len() > MAX_SERVICE_BATCH {
            return Err(Error::invalid_argument(format!(
                "batch of {} texts exceeds the service limit of {}",
                texts.len(),
                MAX_SERVICE_BATCH
            )));
        }
        let batch_size = batch_size.unwrap_or(self.batch_size);
        if batch_size == 0 {
            return Err(Error::invalid_argument("batch_size must be > 0"));
        }

        // Newlines degrade embedding quality; scrub before anything else so
        // cache keys match what is actually sent.
        let scrubbed: Vec<String> = texts.iter().map(|t| t.replace('\n', " ")).collect();

        match &self.cache {
            Some(cache) => self.embed_with_cache(cache, &scrubbed, batch_size),
            None => self.embed_uncached(&scrubbed, batch_size),
        }
    }

    /// Embed the contents of `fragments`, preserving order.
    pub fn embed_fragments(
        &self,
        fragments: Vec<TextFileFragment>,
    ) -> Result<Vec<EmbeddedTextFileFragment>> {
        let texts: Vec<String> = fragments.iter().map(|f| f.contents.clone()).collect();
        let embeddings = self.embed_many(&texts, None)?;
        Ok(fragments
            .into_iter()
            .zip(embeddings)
            .map(|(fragment, embedding)| EmbeddedTextFileFragment {
                fragment,
                embedding,
            })
            .collect())
    }

    /// Embed a query string into an [`EmbeddedText`].
    pub fn embed_text(&self, text: &str) -> Result<EmbeddedText> {
        Ok(EmbeddedText {
            text: text.to_string(),
            embedding: self.embed_one(text)?,
        })
    }

    fn embed_uncached(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(batch_size) {
            results.extend(self.request_batch(batch)?);
        }
        Ok(results)
    }

    /// Load the cache once, request only the misses, persist once.
    fn embed_with_cache(
        &self,
        cache: &Mutex<EmbeddingCache>,
        texts: &[String],
        batch_size: usize,
    ) -> Result<Vec<Vec<f32>>> {
        let mode = self.backend.mode().to_string();
        let model = self.backend.model().to_string();
        let mut cache = cache.lock().expect("embedding cache lock poisoned");

        let mut results: Vec<Option<Vec<f32>>> = texts
            .iter()
            .map(|text| cache.get(&mode, &model, text).map(<[f32]>::to_vec))
            .collect();

        let misses: Vec<usize> = (0..texts.len()).filter(|&i| results[i].is_none()).collect();
        tracing::debug!(
            total = texts.len(),
            hits = texts.len() - misses.len(),
            misses = misses.len(),
            "embedding cache lookup"
        );

        if !misses.is_empty() {
            let miss_texts: Vec<String> = misses.iter().map(|&i| texts[i].clone()).collect();
            let mut fresh = Vec::with_capacity(miss_texts.len());
            for batch in miss_texts.chunks(batch_size) {
                fresh.extend(self.request_batch(batch)?);
            }
            for (&i, embedding) in misses.iter().zip(fresh) {
                cache.insert(&mode, &model, &texts[i], embedding.clone());
                results[i] = Some(embedding);
            }
            cache.persist()?;
        }

        results
            .into_iter()
            .map(|r| {
                r.ok_or_else(|| Error::Remote {
                    service: "embedding",
                    message: "missing embedding after cache fill".into(),
                })
            })
            .collect()
    }

    /// One retried service request, with result order restored.
    fn request_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut tagged = self
            .retry
            .run("embedding", || self.backend.embed_batch(batch))?;

        if tagged.len() != batch.len() {
            return Err(Error::Remote {
                service: "embedding",
                message: format!(
                    "service returned {} embeddings for {} inputs",
                    tagged.len(),
                    batch.len()
                ),
            });
        }

        // The service may answer out of order; the index tag is authoritative.
        tagged.sort_by_key(|e| e.index);
        Ok(tagged.into_iter().map(|e| e.embedding).collect())
    }
}
