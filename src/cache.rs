//! Durable embedding response cache.
//!
//! A single JSON file mapping request identity to `{embedding, timestamp}`.
//! Keys are derived from `(mode, model, text)` — the backend kind, the model
//! identifier, and a SHA-256 digest of the text — so embeddings from
//! different models never collide.
//!
//! Entries are valid for [`CACHE_DURATION_HOURS`]; a stale entry is logically
//! absent and gets overwritten when its text is re-embedded. The cache is
//! loaded wholesale, mutated in memory, and persisted wholesale once per
//! batch operation to bound I/O. Concurrent writers to the same cache file
//! are not protected against; last write wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Validity window for cache entries.
pub const CACHE_DURATION_HOURS: i64 = 24;

/// Wall-clock source, injectable for staleness tests.
pub type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    embedding: Vec<f32>,
    timestamp: DateTime<Utc>,
}

pub struct EmbeddingCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
    clock: Clock,
}

impl EmbeddingCache {
    /// Load the cache at `path`, using the system clock.
    ///
    /// A missing file yields an empty cache. An unreadable or corrupt file is
    /// treated as empty too — cached embeddings are disposable — with a
    /// warning logged.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::open_with_clock(path, Box::new(Utc::now))
    }

    /// Load the cache at `path` with an explicit clock.
    pub fn open_with_clock(path: impl Into<PathBuf>, clock: Clock) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "discarding corrupt embedding cache");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            entries,
            clock,
        }
    }

    /// Look up a non-stale embedding for `(mode, model, text)`.
    pub fn get(&self, mode: &str, model: &str, text: &str) -> Option<&[f32]> {
        let entry = self.entries.get(&cache_key(mode, model, text))?;
        let age = (self.clock)() - entry.timestamp;
        if age > Duration::hours(CACHE_DURATION_HOURS) {
            return None;
        }
        Some(&entry.embedding)
    }

    /// Record a freshly computed embedding, overwriting any prior (possibly
    /// stale) entry for the same key.
    pub fn insert(&mut self, mode: &str, model: &str, text: &str, embedding: Vec<f32>) {
        self.entries.insert(
            cache_key(mode, model, text),
            CacheEntry {
                embedding,
                timestamp: (self.clock)(),
            },
        );
    }

    /// Write the whole cache back to disk.
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| Error::Io {
                    path: self.path.clone(),
                    source,
                })?;
            }
        }
        let raw = serde_json::to_string(&self.entries)
            .map_err(|err| Error::Config(format!("failed to serialize cache: {}", err)))?;
        std::fs::write(&self.path, raw).map_err(|source| Error::Io {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn cache_key(mode: &str, model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{}:{}:{:x}", mode, model, hasher.finalize())
}
