//! # embed-search
//!
//! Text-fragment semantic search over local files via embedding APIs.
//!
//! Given a natural-language query and a set of files, embed-search splits
//! each file into line-bounded fragments, embeds the fragments and the query
//! through an external embedding service, and ranks the fragments by cosine
//! similarity to the query.
//!
//! ## Pipeline
//!
//! ```text
//! ┌─────────┐   ┌────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Gather  │──▶│ Fragmenter │──▶│  Embedding   │──▶│  Ranker  │
//! │ (files) │   │ (windows)  │   │ (batched API)│   │ (cosine) │
//! └─────────┘   └────────────┘   └──────────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export OPENAI_API_KEY=...
//! emsearch search "where is the retry logic" src/*.rs
//! emsearch transform --prompt "add type hints" src/*.py
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | File, fragment, and result value types |
//! | [`fragment`] | Line-window fragmenter |
//! | [`chunker`] | Token-budget batching |
//! | [`embedding`] | Embedding client: batching, ordering, retry, caching |
//! | [`cache`] | Durable embedding response cache |
//! | [`retry`] | Shared retry policy with randomized backoff |
//! | [`similarity`] | Cosine similarity and ranking |
//! | [`search`] | End-to-end search orchestrator |
//! | [`completion`] | Completion service boundary |
//! | [`transform`] | Budget-batched file transformation |
//! | [`config`] | TOML configuration |
//! | [`error`] | Error taxonomy |

pub mod cache;
pub mod chunker;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod fragment;
pub mod models;
pub mod retry;
pub mod search;
pub mod similarity;
pub mod transform;
