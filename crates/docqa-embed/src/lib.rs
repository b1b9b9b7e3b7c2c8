//! docqa-embed
//!
//! Local text encoders: the E5 passage/query embedder, a hashed n-gram
//! embedder for offline use, and the cross-encoder reranker.

mod device;
mod e5;
mod hash;
mod pool;
mod rerank;
mod tokenize;
mod weights;

use anyhow::Result;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use docqa_core::traits::{Embedder, Reranker};

pub use device::select_device;
pub use e5::E5Embedder;
pub use hash::HashEmbedder;
pub use pool::masked_mean_l2;
pub use rerank::CrossEncoderReranker;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    E5,
    Hash,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub batch_size: usize,
    /// Dimensionality of the hash backend; the E5 model reports its own.
    pub dim: usize,
    pub query_prefix: String,
    pub passage_prefix: String,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::E5,
            model_dir: None,
            max_len: 512,
            batch_size: 32,
            dim: 768,
            query_prefix: "query: ".to_string(),
            passage_prefix: "passage: ".to_string(),
        }
    }
}

impl EmbeddingSettings {
    pub fn framing(&self) -> Framing {
        Framing { query_prefix: self.query_prefix.clone(), passage_prefix: self.passage_prefix.clone() }
    }
}

/// Text framing for asymmetric embedders. The same framing must be used at
/// ingestion and at query time, otherwise recall silently degrades.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Framing {
    pub query_prefix: String,
    pub passage_prefix: String,
}

impl Framing {
    pub fn query(&self, text: &str) -> String { format!("{}{}", self.query_prefix, text) }

    pub fn passage(&self, text: &str) -> String { format!("{}{}", self.passage_prefix, text) }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RerankerSettings {
    pub enabled: bool,
    pub model_dir: Option<String>,
    pub max_len: usize,
    pub batch_size: usize,
}

impl Default for RerankerSettings {
    fn default() -> Self {
        Self { enabled: true, model_dir: None, max_len: 512, batch_size: 32 }
    }
}

fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.backend == EmbeddingBackend::Hash || use_fake_embeddings() {
        info!(dim = settings.dim, "Using HashEmbedder");
        return Ok(Arc::new(HashEmbedder::new(settings.dim)));
    }
    let dir = weights::resolve_model_dir(settings.model_dir.as_deref(), "APP_MODEL_DIR", "models/multilingual-e5-base")?;
    Ok(Arc::new(E5Embedder::load(&dir, select_device(), settings.max_len, settings.batch_size)?))
}

/// `Ok(None)` when reranking is disabled in configuration.
pub fn get_default_reranker(settings: &RerankerSettings) -> Result<Option<Arc<dyn Reranker>>> {
    if !settings.enabled {
        return Ok(None);
    }
    let dir = weights::resolve_model_dir(
        settings.model_dir.as_deref(),
        "APP_RERANKER_DIR",
        "models/ms-marco-MiniLM-L-6-v2",
    )?;
    let reranker = CrossEncoderReranker::load(&dir, select_device(), settings.max_len, settings.batch_size)?;
    Ok(Some(Arc::new(reranker)))
}
