use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use docqa_core::config::Config;
use docqa_core::data_processor::{ChunkingConfig, DataProcessor};
use docqa_core::traits::{Embedder, Reranker};
use docqa_core::types::{Document, SearchResult};
use docqa_embed::{get_default_embedder, get_default_reranker, EmbeddingSettings, Framing, RerankerSettings};
use docqa_lexical::{LexicalIndex, LexicalSettings};
use docqa_vector::{EmbeddingIndex, StoreSettings};

use crate::expansion::QueryExpander;
use crate::retriever::HybridRetriever;
use crate::settings::RetrievalSettings;

/// Per-call options; `None` falls back to the configured value.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub n_results: Option<usize>,
    pub use_reranking: Option<bool>,
    pub distance_threshold: Option<f32>,
    /// Prefixes the query with this department before expansion.
    pub department: Option<String>,
}

/// Everything a host needs for ingestion and retrieval: models, the
/// collection, the chunker and the query expander. Build once, share by
/// reference, `close` when done.
pub struct RetrievalService {
    processor: DataProcessor,
    expander: QueryExpander,
    retriever: HybridRetriever,
}

/// Explicit models and settings for [`RetrievalService::from_parts`].
pub struct ServiceParts {
    pub store: StoreSettings,
    pub chunking: ChunkingConfig,
    pub framing: Framing,
    pub lexical: LexicalSettings,
    pub retrieval: RetrievalSettings,
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Option<Arc<dyn Reranker>>,
    pub show_progress: bool,
}

impl RetrievalService {
    /// Loads every section from `config`, then the embedding and reranker
    /// models, then opens the collection.
    pub async fn open(config: &Config, show_progress: bool) -> Result<Self> {
        let embedding: EmbeddingSettings = config.section("embedding")?;
        let reranker: RerankerSettings = config.section("reranker")?;
        let embedder = get_default_embedder(&embedding)?;
        let reranker = get_default_reranker(&reranker)?;
        Self::from_parts(ServiceParts {
            store: config.section("store")?,
            chunking: config.section("chunking")?,
            framing: embedding.framing(),
            lexical: config.section("lexical")?,
            retrieval: config.section("retrieval")?,
            embedder,
            reranker,
            show_progress,
        })
        .await
    }

    pub async fn from_parts(parts: ServiceParts) -> Result<Self> {
        let processor = DataProcessor::with_config(parts.chunking)?;
        let lexical = LexicalIndex::new(parts.lexical)?;
        let index = EmbeddingIndex::open(&parts.store, parts.retrieval.distance_metric, parts.embedder, parts.framing)
            .await?
            .with_progress(parts.show_progress);
        let retriever = HybridRetriever::new(index, lexical, parts.reranker, parts.retrieval)?;
        info!(reranker = retriever.has_reranker(), "Retrieval service opened");
        Ok(Self { processor, expander: QueryExpander::default(), retriever })
    }

    pub fn retriever(&self) -> &HybridRetriever { &self.retriever }

    pub fn expander(&self) -> &QueryExpander { &self.expander }

    /// Chunks and indexes a corpus load. Returns the number of chunks written.
    pub async fn add_documents(&self, docs: &[Document]) -> Result<usize> {
        let chunks = self.processor.process_documents(docs);
        self.retriever.add(&chunks).await
    }

    /// Department scoping, synonym expansion, then hybrid retrieval.
    pub async fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchResult>> {
        let s = self.retriever.settings();
        let scoped = match opts.department.as_deref() {
            Some(dept) => self.expander.scope_to_department(dept, query),
            None => query.to_string(),
        };
        let expanded = self.expander.expand(&scoped);
        self.retriever
            .search(
                &expanded,
                opts.n_results.unwrap_or(s.n_results),
                opts.use_reranking.unwrap_or(self.retriever.has_reranker()),
                opts.distance_threshold.unwrap_or(s.distance_threshold),
            )
            .await
    }

    pub async fn count(&self) -> Result<usize> { self.retriever.count().await }

    pub async fn clear(&self) -> Result<()> { self.retriever.clear().await }

    pub fn close(self) {
        info!("Retrieval service closed");
    }
}

/// Stable key for a caller-side answer cache: the query plus the first 100
/// characters of each retrieved passage, in rank order.
pub fn answer_cache_key(query: &str, results: &[SearchResult]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(query.as_bytes());
    for r in results {
        let head: String = r.content.chars().take(100).collect();
        hasher.update(&[0u8]);
        hasher.update(head.as_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::types::{ChunkMetadata, FileType};

    fn result(content: &str) -> SearchResult {
        SearchResult {
            id: "x_0".into(),
            content: content.into(),
            metadata: ChunkMetadata { filename: "x".into(), file_type: FileType::Word, chunk_index: 0, total_chunks: 1 },
            distance: 0.5,
            keyword_score: 0,
            rerank_score: None,
        }
    }

    #[test]
    fn cache_key_depends_on_passage_heads_only() {
        let base = "あ".repeat(100);
        let a = answer_cache_key("q", &[result(&format!("{base}い"))]);
        let b = answer_cache_key("q", &[result(&format!("{base}う"))]);
        assert_eq!(a, b);
        assert_ne!(a, answer_cache_key("q2", &[result(&base)]));
        assert_ne!(answer_cache_key("q", &[]), answer_cache_key("q", &[result("")]));
        assert_eq!(a.len(), 64);
    }
}
