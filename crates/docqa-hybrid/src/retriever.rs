use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use docqa_core::error::Error;
use docqa_core::traits::Reranker;
use docqa_core::types::{Chunk, SearchResult};
use docqa_lexical::LexicalIndex;
use docqa_vector::EmbeddingIndex;

use crate::fusion::{apply_rerank, passes_threshold, sort_by_combined, union_by_id};
use crate::settings::RetrievalSettings;

/// Dense + lexical retrieval over one collection.
///
/// The index sits behind a read/write lock: `add` and `clear` take the write
/// lock only for the store mutation, `search` reads the vector neighbours and
/// the lexical corpus under one read lock.
pub struct HybridRetriever {
    index: RwLock<EmbeddingIndex>,
    lexical: LexicalIndex,
    reranker: Option<Arc<dyn Reranker>>,
    settings: RetrievalSettings,
}

impl HybridRetriever {
    pub fn new(
        index: EmbeddingIndex,
        lexical: LexicalIndex,
        reranker: Option<Arc<dyn Reranker>>,
        settings: RetrievalSettings,
    ) -> Result<Self> {
        settings.validate()?;
        Ok(Self { index: RwLock::new(index), lexical, reranker, settings })
    }

    pub fn settings(&self) -> &RetrievalSettings { &self.settings }

    pub fn has_reranker(&self) -> bool { self.reranker.is_some() }

    /// Embeds then upserts `chunks`. Embedding runs without the write lock;
    /// the batch lands in a single commit.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }
        let encoder = self.index.read().await.encoder();
        let encoded = encoder.encode(chunks).await?;
        let written = self.index.write().await.upsert(encoded).await?;
        info!(chunks = written, "Added chunks");
        Ok(written)
    }

    pub async fn count(&self) -> Result<usize> {
        self.index.read().await.count().await
    }

    pub async fn clear(&self) -> Result<()> {
        self.index.write().await.clear().await
    }

    /// Ranked results for `query`, at most `n_results`.
    ///
    /// A reranker failure fails the call, as does `use_reranking` without a
    /// loaded reranker; retry with `use_reranking = false` to get the
    /// unranked order.
    pub async fn search(
        &self,
        query: &str,
        n_results: usize,
        use_reranking: bool,
        distance_threshold: f32,
    ) -> Result<Vec<SearchResult>> {
        if n_results == 0 {
            return Ok(Vec::new());
        }
        let s = &self.settings;
        let (vector_hits, corpus) = {
            let index = self.index.read().await;
            let vector_hits = index.query(query, n_results.saturating_mul(s.vector_overfetch)).await?;
            let corpus = index.get_all().await?;
            (vector_hits, corpus)
        };
        let keyword_hits = self.lexical.search(&corpus, query, n_results.saturating_mul(s.lexical_overfetch));
        debug!(vector = vector_hits.len(), lexical = keyword_hits.len(), corpus = corpus.len(), "candidates");

        let mut results: Vec<SearchResult> = union_by_id(vector_hits, keyword_hits, s.keyword_only_distance)
            .into_iter()
            .filter(|r| passes_threshold(r, distance_threshold))
            .collect();
        debug!(kept = results.len(), distance_threshold, "after threshold");

        match (&self.reranker, use_reranking && !results.is_empty()) {
            (Some(reranker), true) => {
                let scores = self.rerank(Arc::clone(reranker), query, &results).await?;
                apply_rerank(&mut results, &scores, s);
            }
            (None, true) => return Err(Error::Rerank("no reranker loaded".into()).into()),
            _ => sort_by_combined(&mut results, s.keyword_weight),
        }
        results.truncate(n_results);
        Ok(results)
    }

    async fn rerank(&self, reranker: Arc<dyn Reranker>, query: &str, results: &[SearchResult]) -> Result<Vec<f32>> {
        let query = query.to_string();
        let passages: Vec<String> = results.iter().map(|r| r.content.clone()).collect();
        let expected = passages.len();
        let scores = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = passages.iter().map(String::as_str).collect();
            reranker.score_pairs(&query, &refs)
        })
        .await
        .context("rerank task panicked")?
        .map_err(|e| Error::Rerank(format!("{e:#}")))?;
        if scores.len() != expected {
            return Err(Error::Rerank(format!("reranker returned {} scores for {} passages", scores.len(), expected)).into());
        }
        Ok(scores)
    }
}
