/// Dense text encoder. Implementations return L2-normalized vectors of
/// exactly `dim()` components, one per input, in input order.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Query-aware relevance model scoring `(query, passage)` pairs.
///
/// Returns one score per passage, higher is more relevant. Scores are only
/// comparable within a single call.
pub trait Reranker: Send + Sync {
    fn score_pairs(&self, query: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>>;
}
