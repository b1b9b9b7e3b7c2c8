use anyhow::{anyhow, Context, Result};
use arrow_array::{FixedSizeListArray, Int32Array, RecordBatch, RecordBatchIterator, StringArray};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use docqa_core::error::Error;
use docqa_core::traits::Embedder;
use docqa_core::types::Chunk;
use docqa_embed::Framing;

use crate::schema::build_schema;
use crate::EmbeddingIndex;

/// Rows ready to be committed: chunks with their passage vectors.
pub struct EncodedBatch {
    batch: RecordBatch,
}

impl EncodedBatch {
    pub fn len(&self) -> usize { self.batch.num_rows() }

    pub fn is_empty(&self) -> bool { self.batch.num_rows() == 0 }
}

/// Computes passage embeddings off the async runtime. Holds no store state,
/// so encoding can run while readers keep using the collection.
#[derive(Clone)]
pub struct PassageEncoder {
    embedder: Arc<dyn Embedder>,
    framing: Framing,
    batch_size: usize,
    show_progress: bool,
}

impl PassageEncoder {
    pub fn new(embedder: Arc<dyn Embedder>, framing: Framing) -> Self {
        Self { embedder, framing, batch_size: 64, show_progress: false }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub async fn encode(&self, chunks: &[Chunk]) -> Result<EncodedBatch> {
        // Last occurrence of an id wins, keeping the merge source key-unique.
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut unique: Vec<Chunk> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match positions.get(&chunk.id()) {
                Some(&i) => unique[i] = chunk.clone(),
                None => {
                    positions.insert(chunk.id(), unique.len());
                    unique.push(chunk.clone());
                }
            }
        }
        let dim = self.embedder.dim();
        if unique.is_empty() {
            return Ok(EncodedBatch { batch: RecordBatch::new_empty(build_schema(dim as i32)) });
        }

        let texts: Vec<String> = unique.iter().map(|c| self.framing.passage(&c.content)).collect();
        let embedder = Arc::clone(&self.embedder);
        let batch_size = self.batch_size;
        let pb = if self.show_progress { ProgressBar::new(texts.len() as u64) } else { ProgressBar::hidden() };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
                .map_err(|e| anyhow!("progress template: {e}"))?
                .progress_chars("#>-"),
        );
        let bar = pb.clone();
        let vectors = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::with_capacity(texts.len());
            for group in texts.chunks(batch_size) {
                out.extend(embedder.embed_batch(group)?);
                bar.inc(group.len() as u64);
            }
            Ok(out)
        })
        .await
        .context("embedding task panicked")?
        .map_err(|e| Error::Embedding(format!("{e:#}")))?;
        pb.finish_with_message("embedded");

        if vectors.len() != unique.len() {
            return Err(Error::Embedding(format!("embedder returned {} vectors for {} chunks", vectors.len(), unique.len())).into());
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != dim) {
            return Err(Error::Embedding(format!("dim mismatch: got {} expected {}", bad.len(), dim)).into());
        }
        Ok(EncodedBatch { batch: to_record_batch(&unique, vectors, dim)? })
    }
}

fn to_record_batch(chunks: &[Chunk], vectors: Vec<Vec<f32>>, dim: usize) -> Result<RecordBatch> {
    let ids: Vec<String> = chunks.iter().map(Chunk::id).collect();
    let filenames: Vec<&str> = chunks.iter().map(|c| c.metadata.filename.as_str()).collect();
    let file_types: Vec<&str> = chunks.iter().map(|c| c.metadata.file_type.as_str()).collect();
    let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
    let indices: Vec<i32> = chunks.iter().map(|c| c.metadata.chunk_index as i32).collect();
    let totals: Vec<i32> = chunks.iter().map(|c| c.metadata.total_chunks as i32).collect();
    let vectors = vectors.into_iter().map(|v| Some(v.into_iter().map(Some).collect::<Vec<_>>()));
    let batch = RecordBatch::try_new(
        build_schema(dim as i32),
        vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(StringArray::from(filenames)),
            Arc::new(StringArray::from(file_types)),
            Arc::new(StringArray::from(contents)),
            Arc::new(Int32Array::from(indices)),
            Arc::new(Int32Array::from(totals)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors, dim as i32)),
        ],
    )?;
    Ok(batch)
}

impl EmbeddingIndex {
    /// Encoder sharing this index's embedder and framing.
    pub fn encoder(&self) -> PassageEncoder {
        PassageEncoder::new(Arc::clone(&self.embedder), self.framing.clone()).with_progress(self.show_progress)
    }

    /// Commits an encoded batch as a single merge-insert keyed by `id`;
    /// existing ids are overwritten.
    pub async fn upsert(&self, encoded: EncodedBatch) -> Result<usize> {
        if encoded.is_empty() {
            return Ok(0);
        }
        let rows = encoded.len();
        let schema = encoded.batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(encoded.batch)].into_iter(), schema));
        let mut mi = self.table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await.map_err(|e| Error::Store(e.to_string()))?;
        info!(collection = %self.name, rows, "Upserted chunks");
        Ok(rows)
    }

    /// Embeds and upserts `chunks`. Returns the number of rows written.
    pub async fn add(&self, chunks: &[Chunk]) -> Result<usize> {
        let encoded = self.encoder().encode(chunks).await?;
        self.upsert(encoded).await
    }
}
