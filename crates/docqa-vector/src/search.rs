use anyhow::{anyhow, Context, Result};
use arrow_array::{Float32Array, Int32Array, RecordBatch, StringArray};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use std::sync::Arc;
use tracing::debug;

use docqa_core::error::Error;
use docqa_core::types::{ChunkMetadata, FileType, StoredChunk, VectorHit};

use crate::schema::{DISTANCE_COLUMN, TEXT_COLUMNS};
use crate::EmbeddingIndex;

fn string_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<StringArray>())
		.ok_or_else(|| anyhow!("missing {name} column"))
}

fn int_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a Int32Array> {
	batch
		.column_by_name(name)
		.and_then(|c| c.as_any().downcast_ref::<Int32Array>())
		.ok_or_else(|| anyhow!("missing {name} column"))
}

fn rows_to_chunks(batch: &RecordBatch) -> Result<Vec<StoredChunk>> {
	let ids = string_col(batch, "id")?;
	let filenames = string_col(batch, "filename")?;
	let file_types = string_col(batch, "file_type")?;
	let contents = string_col(batch, "content")?;
	let indices = int_col(batch, "chunk_index")?;
	let totals = int_col(batch, "total_chunks")?;
	Ok((0..batch.num_rows())
		.map(|i| StoredChunk {
			id: ids.value(i).to_string(),
			content: contents.value(i).to_string(),
			metadata: ChunkMetadata {
				filename: filenames.value(i).to_string(),
				file_type: FileType::from_label(file_types.value(i)),
				chunk_index: indices.value(i).max(0) as usize,
				total_chunks: totals.value(i).max(0) as usize,
			},
		})
		.collect())
}

impl EmbeddingIndex {
	/// The `k` nearest chunks to `text`, ascending by distance.
	pub async fn query(&self, text: &str, k: usize) -> Result<Vec<VectorHit>> {
		let stored = self.count().await?;
		if k == 0 || stored == 0 {
			return Ok(Vec::new());
		}
		let k = k.min(stored);
		let framed = vec![self.framing.query(text)];
		let embedder = Arc::clone(&self.embedder);
		let mut vectors = tokio::task::spawn_blocking(move || embedder.embed_batch(&framed))
			.await
			.context("query embedding task panicked")?
			.map_err(|e| Error::Embedding(format!("{e:#}")))?;
		let q = vectors.pop().ok_or_else(|| Error::Embedding("embedder returned no query vector".into()))?;

		let mut stream = self
			.table
			.vector_search(q)
			.map_err(|e| Error::Store(e.to_string()))?
			.distance_type(self.metric.into())
			.limit(k)
			.execute()
			.await
			.map_err(|e| Error::Store(e.to_string()))?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await? {
			let distances = batch
				.column_by_name(DISTANCE_COLUMN)
				.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
				.ok_or_else(|| anyhow!("missing {DISTANCE_COLUMN} column"))?;
			for (i, chunk) in rows_to_chunks(&batch)?.into_iter().enumerate() {
				hits.push(VectorHit { chunk, distance: distances.value(i) });
			}
		}
		hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
		hits.truncate(k);
		debug!(k, hits = hits.len(), "vector query");
		Ok(hits)
	}

	/// Every stored chunk, without vectors. Feeds the lexical full scan.
	pub async fn get_all(&self) -> Result<Vec<StoredChunk>> {
		let mut stream = self
			.table
			.query()
			.select(Select::columns(&TEXT_COLUMNS))
			.execute()
			.await
			.map_err(|e| Error::Store(e.to_string()))?;
		let mut out = Vec::new();
		while let Some(batch) = stream.try_next().await? {
			out.extend(rows_to_chunks(&batch)?);
		}
		Ok(out)
	}

	pub async fn count(&self) -> Result<usize> {
		Ok(self.table.count_rows(None).await.map_err(|e| Error::Store(e.to_string()))?)
	}
}
