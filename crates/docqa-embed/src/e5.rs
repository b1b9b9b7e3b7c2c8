use anyhow::{ensure, Result};
use candle_core::{DType, Device, Tensor};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use std::path::Path;
use std::time::Instant;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use docqa_core::traits::Embedder;

use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_batch;
use crate::weights::{load_config, load_tokenizer, load_weights, ModelDims};

/// Multilingual E5 sentence encoder (XLM-RoBERTa backbone, mean pooling).
///
/// E5 is trained asymmetrically: callers must frame inputs with `query: ` /
/// `passage: ` (see `Framing`), this type embeds text as given.
pub struct E5Embedder {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    batch_size: usize,
    pad_id: u32,
}

impl E5Embedder {
    pub fn load(model_dir: &Path, device: Device, max_len: usize, batch_size: usize) -> Result<Self> {
        info!("Loading embedding model from {}", model_dir.display());
        let tokenizer = load_tokenizer(model_dir)?;
        let config: XLMRobertaConfig = load_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let model = XLMRobertaModel::new(&config, vb)?;
        let pad_id = tokenizer.token_to_id("<pad>").unwrap_or(1);
        let dim = load_config::<ModelDims>(model_dir)?.hidden_size;
        info!(dim, "Embedding model loaded");
        Ok(Self { model, tokenizer, device, dim, max_len, batch_size: batch_size.max(1), pad_id })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let batch = tokenize_batch(&self.tokenizer, texts.to_vec(), self.max_len, self.pad_id, &self.device)?;
        let token_type_ids = Tensor::zeros(batch.input_ids.dims(), DType::I64, &self.device)?;
        let hidden = self.model.forward(&batch.input_ids, &batch.attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden, &batch.attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        ensure!(vectors.len() == texts.len(), "model returned {} vectors for {} inputs", vectors.len(), texts.len());
        Ok(vectors)
    }
}

impl Embedder for E5Embedder {
    fn dim(&self) -> usize { self.dim }

    fn max_len(&self) -> usize { self.max_len }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(chunk)?);
        }
        debug!(n = texts.len(), elapsed_ms = start.elapsed().as_millis() as u64, "embedded batch");
        Ok(out)
    }
}
