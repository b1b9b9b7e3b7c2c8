use anyhow::{ensure, Result};
use candle_core::{Device, Module};
use candle_nn::{linear, Linear};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::Path;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use docqa_core::traits::Reranker;

use crate::tokenize::tokenize_batch;
use crate::weights::{load_config, load_tokenizer, load_weights, ModelDims};

/// BERT sequence-classification cross-encoder (ms-marco MiniLM family).
///
/// Each `(query, passage)` pair is encoded jointly; the single classifier
/// logit is squashed with a sigmoid, so scores fall in `(0, 1)`.
pub struct CrossEncoderReranker {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
    batch_size: usize,
    pad_id: u32,
}

impl CrossEncoderReranker {
    pub fn load(model_dir: &Path, device: Device, max_len: usize, batch_size: usize) -> Result<Self> {
        info!("Loading reranker from {}", model_dir.display());
        let tokenizer = load_tokenizer(model_dir)?;
        let config: BertConfig = load_config(model_dir)?;
        let vb = load_weights(model_dir, &device)?;
        let bert = BertModel::load(vb.pp("bert"), &config)?;
        let hidden = load_config::<ModelDims>(model_dir)?.hidden_size;
        let pooler = linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = linear(hidden, 1, vb.pp("classifier"))?;
        let pad_id = tokenizer.token_to_id("[PAD]").unwrap_or(0);
        info!("Reranker loaded");
        Ok(Self { bert, pooler, classifier, tokenizer, device, max_len, batch_size: batch_size.max(1), pad_id })
    }

    fn score_chunk(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let pairs: Vec<(String, String)> = passages.iter().map(|p| (query.to_string(), (*p).to_string())).collect();
        let batch = tokenize_batch(&self.tokenizer, pairs, self.max_len, self.pad_id, &self.device)?;
        let hidden = self.bert.forward(&batch.input_ids, &batch.token_type_ids, Some(&batch.attention_mask))?;
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logits = self.classifier.forward(&pooled)?.squeeze(1)?;
        let scores: Vec<f32> = candle_nn::ops::sigmoid(&logits)?.to_device(&Device::Cpu)?.to_vec1()?;
        ensure!(scores.len() == passages.len(), "reranker returned {} scores for {} passages", scores.len(), passages.len());
        Ok(scores)
    }
}

impl Reranker for CrossEncoderReranker {
    fn score_pairs(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let mut out = Vec::with_capacity(passages.len());
        for chunk in passages.chunks(self.batch_size) {
            out.extend(self.score_chunk(query, chunk)?);
        }
        debug!(n = passages.len(), "reranked candidates");
        Ok(out)
    }
}
