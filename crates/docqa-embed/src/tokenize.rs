use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{EncodeInput, Encoding, Tokenizer};

/// Token tensors for one padded batch, each `[B,T]`.
pub struct BatchTensors {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
}

/// Encodes `inputs`, truncates each to `max_len` and right-pads to the
/// longest sequence in the batch with `pad_id`.
pub fn tokenize_batch<'s, E>(
    tokenizer: &Tokenizer,
    inputs: Vec<E>,
    max_len: usize,
    pad_id: u32,
    device: &Device,
) -> Result<BatchTensors>
where
    E: Into<EncodeInput<'s>> + Send,
{
    let encodings: Vec<Encoding> = tokenizer
        .encode_batch(inputs, true)
        .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let batch = encodings.len();
    let seq_len = encodings.iter().map(|e| e.get_ids().len().min(max_len)).max().unwrap_or(0).max(1);

    let mut ids = Vec::with_capacity(batch * seq_len);
    let mut mask = Vec::with_capacity(batch * seq_len);
    let mut types = Vec::with_capacity(batch * seq_len);
    for enc in &encodings {
        let n = enc.get_ids().len().min(seq_len);
        ids.extend_from_slice(&enc.get_ids()[..n]);
        mask.extend_from_slice(&enc.get_attention_mask()[..n]);
        types.extend_from_slice(&enc.get_type_ids()[..n]);
        let pad = seq_len - n;
        ids.extend(std::iter::repeat(pad_id).take(pad));
        mask.extend(std::iter::repeat(0u32).take(pad));
        types.extend(std::iter::repeat(0u32).take(pad));
    }
    Ok(BatchTensors {
        input_ids: Tensor::from_vec(ids, (batch, seq_len), device)?,
        attention_mask: Tensor::from_vec(mask, (batch, seq_len), device)?,
        token_type_ids: Tensor::from_vec(types, (batch, seq_len), device)?,
    })
}
