use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::info;

/// Resolves a model directory: configured path, then `env_var`, then `fallback`.
pub fn resolve_model_dir(configured: Option<&str>, env_var: &str, fallback: &str) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = docqa_core::config::expand_path(dir);
        if p.exists() { info!("Using model dir: {}", p.display()); return Ok(p); }
        return Err(anyhow!("Configured model directory {} does not exist", p.display()));
    }
    if let Ok(dir) = std::env::var(env_var) {
        let p = PathBuf::from(&dir);
        if p.exists() { info!("Using {}: {}", env_var, p.display()); return Ok(p); }
    }
    let p = Path::new(fallback);
    if p.exists() { info!("Using model dir: {}", p.display()); return Ok(p.to_path_buf()); }
    Err(anyhow!("Could not locate model directory (set {} or configure model_dir)", env_var))
}

pub fn load_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let path = model_dir.join("tokenizer.json");
    Tokenizer::from_file(&path).map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", path.display(), e))
}

pub fn load_config<T: serde::de::DeserializeOwned>(model_dir: &Path) -> Result<T> {
    let path = model_dir.join("config.json");
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

/// Fields shared by every HF encoder config that callers need directly.
#[derive(serde::Deserialize)]
pub struct ModelDims {
    pub hidden_size: usize,
}

/// Prefers `model.safetensors`, falls back to `pytorch_model.bin`.
pub fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)
        .with_context(|| format!("reading {}", weights_path.display()))?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}
