//! Local ONNX Runtime embedding provider.
//!
//! Runs a sentence-transformer export (all-MiniLM-L6-v2 by default) via `ort`:
//! tokenization, inference, mean pooling over the attention mask and L2
//! normalization. Model files are read from `embedding.model_dir` and never
//! downloaded.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};
use crate::config::EmbeddingConfig;

/// Maximum sequence length for all-MiniLM-L6-v2 (trained at 256).
const MAX_SEQ_LEN: usize = 256;

pub struct LocalEmbeddingProvider {
    id: String,
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

// Safety: Tokenizer is Send+Sync. Session is behind a Mutex, which guarantees
// exclusive access during run().
unsafe impl Send for LocalEmbeddingProvider {}
unsafe impl Sync for LocalEmbeddingProvider {}

impl LocalEmbeddingProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_dir = crate::config::expand_tilde(&config.model_dir);
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        require_file(&model_path, "ONNX model")?;
        require_file(&tokenizer_path, "tokenizer")?;

        let session = Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?
            .commit_from_file(&model_path)
            .context("failed to load ONNX model")?;
        tracing::info!(model = %model_path.display(), "ONNX model loaded");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: MAX_SEQ_LEN,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("failed to set truncation: {e}"))?;

        Ok(Self {
            id: format!("local-{}", config.model),
            session: Mutex::new(session),
            tokenizer,
        })
    }
}

fn require_file(path: &Path, what: &str) -> Result<()> {
    anyhow::ensure!(
        path.is_file(),
        "{what} not found at {}. Place a sentence-transformers ONNX export there \
         or set embedding.provider to \"hashed\".",
        path.display()
    );
    Ok(())
}

impl EmbeddingProvider for LocalEmbeddingProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenization failed: {e}"))?;

        let input_ids: Vec<i64> = encoding.get_ids().iter().map(|&id| id as i64).collect();
        let attention_mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&m| m as i64)
            .collect();
        let seq_len = input_ids.len();
        let shape = vec![1i64, seq_len as i64];

        let input_ids_tensor = Tensor::from_array((shape.clone(), input_ids.into_boxed_slice()))?;
        let attention_mask_tensor =
            Tensor::from_array((shape.clone(), attention_mask.clone().into_boxed_slice()))?;
        // Single segment.
        let token_type_ids_tensor =
            Tensor::from_array((shape, vec![0i64; seq_len].into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("session lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs! {
            "input_ids" => input_ids_tensor,
            "attention_mask" => attention_mask_tensor,
            "token_type_ids" => token_type_ids_tensor,
        })?;

        // The output name varies by export.
        let token_embeddings = outputs
            .get("token_embeddings")
            .or_else(|| outputs.get("last_hidden_state"))
            .unwrap_or_else(|| &outputs[0]);
        let (shape, data) = token_embeddings
            .try_extract_tensor::<f32>()
            .context("failed to extract token embeddings")?;

        let dims: &[i64] = &shape;
        anyhow::ensure!(
            dims.len() == 3 && dims[0] == 1 && dims[2] == EMBEDDING_DIM as i64,
            "unexpected token embeddings shape {dims:?}, expected [1, seq, {EMBEDDING_DIM}]"
        );

        Ok(l2_normalize(&mean_pool(
            data,
            &attention_mask,
            dims[1] as usize,
            EMBEDDING_DIM,
        )))
    }
}

/// Average of the token vectors whose mask is set. `data` is row-major
/// `[seq_len, hidden]`.
fn mean_pool(data: &[f32], mask: &[i64], seq_len: usize, hidden: usize) -> Vec<f32> {
    let mut sum = vec![0.0f32; hidden];
    let mut count = 0.0f32;
    for (s, &m) in mask.iter().enumerate().take(seq_len) {
        if m == 0 {
            continue;
        }
        let row = &data[s * hidden..(s + 1) * hidden];
        for (acc, x) in sum.iter_mut().zip(row) {
            *acc += x;
        }
        count += 1.0;
    }
    if count > 0.0 {
        sum.iter_mut().for_each(|x| *x /= count);
    }
    sum
}
