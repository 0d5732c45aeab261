//! Text-to-vector embedding pipeline.
//!
//! Provides the [`EmbeddingProvider`] trait, the default deterministic hashed
//! bag-of-words provider and a local ONNX sentence-embedding provider. The
//! provider is created via [`create_provider`] from configuration.

pub mod hashed;
pub mod local;

use anyhow::Result;

/// Number of dimensions in the embedding vectors.
pub const EMBEDDING_DIM: usize = 384;

/// Trait for embedding text into vectors.
///
/// Implementations produce L2-normalized vectors of exactly [`EMBEDDING_DIM`] dimensions.
/// All methods are synchronous; callers in async contexts should use
/// `tokio::task::spawn_blocking` for heavy providers.
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier recorded alongside stored vectors.
    fn id(&self) -> &str;

    /// Embed a single text string into a vector.
    fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Create an embedding provider from config: `"hashed"` or `"local"`.
pub fn create_provider(
    config: &crate::config::EmbeddingConfig,
) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "hashed" => Ok(Box::new(hashed::HashedEmbeddingProvider::new())),
        "local" => Ok(Box::new(local::LocalEmbeddingProvider::new(config)?)),
        other => anyhow::bail!("unknown embedding provider: {other}. Supported: hashed, local"),
    }
}

/// Convert an f32 embedding slice to raw little-endian bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|x| x.to_le_bytes()).collect()
}

/// L2-normalize a vector. Returns the input unchanged if its norm is zero.
pub fn l2_normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
