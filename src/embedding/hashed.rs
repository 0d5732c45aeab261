//! Deterministic hashed bag-of-words embedding provider.
//!
//! Each lowercase alphanumeric token is hashed with SHA-256 into one of
//! [`EMBEDDING_DIM`] buckets with a signed weight, then the vector is
//! L2-normalized. Identical text always yields identical vectors, across runs
//! and machines, so stored vectors stay comparable without a model download.

use anyhow::Result;
use sha2::{Digest, Sha256};

use super::{l2_normalize, EmbeddingProvider, EMBEDDING_DIM};

pub struct HashedEmbeddingProvider {
    id: String,
}

impl HashedEmbeddingProvider {
    pub fn new() -> Self {
        Self {
            id: format!("hashed-bow-{EMBEDDING_DIM}"),
        }
    }
}

impl Default for HashedEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn bucket(token: &str) -> (usize, f32) {
    let digest = Sha256::digest(token.as_bytes());
    let index = u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize;
    let sign = if digest[4] & 1 == 0 { 1.0 } else { -1.0 };
    (index % EMBEDDING_DIM, sign)
}

impl EmbeddingProvider for HashedEmbeddingProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; EMBEDDING_DIM];
        let mut any = false;
        for token in tokens(text) {
            let (index, sign) = bucket(&token);
            v[index] += sign;
            any = true;
        }
        // Token-free text (or tokens that cancel out) maps to a fixed unit
        // vector so cosine distance stays defined.
        if !any || v.iter().all(|x| *x == 0.0) {
            v[0] = 1.0;
        }
        Ok(l2_normalize(&v))
    }
}
