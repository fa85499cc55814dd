use async_trait::async_trait;
use std::hash::Hasher;
use twox_hash::XxHash64;

use careermatch_core::traits::EmbeddingProvider;
use careermatch_core::types::EmbeddingVector;
use careermatch_core::Result;

use crate::tokenize::tokenize;

/// Deterministic bag-of-words embedder: each token is hashed (xxh64, seed 0)
/// into one of `dim` buckets and counted. Identical texts give identical
/// vectors; texts sharing vocabulary score higher. Vectors are raw counts,
/// not normalized.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hash:xxh64:d{dim}") }
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn embed_text(&self, text: &str) -> EmbeddingVector {
        let mut v = vec![0f32; self.dim];
        for token in tokenize(text) {
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.as_bytes());
            let idx = (hasher.finish() % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        v
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        Ok(self.embed_text(text))
    }
}
