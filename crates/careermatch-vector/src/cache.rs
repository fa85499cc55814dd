//! In-process embedding cache keyed by `(embedder_id, content_hash)`.
//!
//! Consulted before calling a provider and written through on misses when
//! the rebuild policy is `reuse_cached`. Vectors from different providers
//! never collide because the provider id is part of the key. Nothing is
//! persisted.

use parking_lot::Mutex;
use std::collections::HashMap;

use careermatch_core::types::EmbeddingVector;

pub fn hash_content(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: Mutex<HashMap<(String, String), EmbeddingVector>>,
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, embedder_id: &str, content_hash: &str) -> Option<EmbeddingVector> {
        self.entries
            .lock()
            .get(&(embedder_id.to_string(), content_hash.to_string()))
            .cloned()
    }

    pub fn put(&self, embedder_id: &str, content_hash: String, vector: EmbeddingVector) {
        self.entries.lock().insert((embedder_id.to_string(), content_hash), vector);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_scoped_by_embedder() {
        let cache = EmbeddingCache::new();
        let h = hash_content("Rust engineer");
        cache.put("a", h.clone(), vec![1.0]);
        assert_eq!(cache.get("a", &h), Some(vec![1.0]));
        assert_eq!(cache.get("b", &h), None);
        assert_eq!(hash_content("Rust engineer"), h);
        assert_ne!(hash_content("Rust engineers"), h);
    }
}
