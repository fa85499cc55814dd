use async_trait::async_trait;

use crate::error::Result;
use crate::types::{EmbeddingVector, ReferenceDocument};

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier for the provider/model pair (e.g. `openai:text-embedding-ada-002`).
    /// Vectors are only comparable when they share this id.
    fn embedder_id(&self) -> &str;
    /// Embed one text. Implementations return raw vectors; normalization is
    /// the index's job.
    async fn embed(&self, text: &str) -> Result<EmbeddingVector>;
}

#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    fn generator_id(&self) -> &str;
    /// Explain why `document_summary` suits the candidate. Must not touch
    /// index state.
    async fn explain(&self, query_excerpt: &str, document_summary: &str, score: f32) -> Result<String>;
}

/// Explanation used when no generator is configured or a generation call
/// fails or times out.
pub fn fallback_explanation(score: f32) -> String {
    format!("Match score: {score:.2}. This role aligns with your background.")
}

pub trait CorpusSource: Send + Sync {
    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
    fn load(&self) -> Result<Vec<ReferenceDocument>>;
}
