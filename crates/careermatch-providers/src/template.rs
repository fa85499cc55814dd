use async_trait::async_trait;

use careermatch_core::traits::{fallback_explanation, NarrativeGenerator};
use careermatch_core::Result;

/// Offline narrator: a fixed sentence carrying the score.
#[derive(Debug, Clone, Default)]
pub struct TemplateNarrator;

#[async_trait]
impl NarrativeGenerator for TemplateNarrator {
    fn generator_id(&self) -> &str { "template" }

    async fn explain(&self, _query_excerpt: &str, _document_summary: &str, score: f32) -> Result<String> {
        Ok(fallback_explanation(score))
    }
}
