//! Embedding and narrative providers.
//!
//! `get_default_embedder` and `get_narrator` turn configuration into trait
//! objects; the rest of the workspace only sees `EmbeddingProvider` and
//! `NarrativeGenerator`.

use std::sync::Arc;
use tracing::info;

use careermatch_core::config::{EmbeddingBackend, EmbeddingSettings, NarrativeBackend, NarrativeSettings};
use careermatch_core::traits::{EmbeddingProvider, NarrativeGenerator};
use careermatch_core::Result;

pub mod hash;
pub mod openai;
pub mod template;
pub mod tokenize;

pub use careermatch_core::config::use_fake_embeddings;
pub use hash::HashEmbedder;
pub use openai::{OpenAiClient, OpenAiEmbedder, OpenAiNarrator};
pub use template::TemplateNarrator;

/// Honours `APP_USE_FAKE_EMBEDDINGS`. Loading a production `Config` already
/// refuses that override, so it only reaches here outside production.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingProvider>> {
    if use_fake_embeddings() || settings.provider == EmbeddingBackend::Hash {
        let embedder = HashEmbedder::new(settings.dimension);
        info!(provider = %embedder.embedder_id(), "using hashing embedder");
        return Ok(Arc::new(embedder));
    }
    let client = OpenAiClient::from_env(&settings.base_url, &settings.api_key_env, settings.timeout())?;
    let embedder = OpenAiEmbedder::new(client, &settings.model);
    info!(provider = %embedder.embedder_id(), "using remote embedder");
    Ok(Arc::new(embedder))
}

/// `None` when explanations are disabled.
pub fn get_narrator(settings: &NarrativeSettings) -> Result<Option<Arc<dyn NarrativeGenerator>>> {
    if !settings.enabled {
        return Ok(None);
    }
    let narrator: Arc<dyn NarrativeGenerator> = match settings.provider {
        NarrativeBackend::Template => Arc::new(TemplateNarrator),
        NarrativeBackend::OpenAi => {
            let client = OpenAiClient::from_env(&settings.base_url, &settings.api_key_env, settings.timeout())?;
            Arc::new(OpenAiNarrator::new(client, &settings.model, settings.temperature, settings.max_tokens))
        }
    };
    info!(generator = %narrator.generator_id(), "narrative generator ready");
    Ok(Some(narrator))
}
