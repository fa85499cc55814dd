//! OpenAI-compatible HTTP providers.
//!
//! Responses are decoded into explicit structs and validated before use; a
//! response that parses but has the wrong shape (no data, empty vector,
//! non-finite values, blank message) is a `ProviderFailure`, never a
//! partially filled result.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use careermatch_core::traits::{EmbeddingProvider, NarrativeGenerator};
use careermatch_core::types::EmbeddingVector;
use careermatch_core::{Error, Result};

const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string(), api_key })
    }

    /// Read the API key from the environment variable named `api_key_env`.
    pub fn from_env(base_url: &str, api_key_env: &str, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::InvalidConfig(format!("environment variable {api_key_env} is not set")))?;
        Self::new(base_url, api_key, timeout)
    }

    async fn post_json<B, R>(&self, path: &str, body: &B, provider: &str) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::provider(provider, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(Error::provider(provider, format!("HTTP {status}: {body}")));
        }
        response
            .json::<R>()
            .await
            .map_err(|e| Error::provider(provider, format!("unexpected response shape: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingsResponse {
    pub data: Vec<EmbeddingDatum>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingDatum {
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub index: usize,
}

impl EmbeddingsResponse {
    /// The single vector for a single-input request.
    pub fn into_vector(self, provider: &str) -> Result<EmbeddingVector> {
        let datum = self
            .data
            .into_iter()
            .min_by_key(|d| d.index)
            .ok_or_else(|| Error::provider(provider, "response contained no embeddings"))?;
        if datum.embedding.is_empty() {
            return Err(Error::provider(provider, "response contained an empty embedding"));
        }
        if datum.embedding.iter().any(|x| !x.is_finite()) {
            return Err(Error::provider(provider, "embedding contains non-finite values"));
        }
        Ok(datum.embedding)
    }
}

pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    id: String,
}

impl OpenAiEmbedder {
    pub fn new(client: OpenAiClient, model: &str) -> Self {
        Self { client, model: model.to_string(), id: format!("openai:{model}") }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    fn embedder_id(&self) -> &str { &self.id }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let request = EmbeddingsRequest { model: &self.model, input: text };
        let response: EmbeddingsResponse = self.client.post_json("embeddings", &request, &self.id).await?;
        let vector = response.into_vector(&self.id)?;
        debug!(provider = %self.id, dim = vector.len(), "embedding received");
        Ok(vector)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatReply,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// Text of the first choice, trimmed.
    pub fn into_text(self, provider: &str) -> Result<String> {
        let text = self
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(Error::provider(provider, "completion contained no text"));
        }
        Ok(text)
    }
}

const COUNSELOR_SYSTEM_PROMPT: &str = "You are a career counselor explaining job matches.";

pub fn explanation_prompt(query_excerpt: &str, document_summary: &str, score: f32) -> String {
    format!(
        "Analyze why this job is a good match for the candidate based on their resume.\n\n\
         Resume Summary: {query_excerpt}...\n\n\
         Job Details:\n{document_summary}\n\n\
         Similarity Score: {score:.2}\n\n\
         Provide a brief explanation (2-3 sentences) covering:\n\
         1. Why this is a good match\n\
         2. Key skills that align\n\
         3. Any potential gaps or areas for improvement"
    )
}

pub struct OpenAiNarrator {
    client: OpenAiClient,
    model: String,
    temperature: f32,
    max_tokens: u32,
    id: String,
}

impl OpenAiNarrator {
    pub fn new(client: OpenAiClient, model: &str, temperature: f32, max_tokens: u32) -> Self {
        Self { client, model: model.to_string(), temperature, max_tokens, id: format!("openai-chat:{model}") }
    }
}

#[async_trait]
impl NarrativeGenerator for OpenAiNarrator {
    fn generator_id(&self) -> &str { &self.id }

    async fn explain(&self, query_excerpt: &str, document_summary: &str, score: f32) -> Result<String> {
        let prompt = explanation_prompt(query_excerpt, document_summary, score);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: COUNSELOR_SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response: ChatResponse = self.client.post_json("chat/completions", &request, &self.id).await?;
        response.into_text(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_response_yields_first_vector() {
        let raw = r#"{"object":"list","model":"m","data":[
            {"object":"embedding","index":1,"embedding":[9.0]},
            {"object":"embedding","index":0,"embedding":[0.5,-0.5]}]}"#;
        let parsed: EmbeddingsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_vector("p").unwrap(), vec![0.5, -0.5]);
    }

    #[test]
    fn embeddings_response_without_data_is_a_provider_failure() {
        let parsed: EmbeddingsResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        let err = parsed.into_vector("p").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn embeddings_response_with_empty_vector_is_rejected() {
        let parsed: EmbeddingsResponse = serde_json::from_str(r#"{"data": [{"embedding": []}]}"#).unwrap();
        assert!(matches!(parsed.into_vector("p"), Err(Error::ProviderFailure { .. })));
    }

    #[test]
    fn chat_response_requires_text() {
        let ok: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"  Good fit. "}}]}"#).unwrap();
        assert_eq!(ok.into_text("p").unwrap(), "Good fit.");

        let blank: ChatResponse = serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert!(blank.into_text("p").is_err());

        let none: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(none.into_text("p").is_err());
    }

    #[test]
    fn prompt_carries_score_with_two_decimals() {
        let prompt = explanation_prompt("Rust dev", "Title: X", 0.8765);
        assert!(prompt.contains("Similarity Score: 0.88"));
        assert!(prompt.contains("Resume Summary: Rust dev..."));
    }
}
