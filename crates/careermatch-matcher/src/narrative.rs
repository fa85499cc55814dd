//! Best-effort match explanations.
//!
//! One generator call per match, at most `concurrency` in flight, each under
//! its own timeout. Failures and timeouts fall back to the templated text;
//! the list of matches is never shortened or reordered here.

use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::{debug, warn};

use careermatch_core::traits::{fallback_explanation, NarrativeGenerator};
use careermatch_core::types::{DocumentId, MatchResult};

/// First `max_chars` characters of `text`, cut on a character boundary.
pub fn query_excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

async fn explain_one(
    narrator: &dyn NarrativeGenerator,
    excerpt: &str,
    document: DocumentId,
    summary: String,
    score: f32,
    timeout: Duration,
) -> String {
    match tokio::time::timeout(timeout, narrator.explain(excerpt, &summary, score)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => text,
        Ok(Ok(_)) => {
            warn!(%document, "generator returned blank text; using fallback");
            fallback_explanation(score)
        }
        Ok(Err(e)) => {
            warn!(%document, error = %e, "explanation failed; using fallback");
            fallback_explanation(score)
        }
        Err(_) => {
            let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
            warn!(%document, timeout_ms, "explanation timed out; using fallback");
            fallback_explanation(score)
        }
    }
}

/// Fill `explanation` on every match. Without a generator every match gets
/// the fallback text.
pub async fn enrich(
    narrator: Option<&dyn NarrativeGenerator>,
    query_text: &str,
    matches: &mut [MatchResult],
    excerpt_chars: usize,
    concurrency: usize,
    timeout: Duration,
) {
    let Some(narrator) = narrator else {
        for m in matches.iter_mut() {
            m.explanation = Some(fallback_explanation(m.similarity_score));
        }
        return;
    };
    let excerpt = query_excerpt(query_text, excerpt_chars);
    let requests: Vec<(DocumentId, String, f32)> = matches
        .iter()
        .map(|m| (m.document.id.clone(), m.document.summary(), m.similarity_score))
        .collect();
    let texts: Vec<String> = stream::iter(requests)
        .map(|(id, summary, score)| explain_one(narrator, excerpt, id, summary, score, timeout))
        .buffered(concurrency.max(1))
        .collect()
        .await;
    for (m, text) in matches.iter_mut().zip(texts) {
        m.explanation = Some(text);
    }
    debug!(generator = %narrator.generator_id(), count = matches.len(), "explanations attached");
}
