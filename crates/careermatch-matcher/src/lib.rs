//! The matching service: one explicit object owning the corpus, the
//! published index and the providers, handed to whoever serves requests.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use careermatch_core::config::{ScorePolicy, Settings};
use careermatch_core::traits::{EmbeddingProvider, NarrativeGenerator};
use careermatch_core::types::{IndexState, MatchResult};
use careermatch_core::{Corpus, Error, Result};
use careermatch_vector::{build_index, BuildOptions, EmbeddingCache, IndexHandle, IndexSnapshot};

pub mod narrative;
pub mod outcome;

pub use outcome::{MatchOutcome, MatchStatus};

#[derive(Debug, Clone)]
pub struct MatcherSettings {
    pub default_k: usize,
    pub max_k: usize,
    pub score_policy: ScorePolicy,
    pub build: BuildOptions,
    pub narrative_concurrency: usize,
    pub narrative_timeout: Duration,
    pub query_excerpt_chars: usize,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for MatcherSettings {
    fn from(s: &Settings) -> Self {
        Self {
            default_k: s.matcher.default_k,
            max_k: s.matcher.max_k,
            score_policy: s.matcher.score_policy,
            build: BuildOptions::from(&s.index),
            narrative_concurrency: s.narrative.concurrency,
            narrative_timeout: s.narrative.timeout(),
            query_excerpt_chars: s.narrative.query_excerpt_chars,
        }
    }
}

pub struct Matcher {
    corpus: Arc<Corpus>,
    provider: Arc<dyn EmbeddingProvider>,
    narrator: Option<Arc<dyn NarrativeGenerator>>,
    index: IndexHandle,
    cache: EmbeddingCache,
    rebuild_lock: tokio::sync::Mutex<()>,
    settings: MatcherSettings,
}

impl Matcher {
    /// The index starts `Uninitialized`; call `rebuild_index` to populate it.
    pub fn new(
        corpus: Corpus,
        provider: Arc<dyn EmbeddingProvider>,
        narrator: Option<Arc<dyn NarrativeGenerator>>,
        settings: MatcherSettings,
    ) -> Self {
        Self {
            corpus: Arc::new(corpus),
            provider,
            narrator,
            index: IndexHandle::new(),
            cache: EmbeddingCache::new(),
            rebuild_lock: tokio::sync::Mutex::new(()),
            settings,
        }
    }

    pub fn settings(&self) -> &MatcherSettings { &self.settings }

    /// Every document, including those the index had to exclude.
    pub fn list_documents(&self) -> &Corpus { &self.corpus }

    pub fn index_state(&self) -> IndexState { self.index.state() }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> { self.index.load() }

    /// Build a new index off to the side and publish it in one swap.
    /// Concurrent calls run one after another. On error the previously
    /// published index stays in place.
    pub async fn rebuild_index(&self) -> Result<Arc<IndexSnapshot>> {
        let _guard = self.rebuild_lock.lock().await;
        let out = build_index(&self.corpus, self.provider.as_ref(), Some(&self.cache), &self.settings.build).await?;
        let snapshot = self.index.publish(out.index, out.report);
        if snapshot.state == IndexState::Empty {
            warn!(documents = self.corpus.len(), "no document could be embedded; index is empty");
        }
        Ok(snapshot)
    }

    fn effective_k(&self, k: usize) -> usize {
        k.min(self.settings.max_k)
    }

    /// Ranked matches without explanations. An index that is not ready
    /// yields an empty list; provider errors are returned as-is.
    pub async fn rank(&self, query_text: &str, k: usize) -> Result<Vec<MatchResult>> {
        let snapshot = self.index.load();
        self.rank_in(&snapshot, query_text, k).await
    }

    async fn rank_in(&self, snapshot: &IndexSnapshot, query_text: &str, k: usize) -> Result<Vec<MatchResult>> {
        let k = self.effective_k(k);
        if k == 0 || !snapshot.state.is_ready() {
            return Ok(Vec::new());
        }
        let query = self.provider.embed(query_text).await?;
        if query.iter().any(|x| !x.is_finite()) {
            return Err(Error::provider(self.provider.embedder_id(), "query embedding has non-finite values"));
        }
        let hits = snapshot.index.search(&query, k)?;
        debug!(generation = snapshot.generation, hits = hits.len(), "searched index");

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let document = self
                .corpus
                .get(&hit.id)
                .ok_or_else(|| Error::NotFound(format!("indexed document {} is not in the corpus", hit.id)))?;
            results.push(MatchResult {
                document: document.clone(),
                similarity_score: self.settings.score_policy.apply(hit.score),
                rank: results.len() + 1,
                explanation: None,
            });
        }
        Ok(results)
    }

    /// Rank, then attach explanations. Never fails: problems are reported
    /// through `MatchOutcome::status`.
    pub async fn find_matches(&self, query_text: &str, k: usize) -> MatchOutcome {
        let total = self.corpus.len();
        if query_text.trim().is_empty() {
            return MatchOutcome::without_matches(MatchStatus::EmptyQuery, total);
        }
        let snapshot = self.index.load();
        if !snapshot.state.is_ready() {
            debug!(state = %snapshot.state, "index not ready; returning no matches");
            return MatchOutcome::without_matches(MatchStatus::IndexNotReady { state: snapshot.state }, total);
        }
        let mut matches = match self.rank_in(&snapshot, query_text, k).await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "query could not be matched");
                let status = MatchStatus::ProviderFailure { reason: e.to_string(), retryable: e.is_retryable() };
                return MatchOutcome::without_matches(status, total);
            }
        };
        narrative::enrich(
            self.narrator.as_deref(),
            query_text,
            &mut matches,
            self.settings.query_excerpt_chars,
            self.settings.narrative_concurrency,
            self.settings.narrative_timeout,
        )
        .await;
        info!(matches = matches.len(), generation = snapshot.generation, "match request served");
        MatchOutcome::matched(matches, total)
    }

    /// `find_matches` with the configured default `k`.
    pub async fn find_default_matches(&self, query_text: &str) -> MatchOutcome {
        self.find_matches(query_text, self.settings.default_k).await
    }
}
