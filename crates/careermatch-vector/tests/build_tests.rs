use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use careermatch_core::config::RebuildPolicy;
use careermatch_core::corpus::sample_jobs;
use careermatch_core::traits::EmbeddingProvider;
use careermatch_core::types::{EmbeddingVector, IndexState};
use careermatch_core::{Corpus, Error, Result};
use careermatch_providers::HashEmbedder;
use careermatch_vector::{build_index, BuildOptions, EmbeddingCache, IndexHandle};

fn samples() -> Corpus {
    Corpus::new(sample_jobs().expect("samples")).expect("corpus")
}

fn opts(concurrency: usize, policy: RebuildPolicy) -> BuildOptions {
    BuildOptions { concurrency, policy, show_progress: false }
}

/// Fails for any text containing one of `poison`, otherwise hashes.
struct Flaky {
    inner: HashEmbedder,
    poison: Vec<&'static str>,
    calls: AtomicUsize,
}

impl Flaky {
    fn new(poison: Vec<&'static str>) -> Self {
        Self { inner: HashEmbedder::new(256), poison, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl EmbeddingProvider for Flaky {
    fn embedder_id(&self) -> &str { "flaky" }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.poison.iter().any(|p| text.contains(p)) {
            return Err(Error::provider("flaky", "rate limited"));
        }
        Ok(self.inner.embed_text(text))
    }
}

/// Returns a longer vector for one document.
struct Inconsistent;

#[async_trait]
impl EmbeddingProvider for Inconsistent {
    fn embedder_id(&self) -> &str { "inconsistent" }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let dim = if text.starts_with("DevOps") { 8 } else { 4 };
        Ok(vec![1.0; dim])
    }
}

/// Sleeps per call and records the peak number of concurrent calls.
struct Slow {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl EmbeddingProvider for Slow {
    fn embedder_id(&self) -> &str { "slow" }

    async fn embed(&self, text: &str) -> Result<EmbeddingVector> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        // Later documents finish first; the index must still follow corpus order.
        let delay = 40u64.saturating_sub(text.len() as u64 % 40);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![1.0, text.len() as f32])
    }
}

#[tokio::test]
async fn builds_every_sample_in_corpus_order() {
    let corpus = samples();
    let out = build_index(&corpus, &HashEmbedder::new(1024), None, &opts(4, RebuildPolicy::AlwaysReembed))
        .await
        .expect("build");
    assert_eq!(out.index.len(), 5);
    assert_eq!(out.index.dim(), 1024);
    let ids: Vec<String> = out.index.ids().iter().map(ToString::to_string).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
    assert_eq!(out.report.attempted, 5);
    assert_eq!(out.report.indexed, 5);
    assert!(out.report.excluded.is_empty());
    assert_eq!(out.report.dimension, Some(1024));
}

#[tokio::test]
async fn provider_failures_exclude_only_their_documents() {
    let corpus = samples();
    let provider = Flaky::new(vec!["Data Scientist", "Product Manager"]);
    let out = build_index(&corpus, &provider, None, &opts(2, RebuildPolicy::AlwaysReembed)).await.expect("build");
    let ids: Vec<String> = out.index.ids().iter().map(ToString::to_string).collect();
    assert_eq!(ids, vec!["1", "3", "4"]);
    let excluded: Vec<String> = out.report.excluded.iter().map(|e| e.id.to_string()).collect();
    assert_eq!(excluded, vec!["2", "5"]);
    assert!(out.report.excluded[0].reason.contains("rate limited"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn all_failures_publish_an_empty_index() {
    let corpus = samples();
    let provider = Flaky::new(vec![""]);
    let out = build_index(&corpus, &provider, None, &opts(3, RebuildPolicy::AlwaysReembed)).await.expect("build");
    assert!(out.index.is_empty());
    assert_eq!(out.report.excluded.len(), 5);
    assert_eq!(out.report.dimension, None);

    let handle = IndexHandle::new();
    assert_eq!(handle.state(), IndexState::Uninitialized);
    let snapshot = handle.publish(out.index, out.report);
    assert_eq!(snapshot.state, IndexState::Empty);
    assert!(handle.load().index.search(&[1.0; 256], 3).expect("search").is_empty());
}

#[tokio::test]
async fn dimension_change_aborts_the_build() {
    let corpus = samples();
    let err = build_index(&corpus, &Inconsistent, None, &opts(1, RebuildPolicy::AlwaysReembed))
        .await
        .expect_err("mismatch must be fatal");
    match err {
        Error::DimensionMismatch { expected, actual, document } => {
            assert_eq!((expected, actual), (4, 8));
            assert_eq!(document, "3");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!Error::DimensionMismatch { expected: 1, actual: 2, document: String::new() }.is_retryable());
}

#[tokio::test]
async fn concurrency_is_bounded_and_order_is_kept() {
    let corpus = samples();
    let provider = Slow { in_flight: AtomicUsize::new(0), peak: AtomicUsize::new(0) };
    let out = build_index(&corpus, &provider, None, &opts(2, RebuildPolicy::AlwaysReembed)).await.expect("build");
    assert!(provider.peak.load(Ordering::SeqCst) <= 2);
    let ids: Vec<String> = out.index.ids().iter().map(ToString::to_string).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
}

#[tokio::test]
async fn rebuilding_twice_gives_identical_results() {
    let corpus = samples();
    let embedder = HashEmbedder::new(1024);
    let o = opts(4, RebuildPolicy::AlwaysReembed);
    let first = build_index(&corpus, &embedder, None, &o).await.unwrap();
    let second = build_index(&corpus, &embedder, None, &o).await.unwrap();
    let query = embedder.embed_text("Python machine learning SQL statistics");
    assert_eq!(first.index.search(&query, 5).unwrap(), second.index.search(&query, 5).unwrap());
}

#[tokio::test]
async fn reuse_cached_policy_skips_the_provider() {
    let corpus = samples();
    let cache = EmbeddingCache::new();
    let provider = Flaky::new(vec![]);

    let first = build_index(&corpus, &provider, Some(&cache), &opts(4, RebuildPolicy::ReuseCached)).await.unwrap();
    assert_eq!(first.report.cache_hits, 0);
    assert_eq!(cache.len(), 5);
    let second = build_index(&corpus, &provider, Some(&cache), &opts(4, RebuildPolicy::ReuseCached)).await.unwrap();
    assert_eq!(second.report.cache_hits, 5);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 5);

    // Always re-embed ignores the cache even when one is passed.
    let third = build_index(&corpus, &provider, Some(&cache), &opts(4, RebuildPolicy::AlwaysReembed)).await.unwrap();
    assert_eq!(third.report.cache_hits, 0);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 10);
}

#[tokio::test]
async fn readers_keep_their_snapshot_across_a_publish() {
    let corpus = samples();
    let embedder = HashEmbedder::new(1024);
    let handle = Arc::new(IndexHandle::new());
    let first = build_index(&corpus, &embedder, None, &BuildOptions::default()).await.unwrap();
    handle.publish(first.index, first.report);

    let held = handle.load();
    let shrunk = Corpus::new(corpus.documents()[..2].to_vec()).unwrap();
    let second = build_index(&shrunk, &embedder, None, &BuildOptions::default()).await.unwrap();
    let published = handle.publish(second.index, second.report);

    assert_eq!(held.generation, 1);
    assert_eq!(held.index.len(), 5);
    assert_eq!(published.generation, 2);
    assert_eq!(handle.load().index.len(), 2);
    assert!(handle.load().built_at.is_some());
}

fn assert_send<T: Send>(_: &T) {}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn builds_can_be_spawned() {
    let corpus = Arc::new(samples());
    let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashEmbedder::new(64));
    let cache = Arc::new(EmbeddingCache::new());

    let local_opts = opts(3, RebuildPolicy::ReuseCached);
    let local = build_index(&corpus, provider.as_ref(), Some(cache.as_ref()), &local_opts);
    assert_send(&local);
    assert_eq!(local.await.expect("build").index.len(), 5);

    let task = tokio::spawn({
        let (corpus, provider, cache) = (Arc::clone(&corpus), Arc::clone(&provider), Arc::clone(&cache));
        async move {
            build_index(&corpus, provider.as_ref(), Some(cache.as_ref()), &opts(3, RebuildPolicy::ReuseCached))
                .await
                .map(|out| out.report.cache_hits)
        }
    });
    assert_eq!(task.await.expect("join").expect("build"), 5);
}
