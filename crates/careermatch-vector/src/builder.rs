//! Index construction from a validated corpus.
//!
//! Documents are embedded with bounded parallelism, then folded into the
//! index strictly in corpus order. A provider failure excludes only its own
//! document; a vector whose length differs from the first successful one
//! aborts the whole build.

use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Instant;
use tracing::{debug, info, warn};

use careermatch_core::config::{IndexSettings, RebuildPolicy};
use careermatch_core::traits::EmbeddingProvider;
use careermatch_core::types::EmbeddingVector;
use careermatch_core::{Corpus, Error, Result};

use crate::cache::{hash_content, EmbeddingCache};
use crate::handle::{BuildReport, ExcludedDocument};
use crate::index::VectorIndex;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Maximum provider calls in flight.
    pub concurrency: usize,
    pub policy: RebuildPolicy,
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::from(&IndexSettings::default())
    }
}

impl From<&IndexSettings> for BuildOptions {
    fn from(settings: &IndexSettings) -> Self {
        Self {
            concurrency: settings.build_concurrency,
            policy: settings.rebuild_policy,
            show_progress: settings.show_progress,
        }
    }
}

#[derive(Debug)]
pub struct BuildOutput {
    pub index: VectorIndex,
    pub report: BuildReport,
}

struct Embedded {
    vector: EmbeddingVector,
    content_hash: Option<String>,
    cached: bool,
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} jobs ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn invalid_vector_reason(vector: &[f32]) -> Option<&'static str> {
    if vector.is_empty() {
        Some("provider returned an empty vector")
    } else if vector.iter().any(|x| !x.is_finite()) {
        Some("provider returned non-finite values")
    } else {
        None
    }
}

async fn embed_one(
    provider: &dyn EmbeddingProvider,
    cache: Option<&EmbeddingCache>,
    embedder_id: &str,
    text: String,
    pb: ProgressBar,
) -> Result<Embedded> {
    let content_hash = cache.map(|_| hash_content(&text));
    if let (Some(c), Some(h)) = (cache, content_hash.as_deref()) {
        if let Some(vector) = c.get(embedder_id, h) {
            pb.inc(1);
            return Ok(Embedded { vector, content_hash, cached: true });
        }
    }
    let result = provider.embed(&text).await;
    pb.inc(1);
    result.map(|vector| Embedded { vector, content_hash, cached: false })
}

/// Embed every document of `corpus` and build a fresh index.
///
/// The cache is only consulted when `opts.policy` is `ReuseCached`. An index
/// with zero rows is a valid result; the caller publishes it as `Empty`.
pub async fn build_index(
    corpus: &Corpus,
    provider: &dyn EmbeddingProvider,
    cache: Option<&EmbeddingCache>,
    opts: &BuildOptions,
) -> Result<BuildOutput> {
    let start = Instant::now();
    let embedder_id = provider.embedder_id();
    let cache = cache.filter(|_| opts.policy == RebuildPolicy::ReuseCached);
    info!(documents = corpus.len(), provider = %embedder_id, concurrency = opts.concurrency, "building index");

    let pb = progress_bar(corpus.len(), opts.show_progress);
    let texts: Vec<String> = corpus.iter().map(|doc| doc.embedding_text()).collect();
    let outcomes: Vec<Result<Embedded>> = stream::iter(texts)
        .map(|text| embed_one(provider, cache, embedder_id, text, pb.clone()))
        .buffered(opts.concurrency.max(1))
        .collect()
        .await;
    pb.finish_and_clear();

    let mut index: Option<VectorIndex> = None;
    let mut report = BuildReport { embedder_id: embedder_id.to_string(), attempted: corpus.len(), ..Default::default() };

    for (doc, outcome) in corpus.iter().zip(outcomes) {
        let embedded = match outcome {
            Ok(e) => e,
            Err(e) => {
                warn!(document = %doc.id, error = %e, "embedding failed; document excluded");
                report.excluded.push(ExcludedDocument { id: doc.id.clone(), reason: e.to_string() });
                continue;
            }
        };
        if let Some(reason) = invalid_vector_reason(&embedded.vector) {
            warn!(document = %doc.id, reason, "unusable embedding; document excluded");
            report.excluded.push(ExcludedDocument { id: doc.id.clone(), reason: reason.to_string() });
            continue;
        }
        let index = index.get_or_insert_with(|| VectorIndex::new(embedded.vector.len()));
        if embedded.vector.len() != index.dim() {
            return Err(Error::DimensionMismatch {
                expected: index.dim(),
                actual: embedded.vector.len(),
                document: doc.id.to_string(),
            });
        }
        index.insert(doc.id.clone(), &embedded.vector)?;
        if embedded.cached {
            report.cache_hits += 1;
        } else if let (Some(c), Some(h)) = (cache, embedded.content_hash) {
            c.put(embedder_id, h, embedded.vector);
        }
        debug!(document = %doc.id, "indexed");
    }

    let index = index.unwrap_or_default();
    report.indexed = index.len();
    report.dimension = (!index.is_empty()).then(|| index.dim());
    report.elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        indexed = report.indexed,
        excluded = report.excluded.len(),
        cache_hits = report.cache_hits,
        elapsed_ms = report.elapsed_ms,
        "index build finished"
    );
    Ok(BuildOutput { index, report })
}
