//! Published index snapshots and the handle that swaps them.
//!
//! Readers clone an `Arc<IndexSnapshot>` and search it without holding any
//! lock; a rebuild publishes a fully built snapshot in one pointer swap.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use careermatch_core::types::{DocumentId, IndexState};

use crate::index::VectorIndex;

#[derive(Debug, Clone, Serialize)]
pub struct ExcludedDocument {
    pub id: DocumentId,
    pub reason: String,
}

/// What one build did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub embedder_id: String,
    pub attempted: usize,
    pub indexed: usize,
    pub excluded: Vec<ExcludedDocument>,
    pub cache_hits: usize,
    pub dimension: Option<usize>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    pub state: IndexState,
    pub index: VectorIndex,
    pub report: Option<BuildReport>,
    pub built_at: Option<DateTime<Utc>>,
    /// 0 for the initial snapshot; each publish increments it.
    pub generation: u64,
}

impl IndexSnapshot {
    pub fn uninitialized() -> Self {
        Self {
            state: IndexState::Uninitialized,
            index: VectorIndex::default(),
            report: None,
            built_at: None,
            generation: 0,
        }
    }
}

#[derive(Debug)]
pub struct IndexHandle {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl Default for IndexHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexHandle {
    pub fn new() -> Self {
        Self { current: RwLock::new(Arc::new(IndexSnapshot::uninitialized())) }
    }

    /// The snapshot searches should run against. Stays valid after later
    /// publishes.
    pub fn load(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&*self.current.read())
    }

    pub fn state(&self) -> IndexState {
        self.current.read().state
    }

    /// Swap in a freshly built index. The state is `Ready` when it holds at
    /// least one vector and `Empty` otherwise.
    pub fn publish(&self, index: VectorIndex, report: BuildReport) -> Arc<IndexSnapshot> {
        let state = if index.is_empty() { IndexState::Empty } else { IndexState::Ready };
        let mut guard = self.current.write();
        let snapshot = Arc::new(IndexSnapshot {
            state,
            index,
            report: Some(report),
            built_at: Some(Utc::now()),
            generation: guard.generation + 1,
        });
        *guard = Arc::clone(&snapshot);
        drop(guard);
        info!(generation = snapshot.generation, state = %state, rows = snapshot.index.len(), "index published");
        snapshot
    }
}
