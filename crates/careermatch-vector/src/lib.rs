//! Flat vector index, index builder, embedding cache and the swappable
//! index handle.

pub mod builder;
pub mod cache;
pub mod handle;
pub mod index;

pub use builder::{build_index, BuildOptions, BuildOutput};
pub use cache::EmbeddingCache;
pub use handle::{BuildReport, ExcludedDocument, IndexHandle, IndexSnapshot};
pub use index::{normalize, ScoredHit, VectorIndex};
