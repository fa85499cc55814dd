//! Flat cosine-similarity index.
//!
//! Rows are stored L2-normalized in one contiguous row-major buffer, so a
//! search is a single O(N·D) pass of dot products. There is no approximation
//! structure; this index targets small corpora only.

use std::cmp::Ordering;

use careermatch_core::types::DocumentId;
use careermatch_core::{Error, Result};

/// Scale `v` to unit length. A zero vector stays zero.
pub fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vec![0.0; v.len()];
    }
    v.iter().map(|&x| (f64::from(x) / norm) as f32).collect()
}

/// One search hit: insertion position, document id and cosine score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredHit {
    pub position: usize,
    pub id: DocumentId,
    pub score: f32,
}

#[derive(Debug, Clone, Default)]
pub struct VectorIndex {
    dim: usize,
    ids: Vec<DocumentId>,
    rows: Vec<f32>,
}

impl VectorIndex {
    pub fn new(dim: usize) -> Self {
        Self { dim, ids: Vec::new(), rows: Vec::new() }
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }

    /// Document ids in insertion order.
    pub fn ids(&self) -> &[DocumentId] { &self.ids }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.ids.contains(id)
    }

    fn row(&self, position: usize) -> &[f32] {
        &self.rows[position * self.dim..(position + 1) * self.dim]
    }

    /// Append a vector. It is normalized on the way in; the caller's copy is
    /// left untouched.
    pub fn insert(&mut self, id: DocumentId, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
                document: id.to_string(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(Error::provider("index", format!("vector for document {id} has non-finite values")));
        }
        let position = self.ids.len();
        self.rows.extend(normalize(vector));
        self.ids.push(id);
        Ok(position)
    }

    /// Top `k` rows by descending cosine score, ties broken by ascending
    /// insertion position. `k` is clamped to the number of rows; an empty
    /// index returns no hits for any query.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
                document: "query".to_string(),
            });
        }
        let q = normalize(query);
        let mut scored: Vec<(usize, f64)> = (0..self.len())
            .map(|pos| {
                let dot = self
                    .row(pos)
                    .iter()
                    .zip(&q)
                    .map(|(&a, &b)| f64::from(a) * f64::from(b))
                    .sum::<f64>();
                (pos, dot.clamp(-1.0, 1.0))
            })
            .collect();
        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(k.min(self.len()));
        Ok(scored
            .into_iter()
            .map(|(position, score)| ScoredHit { position, id: self.ids[position].clone(), score: score as f32 })
            .collect())
    }
}
