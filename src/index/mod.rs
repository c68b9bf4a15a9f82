//! Exact nearest-neighbor index over embedded movie documents.
//!
//! Vectors live in one flat row-major buffer, documents in a parallel
//! vector, so a document's position is its insertion order. Search is a
//! brute-force scan, which keeps results exact and ties deterministic.

mod artifact;
mod store;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::{EmbeddingDocument, SearchHit};
use crate::services::providers::{embed_with_retry, EmbeddingProvider};

pub use artifact::{ensure_index_present, INDEX_GATE_FILE};
pub use store::{BuildOptions, IndexManifest};

/// Distance between a query and a document vector; smaller is closer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared Euclidean distance
    #[default]
    L2,
    /// One minus cosine similarity
    Cosine,
}

impl DistanceMetric {
    pub fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
        }
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Summary of a loaded index, reported by readiness checks
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub dimension: usize,
    pub metric: DistanceMetric,
    pub model: String,
    pub index_version: String,
    pub built_at: String,
}

/// Immutable in-memory index, shared read-only across queries
#[derive(Debug)]
pub struct VectorIndex {
    manifest: IndexManifest,
    documents: Vec<EmbeddingDocument>,
    vectors: Vec<f32>,
}

impl VectorIndex {
    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.manifest.dimension
    }

    /// Identifier that changes on every rebuild; used to scope cached results
    pub fn version(&self) -> String {
        self.manifest.index_version.to_string()
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.len(),
            dimension: self.dimension(),
            metric: self.manifest.metric,
            model: self.manifest.model.clone(),
            index_version: self.version(),
            built_at: self.manifest.built_at.to_rfc3339(),
        }
    }

    fn vector(&self, position: usize) -> &[f32] {
        let dim = self.manifest.dimension;
        &self.vectors[position * dim..(position + 1) * dim]
    }

    /// The `k` documents closest to `query`, ascending by distance
    ///
    /// Equal distances keep insertion order. `k` larger than the index
    /// returns every document.
    pub fn search_by_vector(&self, query: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        if query.len() != self.dimension() {
            return Err(AppError::Retrieval(format!(
                "query vector has dimension {}, index expects {}",
                query.len(),
                self.dimension()
            )));
        }
        if k == 0 || self.is_empty() {
            return Ok(Vec::new());
        }

        let metric = self.manifest.metric;
        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|position| (position, metric.distance(query, self.vector(position))))
            .collect();

        let by_distance = |a: &(usize, f32), b: &(usize, f32)| -> Ordering {
            a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
        };

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, by_distance);
            scored.truncate(k);
        }
        scored.sort_by(by_distance);

        Ok(scored
            .into_iter()
            .map(|(position, distance)| SearchHit {
                document: self.documents[position].clone(),
                distance,
            })
            .collect())
    }

    /// Embeds `text` once and returns its `k` nearest documents
    ///
    /// Any provider failure left after the retry is reported as a retrieval
    /// failure. The scan itself runs on the blocking pool.
    pub async fn search(
        self: &Arc<Self>,
        provider: &dyn EmbeddingProvider,
        text: &str,
        k: usize,
    ) -> AppResult<Vec<SearchHit>> {
        let vectors = embed_with_retry(provider, &[text.to_string()])
            .await
            .map_err(|e| AppError::Retrieval(format!("query embedding failed: {}", e)))?;

        let query = vectors
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Retrieval("provider returned no query vector".to_string()))?;

        let index = Arc::clone(self);
        tokio::task::spawn_blocking(move || index.search_by_vector(&query, k))
            .await
            .map_err(|e| AppError::Internal(format!("search task failed: {}", e)))?
    }
}
