use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use nr_core::{cosine_similarity, Error, Result, Snapshot, VectorRecord, VectorStore};

/// A stored record together with its similarity to the query.
#[derive(Debug, Clone)]
pub struct Neighbor {
    pub record: Arc<VectorRecord>,
    pub score: f32,
}

#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    /// Top `k` embedded records by cosine similarity, best first.
    ///
    /// Equal scores are ordered by article id ascending. Ids in `exclude`
    /// never appear in the result.
    async fn query(&self, vector: &[f32], k: usize, exclude: &HashSet<String>) -> Result<Vec<Neighbor>>;
}

/// Exact nearest-neighbour search by linear scan over a store snapshot.
pub struct FlatIndex {
    store: Arc<dyn VectorStore>,
}

impl FlatIndex {
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SimilarityIndex for FlatIndex {
    async fn query(&self, vector: &[f32], k: usize, exclude: &HashSet<String>) -> Result<Vec<Neighbor>> {
        let snapshot = self.store.all().await?;
        rank(&snapshot, vector, k, exclude)
    }
}

/// Score every embedded record of `snapshot` against `vector` and keep the best `k`.
pub fn rank(snapshot: &Snapshot, vector: &[f32], k: usize, exclude: &HashSet<String>) -> Result<Vec<Neighbor>> {
    let mut embedded = snapshot.embedded().peekable();
    let Some((_, first)) = embedded.peek() else {
        return Err(Error::EmptyIndex);
    };
    if first.len() != vector.len() {
        return Err(Error::DimensionMismatch {
            expected: first.len(),
            actual: vector.len(),
        });
    }
    if k == 0 {
        return Ok(Vec::new());
    }

    let mut scored: Vec<Neighbor> = embedded
        .filter(|(record, _)| !exclude.contains(record.id()))
        .map(|(record, embedding)| Neighbor {
            record: record.clone(),
            score: cosine_similarity(vector, embedding),
        })
        .collect();

    scored.sort_by(compare);
    scored.truncate(k);
    Ok(scored)
}

fn compare(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.record.id().cmp(b.record.id()))
}
