use std::sync::Arc;

use async_trait::async_trait;

use crate::types::{Article, Snapshot, VectorRecord};
use crate::Result;

/// Vector record store: articles keyed by id, each with an optional embedding.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace the record for `id` together with its embedding.
    ///
    /// Fails with `DimensionMismatch` when `vector` does not match the
    /// dimensionality established by the first embedded insert.
    async fn put(&self, id: &str, vector: Vec<f32>, article: Article) -> Result<()>;

    /// Insert or replace article metadata, keeping any embedding already stored.
    async fn put_article(&self, article: Article) -> Result<()>;

    async fn get(&self, id: &str) -> Result<Arc<VectorRecord>>;

    /// Snapshot of every current record.
    async fn all(&self) -> Result<Snapshot>;

    /// Remove a record. Absent ids are ignored.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Replace the category labels of a stored article.
    async fn set_categories(&self, id: &str, categories: Vec<String>) -> Result<()>;

    /// Mutation counter; changes whenever the store contents change.
    async fn revision(&self) -> u64;

    async fn dimension(&self) -> Option<usize>;
}
