use std::collections::HashSet;
use std::sync::Arc;

use nr_core::config::RecommendConfig;
use nr_core::{Error, Result, ScoredArticle, VectorStore};
use tracing::debug;

use crate::index::SimilarityIndex;

/// Answers "articles similar to X" from the store and a similarity index.
pub struct Recommender {
    store: Arc<dyn VectorStore>,
    index: Arc<dyn SimilarityIndex>,
    config: RecommendConfig,
}

impl Recommender {
    pub fn new(store: Arc<dyn VectorStore>, index: Arc<dyn SimilarityIndex>, config: RecommendConfig) -> Self {
        Self { store, index, config }
    }

    /// Up to `k` articles most similar to `article_id`, excluding the article itself.
    ///
    /// Fails with `NotFound` for unknown ids and `NotEmbedded` for articles
    /// stored without a vector. Neighbours deleted between the index query
    /// and the lookup are skipped.
    pub async fn recommend(&self, article_id: &str, k: Option<usize>) -> Result<Vec<ScoredArticle>> {
        let k = k.unwrap_or(self.config.default_k);
        let record = self.store.get(article_id).await?;
        let vector = record
            .embedding
            .as_deref()
            .ok_or_else(|| Error::NotEmbedded(article_id.to_string()))?;

        let exclude: HashSet<String> = [article_id.to_string()].into_iter().collect();
        let neighbors = self.index.query(vector, k, &exclude).await?;

        let mut results = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            match self.store.get(neighbor.record.id()).await {
                Ok(current) => results.push(ScoredArticle {
                    article: current.article.clone(),
                    score: neighbor.score,
                }),
                Err(Error::NotFound(id)) => {
                    debug!("Dropping recommendation for vanished article {}", id);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(results)
    }
}
