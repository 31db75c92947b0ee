use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use nr_core::{Article, EmbeddingProvider, Error, Result};

/// Outcome of embedding one batch of articles.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Ids of the articles in this batch, in input order.
    pub ids: Vec<String>,
    pub result: Result<Vec<Vec<f32>>>,
}

pub struct EmbeddingGenerator {
    model: Arc<dyn EmbeddingProvider>,
    batch_size: usize,
    concurrency: usize,
}

impl EmbeddingGenerator {
    pub fn new(model: Arc<dyn EmbeddingProvider>, batch_size: usize, concurrency: usize) -> Self {
        Self {
            model,
            batch_size: batch_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    /// Embeds `title + content` of every article, one provider call per batch.
    ///
    /// Batches are independent: one failing batch does not affect the others.
    pub async fn generate_article_embeddings(&self, articles: &[Article]) -> Vec<BatchOutcome> {
        let batches: Vec<(Vec<String>, Vec<String>)> = articles
            .chunks(self.batch_size)
            .map(|chunk| {
                (
                    chunk.iter().map(|a| a.id.clone()).collect(),
                    chunk.iter().map(Article::embedding_text).collect(),
                )
            })
            .collect();

        stream::iter(batches)
            .map(|(ids, texts)| async move {
                let result = self.embed_checked(&texts).await;
                BatchOutcome { ids, result }
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn embed_checked(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.model.embed(texts).await?;
        if vectors.len() != texts.len() {
            return Err(Error::Provider(format!(
                "{} returned {} embeddings for {} inputs",
                self.model.name(),
                vectors.len(),
                texts.len()
            )));
        }
        Ok(vectors)
    }
}
