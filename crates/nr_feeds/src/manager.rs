use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;
use nr_core::config::FeedConfig;
use nr_core::{Article, EmbeddingProvider, Error, Result, VectorStore};
use nr_inference::EmbeddingGenerator;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::sources::{FeedSource, RssFeed};

/// Summary of one ingest pass.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub articles: Vec<Article>,
    /// Distinct articles fetched across all sources.
    pub fetched: usize,
    /// Articles stored together with an embedding in this pass.
    pub embedded: usize,
    pub failed_feeds: Vec<String>,
}

/// Pulls every configured source into the vector store.
pub struct IngestManager {
    sources: Vec<Box<dyn FeedSource>>,
    store: Arc<dyn VectorStore>,
    embeddings: EmbeddingGenerator,
}

impl IngestManager {
    pub fn new(
        sources: Vec<Box<dyn FeedSource>>,
        store: Arc<dyn VectorStore>,
        embeddings: EmbeddingGenerator,
    ) -> Self {
        Self {
            sources,
            store,
            embeddings,
        }
    }

    /// One [`RssFeed`] per configured URL sharing a single HTTP client.
    pub fn from_config(
        config: &FeedConfig,
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        let sources: Vec<Box<dyn FeedSource>> = config
            .urls
            .iter()
            .map(|url| Box::new(RssFeed::new(url.clone(), client.clone(), config.clone())) as Box<dyn FeedSource>)
            .collect();
        let embeddings = EmbeddingGenerator::new(embedder, config.embed_batch_size, config.concurrency);
        Ok(Self::new(sources, store, embeddings))
    }

    /// Fetches all sources, stores the articles and embeds them.
    ///
    /// Failing sources are skipped and listed in the report. A batch whose
    /// embedding fails leaves its articles stored without a vector.
    pub async fn ingest(&self) -> Result<IngestReport> {
        info!("🔄 Ingesting {} feeds", self.sources.len());
        let results = join_all(self.sources.iter().map(|source| async move {
            (source.name().to_string(), source.fetch().await)
        }))
        .await;

        let mut failed_feeds = Vec::new();
        let mut seen = HashSet::new();
        let mut articles = Vec::new();
        for (name, result) in results {
            match result {
                Ok(fetched) => {
                    for article in fetched {
                        if seen.insert(article.id.clone()) {
                            articles.push(article);
                        }
                    }
                }
                Err(e) => {
                    warn!(feed = %name, error = %e, "Skipping feed");
                    failed_feeds.push(name);
                }
            }
        }

        for article in &articles {
            self.store.put_article(article.clone()).await?;
        }
        info!("💾 Stored {} articles", articles.len());

        let embedded = self.embed(&articles).await?;
        info!(
            "✅ Ingest complete: {} articles, {} embedded, {} feeds failed",
            articles.len(),
            embedded,
            failed_feeds.len()
        );
        Ok(IngestReport {
            fetched: articles.len(),
            embedded,
            failed_feeds,
            articles,
        })
    }

    async fn embed(&self, articles: &[Article]) -> Result<usize> {
        if articles.is_empty() {
            return Ok(0);
        }
        info!("🔢 Generating embeddings for {} articles", articles.len());
        let by_id: HashMap<&str, &Article> = articles.iter().map(|a| (a.id.as_str(), a)).collect();
        let mut embedded = 0;

        for outcome in self.embeddings.generate_article_embeddings(articles).await {
            let vectors = match outcome.result {
                Ok(vectors) => vectors,
                Err(e) => {
                    warn!(articles = outcome.ids.len(), error = %e, "Embedding batch failed, articles stay unembedded");
                    continue;
                }
            };
            for (id, vector) in outcome.ids.iter().zip(vectors) {
                let Some(article) = by_id.get(id.as_str()) else {
                    continue;
                };
                match self.store.put(id, vector, (*article).clone()).await {
                    Ok(()) => embedded += 1,
                    Err(e @ Error::DimensionMismatch { .. }) => {
                        warn!(article = %id, error = %e, "Embedding rejected by store");
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(embedded)
    }
}
