use std::sync::Arc;

use nr_core::{Config, EmbeddingProvider, Result, TextGenerator, VectorStore};
use nr_feeds::IngestManager;
use nr_inference::ArticleAnalyzer;
use nr_storage::{FlatIndex, MemoryStorage, Recommender};
use nr_topics::{ClusterEngine, TrendAggregator};

/// Shared services behind every route.
pub struct AppState {
    pub storage: Arc<MemoryStorage>,
    pub ingest: IngestManager,
    pub recommender: Recommender,
    pub analyzer: ArticleAnalyzer,
    pub clusters: Arc<ClusterEngine>,
    pub trends: TrendAggregator,
}

impl AppState {
    pub fn new(
        config: &Config,
        storage: Arc<MemoryStorage>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        let store: Arc<dyn VectorStore> = storage.clone();
        let index = Arc::new(FlatIndex::new(store.clone()));
        let clusters = Arc::new(ClusterEngine::new(
            store.clone(),
            generator.clone(),
            config.clustering.clone(),
        ));
        Ok(Self {
            ingest: IngestManager::from_config(&config.feeds, store.clone(), embedder)?,
            recommender: Recommender::new(store.clone(), index, config.recommend.clone()),
            analyzer: ArticleAnalyzer::new(store, generator.clone()),
            trends: TrendAggregator::new(clusters.clone(), generator, &config.clustering),
            clusters,
            storage,
        })
    }
}
