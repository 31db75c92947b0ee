pub mod backends;
pub mod index;
pub mod recommend;

pub use backends::*;
pub use index::{FlatIndex, Neighbor, SimilarityIndex};
pub use recommend::Recommender;

use nr_core::config::StorageConfig;
use nr_core::Result;
use std::sync::Arc;

/// Open the configured store, loading its snapshot file when present.
pub async fn create_storage(config: &StorageConfig) -> Result<Arc<MemoryStorage>> {
    let storage = MemoryStorage::open(config.clone()).await?;
    tracing::info!(
        "🏦 Storage initialized ({})",
        storage
            .snapshot_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "in-memory".to_string())
    );
    Ok(Arc::new(storage))
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{FlatIndex, Recommender, SimilarityIndex};
}
