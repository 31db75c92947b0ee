//! Topic clustering and trend reporting over the embedded corpus.

pub mod engine;
pub mod kmeans;
pub mod trends;

pub use engine::ClusterEngine;
pub use trends::TrendAggregator;

pub mod prelude {
    pub use super::{ClusterEngine, TrendAggregator};
    pub use nr_core::{Clustering, TopicCluster, TrendEntry, TrendReport};
}
