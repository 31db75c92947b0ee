//! Provider adapters and the operations built directly on them.

pub mod analysis;
pub mod embeddings;
pub mod models;
pub mod reply;
pub mod retry;

pub use analysis::ArticleAnalyzer;
pub use embeddings::{BatchOutcome, EmbeddingGenerator};
pub use models::{create_embedder, create_generator, ModelKind};
pub use retry::{retry_with_backoff, RetryPolicy, RetryingEmbedder, RetryingGenerator};

pub mod prelude {
    pub use super::models::{create_embedder, create_generator, DummyEmbedder, DummyGenerator, ModelKind};
    pub use super::{ArticleAnalyzer, EmbeddingGenerator};
    pub use nr_core::{EmbeddingProvider, Error, Result, TextGenerator};
}
