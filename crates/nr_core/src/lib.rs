pub mod config;
pub mod error;
pub mod models;
pub mod similarity;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use models::{EmbeddingProvider, TextGenerator};
pub use similarity::cosine_similarity;
pub use storage::VectorStore;
pub use types::*;
