use async_trait::async_trait;
use std::fmt;

use crate::types::Prompt;
use crate::Result;

/// Maps texts to fixed-length vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Maps a prompt to generated text.
#[async_trait]
pub trait TextGenerator: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &Prompt) -> Result<String>;
}
