use std::str::FromStr;
use std::sync::Arc;

use nr_core::config::{ProviderConfig, RetryConfig};
use nr_core::{EmbeddingProvider, Error, Result, TextGenerator};
use reqwest::{Client, Response};

use crate::retry::{RetryPolicy, RetryingEmbedder, RetryingGenerator};

pub mod cohere;
pub mod dummy;
pub mod openai;

pub use cohere::CohereEmbeddings;
pub use dummy::{DummyEmbedder, DummyGenerator};
pub use openai::{OpenAiChatModel, OpenAiEmbeddings};

/// Provider backends selectable at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Any OpenAI-compatible API (OpenAI, Groq, DeepSeek).
    OpenAi,
    Cohere,
    Dummy,
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" | "groq" => Ok(ModelKind::OpenAi),
            "cohere" => Ok(ModelKind::Cohere),
            "dummy" => Ok(ModelKind::Dummy),
            other => Err(Error::Config(format!("unknown model kind: {other}"))),
        }
    }
}

/// Builds an embedding provider wrapped in the retry policy.
pub fn create_embedder(
    kind: ModelKind,
    config: &ProviderConfig,
    retry: &RetryConfig,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let inner: Arc<dyn EmbeddingProvider> = match kind {
        ModelKind::Cohere => Arc::new(CohereEmbeddings::new(config.clone())?),
        ModelKind::OpenAi => Arc::new(OpenAiEmbeddings::new(config.clone())?),
        ModelKind::Dummy => Arc::new(DummyEmbedder::default()),
    };
    tracing::info!("🧠 Embedding provider: {}", inner.name());
    Ok(Arc::new(RetryingEmbedder::new(
        inner,
        RetryPolicy::new(retry, config.timeout),
    )))
}

/// Builds a text generator wrapped in the retry policy.
pub fn create_generator(
    kind: ModelKind,
    config: &ProviderConfig,
    retry: &RetryConfig,
) -> Result<Arc<dyn TextGenerator>> {
    let inner: Arc<dyn TextGenerator> = match kind {
        ModelKind::OpenAi => Arc::new(OpenAiChatModel::new(config.clone())?),
        ModelKind::Dummy => Arc::new(DummyGenerator::new()),
        ModelKind::Cohere => {
            return Err(Error::Config(
                "cohere is only supported as an embedding provider".to_string(),
            ))
        }
    };
    tracing::info!("💬 Text generator: {}", inner.name());
    Ok(Arc::new(RetryingGenerator::new(
        inner,
        RetryPolicy::new(retry, config.timeout),
    )))
}

pub(crate) fn build_client(config: &ProviderConfig) -> Result<Client> {
    Ok(Client::builder().timeout(config.timeout).build()?)
}

pub(crate) fn transport_error(provider: &str, config: &ProviderConfig, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::ProviderTimeout {
            provider: provider.to_string(),
            after: config.timeout,
        }
    } else {
        Error::Provider(format!("{provider} request failed: {err}"))
    }
}

/// Maps a non-success status to an error: 4xx (other than 408/429) is a
/// rejection, anything else is transient.
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let body: String = body.chars().take(200).collect();
    let message = format!("{provider} returned {status}: {body}");
    if status.is_client_error() && status.as_u16() != 408 && status.as_u16() != 429 {
        Err(Error::ProviderRejected(message))
    } else {
        Err(Error::Provider(message))
    }
}

pub(crate) fn validate_embeddings(
    provider: &str,
    expected: usize,
    embeddings: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>> {
    if embeddings.len() != expected {
        return Err(Error::Provider(format!(
            "{provider} returned {} embeddings for {expected} inputs",
            embeddings.len()
        )));
    }
    if let Some(first) = embeddings.first() {
        let dim = first.len();
        if dim == 0 || embeddings.iter().any(|e| e.len() != dim) {
            return Err(Error::Provider(format!(
                "{provider} returned embeddings of inconsistent dimension"
            )));
        }
    }
    if embeddings.iter().flatten().any(|x| !x.is_finite()) {
        return Err(Error::Provider(format!(
            "{provider} returned non-finite embedding values"
        )));
    }
    Ok(embeddings)
}
