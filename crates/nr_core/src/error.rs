use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Article not found: {0}")]
    NotFound(String),

    #[error("Article has no embedding: {0}")]
    NotEmbedded(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A vector carries NaN or infinite components.
    #[error("Invalid vector for {0}: non-finite component")]
    InvalidVector(String),

    #[error("Similarity index is empty")]
    EmptyIndex,

    #[error("Provider {provider} timed out after {after:?}")]
    ProviderTimeout { provider: String, after: Duration },

    #[error("Provider error: {0}")]
    Provider(String),

    /// The provider refused the request (bad credentials, invalid input). Not retried.
    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

/// Stable, serializable classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    NotEmbedded,
    DimensionMismatch,
    EmptyIndex,
    ProviderTimeout,
    ProviderError,
    FeedError,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::NotEmbedded(_) => ErrorKind::NotEmbedded,
            Error::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            Error::EmptyIndex => ErrorKind::EmptyIndex,
            Error::ProviderTimeout { .. } => ErrorKind::ProviderTimeout,
            Error::Provider(_) | Error::ProviderRejected(_) => ErrorKind::ProviderError,
            Error::Feed(_) => ErrorKind::FeedError,
            Error::InvalidVector(_)
            | Error::Config(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::Http(_)
            | Error::External(_) => ErrorKind::Internal,
        }
    }

    /// Whether a provider call that failed with this error is worth repeating.
    ///
    /// Timeouts, transport failures, 5xx/429 replies and malformed generated
    /// output are retried. Rejections and store/index errors are not.
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::ProviderTimeout { .. } | Error::Provider(_) => true,
            Error::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().map_or(true, |s| s.is_server_error() || s.as_u16() == 429)
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::NotFound("a".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::NotEmbedded("a".into()).kind(), ErrorKind::NotEmbedded);
        assert_eq!(Error::EmptyIndex.kind(), ErrorKind::EmptyIndex);
        assert_eq!(
            Error::DimensionMismatch { expected: 2, actual: 3 }.kind(),
            ErrorKind::DimensionMismatch
        );
        assert_eq!(Error::InvalidVector("a".into()).kind(), ErrorKind::Internal);
        assert_eq!(
            Error::ProviderRejected("401".into()).kind(),
            ErrorKind::ProviderError
        );
    }

    #[test]
    fn test_retriable() {
        assert!(Error::Provider("bad gateway".into()).is_retriable());
        assert!(Error::ProviderTimeout {
            provider: "groq".into(),
            after: Duration::from_secs(1)
        }
        .is_retriable());
        assert!(!Error::ProviderRejected("unauthorized".into()).is_retriable());
        assert!(!Error::NotFound("x".into()).is_retriable());
        assert!(!Error::EmptyIndex.is_retriable());
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::NotEmbedded).unwrap();
        assert_eq!(json, "\"not_embedded\"");
    }

    #[test]
    fn test_messages() {
        let err = Error::DimensionMismatch { expected: 1024, actual: 3 };
        assert_eq!(err.to_string(), "Dimension mismatch: expected 1024, got 3");
    }
}
