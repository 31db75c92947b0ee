use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, Result};

pub const DEFAULT_FEEDS: &[&str] = &[
    "https://feeds.feedburner.com/TechCrunch/",
    "https://www.wired.com/feed/rss",
    "https://www.theverge.com/rss/index.xml",
];

/// Process-wide settings. Built once at startup and handed to constructors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub feeds: FeedConfig,
    pub embedding: ProviderConfig,
    pub generation: ProviderConfig,
    pub retry: RetryConfig,
    pub clustering: ClusterConfig,
    pub recommend: RecommendConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub urls: Vec<String>,
    /// Fetch the linked page when the feed body is shorter than `min_content_length`.
    pub fetch_full_content: bool,
    pub min_content_length: usize,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Pause between full-content page fetches on the same feed.
    pub politeness_delay: Duration,
    pub embed_batch_size: usize,
    pub concurrency: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            urls: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            fetch_full_content: true,
            min_content_length: 500,
            request_timeout: Duration::from_secs(10),
            user_agent: concat!("nr/", env!("CARGO_PKG_VERSION")).to_string(),
            politeness_delay: Duration::from_secs(1),
            embed_batch_size: 64,
            concurrency: 10,
        }
    }
}

#[derive(Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn cohere_embeddings() -> Self {
        Self {
            base_url: "https://api.cohere.ai/v1".to_string(),
            model: "embed-english-v3.0".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn groq_chat() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self::groq_chat()
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Upper bound for the adaptive cluster count.
    pub max_clusters: usize,
    /// Use exactly this many clusters (capped by corpus size) instead of the adaptive rule.
    pub fixed_clusters: Option<usize>,
    pub max_iterations: usize,
    /// Stop once no centroid moves by more than this (1 - cosine).
    pub tolerance: f32,
    /// Members per cluster shown to the text generator when naming it.
    pub representatives: usize,
    pub trend_top_categories: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_clusters: 5,
            fixed_clusters: None,
            max_iterations: 100,
            tolerance: 1e-4,
            representatives: 5,
            trend_top_categories: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecommendConfig {
    pub default_k: usize,
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self { default_k: 5 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// Pre-established embedding dimensionality. `None` lets the first insert decide.
    pub dimension: Option<usize>,
    /// JSON snapshot file; in-memory only when unset.
    pub snapshot_path: Option<PathBuf>,
}

impl Config {
    /// Defaults overlaid with process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `get`, keyed by environment variable name.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config {
            embedding: ProviderConfig::cohere_embeddings(),
            generation: ProviderConfig::groq_chat(),
            ..Config::default()
        };

        if let Some(feeds) = get("NR_FEEDS") {
            config.feeds.urls = feeds
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(v) = get("NR_FETCH_FULL_CONTENT") {
            config.feeds.fetch_full_content = parse("NR_FETCH_FULL_CONTENT", &v)?;
        }

        if let Some(v) = get("NR_EMBEDDING_URL") {
            config.embedding.base_url = v;
        }
        if let Some(v) = get("NR_EMBEDDING_MODEL") {
            config.embedding.model = v;
        }
        config.embedding.api_key = get("NR_EMBEDDING_API_KEY").or_else(|| get("COHERE_API_KEY"));

        if let Some(v) = get("NR_GENERATION_URL") {
            config.generation.base_url = v;
        }
        if let Some(v) = get("NR_GENERATION_MODEL") {
            config.generation.model = v;
        }
        config.generation.api_key = get("NR_GENERATION_API_KEY").or_else(|| get("GROQ_API_KEY"));
        if let Some(v) = get("NR_PROVIDER_TIMEOUT_SECS") {
            let secs: u64 = parse("NR_PROVIDER_TIMEOUT_SECS", &v)?;
            config.embedding.timeout = Duration::from_secs(secs);
            config.generation.timeout = Duration::from_secs(secs);
        }

        if let Some(v) = get("NR_MAX_RETRIES") {
            config.retry.max_retries = parse("NR_MAX_RETRIES", &v)?;
        }
        if let Some(v) = get("NR_MAX_CLUSTERS") {
            config.clustering.max_clusters = parse("NR_MAX_CLUSTERS", &v)?;
        }
        if let Some(v) = get("NR_CLUSTER_COUNT") {
            config.clustering.fixed_clusters = Some(parse("NR_CLUSTER_COUNT", &v)?);
        }
        if let Some(v) = get("NR_VECTOR_DIMENSION") {
            config.storage.dimension = Some(parse("NR_VECTOR_DIMENSION", &v)?);
        }
        if let Some(v) = get("NR_STORE_PATH") {
            config.storage.snapshot_path = Some(PathBuf::from(v));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.clustering.max_clusters == 0 {
            return Err(Error::Config("max_clusters must be > 0".to_string()));
        }
        if self.clustering.fixed_clusters == Some(0) {
            return Err(Error::Config("cluster count must be > 0".to_string()));
        }
        if self.clustering.max_iterations == 0 {
            return Err(Error::Config("max_iterations must be > 0".to_string()));
        }
        if !(self.clustering.tolerance.is_finite() && self.clustering.tolerance > 0.0) {
            return Err(Error::Config("tolerance must be a finite positive number".to_string()));
        }
        if self.storage.dimension == Some(0) {
            return Err(Error::Config("vector dimension must be > 0".to_string()));
        }
        if self.feeds.embed_batch_size == 0 || self.feeds.concurrency == 0 {
            return Err(Error::Config("batch size and concurrency must be > 0".to_string()));
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {key}: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.feeds.urls.len(), 3);
        assert_eq!(config.embedding.model, "embed-english-v3.0");
        assert_eq!(config.generation.model, "llama-3.3-70b-versatile");
        assert_eq!(config.generation.timeout, Duration::from_secs(60));
        assert_eq!(config.clustering.max_clusters, 5);
        assert_eq!(config.recommend.default_k, 5);
        assert!(config.storage.dimension.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("NR_FEEDS", "https://a.example/rss, https://b.example/atom,"),
            ("COHERE_API_KEY", "co-key"),
            ("GROQ_API_KEY", "gq-key"),
            ("NR_CLUSTER_COUNT", "4"),
            ("NR_VECTOR_DIMENSION", "1024"),
        ]))
        .unwrap();
        assert_eq!(config.feeds.urls, vec!["https://a.example/rss", "https://b.example/atom"]);
        assert_eq!(config.embedding.api_key.as_deref(), Some("co-key"));
        assert_eq!(config.generation.api_key.as_deref(), Some("gq-key"));
        assert_eq!(config.clustering.fixed_clusters, Some(4));
        assert_eq!(config.storage.dimension, Some(1024));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[("NR_MAX_RETRIES", "lots")])).unwrap_err();
        assert!(err.to_string().contains("NR_MAX_RETRIES"));
        assert!(Config::from_lookup(lookup(&[("NR_CLUSTER_COUNT", "0")])).is_err());
    }

    #[test]
    fn test_api_key_redacted() {
        let mut provider = ProviderConfig::groq_chat();
        provider.api_key = Some("secret".to_string());
        let debug = format!("{provider:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("<redacted>"));
    }
}
