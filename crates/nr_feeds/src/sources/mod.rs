use async_trait::async_trait;
use nr_core::{Article, Result};

pub mod rss;

pub use rss::RssFeed;

/// A place articles come from.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Identifier used in logs and ingest reports, usually the feed URL.
    fn name(&self) -> &str;

    /// Fetch and process the current entries of this source.
    async fn fetch(&self) -> Result<Vec<Article>>;
}
