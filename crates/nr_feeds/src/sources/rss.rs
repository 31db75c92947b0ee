use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use nr_core::config::FeedConfig;
use nr_core::{Article, Error, Result};
use reqwest::Client;
use url::Url;

use super::FeedSource;
use crate::process::{article_id, extract_main_content, extractive_summary, reading_time_minutes, strip_html};

/// RSS or Atom feed fetched over HTTP.
pub struct RssFeed {
    url: String,
    client: Client,
    config: FeedConfig,
}

impl RssFeed {
    pub fn new(url: impl Into<String>, client: Client, config: FeedConfig) -> Self {
        Self {
            url: url.into(),
            client,
            config,
        }
    }

    async fn fetch_full_content(&self, link: &str) -> Option<String> {
        let response = match self.client.get(link).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(link, error = %e, "Failed to fetch full content");
                return None;
            }
        };
        if !response.status().is_success() {
            tracing::warn!(link, status = %response.status(), "Failed to fetch full content");
            return None;
        }
        match response.text().await {
            Ok(html) => extract_main_content(&html),
            Err(e) => {
                tracing::warn!(link, error = %e, "Failed to read page body");
                None
            }
        }
    }
}

#[async_trait]
impl FeedSource for RssFeed {
    fn name(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<Article>> {
        tracing::info!("📡 Fetching feed {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::Feed(format!("{}: {e}", self.url)))?;
        if !response.status().is_success() {
            return Err(Error::Feed(format!("{} returned {}", self.url, response.status())));
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Feed(format!("{}: {e}", self.url)))?;

        let entries = parse_feed(&body, &self.url)?;
        let mut articles = Vec::with_capacity(entries.len());
        for (i, mut article) in entries.into_iter().enumerate() {
            let needs_page = self.config.fetch_full_content
                && !article.link.is_empty()
                && article.content.chars().count() < self.config.min_content_length;
            if needs_page {
                if i > 0 && self.config.politeness_delay > Duration::ZERO {
                    tokio::time::sleep(self.config.politeness_delay).await;
                }
                article.full_content = self.fetch_full_content(&article.link).await;
            }
            finish_article(&mut article);
            articles.push(article);
        }
        tracing::info!("📰 {} articles from {}", articles.len(), self.url);
        Ok(articles)
    }
}

/// Maps a feed document to articles. Entries without a title are skipped.
pub fn parse_feed(body: &[u8], feed_url: &str) -> Result<Vec<Article>> {
    let feed = feed_rs::parser::parse(body)
        .map_err(|e| Error::Feed(format!("failed to parse {feed_url}: {e}")))?;
    let domain = Url::parse(feed_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string));
    let fetched_at = Utc::now();

    let articles = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = entry.title.map(|t| strip_html(&t.content))?;
            if title.is_empty() {
                return None;
            }
            let published_at = entry.published.or(entry.updated);
            let published = published_at.map(|p| p.to_rfc3339()).unwrap_or_default();
            let raw = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            Some(Article {
                id: article_id(&title, &published),
                title,
                content: strip_html(&raw),
                summary: None,
                full_content: None,
                published_at,
                link: entry.links.first().map(|l| l.href.clone()).unwrap_or_default(),
                source: feed_url.to_string(),
                domain: domain.clone(),
                categories: entry
                    .categories
                    .into_iter()
                    .map(|c| c.term.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
                reading_time_minutes: 1,
                fetched_at,
            })
        })
        .collect();
    Ok(articles)
}

/// Fills summary and reading time from the best text available.
fn finish_article(article: &mut Article) {
    let summary = match &article.full_content {
        Some(full) => extractive_summary(full),
        None => article.content.clone(),
    };
    article.summary = Some(summary).filter(|s| !s.is_empty());
    let text = article.full_content.as_deref().unwrap_or(&article.content);
    article.reading_time_minutes = reading_time_minutes(text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example Tech</title>
    <link>https://news.example.com</link>
    <item>
      <title>Chipmaker unveils new GPU</title>
      <link>{base}/posts/gpu</link>
      <description>&lt;p&gt;The new &lt;b&gt;GPU&lt;/b&gt; is fast.&lt;/p&gt;</description>
      <pubDate>Mon, 01 Jan 2024 10:00:00 +0000</pubDate>
      <category>Hardware</category>
      <category>AI</category>
    </item>
    <item>
      <title>Startup raises funding</title>
      <link>{base}/posts/funding</link>
      <description>Series B round.</description>
    </item>
    <item>
      <description>No title, skipped.</description>
    </item>
  </channel>
</rss>"#;

    fn config() -> FeedConfig {
        FeedConfig {
            politeness_delay: Duration::ZERO,
            ..FeedConfig::default()
        }
    }

    #[test]
    fn test_parse_feed() {
        let xml = RSS.replace("{base}", "https://news.example.com");
        let articles = parse_feed(xml.as_bytes(), "https://news.example.com/feed.xml").unwrap();
        assert_eq!(articles.len(), 2);

        let gpu = &articles[0];
        assert_eq!(gpu.title, "Chipmaker unveils new GPU");
        assert_eq!(gpu.content, "The new GPU is fast.");
        assert_eq!(gpu.link, "https://news.example.com/posts/gpu");
        assert_eq!(gpu.categories, vec!["Hardware", "AI"]);
        assert_eq!(gpu.domain.as_deref(), Some("news.example.com"));
        assert_eq!(gpu.source, "https://news.example.com/feed.xml");
        assert!(gpu.published_at.is_some());
        assert!(articles[1].published_at.is_none());

        let again = parse_feed(xml.as_bytes(), "https://news.example.com/feed.xml").unwrap();
        assert_eq!(again[0].id, gpu.id);
        assert_ne!(articles[1].id, gpu.id);
    }

    #[test]
    fn test_parse_atom() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Example</title>
  <id>urn:example</id>
  <updated>2024-02-01T00:00:00Z</updated>
  <entry>
    <title>Atom entry</title>
    <id>urn:example:1</id>
    <link href="https://atom.example.org/1"/>
    <updated>2024-02-01T00:00:00Z</updated>
    <summary>Short atom summary.</summary>
    <category term="Science"/>
  </entry>
</feed>"#;
        let articles = parse_feed(atom.as_bytes(), "https://atom.example.org/feed").unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].link, "https://atom.example.org/1");
        assert_eq!(articles[0].categories, vec!["Science"]);
        assert!(articles[0].published_at.is_some());
    }

    #[test]
    fn test_parse_garbage() {
        let err = parse_feed(b"not a feed", "https://x.example/rss").unwrap_err();
        assert!(matches!(err, Error::Feed(_)));
    }

    #[tokio::test]
    async fn test_fetch_with_full_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS.replace("{base}", &server.uri())))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts/gpu"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><body><nav>Home</nav><article><p>The GPU doubles throughput.</p>\
                 <p>It ships in March.</p></article></body></html>",
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/posts/funding"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let feed = RssFeed::new(format!("{}/rss", server.uri()), Client::new(), config());
        let articles = feed.fetch().await.unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(
            articles[0].full_content.as_deref(),
            Some("The GPU doubles throughput. It ships in March.")
        );
        assert_eq!(articles[0].summary, articles[0].full_content);
        assert!(articles[1].full_content.is_none());
        assert_eq!(articles[1].summary.as_deref(), Some("Series B round."));
        assert_eq!(articles[1].reading_time_minutes, 1);
    }

    #[tokio::test]
    async fn test_fetch_without_full_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string(RSS.replace("{base}", &server.uri())))
            .mount(&server)
            .await;

        let config = FeedConfig {
            fetch_full_content: false,
            ..config()
        };
        let feed = RssFeed::new(format!("{}/rss", server.uri()), Client::new(), config);
        let articles = feed.fetch().await.unwrap();
        assert!(articles.iter().all(|a| a.full_content.is_none()));
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let feed = RssFeed::new(format!("{}/rss", server.uri()), Client::new(), config());
        assert!(matches!(feed.fetch().await, Err(Error::Feed(_))));
    }
}
