use std::fmt;
use std::sync::Arc;

use nr_core::{ArticleAnalysis, Error, Prompt, Result, Sentiment, TextGenerator, VectorStore};
use serde::Deserialize;

use crate::reply::extract_json;

const MAX_CONTENT_CHARS: usize = 6000;

const SYSTEM_PROMPT: &str = "You are a news analyst providing structured analysis of articles.";

#[derive(Deserialize)]
struct AnalysisReply {
    summary: String,
    #[serde(default, alias = "main_topics")]
    topics: Vec<String>,
    #[serde(default)]
    key_takeaways: Vec<String>,
    sentiment: String,
}

/// Produces a structured [`ArticleAnalysis`] for a stored article.
pub struct ArticleAnalyzer {
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn TextGenerator>,
}

impl fmt::Debug for ArticleAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleAnalyzer")
            .field("generator", &self.generator.name())
            .finish()
    }
}

impl ArticleAnalyzer {
    pub fn new(store: Arc<dyn VectorStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    pub async fn analyze(&self, article_id: &str) -> Result<ArticleAnalysis> {
        let record = self.store.get(article_id).await?;
        let article = &record.article;
        let body = article.full_content.as_deref().unwrap_or(&article.content);
        let body: String = body.chars().take(MAX_CONTENT_CHARS).collect();

        let prompt = Prompt::new(
            SYSTEM_PROMPT,
            format!(
                "Analyze this news article and provide key insights:\n\n\
                 Title: {}\nContent: {}\n\n\
                 Respond with a JSON object with these fields:\n\
                 - \"summary\": a brief summary (2-3 sentences)\n\
                 - \"topics\": list of main topics/themes\n\
                 - \"key_takeaways\": list of key takeaways\n\
                 - \"sentiment\": one of \"positive\", \"negative\", \"neutral\", \"mixed\"\n\n\
                 Format the response as JSON only.",
                article.title, body
            ),
        );

        tracing::info!("🔎 Analyzing article {}", article_id);
        let raw = self.generator.generate(&prompt).await?;
        let reply: AnalysisReply = extract_json(self.generator.name(), &raw)?;
        let sentiment = parse_sentiment(self.generator.name(), &reply.sentiment)?;

        Ok(ArticleAnalysis {
            article_id: article.id.clone(),
            summary: reply.summary.trim().to_string(),
            topics: reply.topics,
            key_takeaways: reply.key_takeaways,
            sentiment,
        })
    }
}

fn parse_sentiment(provider: &str, label: &str) -> Result<Sentiment> {
    match label.trim().to_ascii_lowercase().as_str() {
        "positive" => Ok(Sentiment::Positive),
        "negative" => Ok(Sentiment::Negative),
        "neutral" => Ok(Sentiment::Neutral),
        "mixed" => Ok(Sentiment::Mixed),
        other => Err(Error::Provider(format!(
            "{provider} returned an unknown sentiment label: {other:?}"
        ))),
    }
}
