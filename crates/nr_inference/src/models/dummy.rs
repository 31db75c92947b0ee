use std::fmt;
use nr_core::{EmbeddingProvider, Error, Prompt, Result, TextGenerator};

pub const DUMMY_DIMENSION: usize = 768;

/// Offline embedder: hashes lowercase words into a fixed number of buckets.
///
/// Texts sharing vocabulary end up with high cosine similarity, which is
/// enough to exercise recommendation and clustering without a provider.
pub struct DummyEmbedder {
    dimension: usize,
}

impl fmt::Debug for DummyEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DummyEmbedder")
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl DummyEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(2),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0; self.dimension];
        // Text length as a feature
        embedding[0] = text.len() as f32 / 1000.0;
        for word in text.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.len() < 3 {
                continue;
            }
            let bucket = 1 + (fnv1a(word.as_bytes()) % (self.dimension as u64 - 1)) as usize;
            embedding[bucket] += 1.0;
        }
        embedding
    }
}

impl Default for DummyEmbedder {
    fn default() -> Self {
        Self::new(DUMMY_DIMENSION)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

#[async_trait::async_trait]
impl EmbeddingProvider for DummyEmbedder {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[derive(Debug, Clone)]
pub enum DummyReply {
    /// Derive a reply from the prompt text.
    Echo,
    Fixed(String),
    Fail,
}

/// Deterministic stand-in for a text-generation provider.
#[derive(Debug, Clone)]
pub struct DummyGenerator {
    reply: DummyReply,
}

impl DummyGenerator {
    pub fn new() -> Self {
        Self {
            reply: DummyReply::Echo,
        }
    }

    pub fn fixed(reply: impl Into<String>) -> Self {
        Self {
            reply: DummyReply::Fixed(reply.into()),
        }
    }

    /// A generator whose every call fails, as an unreachable provider would.
    pub fn failing() -> Self {
        Self {
            reply: DummyReply::Fail,
        }
    }

    fn echo(prompt: &Prompt) -> String {
        // Take first 20 words and join them
        let words: Vec<&str> = prompt.user.split_whitespace().take(20).collect();
        let summary = words.join(" ");
        if !prompt.user.contains("JSON") {
            return summary;
        }
        let name = prompt
            .user
            .lines()
            .filter_map(|l| l.trim().strip_prefix("- "))
            .flat_map(str::split_whitespace)
            .filter(|w| w.len() > 3)
            .take(3)
            .collect::<Vec<_>>()
            .join(" ");
        serde_json::json!({
            "name": if name.is_empty() { "General News".to_string() } else { name },
            "summary": summary,
            "topics": ["general"],
            "key_takeaways": [summary],
            "sentiment": "neutral",
        })
        .to_string()
    }
}

impl Default for DummyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextGenerator for DummyGenerator {
    fn name(&self) -> &str {
        "Dummy"
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        match &self.reply {
            DummyReply::Echo => Ok(Self::echo(prompt)),
            DummyReply::Fixed(reply) => Ok(reply.clone()),
            DummyReply::Fail => Err(Error::Provider("dummy provider is unavailable".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nr_core::cosine_similarity;

    #[tokio::test]
    async fn test_dummy_embedder() {
        let model = DummyEmbedder::default();
        let texts = vec![
            "Apple unveils new iPhone camera".to_string(),
            "Apple iPhone camera review".to_string(),
            "Senate passes farm subsidy bill".to_string(),
        ];
        let vectors = model.embed(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors.iter().all(|v| v.len() == DUMMY_DIMENSION));
        assert!(vectors[0][0] > 0.0); // Text length feature should be non-zero

        let related = cosine_similarity(&vectors[0], &vectors[1]);
        let unrelated = cosine_similarity(&vectors[0], &vectors[2]);
        assert!(related > unrelated);

        let again = model.embed(&texts[..1]).await.unwrap();
        assert_eq!(again[0], vectors[0]);
    }

    #[tokio::test]
    async fn test_dummy_generator_modes() {
        let prompt = Prompt::new("system", "Name this cluster as JSON:\n- Rocket launch delayed\n- Rocket engines tested");
        let echo = DummyGenerator::new().generate(&prompt).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&echo).unwrap();
        assert_eq!(value["name"], "Rocket launch delayed");

        let plain = DummyGenerator::new()
            .generate(&Prompt::new("s", "one two three"))
            .await
            .unwrap();
        assert_eq!(plain, "one two three");

        let fixed = DummyGenerator::fixed("hello").generate(&prompt).await.unwrap();
        assert_eq!(fixed, "hello");

        assert!(DummyGenerator::failing().generate(&prompt).await.is_err());
    }
}
