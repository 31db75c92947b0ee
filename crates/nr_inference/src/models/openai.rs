use async_trait::async_trait;
use nr_core::config::ProviderConfig;
use nr_core::{EmbeddingProvider, Error, Prompt, Result, TextGenerator};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{build_client, check_status, transport_error};

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

/// Chat-completions client for OpenAI-compatible APIs (Groq, OpenAI, DeepSeek, ...).
pub struct OpenAiChatModel {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiChatModel {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }
}

impl fmt::Debug for OpenAiChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiChatModel")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl TextGenerator for OpenAiChatModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: prompt.temperature,
            max_tokens: prompt.max_tokens,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &self.config, e))?;
        let response = check_status(self.name(), response).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("{} response parse error: {e}", self.name())))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Provider(format!("{} returned no completion", self.name())))?;
        tracing::debug!("Generated {} characters with {}", content.len(), self.name());
        Ok(content)
    }
}

/// Embeddings client for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAiEmbeddings {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiEmbeddings {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }
}

impl fmt::Debug for OpenAiEmbeddings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEmbeddings")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbeddingRequest {
            input: texts,
            model: &self.config.model,
        };
        let mut builder = self
            .client
            .post(format!("{}/embeddings", self.config.base_url))
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &self.config, e))?;
        let response = check_status(self.name(), response).await?;
        let mut body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("{} response parse error: {e}", self.name())))?;

        body.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        let embeddings: Vec<Vec<f32>> = body.data.into_iter().map(|d| d.embedding).collect();
        super::validate_embeddings(self.name(), texts.len(), embeddings)
    }
}
