use async_trait::async_trait;
use nr_core::config::ProviderConfig;
use nr_core::{EmbeddingProvider, Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{build_client, check_status, transport_error};

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    model: &'a str,
    input_type: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

/// Cohere `/embed` client. Articles are embedded as `search_document` inputs.
pub struct CohereEmbeddings {
    client: Client,
    config: ProviderConfig,
}

impl CohereEmbeddings {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(Error::Config("Cohere API key is required".to_string()));
        }
        Ok(Self {
            client: build_client(&config)?,
            config,
        })
    }
}

impl fmt::Debug for CohereEmbeddings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CohereEmbeddings")
            .field("client", &"<reqwest::Client>")
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl EmbeddingProvider for CohereEmbeddings {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let request = EmbedRequest {
            texts,
            model: &self.config.model,
            input_type: "search_document",
        };
        let mut builder = self
            .client
            .post(format!("{}/embed", self.config.base_url))
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(self.name(), &self.config, e))?;
        let response = check_status(self.name(), response).await?;
        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("{} response parse error: {e}", self.name())))?;
        super::validate_embeddings(self.name(), texts.len(), body.embeddings)
    }
}
