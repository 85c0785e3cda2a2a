use crate::error::EmbeddingError;
use crate::provider::EmbeddingProvider;
use crate::{DEFAULT_EMBEDDING_DIM, DEFAULT_EMBEDDING_MODEL};
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the embedding service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Model to request embeddings from
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible API (without trailing slash)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Bearer token sent with every request
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Expected embedding dimension; responses of any other length are rejected
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIM
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            api_key: None,
            dimension: default_dimension(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("embedding model must not be empty".to_string());
        }
        if self.dimension == 0 {
            return Err("embedding dimension must be > 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("embedding timeout must be > 0".to_string());
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Embedding provider backed by an OpenAI-compatible HTTP API
pub struct OpenAiEmbeddings {
    http: reqwest::Client,
    config: EmbeddingConfig,
}

impl OpenAiEmbeddings {
    /// Create a new embedding service with custom configuration
    pub fn new(config: EmbeddingConfig) -> Result<Self, EmbeddingError> {
        config.validate().map_err(EmbeddingError::InvalidInput)?;

        info!(
            "Initializing embedding service with model {}, dimension {}",
            config.model, config.dimension
        );

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    /// Get the configuration of this service
    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/embeddings", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.is_empty() {
            return Err(EmbeddingError::InvalidInput("cannot embed empty text".into()));
        }
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(EmbeddingError::MissingApiKey)?;

        debug!("Requesting embedding for {} chars", text.len());

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&EmbeddingRequest {
                model: &self.config.model,
                input: vec![text],
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or(EmbeddingError::EmptyResponse)?;

        if embedding.len() != self.config.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.len(),
            });
        }

        Ok(embedding)
    }
}
