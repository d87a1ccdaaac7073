//! Embedding driver for the passage index.
//!
//! One OpenAI-compatible implementation covers every provider exposing a
//! `/embeddings` endpoint (OpenAI, Together, Groq, Ollama, vLLM, ...).

use async_trait::async_trait;
use govsight_types::config::EmbeddingSettings;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const TOGETHER_BASE_URL: &str = "https://api.together.xyz/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const VLLM_BASE_URL: &str = "http://localhost:8000/v1";
pub const LMSTUDIO_BASE_URL: &str = "http://localhost:1234/v1";

/// Error type for embedding operations.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Missing API key: {0}")]
    MissingApiKey(String),
}

/// Trait for computing text embeddings.
#[async_trait]
pub trait EmbeddingDriver: Send + Sync {
    /// Compute embedding vectors for a batch of texts.
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Compute embedding for a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let results = self.embed(&[text]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::Parse("Empty embedding response".to_string()))
    }
}

/// OpenAI-compatible embedding driver.
pub struct OpenAIEmbeddingDriver {
    api_key: Zeroizing<String>,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl OpenAIEmbeddingDriver {
    pub fn new(model: String, api_key: Zeroizing<String>, base_url: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EmbeddingDriver for OpenAIEmbeddingDriver {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/embeddings", self.base_url);
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let mut req = self.client.post(&url).json(&body);
        if !self.api_key.as_str().is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key.as_str()));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;
        let status = resp.status().as_u16();

        if status != 200 {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status,
                message: body_text,
            });
        }

        let data: EmbedResponse = resp
            .json()
            .await
            .map_err(|e| EmbeddingError::Parse(e.to_string()))?;
        let embeddings: Vec<Vec<f32>> = data.data.into_iter().map(|d| d.embedding).collect();

        debug!(
            "Embedded {} texts (dims={})",
            embeddings.len(),
            embeddings.first().map(|e| e.len()).unwrap_or(0)
        );
        Ok(embeddings)
    }
}

/// Default base URL for a provider name.
pub fn provider_base_url(provider: &str) -> String {
    match provider {
        "openai" => OPENAI_BASE_URL.to_string(),
        "together" => TOGETHER_BASE_URL.to_string(),
        "groq" => GROQ_BASE_URL.to_string(),
        "ollama" => OLLAMA_BASE_URL.to_string(),
        "vllm" => VLLM_BASE_URL.to_string(),
        "lmstudio" => LMSTUDIO_BASE_URL.to_string(),
        other => {
            warn!("Unknown provider '{other}', using OpenAI-compatible format");
            format!("https://{other}/v1")
        }
    }
}

/// Whether requests to `base_url` stay on this machine.
pub fn is_local_url(base_url: &str) -> bool {
    base_url.contains("localhost") || base_url.contains("127.0.0.1") || base_url.contains("[::1]")
}

/// Resolve an API key from an environment variable name.
pub fn resolve_api_key(env_var: &str) -> Option<Zeroizing<String>> {
    if env_var.is_empty() {
        return None;
    }
    std::env::var(env_var)
        .ok()
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}

/// Create an embedding driver from config.
///
/// Remote providers need their key env var set; local ones run keyless.
pub fn create_embedding_driver(
    settings: &EmbeddingSettings,
) -> Result<Box<dyn EmbeddingDriver>, EmbeddingError> {
    let base_url = settings
        .base_url
        .clone()
        .unwrap_or_else(|| provider_base_url(&settings.provider));
    let api_key = resolve_api_key(&settings.api_key_env);

    let api_key = match api_key {
        Some(key) => key,
        None if is_local_url(&base_url) => Zeroizing::new(String::new()),
        None => return Err(EmbeddingError::MissingApiKey(settings.api_key_env.clone())),
    };

    if !is_local_url(&base_url) {
        debug!(
            provider = %settings.provider,
            base_url = %base_url,
            "Embedding requests will be sent to an external API"
        );
    }

    Ok(Box::new(OpenAIEmbeddingDriver::new(
        settings.model.clone(),
        api_key,
        base_url,
    )))
}
