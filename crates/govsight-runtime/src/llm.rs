//! Chat-completion driver used to summarize web search results.

use crate::embedding::{is_local_url, provider_base_url, resolve_api_key};
use async_trait::async_trait;
use govsight_types::config::LlmConfig;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use zeroize::Zeroizing;

/// Error type for completion calls.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Missing API key: {0}")]
    MissingApiKey(String),
}

/// A single-turn chat completion.
#[async_trait]
pub trait ChatDriver: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError>;
}

/// OpenAI-compatible `/chat/completions` driver.
pub struct OpenAIChatDriver {
    api_key: Zeroizing<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAIChatDriver {
    pub fn new(config: &LlmConfig, api_key: Zeroizing<String>, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        }
    }
}

#[async_trait]
impl ChatDriver for OpenAIChatDriver {
    async fn complete(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });

        let mut req = self.client.post(&url).json(&body);
        if !self.api_key.as_str().is_empty() {
            req = req.header("Authorization", format!("Bearer {}", self.api_key.as_str()));
        }

        let resp = req.send().await.map_err(|e| LlmError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status,
                message: body.chars().take(200).collect(),
            });
        }

        let data: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;
        let content = data
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        debug!(model = %self.model, chars = content.len(), "Completion received");
        Ok(content.trim().to_string())
    }
}

/// Create a chat driver from config.
pub fn create_chat_driver(config: &LlmConfig) -> Result<Box<dyn ChatDriver>, LlmError> {
    let base_url = config
        .base_url
        .clone()
        .unwrap_or_else(|| provider_base_url(&config.provider));
    let api_key = match resolve_api_key(&config.api_key_env) {
        Some(key) => key,
        None if is_local_url(&base_url) => Zeroizing::new(String::new()),
        None => return Err(LlmError::MissingApiKey(config.api_key_env.clone())),
    };
    Ok(Box::new(OpenAIChatDriver::new(config, api_key, base_url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_for_remote_provider() {
        let config = LlmConfig {
            api_key_env: "GOVSIGHT_TEST_LLM_KEY_UNSET".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            create_chat_driver(&config),
            Err(LlmError::MissingApiKey(_))
        ));
    }

    #[test]
    fn test_local_base_url_runs_keyless() {
        let config = LlmConfig {
            provider: "ollama".to_string(),
            api_key_env: String::new(),
            ..LlmConfig::default()
        };
        assert!(create_chat_driver(&config).is_ok());
    }

    #[test]
    fn test_response_parsing() {
        let data: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":" Jane Doe "}}]}"#,
        )
        .unwrap();
        assert_eq!(
            data.choices[0].message.content.as_deref(),
            Some(" Jane Doe ")
        );
    }
}
