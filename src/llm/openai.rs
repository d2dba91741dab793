use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::provider::{ChatProvider, EmbeddingProvider};
use crate::config::ProviderConfig;
use crate::errors::ApiError;

/// Provider for any OpenAI-compatible endpoint (LM Studio, Ollama,
/// llama.cpp server, hosted APIs). Covers both the chat and the
/// embedding contracts over one HTTP client.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    chat_model: String,
    embedding_model: String,
    api_key: Option<String>,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: &ProviderConfig) -> Result<Self, ApiError> {
        // Every outbound call carries this timeout; a hung provider surfaces
        // as an ordinary request error instead of blocking a query forever.
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(ApiError::internal)?;

        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            api_key,
            client,
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.client.post(url);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ApiError> {
        let body = json!({
            "model": self.chat_model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": user_prompt},
            ],
            "stream": false,
        });

        let res = self
            .post("/v1/chat/completions")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "chat completion failed ({status}): {text}"
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                ApiError::Internal("chat completion response missing content".to_string())
            })?;

        Ok(content.to_string())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        let body = json!({
            "model": self.embedding_model,
            "input": text,
        });

        let res = self
            .post("/v1/embeddings")
            .json(&body)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Internal(format!(
                "embedding request failed ({status}): {text}"
            )));
        }

        let payload: Value = res.json().await.map_err(ApiError::internal)?;
        let values = payload["data"][0]["embedding"].as_array().ok_or_else(|| {
            ApiError::Internal("embedding response missing vector".to_string())
        })?;

        let vector: Vec<f32> = values
            .iter()
            .filter_map(|v| v.as_f64().map(|f| f as f32))
            .collect();

        if vector.is_empty() {
            return Err(ApiError::Internal("embedding response was empty".to_string()));
        }

        Ok(vector)
    }
}
