use async_trait::async_trait;

use crate::errors::ApiError;

/// Text-to-vector contract. Vector dimension is fixed per model version;
/// vectors from different models must never be compared.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// return the provider name (e.g. "openai-compat")
    fn name(&self) -> &str;

    /// embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ApiError>;

    /// embed many texts, one call per item so failures stay isolated
    async fn embed_many(&self, texts: &[String]) -> Vec<Result<Vec<f32>, ApiError>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await);
        }
        results
    }
}

/// Grounded-answer generation contract.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// return the provider name
    fn name(&self) -> &str;

    /// single-shot completion from a system prompt and a user prompt
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, ApiError>;
}
