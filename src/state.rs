use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::{AppConfig, AppPaths};
use crate::errors::ApiError;
use crate::llm::{ChatProvider, EmbeddingProvider, OpenAiCompatProvider};
use crate::rag::index::{build_index, Retriever};
use crate::rag::loader;
use crate::rag::pipeline::RagPipeline;

pub struct AppState {
    pub config: AppConfig,
    pub paths: AppPaths,
    pub retriever: Arc<Retriever>,
    pub pipeline: RagPipeline,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub async fn initialize() -> anyhow::Result<Arc<Self>> {
        let config = AppConfig::load()?;
        let paths = AppPaths::new(&config);
        Self::with_config(config, paths).await
    }

    /// Builds the full corpus before returning; no queries are served
    /// until the initial index exists.
    pub async fn with_config(config: AppConfig, paths: AppPaths) -> anyhow::Result<Arc<Self>> {
        let provider = OpenAiCompatProvider::new(&config.provider)?;
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(provider.clone());
        let llm: Arc<dyn ChatProvider> = Arc::new(provider);
        tracing::info!(
            "Embeddings and generation via {} at {}",
            embedder.name(),
            config.provider.base_url
        );

        let documents = loader::load_all(&paths.data_dir)?;
        let index = build_index(
            documents,
            embedder.as_ref(),
            config.retrieval.embed_concurrency,
        )
        .await;
        if index.is_empty() {
            tracing::warn!("Index is empty; every query will get the fallback answer");
        }

        let retriever = Arc::new(Retriever::new(embedder, index));
        let pipeline = RagPipeline::new(retriever.clone(), llm, config.retrieval.clone());

        Ok(Arc::new(AppState {
            config,
            paths,
            retriever,
            pipeline,
            started_at: Utc::now(),
        }))
    }

    /// Full rebuild-and-swap; the only destructive corpus operation.
    pub async fn reload_corpus(&self) -> Result<(usize, Vec<String>), ApiError> {
        let documents = loader::load_all(&self.paths.data_dir).map_err(|err| {
            tracing::error!("Corpus reload failed: {:#}", err);
            ApiError::Internal(err.to_string())
        })?;

        let embedder = self.retriever.embedder();
        let index = build_index(
            documents,
            embedder.as_ref(),
            self.config.retrieval.embed_concurrency,
        )
        .await;

        let cards = index.card_names();
        let count = index.len();
        self.retriever.swap(index).await;
        tracing::info!("Corpus reloaded: {} documents across {} cards", count, cards.len());
        Ok((count, cards))
    }
}
