//! In-memory vector index over card documents.
//!
//! Ranking is a linear scan. The corpus is a few hundred chunks, so this is
//! deliberate; an approximate-NN structure can replace `VectorIndex` behind
//! the same `Retriever` surface if the corpus ever grows by orders of
//! magnitude.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::errors::ApiError;
use crate::llm::EmbeddingProvider;
use crate::rag::loader::Document;
use crate::vector_math::rank_descending_by_cosine;

/// A document with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub document: Document,
    pub score: f32,
}

/// Immutable snapshot of the embedded corpus.
#[derive(Debug, Default)]
pub struct VectorIndex {
    documents: Vec<Document>,
}

impl VectorIndex {
    /// Documents without an embedding never made it through the build and
    /// are dropped here as a last line of defence.
    pub fn new(documents: Vec<Document>) -> Self {
        let documents = documents
            .into_iter()
            .filter(|doc| doc.embedding.is_some())
            .collect();
        Self { documents }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Unscoped ranking: scores every document, drops anything below
    /// `threshold`, returns up to `top_k` hits sorted descending. Ties keep
    /// ingestion order (the sort is stable).
    pub fn rank(&self, query: &[f32], top_k: usize, threshold: f32) -> Vec<SearchHit> {
        self.rank_filtered(query, top_k, Some(threshold), |_| true)
    }

    /// Card-scoped ranking: case-insensitive substring match on the card
    /// name first, then ranks with no threshold. A card-scoped query is
    /// presumed topically relevant, so moderate-similarity chunks from that
    /// card are returned rather than discarded.
    pub fn rank_by_card(&self, card_name: &str, query: &[f32], top_k: usize) -> Vec<SearchHit> {
        let needle = card_name.to_lowercase();
        self.rank_filtered(query, top_k, None, |doc| {
            doc.card_name.to_lowercase().contains(&needle)
        })
    }

    fn rank_filtered<F>(
        &self,
        query: &[f32],
        top_k: usize,
        threshold: Option<f32>,
        keep: F,
    ) -> Vec<SearchHit>
    where
        F: Fn(&Document) -> bool,
    {
        let kept: Vec<&Document> = self.documents.iter().filter(|doc| keep(doc)).collect();
        let ranked = rank_descending_by_cosine(
            query,
            kept.iter().map(|doc| doc.embedding.as_deref().unwrap_or_default()),
        );

        ranked
            .into_iter()
            .filter(|(_, score)| threshold.map_or(true, |floor| *score >= floor))
            .take(top_k)
            .map(|(idx, score)| SearchHit {
                document: kept[idx].clone(),
                score,
            })
            .collect()
    }

    /// Distinct card names present in the index, sorted.
    pub fn card_names(&self) -> Vec<String> {
        self.documents
            .iter()
            .map(|doc| doc.card_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Embeds all documents and builds the index. Embedding calls run with
/// bounded concurrency; a failed call drops that document with a warning
/// and the build carries on.
pub async fn build_index(
    documents: Vec<Document>,
    embedder: &dyn EmbeddingProvider,
    concurrency: usize,
) -> VectorIndex {
    let total = documents.len();
    let embedded: Vec<Option<Document>> = stream::iter(documents.into_iter().map(|mut doc| {
        async move {
            match embedder.embed(&doc.content).await {
                Ok(vector) => {
                    doc.embedding = Some(vector);
                    Some(doc)
                }
                Err(err) => {
                    tracing::warn!("Dropping chunk {}: embedding failed: {}", doc.id, err);
                    None
                }
            }
        }
    }))
    .buffered(concurrency.max(1))
    .collect()
    .await;

    let documents: Vec<Document> = embedded.into_iter().flatten().collect();
    if documents.len() < total {
        tracing::warn!(
            "Index built with {} of {} chunks; the rest failed to embed",
            documents.len(),
            total
        );
    } else {
        tracing::info!("Index built with {} chunks", documents.len());
    }

    VectorIndex::new(documents)
}

/// Query-side entry point: owns the embedding provider and the current
/// index snapshot. A rebuild swaps the whole `Arc` so in-flight queries
/// never observe a half-updated corpus.
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: RwLock<Arc<VectorIndex>>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: VectorIndex) -> Self {
        Self {
            embedder,
            index: RwLock::new(Arc::new(index)),
        }
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingProvider> {
        self.embedder.clone()
    }

    pub async fn snapshot(&self) -> Arc<VectorIndex> {
        self.index.read().await.clone()
    }

    pub async fn swap(&self, index: VectorIndex) {
        *self.index.write().await = Arc::new(index);
    }

    pub async fn search(
        &self,
        query: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let query_embedding = self.embed_query(query).await?;
        let index = self.snapshot().await;
        Ok(index.rank(&query_embedding, top_k, threshold))
    }

    pub async fn search_by_card(
        &self,
        card_name: &str,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let query_embedding = self.embed_query(query).await?;
        let index = self.snapshot().await;
        Ok(index.rank_by_card(card_name, &query_embedding, top_k))
    }

    pub async fn available_cards(&self) -> Vec<String> {
        self.snapshot().await.card_names()
    }

    pub async fn document_count(&self) -> usize {
        self.snapshot().await.len()
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, ApiError> {
        self.embedder.embed(query).await.map_err(|err| {
            tracing::error!("Query embedding failed: {}", err);
            ApiError::ServiceUnavailable
        })
    }
}
