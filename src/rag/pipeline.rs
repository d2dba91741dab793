//! RAG pipeline: retrieve, build context, synthesize a grounded answer.
//!
//! Every query follows the same shape: retrieve → (empty ⇒ short-circuit) →
//! build context → generate → return. The short-circuit returns a fixed
//! message with zero LLM calls; an empty retrieval is a policy outcome,
//! not an error.

use std::sync::Arc;

use futures_util::future;
use serde::Serialize;

use crate::config::RetrievalConfig;
use crate::errors::ApiError;
use crate::llm::ChatProvider;
use crate::rag::index::{Retriever, SearchHit};
use crate::rag::loader::title_case;

/// Returned when nothing in the corpus clears the relevance bar.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str =
    "I could not find anything in the card documents that answers this question.";

/// Returned when the LLM call fails; the real cause is logged server-side.
pub const GENERATION_FAILURE_ANSWER: &str =
    "Sorry, I could not generate an answer right now. Please try again in a moment.";

const GENERAL_SYSTEM_PROMPT: &str = "You are an assistant that answers questions about credit card policies. \
    Answer using only the facts in the supplied context. The context may contain passages from several \
    different cards; attribute every fact to the card it belongs to and never mix terms across cards. \
    If the context does not contain the answer, say that the available card documents do not cover it.";

fn card_system_prompt(card_name: &str) -> String {
    format!(
        "You are an assistant that answers questions about the {card_name} credit card. \
        Answer using only the facts in the supplied context, and answer only about {card_name}. \
        If the retrieved context does not contain the fact needed, say explicitly that the \
        {card_name} documents retrieved do not contain it. Never answer from general knowledge."
    )
}

fn compare_system_prompt(card_names: &[String]) -> String {
    format!(
        "You are an assistant that compares credit cards. Compare {} using only the facts in the \
        supplied context. Present the comparison as a markdown table with one column per card, \
        followed by a short summary. If the context contains no information for one of the cards \
        on the asked topic, state that explicitly for that card instead of inferring or inventing it.",
        card_names.join(" and ")
    )
}

/// One retrieved source as exposed to callers: a truncated snippet, never
/// the full chunk text.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    pub card_name: String,
    pub section: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
    pub content_snippet: String,
    pub similarity_score: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

pub struct RagPipeline {
    retriever: Arc<Retriever>,
    llm: Arc<dyn ChatProvider>,
    retrieval: RetrievalConfig,
}

impl RagPipeline {
    pub fn new(
        retriever: Arc<Retriever>,
        llm: Arc<dyn ChatProvider>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            retriever,
            llm,
            retrieval,
        }
    }

    /// Unscoped question over the whole corpus.
    pub async fn query(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<QueryResponse, ApiError> {
        let question = validate_question(question)?;
        let top_k = top_k.unwrap_or(self.retrieval.top_k);

        let hits = match self
            .retriever
            .search(question, top_k, self.retrieval.threshold)
            .await
        {
            Ok(hits) => hits,
            // A failed query embedding is a generation-class failure: the
            // cause is already logged, the caller gets the apology.
            Err(_) => return Ok(generation_failure_response()),
        };
        if hits.is_empty() {
            return Ok(QueryResponse {
                answer: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let context = build_context(&hits);
        let answer = self
            .generate(GENERAL_SYSTEM_PROMPT, question, &context, "general")
            .await;
        Ok(QueryResponse {
            answer,
            sources: self.source_refs(&hits),
        })
    }

    /// Question scoped to a single named card.
    pub async fn query_by_card(
        &self,
        card_name: &str,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<QueryResponse, ApiError> {
        let question = validate_question(question)?;
        let card_name = card_name.trim();
        if card_name.is_empty() {
            return Err(ApiError::BadRequest("Card name must not be empty".to_string()));
        }
        let top_k = top_k.unwrap_or(self.retrieval.top_k);

        let hits = match self
            .retriever
            .search_by_card(card_name, question, top_k)
            .await
        {
            Ok(hits) => hits,
            Err(_) => return Ok(generation_failure_response()),
        };
        if hits.is_empty() {
            return Ok(QueryResponse {
                answer: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let context = build_context(&hits);
        let answer = self
            .generate(&card_system_prompt(card_name), question, &context, "card")
            .await;
        Ok(QueryResponse {
            answer,
            sources: self.source_refs(&hits),
        })
    }

    /// Multi-card comparison. Requires at least two distinct card names,
    /// validated before any retrieval work. Per-card retrievals run
    /// concurrently against the immutable index snapshot; a card whose
    /// retrieval fails or comes back empty is noted rather than aborting
    /// the whole comparison.
    pub async fn compare_cards(
        &self,
        question: &str,
        card_names: &[String],
    ) -> Result<QueryResponse, ApiError> {
        let question = validate_question(question)?;
        let distinct = distinct_card_names(card_names);
        if distinct.len() < 2 {
            return Err(ApiError::BadRequest(
                "Comparison requires at least two distinct card names".to_string(),
            ));
        }

        let per_card_top_k = self.retrieval.compare_top_k;
        let tasks = distinct.iter().map(|card| {
            let retriever = self.retriever.clone();
            let card = card.clone();
            let question = question.to_string();
            async move {
                let result = retriever
                    .search_by_card(&card, &question, per_card_top_k)
                    .await;
                (card, result)
            }
        });
        let results = future::join_all(tasks).await;

        let mut retrieved: Vec<(String, Vec<SearchHit>)> = Vec::new();
        let mut without_context: Vec<String> = Vec::new();
        for (card, result) in results {
            match result {
                Ok(hits) if !hits.is_empty() => retrieved.push((card, hits)),
                Ok(_) => without_context.push(card),
                Err(err) => {
                    tracing::warn!(
                        "Retrieval for card {} failed during comparison, omitting it: {}",
                        card,
                        err
                    );
                    without_context.push(card);
                }
            }
        }

        if retrieved.is_empty() {
            return Ok(QueryResponse {
                answer: INSUFFICIENT_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let mut context = String::new();
        for (card, hits) in &retrieved {
            context.push_str(&format!("### {card}\n\n"));
            context.push_str(&build_context(hits));
            context.push('\n');
        }
        if !without_context.is_empty() {
            context.push_str(&format!(
                "No context was retrieved for: {}.\n",
                without_context.join(", ")
            ));
        }

        let answer = self
            .generate(&compare_system_prompt(&distinct), question, &context, "compare")
            .await;

        let sources = retrieved
            .iter()
            .flat_map(|(_, hits)| hits.iter())
            .map(|hit| self.source_ref(hit))
            .collect();
        Ok(QueryResponse { answer, sources })
    }

    /// Retrieval only, no LLM call. For inspection and debugging.
    pub async fn raw_search(
        &self,
        query: &str,
        top_k: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let query = validate_question(query)?;
        self.retriever
            .search(
                query,
                top_k.unwrap_or(self.retrieval.top_k),
                threshold.unwrap_or(self.retrieval.threshold),
            )
            .await
    }

    async fn generate(&self, system_prompt: &str, question: &str, context: &str, mode: &str) -> String {
        let user_prompt = format!("Context:\n{context}\n\nQuestion: {question}");
        match self.llm.generate(system_prompt, &user_prompt).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::error!(
                    "LLM generation failed (mode: {}, question: {}): {}",
                    mode,
                    question,
                    err
                );
                GENERATION_FAILURE_ANSWER.to_string()
            }
        }
    }

    fn source_refs(&self, hits: &[SearchHit]) -> Vec<SourceRef> {
        hits.iter().map(|hit| self.source_ref(hit)).collect()
    }

    fn source_ref(&self, hit: &SearchHit) -> SourceRef {
        SourceRef {
            card_name: hit.document.card_name.clone(),
            section: hit.document.metadata.section.clone(),
            subsection: hit.document.metadata.subsection.clone(),
            content_snippet: snippet(&hit.document.content, self.retrieval.snippet_chars),
            similarity_score: hit.score,
        }
    }
}

fn generation_failure_response() -> QueryResponse {
    QueryResponse {
        answer: GENERATION_FAILURE_ANSWER.to_string(),
        sources: Vec::new(),
    }
}

fn validate_question(question: &str) -> Result<&str, ApiError> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("Question must not be empty".to_string()));
    }
    Ok(trimmed)
}

fn distinct_card_names(card_names: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut distinct = Vec::new();
    for name in card_names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        let folded = trimmed.to_lowercase();
        if !seen.contains(&folded) {
            seen.push(folded);
            distinct.push(trimmed.to_string());
        }
    }
    distinct
}

fn build_context(hits: &[SearchHit]) -> String {
    let mut context = String::new();
    for (i, hit) in hits.iter().enumerate() {
        let section = section_label(hit);
        context.push_str(&format!(
            "[{}] (source: {} / {}, relevance: {:.2})\n{}\n\n",
            i + 1,
            hit.document.card_name,
            section,
            hit.score,
            hit.document.content
        ));
    }
    context.trim_end().to_string()
}

fn section_label(hit: &SearchHit) -> String {
    match &hit.document.metadata.subsection {
        Some(sub) => format!(
            "{} > {}",
            title_case(&hit.document.metadata.section),
            title_case(sub)
        ),
        None => title_case(&hit.document.metadata.section),
    }
}

/// Char-boundary-safe truncation for transport; full chunk text stays
/// server-side.
fn snippet(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let mut cut: String = content.chars().take(max_chars).collect();
    cut.push('…');
    cut
}
