use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn list_cards(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let cards = state.retriever.available_cards().await;
    Ok(Json(json!({ "cards": cards })))
}

/// Rebuilds the corpus from the data directory and swaps it in atomically.
/// In-flight queries keep the snapshot they started with.
pub async fn reload_corpus(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let (documents, cards) = state.reload_corpus().await?;
    Ok(Json(json!({
        "documents": documents,
        "cards": cards,
    })))
}
