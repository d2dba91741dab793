use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::errors::ApiError;
use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let documents = state.retriever.document_count().await;
    let cards = state.retriever.available_cards().await;
    Ok(Json(json!({
        "documents": documents,
        "cards": cards.len(),
        "started_at": state.started_at,
    })))
}
