use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: Option<usize>,
    pub threshold: Option<f32>,
}

/// Ranked chunks without answer synthesis, for inspection and debugging.
pub async fn raw_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let hits = state
        .pipeline
        .raw_search(&request.query, request.top_k, request.threshold)
        .await?;
    Ok(Json(json!({ "results": hits })))
}
