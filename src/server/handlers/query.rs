use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub question: String,
    pub cards: Vec<String>,
}

pub async fn general_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .pipeline
        .query(&request.question, request.top_k)
        .await?;
    Ok(Json(response))
}

pub async fn card_query(
    State(state): State<Arc<AppState>>,
    Path(card_name): Path<String>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .pipeline
        .query_by_card(&card_name, &request.question, request.top_k)
        .await?;
    Ok(Json(response))
}

pub async fn compare(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state
        .pipeline
        .compare_cards(&request.question, &request.cards)
        .await?;
    Ok(Json(response))
}
