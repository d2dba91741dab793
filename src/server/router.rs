use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{cards, health, query, search};
use crate::state::AppState;

/// Creates the application router with all routes and middleware.
///
/// Routes:
/// - health and corpus status
/// - general, card-scoped and comparison queries
/// - raw retrieval (no LLM) for inspection
/// - card listing and corpus reload
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/status", get(health::get_status))
        .route("/api/query", post(query::general_query))
        .route("/api/cards/:card_name/query", post(query::card_query))
        .route("/api/compare", post(query::compare))
        .route("/api/search", post(search::raw_search))
        .route("/api/cards", get(cards::list_cards))
        .route("/api/corpus/reload", post(cards::reload_corpus))
        .with_state(state)
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}
