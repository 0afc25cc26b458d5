pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::ingest::handlers as ingest_handlers;
use crate::review::handlers as review_handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ingestion API
        .route("/api/v1/collect", post(ingest_handlers::handle_collect))
        .route("/api/v1/summarize", post(ingest_handlers::handle_summarize))
        // Review API
        .route("/api/v1/queue", get(review_handlers::handle_queue))
        .route(
            "/api/v1/review/:item_id",
            post(review_handlers::handle_review),
        )
        .route("/api/v1/reviewed", get(review_handlers::handle_reviewed))
        .route("/api/v1/items/:id", get(review_handlers::handle_get_item))
        .route("/api/v1/stats", get(review_handlers::handle_stats))
        .with_state(state)
}
