//! HTTP server setup with Axum

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::rest::{collections, realtime};
use super::sse::handler::notifications_stream;
use super::state::AppState;

/// Create the Axum router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/realtime/status", get(realtime::get_status))
        .route("/api/realtime/reconnect", post(realtime::reconnect))
        .route("/api/budgets", get(collections::list_budgets))
        .route("/api/budget-requests", get(collections::list_budget_requests))
        .route("/api/invoices", get(collections::list_invoices))
        .route("/api/transactions", get(collections::list_transactions))
        .route("/api/notifications/stream", get(notifications_stream))
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
