//! Collection endpoints

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use super::{ApiError, ApiResponse, PaginationParams};
use crate::api::state::AppState;
use crate::sync::EntityKind;

/// GET /api/budgets
pub async fn list_budgets(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Response {
    list(&state, EntityKind::Budget, &params)
}

/// GET /api/budget-requests
pub async fn list_budget_requests(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Response {
    list(&state, EntityKind::BudgetRequest, &params)
}

/// GET /api/invoices
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Response {
    list(&state, EntityKind::Invoice, &params)
}

/// GET /api/transactions
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Response {
    list(&state, EntityKind::Transaction, &params)
}

fn list(state: &AppState, kind: EntityKind, params: &PaginationParams) -> Response {
    match state.collection(kind) {
        Some(view) => {
            let data = view.page_json(params.offset, params.normalized_limit());
            Json(ApiResponse::with_total(data, view.len())).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::not_found(format!("{} are not synchronized", kind.plural()))),
        )
            .into_response(),
    }
}
