//! Connection status and the manual reconnect action

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use tracing::info;

use super::ApiError;
use crate::api::state::AppState;
use crate::connection::{ConnectionState, ReconnectOutcome};
use crate::error::RealtimeError;
use crate::sync::{EntityKind, SubscriptionStatus};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub state: ConnectionState,
    pub socket_id: Option<String>,
    pub last_error: Option<ErrorInfo>,
    pub channels: Vec<ChannelInfo>,
    pub collections: Vec<CollectionInfo>,
}

#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub kind: &'static str,
    pub message: String,
}

impl From<&RealtimeError> for ErrorInfo {
    fn from(error: &RealtimeError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ChannelInfo {
    pub name: String,
    pub confirmed: bool,
    pub bindings: usize,
}

#[derive(Debug, Serialize)]
pub struct CollectionInfo {
    pub kind: EntityKind,
    pub status: SubscriptionStatus,
    pub count: usize,
}

/// GET /api/realtime/status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let manager = state.client.manager();
    let bindings = manager.bindings();

    let channels = bindings
        .channels()
        .into_iter()
        .map(|name| ChannelInfo {
            confirmed: bindings.is_confirmed(&name),
            bindings: bindings.binding_count(&name),
            name,
        })
        .collect();

    let collections = state
        .collections()
        .iter()
        .map(|view| CollectionInfo {
            kind: view.kind(),
            status: view.status(),
            count: view.len(),
        })
        .collect();

    Json(StatusResponse {
        state: manager.state(),
        socket_id: manager.socket_id(),
        last_error: manager.last_error().as_ref().map(ErrorInfo::from),
        channels,
        collections,
    })
}

#[derive(Debug, Serialize)]
pub struct ReconnectResponse {
    pub result: ReconnectOutcome,
    pub state: ConnectionState,
}

/// POST /api/realtime/reconnect
pub async fn reconnect(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let manager = state.client.manager();
    match manager.reconnect() {
        Ok(outcome) => {
            info!(outcome = ?outcome, "manual reconnect requested");
            let response = ReconnectResponse {
                result: outcome,
                state: manager.state(),
            };
            (StatusCode::OK, Json(serde_json::to_value(response).unwrap_or_default()))
        }
        Err(error) => {
            let body = ApiError::new(error.kind().to_uppercase(), error.to_string());
            (
                StatusCode::CONFLICT,
                Json(serde_json::to_value(body).unwrap_or_default()),
            )
        }
    }
}
