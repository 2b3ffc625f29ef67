//! Notification stream handler

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use tokio::sync::broadcast;
use tracing::debug;

use super::SseEvent;
use crate::api::state::AppState;
use crate::notify::SHOW_TOAST;

/// GET /api/notifications/stream
pub async fn notifications_stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let bus = Arc::clone(state.client.bus());
    let mut toasts = bus.stream();
    let sequence_id = bus.emitted_count();
    debug!(sequence_id, "notification stream opened");

    let stream = async_stream::stream! {
        let welcome = SseEvent::Welcome {
            server_name: crate::NAME.to_string(),
            server_version: crate::VERSION.to_string(),
            sequence_id,
        };
        yield Ok::<_, Infallible>(Event::default()
            .event("welcome")
            .data(serde_json::to_string(&welcome).unwrap_or_default()));

        loop {
            match toasts.recv().await {
                Ok(toast) => {
                    yield Ok(Event::default()
                        .event(SHOW_TOAST)
                        .id(toast.sequence_id.to_string())
                        .data(serde_json::to_string(&toast.payload).unwrap_or_default()));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    let error = SseEvent::Error {
                        code: "lagged".to_string(),
                        message: format!("Missed {} notifications", n),
                    };
                    yield Ok(Event::default()
                        .event("error")
                        .data(serde_json::to_string(&error).unwrap_or_default()));
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default().interval(Duration::from_secs(30)))
}
