//! SSE stream of toast notifications
//!
//! `GET /api/notifications/stream` forwards every toast emitted on the
//! notification bus as a `showToast` event.

pub mod handler;

use serde::Serialize;

/// Control events sent alongside the toasts
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SseEvent {
    /// First event on every stream
    Welcome {
        server_name: String,
        server_version: String,
        sequence_id: u64,
    },
    /// The client fell behind and missed toasts
    Error { code: String, message: String },
}
