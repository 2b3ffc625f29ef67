//! REST endpoints
//!
//! - `GET /api/realtime/status` - connection state, channels and collections
//! - `POST /api/realtime/reconnect` - manual reconnect
//! - `GET /api/{budgets,budget-requests,invoices,transactions}` - current
//!   collections with pagination

pub mod collections;
pub mod realtime;

use serde::{Deserialize, Serialize};

/// Common pagination parameters
#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    /// Maximum number of items to return (default: 100, max: 1000)
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    100
}

impl PaginationParams {
    pub fn normalized_limit(&self) -> usize {
        self.limit.min(1000)
    }
}

/// Paginated listing: one page of `data` plus the collection's total count
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,
    pub total: usize,
}

impl<T> ApiResponse<T> {
    pub fn with_total(data: T, total: usize) -> Self {
        Self { data, total }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code: code.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }
}
