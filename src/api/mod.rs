//! Status API
//!
//! HTTP endpoints exposing connection state, the manual reconnect action, the
//! synchronized collections and a toast notification stream.

pub mod http;
pub mod rest;
pub mod sse;
pub mod state;

pub use http::create_router;
pub use state::AppState;
