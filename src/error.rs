//! Error types for the realtime layer and the fallback cache
//!
//! Connection and transport failures are captured as state by the
//! [`ConnectionManager`](crate::connection::ConnectionManager), so
//! [`RealtimeError`] is `Clone` and can be stored and handed out repeatedly.

use thiserror::Error;

/// Result type for realtime operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;

/// Result type for fallback cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors surfaced by the connection manager, router and reconcilers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RealtimeError {
    /// Missing or invalid connection configuration (e.g. empty app key).
    /// Fatal to the connection attempt, never retried automatically.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network or protocol failure reported by the transport.
    #[error("transport error{}: {message}", .code.map(|c| format!(" {c}")).unwrap_or_default())]
    Transport { code: Option<u32>, message: String },

    /// Subscribing or unsubscribing without an active connection, or a
    /// subscription rejected by the server.
    #[error("subscription error on {channel}: {reason}")]
    Subscription { channel: String, reason: String },

    /// Reported by reconcilers while the connection is neither connected
    /// nor connecting.
    #[error("No realtime connection")]
    NoConnection,
}

impl RealtimeError {
    pub fn transport(message: impl Into<String>) -> Self {
        RealtimeError::Transport {
            code: None,
            message: message.into(),
        }
    }

    pub fn transport_with_code(code: u32, message: impl Into<String>) -> Self {
        RealtimeError::Transport {
            code: Some(code),
            message: message.into(),
        }
    }

    pub fn subscription(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        RealtimeError::Subscription {
            channel: channel.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable tag, used by the status API
    pub fn kind(&self) -> &'static str {
        match self {
            RealtimeError::Configuration(_) => "configuration",
            RealtimeError::Transport { .. } => "transport",
            RealtimeError::Subscription { .. } => "subscription",
            RealtimeError::NoConnection => "no_connection",
        }
    }
}

/// Errors from the fallback cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid cache key: {0:?}")]
    InvalidKey(String),
}
