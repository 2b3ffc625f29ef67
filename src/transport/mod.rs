//! Realtime transport abstraction
//!
//! A [`Transport`] opens one publish/subscribe session and reports what
//! happens on it through a [`TransportSink`]. The
//! [`ConnectionManager`](crate::connection::ConnectionManager) is the only
//! caller of [`Transport::open`] and the only owner of the returned handle.
//!
//! Implementations:
//! - [`PusherTransport`]: Pusher protocol over WebSocket
//! - [`LoopbackTransport`]: in-process transport for tests and offline runs

pub mod auth;
pub mod loopback;
pub mod pusher;

use std::sync::Arc;

use serde_json::Value;

use crate::config::ConnectOptions;
use crate::error::{RealtimeError, RealtimeResult};

pub use auth::{ChannelAuthorizer, HttpAuthorizer};
pub use loopback::{LoopbackCall, LoopbackTransport};
pub use pusher::PusherTransport;

/// Something that happened on a transport session
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Session established (initially or after a transport-level retry)
    Connected { socket_id: String },
    /// Session dropped; the transport is retrying on its own
    Interrupted,
    /// Network or protocol failure
    Error(RealtimeError),
    /// Session ended for good; the transport will not retry
    Closed,
    /// Server confirmed a channel subscription
    SubscriptionSucceeded { channel: String },
    /// Server rejected a channel subscription
    SubscriptionFailed { channel: String, error: RealtimeError },
    /// Application event on a subscribed channel
    Message {
        channel: String,
        event: String,
        data: Value,
    },
}

/// Receives transport events. May be called from any thread.
pub type TransportSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// A publish/subscribe transport capable of opening sessions.
///
/// `open` must not invoke `sink` before it returns; events are reported
/// asynchronously afterwards.
pub trait Transport: Send + Sync {
    fn open(
        &self,
        key: &str,
        options: &ConnectOptions,
        sink: TransportSink,
    ) -> RealtimeResult<Box<dyn TransportHandle>>;
}

/// Handle to an open transport session
pub trait TransportHandle: Send + Sync {
    fn subscribe(&self, channel: &str);

    fn unsubscribe(&self, channel: &str);

    /// Close the session. Idempotent.
    fn close(&self);
}

/// Channels whose subscription must be signed by the auth endpoint
pub fn is_private_channel(channel: &str) -> bool {
    channel.starts_with("private-") || channel.starts_with("presence-")
}
