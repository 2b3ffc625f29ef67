//! Connection state machine values

use std::fmt;

use serde::Serialize;

/// Lifecycle of the single realtime connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Errored,
}

impl ConnectionState {
    /// Connected or on the way there
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Connecting)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Errored => "errored",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful `connect` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectOutcome {
    /// A new transport session was opened
    Initiated,
    /// Precondition: already connected, nothing done
    AlreadyConnected,
    /// Precondition: a connection attempt is in flight, nothing done
    AlreadyConnecting,
    /// Precondition: the connection is errored and waits for `reconnect`
    AwaitingReconnect,
}

/// Result of a successful `reconnect` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "state")]
pub enum ReconnectOutcome {
    /// Stale session dropped and a new one initiated
    Restarted,
    /// Connection was live; reconnect is a no-op
    Skipped(ConnectionState),
}
