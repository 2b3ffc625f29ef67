//! Connection manager - owns the single realtime transport session
//!
//! # State machine
//!
//! ```text
//! Disconnected --connect--> Connecting --transport connected--> Connected
//!      ^                        |                                  |
//!      |                        +------- transport error ----------+--> Errored
//!      +------------ disconnect / transport closed                      |
//!                                                                       |
//! Errored --reconnect--> Connecting                                     |
//! Errored --transport recovered--> Connected  <-------------------------+
//! ```
//!
//! Every session gets a generation number. The sink handed to the transport
//! carries the generation it was created for; events from older generations
//! are ignored, which is how teardown unbinds the transport's handlers.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::state::{ConnectOutcome, ConnectionState, ReconnectOutcome};
use crate::config::{ConnectOptions, RealtimeConfig};
use crate::error::{RealtimeError, RealtimeResult};
use crate::router::registry::BindingTable;
use crate::transport::{Transport, TransportEvent, TransportHandle, TransportSink};

#[derive(Clone)]
struct Credentials {
    key: String,
    options: ConnectOptions,
}

struct Inner {
    state: ConnectionState,
    handle: Option<Arc<dyn TransportHandle>>,
    last_error: Option<RealtimeError>,
    credentials: Option<Credentials>,
    socket_id: Option<String>,
    generation: u64,
}

/// Owns the lifecycle of the one transport connection shared by all
/// reconcilers. Only the manager opens or closes it.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    bindings: Arc<BindingTable>,
    inner: Mutex<Inner>,
    status_tx: watch::Sender<ConnectionState>,
    this: Weak<ConnectionManager>,
}

impl ConnectionManager {
    /// Create a manager around `transport`. Nothing is opened until
    /// [`connect`](Self::connect) is called.
    pub fn new(transport: Arc<dyn Transport>) -> Arc<Self> {
        let (status_tx, _) = watch::channel(ConnectionState::Disconnected);
        Arc::new_cyclic(|this| Self {
            transport,
            bindings: Arc::new(BindingTable::new()),
            inner: Mutex::new(Inner {
                state: ConnectionState::Disconnected,
                handle: None,
                last_error: None,
                credentials: None,
                socket_id: None,
                generation: 0,
            }),
            status_tx,
            this: this.clone(),
        })
    }

    /// Open the connection. Idempotent while connected or connecting.
    ///
    /// An empty key fails with [`RealtimeError::Configuration`] and leaves the
    /// state `Errored` without touching the transport.
    ///
    /// While a previously opened session is `Errored` the call returns
    /// [`ConnectOutcome::AwaitingReconnect`]: only [`reconnect`](Self::reconnect)
    /// or [`disconnect`](Self::disconnect) leave that state.
    pub fn connect(&self, key: &str, options: ConnectOptions) -> RealtimeResult<ConnectOutcome> {
        self.open_session(key, options, false)
    }

    fn open_session(
        &self,
        key: &str,
        options: ConnectOptions,
        reconnecting: bool,
    ) -> RealtimeResult<ConnectOutcome> {
        let key = key.trim();
        let generation = {
            let mut inner = self.inner.lock();
            match inner.state {
                ConnectionState::Connected => return Ok(ConnectOutcome::AlreadyConnected),
                ConnectionState::Connecting => return Ok(ConnectOutcome::AlreadyConnecting),
                ConnectionState::Errored if !reconnecting && inner.credentials.is_some() => {
                    return Ok(ConnectOutcome::AwaitingReconnect)
                }
                ConnectionState::Disconnected | ConnectionState::Errored => {}
            }

            if key.is_empty() {
                let error = RealtimeError::Configuration("realtime app key is not set".to_string());
                warn!(error = %error, "refusing to connect");
                inner.last_error = Some(error.clone());
                self.set_state(&mut inner, ConnectionState::Errored);
                return Err(error);
            }

            inner.generation += 1;
            inner.credentials = Some(Credentials {
                key: key.to_string(),
                options: options.clone(),
            });
            inner.socket_id = None;
            self.set_state(&mut inner, ConnectionState::Connecting);
            inner.generation
        };

        info!(cluster = %options.cluster, "opening realtime connection");
        let opened = self.transport.open(key, &options, self.sink_for(generation));

        let mut inner = self.inner.lock();
        match opened {
            Ok(handle) => {
                let handle: Arc<dyn TransportHandle> = Arc::from(handle);
                if inner.generation != generation {
                    // Torn down while the transport was opening
                    drop(inner);
                    handle.close();
                    return Ok(ConnectOutcome::Initiated);
                }
                for channel in self.bindings.channels() {
                    handle.subscribe(&channel);
                }
                inner.handle = Some(handle);
                Ok(ConnectOutcome::Initiated)
            }
            Err(error) => {
                warn!(error = %error, "failed to open realtime transport");
                if inner.generation == generation {
                    inner.last_error = Some(error.clone());
                    self.set_state(&mut inner, ConnectionState::Errored);
                }
                Err(error)
            }
        }
    }

    /// Connect using a loaded [`RealtimeConfig`]
    pub fn connect_with(&self, config: &RealtimeConfig) -> RealtimeResult<ConnectOutcome> {
        self.connect(&config.app_key, config.options.clone())
    }

    /// Drop any stale session and connect again with the last credentials.
    ///
    /// A no-op while connected or connecting, so repeated clicks on a
    /// reconnect button never stack connection attempts.
    pub fn reconnect(&self) -> RealtimeResult<ReconnectOutcome> {
        let (stale, credentials) = {
            let mut inner = self.inner.lock();
            if inner.state.is_live() {
                debug!(state = %inner.state, "reconnect skipped");
                return Ok(ReconnectOutcome::Skipped(inner.state));
            }

            let Some(credentials) = inner.credentials.clone() else {
                let error =
                    RealtimeError::Configuration("reconnect called before connect".to_string());
                inner.last_error = Some(error.clone());
                self.set_state(&mut inner, ConnectionState::Errored);
                return Err(error);
            };

            inner.generation += 1;
            inner.socket_id = None;
            (inner.handle.take(), credentials)
        };

        if let Some(handle) = stale {
            handle.close();
        }
        self.bindings.reset_confirmations();

        info!("reconnecting realtime connection");
        match self.open_session(&credentials.key, credentials.options, true)? {
            ConnectOutcome::Initiated => Ok(ReconnectOutcome::Restarted),
            // Another caller won the race
            _ => Ok(ReconnectOutcome::Skipped(self.state())),
        }
    }

    /// Close the connection and detach the transport's event handlers.
    /// Safe to call any number of times.
    pub fn disconnect(&self) {
        let handle = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            inner.socket_id = None;
            if inner.state != ConnectionState::Disconnected {
                self.set_state(&mut inner, ConnectionState::Disconnected);
            }
            inner.handle.take()
        };

        if let Some(handle) = handle {
            info!("closing realtime connection");
            handle.close();
        }
        self.bindings.reset_confirmations();
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn is_connecting(&self) -> bool {
        self.state() == ConnectionState::Connecting
    }

    /// Last configuration or transport error, cleared on (re)connect
    pub fn last_error(&self) -> Option<RealtimeError> {
        self.inner.lock().last_error.clone()
    }

    pub fn socket_id(&self) -> Option<String> {
        self.inner.lock().socket_id.clone()
    }

    /// Observe state changes
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.status_tx.subscribe()
    }

    /// True once `connect` has been called and until `disconnect`
    pub fn has_session(&self) -> bool {
        self.state() != ConnectionState::Disconnected
    }

    /// Channel/event bindings shared with the router
    pub fn bindings(&self) -> &Arc<BindingTable> {
        &self.bindings
    }

    /// Forward a channel subscription to the open transport session, if any
    pub(crate) fn subscribe_channel(&self, channel: &str) {
        let handle = self.inner.lock().handle.clone();
        if let Some(handle) = handle {
            handle.subscribe(channel);
        }
    }

    pub(crate) fn unsubscribe_channel(&self, channel: &str) {
        let handle = self.inner.lock().handle.clone();
        if let Some(handle) = handle {
            handle.unsubscribe(channel);
        }
    }

    fn set_state(&self, inner: &mut Inner, state: ConnectionState) {
        if inner.state != state {
            debug!(from = %inner.state, to = %state, "connection state changed");
            inner.state = state;
            self.status_tx.send_replace(state);
        }
    }

    fn sink_for(&self, generation: u64) -> TransportSink {
        let manager = self.this.clone();
        Arc::new(move |event| {
            if let Some(manager) = manager.upgrade() {
                manager.handle_transport_event(generation, event);
            }
        })
    }

    fn handle_transport_event(&self, generation: u64, event: TransportEvent) {
        // Messages are dispatched outside the lock so callbacks can re-enter.
        let message: Option<(String, String, Value)> = {
            let mut inner = self.inner.lock();
            if inner.generation != generation {
                debug!(generation, "ignoring event from stale transport session");
                return;
            }

            match event {
                TransportEvent::Connected { socket_id } => {
                    info!(socket_id = %socket_id, "realtime connection established");
                    inner.socket_id = Some(socket_id);
                    inner.last_error = None;
                    self.set_state(&mut inner, ConnectionState::Connected);
                    None
                }
                TransportEvent::Interrupted => {
                    if inner.state == ConnectionState::Connected {
                        self.set_state(&mut inner, ConnectionState::Connecting);
                    }
                    inner.socket_id = None;
                    self.bindings.reset_confirmations();
                    None
                }
                TransportEvent::Error(error) => {
                    warn!(error = %error, "realtime transport error");
                    inner.last_error = Some(error);
                    if inner.state != ConnectionState::Disconnected {
                        self.set_state(&mut inner, ConnectionState::Errored);
                    }
                    None
                }
                TransportEvent::Closed => {
                    info!("realtime transport closed");
                    inner.handle = None;
                    inner.socket_id = None;
                    if inner.state != ConnectionState::Errored {
                        self.set_state(&mut inner, ConnectionState::Disconnected);
                    }
                    None
                }
                TransportEvent::SubscriptionSucceeded { channel } => {
                    debug!(channel = %channel, "subscription confirmed");
                    self.bindings.mark_confirmed(&channel, true);
                    None
                }
                TransportEvent::SubscriptionFailed { channel, error } => {
                    warn!(channel = %channel, error = %error, "subscription failed");
                    self.bindings.mark_confirmed(&channel, false);
                    None
                }
                TransportEvent::Message {
                    channel,
                    event,
                    data,
                } => Some((channel, event, data)),
            }
        };

        if let Some((channel, event, data)) = message {
            if !self.bindings.dispatch(&channel, &event, &data) {
                debug!(channel = %channel, event = %event, "no binding for event");
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(handle) = self.inner.get_mut().handle.take() {
            handle.close();
        }
    }
}
