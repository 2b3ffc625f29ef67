//! Notification bus
//!
//! Listeners are called synchronously, in registration order, on the thread
//! that emits. Every toast is also published on a broadcast channel so
//! asynchronous consumers (the SSE stream) can follow along.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::types::Toast;

/// Event name the toast renderer listens for
pub const SHOW_TOAST: &str = "showToast";

/// Default capacity of the broadcast side of the bus
pub const DEFAULT_STREAM_CAPACITY: usize = 256;

/// Callback receiving every emitted toast
pub type Listener = Arc<dyn Fn(&Toast) + Send + Sync>;

/// Handle returned by [`NotificationBus::on`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A toast as published to stream consumers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToastEvent {
    pub event: &'static str,
    pub payload: Toast,
    pub sequence_id: u64,
    pub timestamp: i64,
}

/// Explicitly constructed notification emitter, shared by `Arc`
pub struct NotificationBus {
    listeners: RwLock<Vec<(ListenerId, Listener)>>,
    next_listener: AtomicU64,
    sequence_counter: AtomicU64,
    tx: broadcast::Sender<ToastEvent>,
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_STREAM_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            listeners: RwLock::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            sequence_counter: AtomicU64::new(0),
            tx,
        }
    }

    /// Register a listener
    pub fn on<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Toast) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn off(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Deliver `toast` to every current listener, then to stream subscribers.
    /// Nothing is buffered for listeners registered later.
    pub fn emit(&self, toast: Toast) {
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        trace!(message = %toast.message, listeners = snapshot.len(), "emitting toast");
        for listener in &snapshot {
            listener(&toast);
        }

        let sequence_id = self.sequence_counter.fetch_add(1, Ordering::SeqCst);
        // No stream subscribers is fine
        let _ = self.tx.send(ToastEvent {
            event: SHOW_TOAST,
            payload: toast,
            sequence_id,
            timestamp: chrono::Utc::now().timestamp(),
        });
    }

    /// Subscribe to the broadcast side of the bus
    pub fn stream(&self) -> broadcast::Receiver<ToastEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Number of toasts emitted so far
    pub fn emitted_count(&self) -> u64 {
        self.sequence_counter.load(Ordering::SeqCst)
    }
}
