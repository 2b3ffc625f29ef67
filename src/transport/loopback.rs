//! In-process transport
//!
//! Nothing leaves the process: callers drive the session by hand with
//! [`LoopbackTransport::establish`], [`LoopbackTransport::fail`] and
//! [`LoopbackTransport::deliver`]. Every call made through the handle is
//! recorded so tests can assert on connect/subscribe/close cycles.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use super::{Transport, TransportEvent, TransportHandle, TransportSink};
use crate::config::ConnectOptions;
use crate::error::{RealtimeError, RealtimeResult};

/// A call observed by the loopback transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopbackCall {
    Open { key: String, session: u64 },
    Subscribe { channel: String, session: u64 },
    Unsubscribe { channel: String, session: u64 },
    Close { session: u64 },
}

#[derive(Default)]
struct LoopbackState {
    session: u64,
    sink: Option<TransportSink>,
    subscribed: BTreeSet<String>,
    calls: Vec<LoopbackCall>,
    fail_next_open: Option<RealtimeError>,
}

/// Transport that loops events back from the test or demo driving it
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` call fail synchronously with `error`
    pub fn fail_next_open(&self, error: RealtimeError) {
        self.state.lock().fail_next_open = Some(error);
    }

    /// Report the current session as connected
    pub fn establish(&self, socket_id: &str) -> bool {
        self.emit(TransportEvent::Connected {
            socket_id: socket_id.to_string(),
        })
    }

    /// Report a transport error on the current session
    pub fn fail(&self, error: RealtimeError) -> bool {
        self.emit(TransportEvent::Error(error))
    }

    /// Report that the current session dropped and is being retried
    pub fn interrupt(&self) -> bool {
        self.emit(TransportEvent::Interrupted)
    }

    /// Deliver an application event. Only subscribed channels receive events.
    pub fn deliver(&self, channel: &str, event: &str, data: Value) -> bool {
        if !self.state.lock().subscribed.contains(channel) {
            return false;
        }
        self.emit(TransportEvent::Message {
            channel: channel.to_string(),
            event: event.to_string(),
            data,
        })
    }

    /// Push any event into the current session's sink.
    /// Returns false when no session is open.
    pub fn emit(&self, event: TransportEvent) -> bool {
        // Clone the sink out so the lock is free while the manager runs.
        let sink = self.state.lock().sink.clone();
        match sink {
            Some(sink) => {
                sink(event);
                true
            }
            None => false,
        }
    }

    /// Every call observed so far, in order
    pub fn calls(&self) -> Vec<LoopbackCall> {
        self.state.lock().calls.clone()
    }

    pub fn open_count(&self) -> usize {
        self.count(|c| matches!(c, LoopbackCall::Open { .. }))
    }

    pub fn close_count(&self) -> usize {
        self.count(|c| matches!(c, LoopbackCall::Close { .. }))
    }

    /// Channels subscribed on the current session
    pub fn subscribed_channels(&self) -> Vec<String> {
        self.state.lock().subscribed.iter().cloned().collect()
    }

    pub fn has_session(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    fn count(&self, pred: impl Fn(&LoopbackCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }
}

impl Transport for LoopbackTransport {
    fn open(
        &self,
        key: &str,
        _options: &ConnectOptions,
        sink: TransportSink,
    ) -> RealtimeResult<Box<dyn TransportHandle>> {
        let mut state = self.state.lock();
        if let Some(error) = state.fail_next_open.take() {
            return Err(error);
        }

        state.session += 1;
        let session = state.session;
        state.sink = Some(sink);
        state.subscribed.clear();
        state.calls.push(LoopbackCall::Open {
            key: key.to_string(),
            session,
        });

        Ok(Box::new(LoopbackHandle {
            state: Arc::clone(&self.state),
            session,
        }))
    }
}

struct LoopbackHandle {
    state: Arc<Mutex<LoopbackState>>,
    session: u64,
}

impl LoopbackHandle {
    /// Mutate shared state only while this handle's session is current
    fn with_current<F: FnOnce(&mut LoopbackState)>(&self, f: F) {
        let mut state = self.state.lock();
        if state.session == self.session {
            f(&mut state);
        }
    }
}

impl TransportHandle for LoopbackHandle {
    fn subscribe(&self, channel: &str) {
        let session = self.session;
        self.with_current(|state| {
            state.subscribed.insert(channel.to_string());
            state.calls.push(LoopbackCall::Subscribe {
                channel: channel.to_string(),
                session,
            });
        });
    }

    fn unsubscribe(&self, channel: &str) {
        let session = self.session;
        self.with_current(|state| {
            state.subscribed.remove(channel);
            state.calls.push(LoopbackCall::Unsubscribe {
                channel: channel.to_string(),
                session,
            });
        });
    }

    fn close(&self) {
        let session = self.session;
        self.with_current(|state| {
            if state.sink.take().is_some() {
                state.subscribed.clear();
                state.calls.push(LoopbackCall::Close { session });
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_sink() -> (TransportSink, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let sink: TransportSink = Arc::new(move |_event| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (sink, count)
    }

    #[test]
    fn test_deliver_requires_subscription() {
        let transport = LoopbackTransport::new();
        let (sink, count) = counting_sink();
        let handle = transport
            .open("key", &ConnectOptions::default(), sink)
            .unwrap();

        assert!(!transport.deliver("private-budgets", "budget-created", Value::Null));
        handle.subscribe("private-budgets");
        assert!(transport.deliver("private-budgets", "budget-created", Value::Null));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let transport = LoopbackTransport::new();
        let (sink, _) = counting_sink();
        let handle = transport
            .open("key", &ConnectOptions::default(), sink)
            .unwrap();

        handle.close();
        handle.close();
        assert_eq!(transport.close_count(), 1);
        assert!(!transport.has_session());
    }

    #[test]
    fn test_stale_handle_does_not_touch_new_session() {
        let transport = LoopbackTransport::new();
        let (sink, _) = counting_sink();
        let old = transport
            .open("key", &ConnectOptions::default(), sink.clone())
            .unwrap();
        let _new = transport
            .open("key", &ConnectOptions::default(), sink)
            .unwrap();

        old.close();
        assert!(transport.has_session());
        assert_eq!(transport.close_count(), 0);
    }

    #[test]
    fn test_fail_next_open() {
        let transport = LoopbackTransport::new();
        transport.fail_next_open(RealtimeError::transport("refused"));
        let (sink, _) = counting_sink();
        assert!(transport.open("key", &ConnectOptions::default(), sink).is_err());
    }
}
