//! Channel/event router
//!
//! Multiplexes named channels and events on the manager's single
//! connection. Channel subscriptions are created on first use and shared by
//! every event bound on them; each `(channel, event)` pair holds exactly one
//! callback.

mod disposer;
pub mod registry;

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::connection::ConnectionManager;
use crate::error::RealtimeError;

pub use disposer::Disposer;
pub use registry::{BindingTable, EventCallback};

/// Subscribe/unsubscribe front end over the connection manager
pub struct ChannelRouter {
    manager: Arc<ConnectionManager>,
}

impl ChannelRouter {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Bind `callback` to `event` on `channel`.
    ///
    /// Re-binding the same pair replaces the earlier callback. Without a
    /// connection the call is logged and a no-op [`Disposer`] is returned.
    pub fn subscribe<F>(&self, channel: &str, event: &str, callback: F) -> Disposer
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        if !self.manager.has_session() {
            let error = RealtimeError::subscription(channel, "no realtime connection");
            warn!(event = %event, error = %error, "subscribe ignored");
            return Disposer::noop();
        }

        let bindings = self.manager.bindings();
        let bound = bindings.bind(channel, event, Arc::new(callback));
        if bound.new_channel {
            debug!(channel = %channel, "subscribing channel");
            self.manager.subscribe_channel(channel);
        }
        if bound.replaced {
            debug!(channel = %channel, event = %event, "replaced existing binding");
        }

        Disposer::new(Arc::downgrade(bindings), channel, event, bound.id)
    }

    /// Remove every binding on `channel` and release its subscription.
    /// Returns the number of bindings removed.
    pub fn unsubscribe(&self, channel: &str) -> usize {
        if !self.manager.has_session() {
            let error = RealtimeError::subscription(channel, "no realtime connection");
            warn!(error = %error, "unsubscribe ignored");
            return 0;
        }

        match self.manager.bindings().remove_channel(channel) {
            Some(removed) => {
                debug!(channel = %channel, removed, "unsubscribing channel");
                self.manager.unsubscribe_channel(channel);
                removed
            }
            None => 0,
        }
    }

    pub fn is_bound(&self, channel: &str, event: &str) -> bool {
        self.manager.bindings().is_bound(channel, event)
    }

    pub fn binding_count(&self, channel: &str) -> usize {
        self.manager.bindings().binding_count(channel)
    }

    pub fn is_subscribed(&self, channel: &str) -> bool {
        self.manager.bindings().has_channel(channel)
    }

    /// Subscribed channels, sorted
    pub fn channels(&self) -> Vec<String> {
        self.manager.bindings().channels()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConnectOptions;
    use crate::transport::LoopbackTransport;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn connected() -> (ChannelRouter, LoopbackTransport) {
        let transport = LoopbackTransport::new();
        let manager = ConnectionManager::new(Arc::new(transport.clone()));
        manager.connect("app-key", ConnectOptions::default()).unwrap();
        transport.establish("1.1");
        (ChannelRouter::new(manager), transport)
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Value) + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        (hits, move |_: &Value| {
            seen.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_subscribe_forwards_channel_once() {
        let (router, transport) = connected();
        let (_, a) = counter();
        let (_, b) = counter();

        let _d1 = router.subscribe("private-budgets", "budget-created", a);
        let _d2 = router.subscribe("private-budgets", "budget-updated", b);

        assert_eq!(transport.subscribed_channels(), vec!["private-budgets".to_string()]);
        assert_eq!(router.binding_count("private-budgets"), 2);
    }

    #[test]
    fn test_replaced_disposer_is_inactive() {
        let (router, _) = connected();
        let first = router.subscribe("private-invoices", "invoice-paid", |_| {});
        assert!(first.is_active());

        let second = router.subscribe("private-invoices", "invoice-paid", |_| {});
        assert!(!first.is_active());
        assert!(second.is_active());

        assert!(second.dispose());
        assert!(!first.is_active());
    }

    #[test]
    fn test_same_pair_twice_keeps_one_callback() {
        let (router, transport) = connected();
        let (first_hits, first) = counter();
        let (second_hits, second) = counter();

        let _d1 = router.subscribe("private-invoices", "invoice-created", first);
        let d2 = router.subscribe("private-invoices", "invoice-created", second);
        assert_eq!(router.binding_count("private-invoices"), 1);

        transport.deliver("private-invoices", "invoice-created", json!({}));
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);

        assert!(d2.dispose());
        assert_eq!(router.binding_count("private-invoices"), 0);
    }

    #[test]
    fn test_disposer_leaves_other_events_bound() {
        let (router, transport) = connected();
        let (created_hits, created) = counter();
        let (deleted_hits, deleted) = counter();

        let d_created = router.subscribe("private-budgets", "budget-created", created);
        let _d_deleted = router.subscribe("private-budgets", "budget-deleted", deleted);
        d_created.dispose();

        transport.deliver("private-budgets", "budget-created", json!({}));
        transport.deliver("private-budgets", "budget-deleted", json!({"id": "b1"}));
        assert_eq!(created_hits.load(Ordering::SeqCst), 0);
        assert_eq!(deleted_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_removes_all_bindings() {
        let (router, transport) = connected();
        let (_, a) = counter();
        let (_, b) = counter();
        let _d1 = router.subscribe("private-transactions", "transaction-created", a);
        let _d2 = router.subscribe("private-transactions", "transaction-deleted", b);

        assert_eq!(router.unsubscribe("private-transactions"), 2);
        assert!(!router.is_subscribed("private-transactions"));
        assert!(transport.subscribed_channels().is_empty());
    }

    #[test]
    fn test_subscribe_without_connection_is_noop() {
        let transport = LoopbackTransport::new();
        let router = ChannelRouter::new(ConnectionManager::new(Arc::new(transport.clone())));
        let (_, cb) = counter();

        let disposer = router.subscribe("private-budgets", "budget-created", cb);
        assert!(disposer.is_noop());
        assert!(!disposer.dispose());
        assert!(router.channels().is_empty());
        assert_eq!(router.unsubscribe("private-budgets"), 0);
    }

    #[test]
    fn test_channels_resubscribed_after_reconnect() {
        let (router, transport) = connected();
        let (_, cb) = counter();
        let _d = router.subscribe("private-budgets", "budget-created", cb);

        transport.fail(RealtimeError::transport("socket closed"));
        router.manager().reconnect().unwrap();

        assert_eq!(transport.open_count(), 2);
        assert_eq!(transport.subscribed_channels(), vec!["private-budgets".to_string()]);
    }
}
