//! Realtime client facade
//!
//! Wires the connection manager, router, notification bus and optional
//! fallback cache together and hands out reconcilers that share them.

use std::sync::Arc;

use crate::cache::FallbackCache;
use crate::config::RealtimeConfig;
use crate::connection::{ConnectOutcome, ConnectionManager, ReconnectOutcome};
use crate::error::RealtimeResult;
use crate::notify::NotificationBus;
use crate::router::ChannelRouter;
use crate::sync::{Reconciler, ReconcilerOptions, SyncEntity};
use crate::transport::Transport;

/// Shared handles of one realtime session. Cheap to clone.
#[derive(Clone)]
pub struct RealtimeClient {
    manager: Arc<ConnectionManager>,
    router: Arc<ChannelRouter>,
    bus: Arc<NotificationBus>,
    cache: Option<Arc<dyn FallbackCache>>,
}

impl RealtimeClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let manager = ConnectionManager::new(transport);
        Self {
            router: Arc::new(ChannelRouter::new(Arc::clone(&manager))),
            manager,
            bus: Arc::new(NotificationBus::new()),
            cache: None,
        }
    }

    /// Use an existing bus instead of a private one
    pub fn with_bus(mut self, bus: Arc<NotificationBus>) -> Self {
        self.bus = bus;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn FallbackCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    pub fn router(&self) -> &Arc<ChannelRouter> {
        &self.router
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    pub fn cache(&self) -> Option<&Arc<dyn FallbackCache>> {
        self.cache.as_ref()
    }

    pub fn connect(&self, config: &RealtimeConfig) -> RealtimeResult<ConnectOutcome> {
        self.manager.connect_with(config)
    }

    pub fn reconnect(&self) -> RealtimeResult<ReconnectOutcome> {
        self.manager.reconnect()
    }

    pub fn disconnect(&self) {
        self.manager.disconnect()
    }

    /// Reconciler with the default notification rules for `T`
    pub fn reconciler<T: SyncEntity>(&self, initial: Vec<T>) -> Reconciler<T> {
        Reconciler::new(self, initial)
    }

    pub fn reconciler_with<T: SyncEntity>(
        &self,
        initial: Vec<T>,
        options: ReconcilerOptions<T>,
    ) -> Reconciler<T> {
        Reconciler::with_options(self, initial, options)
    }
}
