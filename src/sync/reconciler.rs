//! Generic entity reconciler
//!
//! Merges `<entity>-created|updated|deleted` events into an ordered
//! collection. Every realtime callback holds only a `Weak` reference to the
//! reconciler, so dropping the last [`Reconciler`] handle stops
//! reconciliation even if a disposer outlived it.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::collection::{Change, EntityCollection};
use super::entity::{EntityKind, Lifecycle, SyncEntity};
use super::rules::NotificationRules;
use crate::cache::{load_records, store_records, FallbackCache};
use crate::client::RealtimeClient;
use crate::connection::ConnectionManager;
use crate::error::RealtimeError;
use crate::notify::NotificationBus;
use crate::router::{ChannelRouter, Disposer};
use crate::types::DeletedPayload;

/// Hook run after a change has been applied locally
pub type Hook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Whether the reconciler is currently receiving realtime events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Subscribed,
    Unsubscribed,
}

/// Per-reconciler behaviour
pub struct ReconcilerOptions<T: SyncEntity> {
    pub rules: NotificationRules,
    /// Persist the collection to the fallback cache after every change
    pub cache_on_change: bool,
    pub on_created: Option<Hook<T>>,
    pub on_updated: Option<Hook<T>>,
    pub on_deleted: Option<Hook<T>>,
}

impl<T: SyncEntity> Default for ReconcilerOptions<T> {
    fn default() -> Self {
        Self {
            rules: NotificationRules::for_kind(T::KIND),
            cache_on_change: false,
            on_created: None,
            on_updated: None,
            on_deleted: None,
        }
    }
}

impl<T: SyncEntity> Clone for ReconcilerOptions<T> {
    fn clone(&self) -> Self {
        Self {
            rules: self.rules.clone(),
            cache_on_change: self.cache_on_change,
            on_created: self.on_created.clone(),
            on_updated: self.on_updated.clone(),
            on_deleted: self.on_deleted.clone(),
        }
    }
}

impl<T: SyncEntity> ReconcilerOptions<T> {
    pub fn with_rules(mut self, rules: NotificationRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn cache_on_change(mut self, enabled: bool) -> Self {
        self.cache_on_change = enabled;
        self
    }

    pub fn on_created<F: Fn(&T) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.on_created = Some(Arc::new(hook));
        self
    }

    pub fn on_updated<F: Fn(&T) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.on_updated = Some(Arc::new(hook));
        self
    }

    pub fn on_deleted<F: Fn(&T) + Send + Sync + 'static>(mut self, hook: F) -> Self {
        self.on_deleted = Some(Arc::new(hook));
        self
    }
}

struct Shared<T: SyncEntity> {
    manager: Arc<ConnectionManager>,
    router: Arc<ChannelRouter>,
    bus: Arc<NotificationBus>,
    cache: Option<Arc<dyn FallbackCache>>,
    options: ReconcilerOptions<T>,
    collection: RwLock<EntityCollection<T>>,
    disposers: Mutex<Vec<Disposer>>,
    shutdown: watch::Sender<bool>,
}

/// Keeps one entity collection in sync with realtime events.
///
/// Cheap to clone; clones share the same collection.
pub struct Reconciler<T: SyncEntity> {
    shared: Arc<Shared<T>>,
}

impl<T: SyncEntity> Clone for Reconciler<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: SyncEntity> fmt::Debug for Reconciler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("kind", &T::KIND)
            .field("len", &self.len())
            .field("status", &self.status())
            .finish()
    }
}

impl<T: SyncEntity> Reconciler<T> {
    pub fn new(client: &RealtimeClient, initial: Vec<T>) -> Self {
        Self::with_options(client, initial, ReconcilerOptions::default())
    }

    /// Create a reconciler seeded with `initial`.
    ///
    /// An empty snapshot is replaced by the fallback cache contents; a
    /// non-empty one is written through to the cache. Realtime bindings are
    /// made right away if the connection is live.
    pub fn with_options(
        client: &RealtimeClient,
        initial: Vec<T>,
        options: ReconcilerOptions<T>,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let reconciler = Self {
            shared: Arc::new(Shared {
                manager: Arc::clone(client.manager()),
                router: Arc::clone(client.router()),
                bus: Arc::clone(client.bus()),
                cache: client.cache().cloned(),
                options,
                collection: RwLock::new(EntityCollection::default()),
                disposers: Mutex::new(Vec::new()),
                shutdown,
            }),
        };

        reconciler.seed(initial);
        reconciler.sync_with_connection();
        reconciler
    }

    pub fn kind(&self) -> EntityKind {
        T::KIND
    }

    /// Current records, newest first
    pub fn records(&self) -> Vec<T> {
        self.shared.collection.read().records().to_vec()
    }

    /// Slice of the current records for paginated views
    pub fn page(&self, offset: usize, limit: usize) -> Vec<T> {
        self.shared
            .collection
            .read()
            .records()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<T> {
        self.shared.collection.read().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.shared.collection.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribed while the connection is connected or connecting and the
    /// event bindings are in place
    pub fn status(&self) -> SubscriptionStatus {
        if self.shared.manager.state().is_live() && self.is_bound() {
            SubscriptionStatus::Subscribed
        } else {
            SubscriptionStatus::Unsubscribed
        }
    }

    /// `NoConnection` while the connection is neither connected nor
    /// connecting. The last known collection is kept meanwhile.
    pub fn error(&self) -> Option<RealtimeError> {
        if self.shared.manager.state().is_live() {
            None
        } else {
            Some(RealtimeError::NoConnection)
        }
    }

    /// Replace the whole collection with a fresh server snapshot
    pub fn reseed(&self, records: Vec<T>) {
        let empty = records.is_empty();
        self.shared.collection.write().replace_all(records);
        info!(kind = %T::KIND, len = self.len(), "collection reseeded");
        // An empty snapshot never overwrites the fallback copy
        if !empty {
            self.write_through();
        }
    }

    /// Bind the lifecycle events if the connection is live and they are not
    /// bound yet. Returns the resulting status.
    pub fn sync_with_connection(&self) -> SubscriptionStatus {
        if *self.shared.shutdown.borrow() {
            return SubscriptionStatus::Unsubscribed;
        }

        let state = self.shared.manager.state();
        if state.is_live() && !self.is_bound() {
            self.bind();
        }

        let status = self.status();
        debug!(kind = %T::KIND, state = %state, status = ?status, "subscription status");
        status
    }

    /// Re-evaluate the subscription on every connection state change until
    /// [`teardown`](Self::teardown) is called or the reconciler is dropped.
    pub async fn follow_connection(self) {
        let weak = Arc::downgrade(&self.shared);
        let mut states = self.shared.manager.watch();
        let mut shutdown = self.shared.shutdown.subscribe();
        drop(self);

        loop {
            let active = !*shutdown.borrow();
            let Some(shared) = weak.upgrade().filter(|_| active) else {
                break;
            };
            Reconciler { shared }.sync_with_connection();

            tokio::select! {
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(kind = %T::KIND, "stopped following connection");
    }

    /// Apply a created record
    pub fn handle_created(&self, record: T) -> Change<T> {
        let change = self.shared.collection.write().apply_created(record.clone());
        if let Change::Ignored(reason) = &change {
            debug!(kind = %T::KIND, id = %record.id(), reason = ?reason, "created event ignored");
            return change;
        }

        self.write_through_on_change();
        if let Some(hook) = &self.shared.options.on_created {
            hook(&record);
        }
        if let Some(toast) = self.shared.options.rules.created(&record) {
            self.shared.bus.emit(toast);
        }
        change
    }

    /// Apply an updated record. Unknown ids are dropped.
    pub fn handle_updated(&self, record: T) -> Change<T> {
        let change = self.shared.collection.write().apply_updated(record.clone());
        match &change {
            Change::Replaced { previous } => {
                self.write_through_on_change();
                if let Some(hook) = &self.shared.options.on_updated {
                    hook(&record);
                }
                if let Some(toast) = self.shared.options.rules.updated(previous, &record) {
                    self.shared.bus.emit(toast);
                }
            }
            other => {
                debug!(kind = %T::KIND, id = %record.id(), change = ?other, "updated event ignored");
            }
        }
        change
    }

    pub fn handle_deleted(&self, id: &str) -> Change<T> {
        let change = self.shared.collection.write().apply_deleted(id);
        match &change {
            Change::Removed { removed } => {
                self.write_through_on_change();
                if let Some(hook) = &self.shared.options.on_deleted {
                    hook(removed);
                }
                if let Some(toast) = self.shared.options.rules.deleted(removed) {
                    self.shared.bus.emit(toast);
                }
            }
            other => {
                debug!(kind = %T::KIND, id = %id, change = ?other, "deleted event ignored");
            }
        }
        change
    }

    /// Drop the event bindings and release the channel if nothing else is
    /// bound on it. Safe to call repeatedly.
    pub fn teardown(&self) {
        self.shared.shutdown.send_replace(true);

        let disposers: Vec<Disposer> = std::mem::take(&mut *self.shared.disposers.lock());
        if disposers.is_empty() {
            return;
        }
        for disposer in disposers {
            disposer.dispose();
        }

        let channel = T::KIND.channel();
        let router = &self.shared.router;
        if router.is_subscribed(&channel) && router.binding_count(&channel) == 0 {
            router.unsubscribe(&channel);
        }
        info!(kind = %T::KIND, "reconciler torn down");
    }

    /// True only while this reconciler's own bindings are in place. Another
    /// subscriber re-binding the same events takes them over.
    fn is_bound(&self) -> bool {
        let disposers = self.shared.disposers.lock();
        disposers.len() == Lifecycle::ALL.len() && disposers.iter().all(Disposer::is_active)
    }

    fn bind(&self) {
        let channel = T::KIND.channel();
        let mut disposers = Vec::with_capacity(Lifecycle::ALL.len());

        for lifecycle in Lifecycle::ALL {
            let weak: Weak<Shared<T>> = Arc::downgrade(&self.shared);
            let disposer = self.shared.router.subscribe(
                &channel,
                &T::KIND.event(lifecycle),
                move |data: &Value| {
                    if let Some(shared) = weak.upgrade() {
                        Reconciler { shared }.dispatch(lifecycle, data);
                    }
                },
            );
            if disposer.is_noop() {
                return;
            }
            disposers.push(disposer);
        }

        debug!(kind = %T::KIND, channel = %channel, "lifecycle events bound");
        *self.shared.disposers.lock() = disposers;
    }

    fn dispatch(&self, lifecycle: Lifecycle, data: &Value) {
        match lifecycle {
            Lifecycle::Created => match serde_json::from_value::<T>(data.clone()) {
                Ok(record) => {
                    self.handle_created(record);
                }
                Err(error) => self.log_undecodable(lifecycle, &error),
            },
            Lifecycle::Updated => match serde_json::from_value::<T>(data.clone()) {
                Ok(record) => {
                    self.handle_updated(record);
                }
                Err(error) => self.log_undecodable(lifecycle, &error),
            },
            Lifecycle::Deleted => match serde_json::from_value::<DeletedPayload>(data.clone()) {
                Ok(payload) => {
                    self.handle_deleted(&payload.id);
                }
                Err(error) => self.log_undecodable(lifecycle, &error),
            },
        }
    }

    fn log_undecodable(&self, lifecycle: Lifecycle, error: &serde_json::Error) {
        warn!(
            kind = %T::KIND,
            event = %T::KIND.event(lifecycle),
            error = %error,
            "dropping undecodable event payload"
        );
    }

    fn seed(&self, initial: Vec<T>) {
        if !initial.is_empty() {
            self.shared.collection.write().replace_all(initial);
            self.write_through();
            return;
        }

        let Some(cache) = &self.shared.cache else {
            return;
        };
        match load_records::<T>(cache.as_ref(), T::KIND.cache_key()) {
            Ok(records) => {
                if !records.is_empty() {
                    info!(kind = %T::KIND, len = records.len(), "seeded from fallback cache");
                }
                self.shared.collection.write().replace_all(records);
            }
            Err(error) => warn!(kind = %T::KIND, error = %error, "fallback cache read failed"),
        }
    }

    fn write_through_on_change(&self) {
        if self.shared.options.cache_on_change {
            self.write_through();
        }
    }

    fn write_through(&self) {
        let Some(cache) = &self.shared.cache else {
            return;
        };
        let records = self.records();
        if let Err(error) = store_records(cache.as_ref(), T::KIND.cache_key(), &records) {
            warn!(kind = %T::KIND, error = %error, "fallback cache write failed");
        }
    }
}

/// Type-erased view of a reconciler, for status and listing endpoints
pub trait CollectionView: Send + Sync {
    fn kind(&self) -> EntityKind;

    fn status(&self) -> SubscriptionStatus;

    fn len(&self) -> usize;

    /// Records in `[offset, offset + limit)` as JSON
    fn page_json(&self, offset: usize, limit: usize) -> Vec<Value>;
}

impl<T: SyncEntity> CollectionView for Reconciler<T> {
    fn kind(&self) -> EntityKind {
        T::KIND
    }

    fn status(&self) -> SubscriptionStatus {
        Reconciler::status(self)
    }

    fn len(&self) -> usize {
        Reconciler::len(self)
    }

    fn page_json(&self, offset: usize, limit: usize) -> Vec<Value> {
        self.page(offset, limit)
            .iter()
            .filter_map(|record| serde_json::to_value(record).ok())
            .collect()
    }
}
