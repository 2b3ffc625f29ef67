//! Shared state of the status API

use std::sync::Arc;

use crate::client::RealtimeClient;
use crate::sync::{CollectionView, EntityKind};

pub struct AppState {
    pub client: RealtimeClient,
    collections: Vec<Arc<dyn CollectionView>>,
}

impl AppState {
    pub fn new(client: RealtimeClient) -> Self {
        Self {
            client,
            collections: Vec::new(),
        }
    }

    /// Expose a reconciler's collection. A later registration for the same
    /// kind replaces the earlier one.
    pub fn with_collection(mut self, view: Arc<dyn CollectionView>) -> Self {
        let kind = view.kind();
        self.collections.retain(|existing| existing.kind() != kind);
        self.collections.push(view);
        self
    }

    pub fn collection(&self, kind: EntityKind) -> Option<&Arc<dyn CollectionView>> {
        self.collections.iter().find(|view| view.kind() == kind)
    }

    pub fn collections(&self) -> &[Arc<dyn CollectionView>] {
        &self.collections
    }
}
