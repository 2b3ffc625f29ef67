//! Entity reconciliation
//!
//! One generic [`Reconciler`] serves every entity kind; the kind decides the
//! channel, the event names, the cache key and the [`NotificationRules`].

mod collection;
mod entity;
mod reconciler;
mod rules;

pub use collection::{Change, EntityCollection, NoOp};
pub use entity::{EntityKind, Lifecycle, SyncEntity};
pub use reconciler::{
    CollectionView, Hook, Reconciler, ReconcilerOptions, SubscriptionStatus,
};
pub use rules::{NotificationRules, StatusRule};
