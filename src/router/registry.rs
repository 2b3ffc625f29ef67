//! Channel subscription and event binding registry
//!
//! One entry per channel; each channel maps event names to exactly one
//! binding. Callbacks are cloned out before they run so no lock is held
//! while user code executes.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

/// Callback invoked with the decoded event payload
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies one particular binding of a `(channel, event)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

struct Binding {
    id: BindingId,
    callback: EventCallback,
}

#[derive(Default)]
struct ChannelEntry {
    events: HashMap<String, Binding>,
    confirmed: bool,
}

/// Result of binding a callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bound {
    pub id: BindingId,
    /// The channel had no subscription before this call
    pub new_channel: bool,
    /// An earlier callback for the same pair was replaced
    pub replaced: bool,
}

/// Shared table of channel subscriptions and their event bindings
#[derive(Default)]
pub struct BindingTable {
    channels: RwLock<BTreeMap<String, ChannelEntry>>,
    next_id: AtomicU64,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callback` to `(channel, event)`, replacing any previous binding
    pub fn bind(&self, channel: &str, event: &str, callback: EventCallback) -> Bound {
        let id = BindingId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let mut channels = self.channels.write();

        let new_channel = !channels.contains_key(channel);
        let entry = channels.entry(channel.to_string()).or_default();
        let replaced = entry
            .events
            .insert(event.to_string(), Binding { id, callback })
            .is_some();

        Bound {
            id,
            new_channel,
            replaced,
        }
    }

    /// Remove the binding of `(channel, event)` only if it is still `id`.
    /// Returns true if something was removed.
    pub fn unbind(&self, channel: &str, event: &str, id: BindingId) -> bool {
        let mut channels = self.channels.write();
        let Some(entry) = channels.get_mut(channel) else {
            return false;
        };

        match entry.events.get(event) {
            Some(binding) if binding.id == id => {
                entry.events.remove(event);
                true
            }
            _ => false,
        }
    }

    /// Drop a channel and every binding on it. Returns the number of
    /// bindings removed, or `None` if the channel was not subscribed.
    pub fn remove_channel(&self, channel: &str) -> Option<usize> {
        self.channels
            .write()
            .remove(channel)
            .map(|entry| entry.events.len())
    }

    /// Invoke the callback bound to `(channel, event)`, if any
    pub fn dispatch(&self, channel: &str, event: &str, data: &Value) -> bool {
        let callback = {
            let channels = self.channels.read();
            channels
                .get(channel)
                .and_then(|entry| entry.events.get(event))
                .map(|binding| Arc::clone(&binding.callback))
        };

        match callback {
            Some(callback) => {
                callback(data);
                true
            }
            None => false,
        }
    }

    pub fn mark_confirmed(&self, channel: &str, confirmed: bool) {
        if let Some(entry) = self.channels.write().get_mut(channel) {
            entry.confirmed = confirmed;
        }
    }

    /// Clear server confirmations, e.g. after the session dropped
    pub fn reset_confirmations(&self) {
        for entry in self.channels.write().values_mut() {
            entry.confirmed = false;
        }
    }

    pub fn is_confirmed(&self, channel: &str) -> bool {
        self.channels
            .read()
            .get(channel)
            .map(|entry| entry.confirmed)
            .unwrap_or(false)
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.read().contains_key(channel)
    }

    pub fn is_bound(&self, channel: &str, event: &str) -> bool {
        self.channels
            .read()
            .get(channel)
            .map(|entry| entry.events.contains_key(event))
            .unwrap_or(false)
    }

    /// True if `(channel, event)` is still bound to `id`
    pub fn holds(&self, channel: &str, event: &str, id: BindingId) -> bool {
        self.channels
            .read()
            .get(channel)
            .and_then(|entry| entry.events.get(event))
            .map(|binding| binding.id == id)
            .unwrap_or(false)
    }

    /// Number of bindings on a channel (0 if not subscribed)
    pub fn binding_count(&self, channel: &str) -> usize {
        self.channels
            .read()
            .get(channel)
            .map(|entry| entry.events.len())
            .unwrap_or(0)
    }

    /// Subscribed channel names, sorted
    pub fn channels(&self) -> Vec<String> {
        self.channels.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (EventCallback, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let callback: EventCallback = Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (callback, hits)
    }

    #[test]
    fn test_rebind_replaces_callback() {
        let table = BindingTable::new();
        let (first, first_hits) = counter();
        let (second, second_hits) = counter();

        let a = table.bind("private-budgets", "budget-created", first);
        let b = table.bind("private-budgets", "budget-created", second);
        assert!(a.new_channel);
        assert!(!b.new_channel);
        assert!(b.replaced);

        table.dispatch("private-budgets", "budget-created", &Value::Null);
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stale_unbind_is_noop() {
        let table = BindingTable::new();
        let (cb, _) = counter();
        let a = table.bind("c", "e", cb.clone());
        let b = table.bind("c", "e", cb);

        assert!(!table.unbind("c", "e", a.id));
        assert!(table.is_bound("c", "e"));
        assert!(!table.holds("c", "e", a.id));
        assert!(table.holds("c", "e", b.id));
        assert!(table.unbind("c", "e", b.id));
        assert_eq!(table.binding_count("c"), 0);
        // The channel subscription itself survives an unbind
        assert!(table.has_channel("c"));
    }

    #[test]
    fn test_remove_channel_drops_all_events() {
        let table = BindingTable::new();
        let (cb, _) = counter();
        table.bind("c", "one", cb.clone());
        table.bind("c", "two", cb);

        assert_eq!(table.remove_channel("c"), Some(2));
        assert_eq!(table.remove_channel("c"), None);
        assert!(!table.dispatch("c", "one", &Value::Null));
    }

    #[test]
    fn test_callback_may_rebind_during_dispatch() {
        let table = Arc::new(BindingTable::new());
        let inner = Arc::clone(&table);
        let callback: EventCallback = Arc::new(move |_| {
            let (cb, _) = counter();
            inner.bind("c", "other", cb);
        });
        table.bind("c", "e", callback);

        assert!(table.dispatch("c", "e", &Value::Null));
        assert!(table.is_bound("c", "other"));
    }
}
