//! Disposers returned by [`ChannelRouter::subscribe`](super::ChannelRouter::subscribe)

use std::sync::Weak;

use super::registry::{BindingId, BindingTable};

/// Unbinds one `(channel, event)` binding when disposed or dropped.
///
/// Only the binding this disposer was created for is removed: if the pair
/// has been re-bound since, disposing is a no-op.
#[must_use = "dropping a Disposer unbinds the callback immediately"]
pub struct Disposer {
    target: Option<Target>,
}

struct Target {
    table: Weak<BindingTable>,
    channel: String,
    event: String,
    id: BindingId,
}

impl Disposer {
    pub(crate) fn new(table: Weak<BindingTable>, channel: &str, event: &str, id: BindingId) -> Self {
        Self {
            target: Some(Target {
                table,
                channel: channel.to_string(),
                event: event.to_string(),
                id,
            }),
        }
    }

    /// A disposer that does nothing (returned when no connection exists)
    pub fn noop() -> Self {
        Self { target: None }
    }

    pub fn is_noop(&self) -> bool {
        self.target.is_none()
    }

    /// True while the binding this disposer was created for is still in
    /// place (not disposed, not replaced by a later subscribe)
    pub fn is_active(&self) -> bool {
        match &self.target {
            Some(target) => target
                .table
                .upgrade()
                .map(|table| table.holds(&target.channel, &target.event, target.id))
                .unwrap_or(false),
            None => false,
        }
    }

    /// Unbind now. Returns true if the binding was still active.
    pub fn dispose(mut self) -> bool {
        self.release()
    }

    fn release(&mut self) -> bool {
        match self.target.take() {
            Some(target) => match target.table.upgrade() {
                Some(table) => table.unbind(&target.channel, &target.event, target.id),
                None => false,
            },
            None => false,
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.target {
            Some(t) => f
                .debug_struct("Disposer")
                .field("channel", &t.channel)
                .field("event", &t.event)
                .finish(),
            None => f.write_str("Disposer(noop)"),
        }
    }
}
