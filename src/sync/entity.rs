//! Entity kinds and the trait every synchronized record implements

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::types::{Budget, BudgetRequest, Invoice, RecordStatus, Transaction};

/// The three lifecycle events published per entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Created,
    Updated,
    Deleted,
}

impl Lifecycle {
    pub const ALL: [Lifecycle; 3] = [Lifecycle::Created, Lifecycle::Updated, Lifecycle::Deleted];

    pub fn as_str(self) -> &'static str {
        match self {
            Lifecycle::Created => "created",
            Lifecycle::Updated => "updated",
            Lifecycle::Deleted => "deleted",
        }
    }
}

/// Which collection a record belongs to. Determines channel, event names
/// and cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Budget,
    BudgetRequest,
    Invoice,
    Transaction,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Budget,
        EntityKind::BudgetRequest,
        EntityKind::Invoice,
        EntityKind::Transaction,
    ];

    /// Event name prefix, e.g. `budget-request`
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Budget => "budget",
            EntityKind::BudgetRequest => "budget-request",
            EntityKind::Invoice => "invoice",
            EntityKind::Transaction => "transaction",
        }
    }

    /// Plural slug used for the cache key and API path
    pub fn plural(self) -> &'static str {
        match self {
            EntityKind::Budget => "budgets",
            EntityKind::BudgetRequest => "budget-requests",
            EntityKind::Invoice => "invoices",
            EntityKind::Transaction => "transactions",
        }
    }

    pub fn channel(self) -> String {
        format!("private-{}", self.plural())
    }

    /// Full event name, e.g. `invoice-deleted`
    pub fn event(self, lifecycle: Lifecycle) -> String {
        format!("{}-{}", self.prefix(), lifecycle.as_str())
    }

    pub fn cache_key(self) -> &'static str {
        self.plural()
    }

    /// Human-readable noun for notifications
    pub fn noun(self) -> &'static str {
        match self {
            EntityKind::Budget => "Budget",
            EntityKind::BudgetRequest => "Budget request",
            EntityKind::Invoice => "Invoice",
            EntityKind::Transaction => "Transaction",
        }
    }

    pub fn from_plural(plural: &str) -> Option<Self> {
        EntityKind::ALL.into_iter().find(|kind| kind.plural() == plural)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A record kept in sync by a [`Reconciler`](super::Reconciler)
pub trait SyncEntity:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Short label used in notifications (name, title, number...)
    fn label(&self) -> &str;

    /// Workflow status, for kinds that have one
    fn status(&self) -> Option<&RecordStatus> {
        None
    }
}

impl SyncEntity for Budget {
    const KIND: EntityKind = EntityKind::Budget;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn status(&self) -> Option<&RecordStatus> {
        Some(&self.status)
    }
}

impl SyncEntity for BudgetRequest {
    const KIND: EntityKind = EntityKind::BudgetRequest;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.title
    }

    fn status(&self) -> Option<&RecordStatus> {
        Some(&self.status)
    }
}

impl SyncEntity for Invoice {
    const KIND: EntityKind = EntityKind::Invoice;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.invoice_number
    }

    fn status(&self) -> Option<&RecordStatus> {
        Some(&self.status)
    }
}

impl SyncEntity for Transaction {
    const KIND: EntityKind = EntityKind::Transaction;

    fn id(&self) -> &str {
        &self.id
    }

    fn label(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_and_event_names() {
        assert_eq!(EntityKind::Budget.channel(), "private-budgets");
        assert_eq!(EntityKind::BudgetRequest.channel(), "private-budget-requests");
        assert_eq!(EntityKind::Invoice.channel(), "private-invoices");
        assert_eq!(EntityKind::Transaction.channel(), "private-transactions");

        assert_eq!(
            EntityKind::BudgetRequest.event(Lifecycle::Created),
            "budget-request-created"
        );
        assert_eq!(EntityKind::Transaction.event(Lifecycle::Deleted), "transaction-deleted");
    }

    #[test]
    fn test_from_plural() {
        assert_eq!(EntityKind::from_plural("invoices"), Some(EntityKind::Invoice));
        assert_eq!(EntityKind::from_plural("suppliers"), None);
    }
}
