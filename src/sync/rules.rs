//! Which toast a reconciled change produces

use std::time::Duration;

use super::entity::{EntityKind, SyncEntity};
use crate::types::{RecordStatus, Severity, Toast, DEFAULT_TOAST_DURATION};

/// Toast shown when an update moves a record into `status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRule {
    pub status: RecordStatus,
    pub severity: Severity,
    pub verb: &'static str,
}

impl StatusRule {
    pub fn new(status: RecordStatus, severity: Severity, verb: &'static str) -> Self {
        Self {
            status,
            severity,
            verb,
        }
    }
}

/// Notification strategy of one entity kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRules {
    pub kind: EntityKind,
    pub enabled: bool,
    pub status_rules: Vec<StatusRule>,
    pub duration: Duration,
}

impl NotificationRules {
    pub fn for_kind(kind: EntityKind) -> Self {
        use RecordStatus::*;

        let status_rules = match kind {
            EntityKind::Budget => vec![
                StatusRule::new(Approved, Severity::Success, "approved"),
                StatusRule::new(Rejected, Severity::Error, "rejected"),
                StatusRule::new(Active, Severity::Info, "activated"),
                StatusRule::new(Closed, Severity::Info, "closed"),
            ],
            EntityKind::BudgetRequest => vec![
                StatusRule::new(Approved, Severity::Success, "approved"),
                StatusRule::new(Rejected, Severity::Error, "rejected"),
            ],
            EntityKind::Invoice => vec![
                StatusRule::new(Paid, Severity::Success, "paid"),
                StatusRule::new(Overdue, Severity::Warning, "is overdue"),
                StatusRule::new(Approved, Severity::Success, "approved"),
                StatusRule::new(Rejected, Severity::Error, "rejected"),
                StatusRule::new(Cancelled, Severity::Warning, "cancelled"),
            ],
            EntityKind::Transaction => Vec::new(),
        };

        Self {
            kind,
            enabled: true,
            status_rules,
            duration: DEFAULT_TOAST_DURATION,
        }
    }

    /// Rules that never produce a toast
    pub fn silent(kind: EntityKind) -> Self {
        Self {
            enabled: false,
            ..Self::for_kind(kind)
        }
    }

    pub fn created<T: SyncEntity>(&self, record: &T) -> Option<Toast> {
        self.toast(record, Severity::Success, "created")
    }

    /// A status transition matching a rule selects that rule's toast;
    /// anything else is a generic "updated" info toast.
    pub fn updated<T: SyncEntity>(&self, previous: &T, current: &T) -> Option<Toast> {
        let rule = match (previous.status(), current.status()) {
            (Some(before), Some(after)) if before != after => {
                self.status_rules.iter().find(|rule| &rule.status == after)
            }
            (None, Some(after)) => self.status_rules.iter().find(|rule| &rule.status == after),
            _ => None,
        };

        match rule {
            Some(rule) => self.toast(current, rule.severity, rule.verb),
            None => self.toast(current, Severity::Info, "updated"),
        }
    }

    pub fn deleted<T: SyncEntity>(&self, removed: &T) -> Option<Toast> {
        self.toast(removed, Severity::Info, "deleted")
    }

    fn toast<T: SyncEntity>(&self, record: &T, severity: Severity, verb: &str) -> Option<Toast> {
        if !self.enabled {
            return None;
        }
        let message = match record.label().trim() {
            "" => format!("{} {verb}", self.kind.noun()),
            label => format!("{} \"{label}\" {verb}", self.kind.noun()),
        };
        Some(Toast::new(message, severity).with_duration(self.duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Budget, Invoice, Transaction};
    use rust_decimal::Decimal;

    #[test]
    fn test_budget_approval_is_success() {
        let rules = NotificationRules::for_kind(EntityKind::Budget);
        let before = Budget::new("b1", "Marketing", Decimal::new(100, 0));
        let after = before.clone().with_status(RecordStatus::Approved);

        let toast = rules.updated(&before, &after).unwrap();
        assert_eq!(toast.severity, Severity::Success);
        assert_eq!(toast.message, "Budget \"Marketing\" approved");
    }

    #[test]
    fn test_same_status_is_generic_update() {
        let rules = NotificationRules::for_kind(EntityKind::Invoice);
        let before = Invoice::new("i1", "INV-1", Decimal::new(100, 0)).with_status(RecordStatus::Paid);
        let mut after = before.clone();
        after.amount = Decimal::new(120, 0);

        let toast = rules.updated(&before, &after).unwrap();
        assert_eq!(toast.severity, Severity::Info);
        assert_eq!(toast.message, "Invoice \"INV-1\" updated");
    }

    #[test]
    fn test_overdue_invoice_warns() {
        let rules = NotificationRules::for_kind(EntityKind::Invoice);
        let before = Invoice::new("i1", "INV-1", Decimal::new(100, 0));
        let after = before.clone().with_status(RecordStatus::Overdue);
        assert_eq!(rules.updated(&before, &after).unwrap().severity, Severity::Warning);
    }

    #[test]
    fn test_transactions_and_silent_rules() {
        let rules = NotificationRules::for_kind(EntityKind::Transaction);
        let tx = Transaction::new("t1", "Office chairs", Decimal::new(250, 0));
        assert_eq!(rules.created(&tx).unwrap().message, "Transaction \"Office chairs\" created");
        assert_eq!(rules.deleted(&tx).unwrap().severity, Severity::Info);

        assert!(NotificationRules::silent(EntityKind::Transaction).created(&tx).is_none());
    }
}
