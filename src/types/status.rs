//! Workflow status shared by budgets, budget requests and invoices

use std::fmt;

use serde::{Deserialize, Serialize};

/// Status carried by records that move through an approval or payment flow.
///
/// Unknown values from the backend are preserved in [`RecordStatus::Other`]
/// so a newer backend never breaks deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Active,
    Closed,
    Paid,
    Overdue,
    Cancelled,
    Other(String),
}

impl RecordStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Pending => "pending",
            RecordStatus::Approved => "approved",
            RecordStatus::Rejected => "rejected",
            RecordStatus::Active => "active",
            RecordStatus::Closed => "closed",
            RecordStatus::Paid => "paid",
            RecordStatus::Overdue => "overdue",
            RecordStatus::Cancelled => "cancelled",
            RecordStatus::Other(s) => s,
        }
    }
}

impl Default for RecordStatus {
    fn default() -> Self {
        RecordStatus::Pending
    }
}

impl From<String> for RecordStatus {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "draft" => RecordStatus::Draft,
            "pending" => RecordStatus::Pending,
            "approved" => RecordStatus::Approved,
            "rejected" => RecordStatus::Rejected,
            "active" => RecordStatus::Active,
            "closed" => RecordStatus::Closed,
            "paid" => RecordStatus::Paid,
            "overdue" => RecordStatus::Overdue,
            "cancelled" | "canceled" => RecordStatus::Cancelled,
            _ => RecordStatus::Other(value),
        }
    }
}

impl From<RecordStatus> for String {
    fn from(status: RecordStatus) -> Self {
        match status {
            RecordStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_case_insensitively() {
        let status: RecordStatus = serde_json::from_str("\"APPROVED\"").unwrap();
        assert_eq!(status, RecordStatus::Approved);
    }

    #[test]
    fn test_unknown_status_is_preserved() {
        let status: RecordStatus = serde_json::from_str("\"on_hold\"").unwrap();
        assert_eq!(status, RecordStatus::Other("on_hold".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"on_hold\"");
    }

    #[test]
    fn test_canceled_spelling_variants() {
        assert_eq!(RecordStatus::from("canceled".to_string()), RecordStatus::Cancelled);
        assert_eq!(RecordStatus::Cancelled.to_string(), "cancelled");
    }
}
