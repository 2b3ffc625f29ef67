//! Budget records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{CategoryRef, DepartmentRef, RecordStatus, UserRef};

/// A budget allocated to a department and category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(default)]
    pub spent: Decimal,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiscal_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Budget {
    /// Create a pending budget with only the required fields set
    pub fn new(id: impl Into<String>, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            amount,
            spent: Decimal::ZERO,
            status: RecordStatus::Pending,
            fiscal_year: None,
            start_date: None,
            end_date: None,
            category: None,
            department: None,
            created_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    /// Amount left to spend (never negative)
    pub fn remaining(&self) -> Decimal {
        (self.amount - self.spent).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_deserializes_backend_payload() {
        let json = r#"{
            "id": "b1",
            "name": "Marketing Q3",
            "amount": 12000,
            "spent": 2500.5,
            "status": "approved",
            "fiscalYear": 2026,
            "category": {"id": "c1", "name": "Marketing"},
            "department": {"id": "d1", "name": "Sales"},
            "createdAt": "2026-07-01T09:30:00Z"
        }"#;

        let budget: Budget = serde_json::from_str(json).unwrap();
        assert_eq!(budget.id, "b1");
        assert_eq!(budget.status, RecordStatus::Approved);
        assert_eq!(budget.fiscal_year, Some(2026));
        assert_eq!(budget.category.as_ref().unwrap().name, "Marketing");
        assert_eq!(budget.remaining(), Decimal::new(94995, 1));
    }

    #[test]
    fn test_budget_missing_optional_fields() {
        let json = r#"{"id": "b2", "name": "Travel", "amount": 500}"#;
        let budget: Budget = serde_json::from_str(json).unwrap();
        assert_eq!(budget.spent, Decimal::ZERO);
        assert_eq!(budget.status, RecordStatus::Pending);
        assert!(budget.department.is_none());
    }
}
