//! Supplier invoices

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BudgetRef, DepartmentRef, RecordStatus, SupplierRef, UserRef};

/// An invoice received from a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub amount: Decimal,
    #[serde(default)]
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier: Option<SupplierRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<BudgetRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<DepartmentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Invoice {
    pub fn new(id: impl Into<String>, invoice_number: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: id.into(),
            invoice_number: invoice_number.into(),
            amount,
            status: RecordStatus::Pending,
            currency: None,
            issue_date: None,
            due_date: None,
            supplier: None,
            budget: None,
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

    /// True when unpaid past its due date
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        match self.due_date {
            Some(due) => due < today && self.status != RecordStatus::Paid,
            None => false,
        }
    }
}
