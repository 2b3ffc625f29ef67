//! Domain records synchronized by the realtime layer
//!
//! The authoritative copy of every record lives on the backend API; the types
//! here mirror its camelCase JSON so created/updated payloads deserialize
//! directly into them.

mod budget;
mod budget_request;
mod invoice;
mod refs;
mod status;
mod toast;
mod transaction;

pub use budget::Budget;
pub use budget_request::BudgetRequest;
pub use invoice::Invoice;
pub use refs::{BudgetRef, CategoryRef, DepartmentRef, SupplierRef, UserRef};
pub use status::RecordStatus;
pub use toast::{Severity, Toast, DEFAULT_TOAST_DURATION};
pub use transaction::{Transaction, TransactionType};

use serde::{Deserialize, Serialize};

/// Payload of every `<entity>-deleted` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedPayload {
    pub id: String,
}
