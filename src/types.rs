use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a customer
pub type CustomerId = Uuid;

/// unique identifier for an installment plan
pub type PlanId = Uuid;

/// unique identifier for an originating sale
pub type SaleId = Uuid;

/// customer account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerStatus {
    Active,
    Inactive,
}

/// plan lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanStatus {
    /// plan drafted, schedule may still be regenerated
    Draft,
    /// plan submitted, credit limit debited, payments accepted
    Active,
    /// every installment fully paid
    Completed,
    /// cancelled by an operator, credit limit released
    Cancelled,
}

impl PlanStatus {
    /// terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Completed | PlanStatus::Cancelled)
    }
}

/// installment entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    /// not yet due, nothing paid
    Pending,
    /// some payment applied, balance remains
    PartiallyPaid,
    /// fully paid, never reverts
    Paid,
    /// past due with nothing paid
    Overdue,
}

/// billing period between installments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
}
