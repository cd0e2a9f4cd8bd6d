pub mod allocator;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::PlanId;

pub use allocator::{allocate, AllocationOutcome};

/// payment posting request from the payment collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub plan_id: PlanId,
    pub amount: Money,
    /// defaults to the engine clock's current date when absent
    pub payment_date: Option<NaiveDate>,
    /// gateway/import reference used for idempotent replay
    pub external_transaction_id: Option<String>,
}

/// result returned to the payment collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    pub plan_id: PlanId,
    pub amount: Money,
    /// portion consumed by the schedule
    pub applied: Money,
    /// overpayment returned to the caller, never silently absorbed
    pub leftover: Money,
    pub updated_balance: Money,
    /// true when an already-recorded transaction was replayed
    pub duplicate: bool,
}
