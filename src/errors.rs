use thiserror::Error;

use crate::decimal::Money;
use crate::types::{CustomerId, PlanId, PlanStatus};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid term: {term} installments (minimum 1)")]
    InvalidTerm { term: u32 },

    #[error("invalid plan terms: {message}")]
    InvalidTerms { message: String },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount { amount: Money },

    #[error("credit limit exceeded: requested {requested}, available {available}")]
    CreditLimitExceeded {
        requested: Money,
        available: Money,
    },

    #[error("plan {plan_id} is closed: status is {status:?}")]
    PlanClosed {
        plan_id: PlanId,
        status: PlanStatus,
    },

    #[error("plan {plan_id} has not been submitted")]
    PlanNotSubmitted { plan_id: PlanId },

    #[error("customer {customer_id} is not active")]
    CustomerInactive { customer_id: CustomerId },

    #[error("concurrent modification of {entity}: {detail}")]
    ConcurrentModification { entity: String, detail: String },

    #[error("customer not found: {customer_id}")]
    CustomerNotFound { customer_id: CustomerId },

    #[error("plan not found: {plan_id}")]
    PlanNotFound { plan_id: PlanId },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
