use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{CustomerId, CustomerStatus};

/// customer credit record
///
/// `available_limit` is a derived cache maintained exclusively by the
/// credit ledger; nothing else writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub status: CustomerStatus,
    pub credit_limit: Money,
    pub available_limit: Money,
    pub version: u64,
}

impl Customer {
    pub fn new(name: impl Into<String>, credit_limit: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: CustomerStatus::Active,
            credit_limit,
            available_limit: credit_limit,
            version: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }
}
