use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{CustomerId, PlanId, PlanStatus};

/// all events that can be emitted by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // plan lifecycle events
    PlanCreated {
        plan_id: PlanId,
        customer_id: CustomerId,
        financed_amount: Money,
        total_amount: Money,
        timestamp: DateTime<Utc>,
    },
    PlanSubmitted {
        plan_id: PlanId,
        customer_id: CustomerId,
        financed_amount: Money,
        available_limit_after: Money,
        timestamp: DateTime<Utc>,
    },
    PlanCompleted {
        plan_id: PlanId,
        total_paid: Money,
        timestamp: DateTime<Utc>,
    },
    PlanCancelled {
        plan_id: PlanId,
        customer_id: CustomerId,
        released_exposure: Money,
        timestamp: DateTime<Utc>,
    },
    StatusChanged {
        plan_id: PlanId,
        old_status: PlanStatus,
        new_status: PlanStatus,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentReceived {
        plan_id: PlanId,
        amount: Money,
        applied: Money,
        leftover: Money,
        remaining_balance: Money,
        timestamp: DateTime<Utc>,
    },
    InstallmentPaid {
        plan_id: PlanId,
        installment_number: u32,
        amount: Money,
        paid_date: NaiveDate,
    },
    InstallmentPartiallyPaid {
        plan_id: PlanId,
        installment_number: u32,
        paid_amount: Money,
        outstanding: Money,
    },

    // overdue events
    InstallmentOverdue {
        plan_id: PlanId,
        installment_number: u32,
        due_date: NaiveDate,
        amount_outstanding: Money,
    },
    LateFeeApplied {
        plan_id: PlanId,
        installment_number: u32,
        fee: Money,
        days_overdue: u32,
    },

    // credit limit events
    CreditLimitChanged {
        customer_id: CustomerId,
        old_available: Money,
        new_available: Money,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
