use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::MerchantConfig;
use crate::credit;
use crate::customer::Customer;
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::plan::{InstallmentPlan, PlanTerms};
use crate::types::PlanStatus;

/// validate drafting terms against the merchant's settings
pub fn validate_terms(terms: &PlanTerms, config: &MerchantConfig) -> Result<()> {
    let term = terms.number_of_installments;
    if term < 1 {
        return Err(EngineError::InvalidTerm { term });
    }
    if term < config.min_installments || term > config.max_installments {
        return Err(EngineError::InvalidTerms {
            message: format!(
                "term {} outside allowed range {}..={}",
                term, config.min_installments, config.max_installments
            ),
        });
    }
    Ok(())
}

/// submit a draft plan: Draft → Active
///
/// the caller holds the customer serialization scope and supplies the
/// available limit computed live inside it; this function performs the
/// check, the transition, and the matching debit of the cached limit.
pub fn submit(
    plan: &mut InstallmentPlan,
    customer: &mut Customer,
    available: Money,
    now: DateTime<Utc>,
    events: &mut EventStore,
) -> Result<()> {
    match plan.status {
        PlanStatus::Draft => {}
        PlanStatus::Active => {
            return Err(EngineError::InvalidTerms {
                message: format!("plan {} is already active", plan.id),
            });
        }
        PlanStatus::Completed | PlanStatus::Cancelled => {
            return Err(EngineError::PlanClosed {
                plan_id: plan.id,
                status: plan.status,
            });
        }
    }

    if !customer.is_active() {
        return Err(EngineError::CustomerInactive {
            customer_id: customer.id,
        });
    }

    // check and debit use the same quantity: the financed exposure
    if plan.financed_amount > available {
        return Err(EngineError::CreditLimitExceeded {
            requested: plan.financed_amount,
            available,
        });
    }

    let old_status = plan.status;
    plan.update_status(PlanStatus::Active, now);
    plan.version += 1;

    let old_available = customer.available_limit;
    customer.available_limit = available - plan.financed_amount;
    customer.version += 1;

    info!(
        plan_id = %plan.id,
        customer_id = %customer.id,
        financed = %plan.financed_amount,
        available = %customer.available_limit,
        "plan submitted"
    );

    events.emit(Event::StatusChanged {
        plan_id: plan.id,
        old_status,
        new_status: PlanStatus::Active,
        timestamp: now,
    });
    events.emit(Event::PlanSubmitted {
        plan_id: plan.id,
        customer_id: customer.id,
        financed_amount: plan.financed_amount,
        available_limit_after: customer.available_limit,
        timestamp: now,
    });
    events.emit(Event::CreditLimitChanged {
        customer_id: customer.id,
        old_available,
        new_available: customer.available_limit,
        timestamp: now,
    });

    Ok(())
}

/// cancel a plan: Draft/Active → Cancelled
///
/// active plans keep their entries as historical record; a draft's
/// never-submitted schedule is dropped with it. returns the financed
/// exposure released back to the customer's limit.
pub fn cancel(
    plan: &mut InstallmentPlan,
    now: DateTime<Utc>,
    events: &mut EventStore,
) -> Result<Money> {
    if plan.status.is_terminal() {
        return Err(EngineError::PlanClosed {
            plan_id: plan.id,
            status: plan.status,
        });
    }

    let released = credit::outstanding_exposure(plan);
    let old_status = plan.status;

    if plan.status == PlanStatus::Draft {
        plan.schedule.clear();
        plan.recompute_totals();
    }

    plan.update_status(PlanStatus::Cancelled, now);
    plan.version += 1;

    info!(plan_id = %plan.id, released = %released, "plan cancelled");

    events.emit(Event::StatusChanged {
        plan_id: plan.id,
        old_status,
        new_status: PlanStatus::Cancelled,
        timestamp: now,
    });
    events.emit(Event::PlanCancelled {
        plan_id: plan.id,
        customer_id: plan.customer_id,
        released_exposure: released,
        timestamp: now,
    });

    Ok(released)
}
