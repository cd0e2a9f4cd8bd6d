use chrono::NaiveDate;

use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::plan::InstallmentPlan;
use crate::types::PlanStatus;

/// what a single allocation did to a plan
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationOutcome {
    pub applied: Money,
    pub leftover: Money,
    /// true when this allocation paid off the final open entry
    pub completed: bool,
    /// installment numbers fully paid by this allocation
    pub entries_paid: Vec<u32>,
    /// installment numbers left partially paid, with their new paid amount
    pub entries_partial: Vec<(u32, Money)>,
}

/// apply a payment to a plan's schedule
///
/// fixed policy: oldest due date first, ties broken by installment number,
/// each entry settled in full before the next receives anything. mutates
/// the plan in place; callers wanting atomicity allocate against a working
/// copy and commit on success.
pub fn allocate(
    plan: &mut InstallmentPlan,
    amount: Money,
    payment_date: NaiveDate,
) -> Result<AllocationOutcome> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidPaymentAmount { amount });
    }
    match plan.status {
        PlanStatus::Active => {}
        PlanStatus::Draft => {
            return Err(EngineError::PlanNotSubmitted { plan_id: plan.id });
        }
        PlanStatus::Completed | PlanStatus::Cancelled => {
            return Err(EngineError::PlanClosed {
                plan_id: plan.id,
                status: plan.status,
            });
        }
    }

    let mut remaining = amount;
    let mut entries_paid = Vec::new();
    let mut entries_partial = Vec::new();

    for idx in plan.allocation_order() {
        if remaining.is_zero() {
            break;
        }

        let entry = &mut plan.schedule[idx];
        if entry.is_paid() {
            continue;
        }

        let due = entry.outstanding();
        if remaining >= due {
            entry.paid_amount = entry.amount;
            remaining -= due;
            entry.refresh_status(payment_date);
            entries_paid.push(entry.installment_number);
        } else {
            entry.paid_amount += remaining;
            remaining = Money::ZERO;
            entry.refresh_status(payment_date);
            entries_partial.push((entry.installment_number, entry.paid_amount));
        }
    }

    plan.recompute_totals();

    let completed = plan.is_fully_paid();
    if completed {
        plan.status = PlanStatus::Completed;
    }

    Ok(AllocationOutcome {
        applied: amount - remaining,
        leftover: remaining,
        completed,
        entries_paid,
        entries_partial,
    })
}
