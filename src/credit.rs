use crate::decimal::Money;
use crate::plan::InstallmentPlan;
use crate::types::PlanStatus;

/// outstanding financed exposure of a single plan
///
/// clamped at zero: late-stage payments covering interest must never
/// inflate the customer's limit beyond the financed amount.
pub fn outstanding_exposure(plan: &InstallmentPlan) -> Money {
    if plan.status != PlanStatus::Active {
        return Money::ZERO;
    }
    (plan.financed_amount - plan.paid_amount).max(Money::ZERO)
}

/// available limit derived from the customer's total limit and the
/// outstanding exposure of all their active plans
///
/// `available = credit_limit − Σ max(financed − paid, 0)` over Active
/// plans, floored at zero. callers must hold the customer's serialization
/// scope while reading this for a check-then-write sequence.
pub fn available_limit<'a>(
    credit_limit: Money,
    plans: impl Iterator<Item = &'a InstallmentPlan>,
) -> Money {
    let used: Money = plans.map(outstanding_exposure).sum();
    (credit_limit - used).max(Money::ZERO)
}
