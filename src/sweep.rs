use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::MerchantConfig;
use crate::decimal::Money;
use crate::events::{Event, EventStore};
use crate::plan::InstallmentPlan;
use crate::types::EntryStatus;

/// summary of one sweep run across all plans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub plans_examined: usize,
    pub entries_marked_overdue: usize,
    pub late_fees_applied: usize,
    pub total_fees: Money,
    /// plans skipped because their records could not be processed
    pub failures: usize,
}

/// what the sweep did to a single plan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanSweepOutcome {
    pub marked_overdue: usize,
    pub fees_applied: usize,
    pub fee_total: Money,
}

/// the daily batch that reclassifies past-due entries and charges late fees
pub struct OverdueSweep<'a> {
    config: &'a MerchantConfig,
}

impl<'a> OverdueSweep<'a> {
    pub fn new(config: &'a MerchantConfig) -> Self {
        Self { config }
    }

    /// sweep one plan's schedule
    ///
    /// the caller holds the plan's lock, so the status read here cannot
    /// race a payment: an entry a payment just moved to Paid or
    /// PartiallyPaid is skipped, never overwritten. idempotent per entry;
    /// the `late_fee_applied` flag keeps a second run on the same day from
    /// charging twice.
    pub fn sweep_plan(
        &self,
        plan: &mut InstallmentPlan,
        today: NaiveDate,
        events: &mut EventStore,
    ) -> PlanSweepOutcome {
        let mut outcome = PlanSweepOutcome::default();
        let mut fee_total = Money::ZERO;

        for entry in &mut plan.schedule {
            if entry.status == EntryStatus::Pending && entry.due_date < today {
                entry.refresh_status(today);
                outcome.marked_overdue += 1;

                events.emit(Event::InstallmentOverdue {
                    plan_id: plan.id,
                    installment_number: entry.installment_number,
                    due_date: entry.due_date,
                    amount_outstanding: entry.outstanding(),
                });
            }

            if entry.status == EntryStatus::Overdue && !entry.late_fee_applied {
                let days_overdue = (today - entry.due_date).num_days();
                if days_overdue > self.config.grace_period_days as i64 {
                    // the fee materializes: it raises the entry's amount and
                    // with it the plan's total, so later allocation collects it
                    let fee = entry.amount.percentage(self.config.late_fee_percentage);
                    entry.late_fee = fee;
                    entry.amount += fee;
                    entry.late_fee_applied = true;

                    outcome.fees_applied += 1;
                    fee_total += fee;

                    info!(
                        plan_id = %plan.id,
                        installment = entry.installment_number,
                        fee = %fee,
                        days_overdue,
                        "late fee applied"
                    );

                    events.emit(Event::LateFeeApplied {
                        plan_id: plan.id,
                        installment_number: entry.installment_number,
                        fee,
                        days_overdue: days_overdue as u32,
                    });
                }
            }
        }

        if !fee_total.is_zero() {
            plan.total_amount += fee_total;
        }
        plan.recompute_totals();

        outcome.fee_total = fee_total;
        outcome
    }
}
