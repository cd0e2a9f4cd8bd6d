use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar;
use crate::decimal::Money;
use crate::errors::{EngineError, Result};
use crate::plan::{InstallmentEntry, InstallmentPlan, PlanTerms};
use crate::types::{CustomerId, PlanStatus, SaleId};

/// a generated schedule with its derived totals
///
/// this is both the preview payload and the exact shape persisted into a
/// new plan; generation is pure and deterministic, so previewing and
/// drafting the same terms yield identical schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleQuote {
    pub terms: PlanTerms,
    pub financed_amount: Money,
    pub total_interest: Money,
    pub total_amount: Money,
    /// uniform per-entry amount; the last entry absorbs the rounding remainder
    pub installment_amount: Money,
    pub end_date: NaiveDate,
    pub entries: Vec<InstallmentEntry>,
}

impl ScheduleQuote {
    /// generate a schedule from plan terms
    ///
    /// flat interest: `financed × rate × term`, rate given as percent per
    /// period. each entry is due one period after the previous, the first
    /// one period after `start_date`.
    pub fn generate(terms: &PlanTerms) -> Result<Self> {
        let term = terms.number_of_installments;
        if term < 1 {
            return Err(EngineError::InvalidTerm { term });
        }

        if terms.principal_amount.is_negative() {
            return Err(EngineError::InvalidTerms {
                message: format!("principal amount {} is negative", terms.principal_amount),
            });
        }
        if terms.down_payment.is_negative() {
            return Err(EngineError::InvalidTerms {
                message: format!("down payment {} is negative", terms.down_payment),
            });
        }
        if terms.down_payment > terms.principal_amount {
            return Err(EngineError::InvalidTerms {
                message: format!(
                    "down payment {} exceeds principal {}",
                    terms.down_payment, terms.principal_amount
                ),
            });
        }
        if terms.interest_rate.as_decimal() < Decimal::ZERO {
            return Err(EngineError::InvalidTerms {
                message: format!("interest rate {} is negative", terms.interest_rate),
            });
        }

        // financed may legitimately be zero for a fully-down-paid sale
        let financed_amount = terms.principal_amount - terms.down_payment;
        let total_interest = Money::from_decimal(
            financed_amount.as_decimal() * terms.interest_rate.as_decimal() * Decimal::from(term),
        );
        let total_amount = financed_amount + total_interest;
        let installment_amount = total_amount / Decimal::from(term);

        let mut entries = Vec::with_capacity(term as usize);
        for i in 1..=term {
            let due_date = calendar::advance(terms.start_date, terms.frequency, i);
            let amount = if i == term {
                // last entry absorbs the rounding remainder so the schedule
                // reconciles exactly with the total
                total_amount - installment_amount * Decimal::from(term - 1)
            } else {
                installment_amount
            };
            entries.push(InstallmentEntry::new(i, due_date, amount));
        }

        let end_date = entries
            .last()
            .map(|e| e.due_date)
            .unwrap_or(terms.start_date);

        Ok(Self {
            terms: terms.clone(),
            financed_amount,
            total_interest,
            total_amount,
            installment_amount,
            end_date,
            entries,
        })
    }

    /// materialize the quote as a draft plan
    pub fn into_plan(
        self,
        customer_id: CustomerId,
        sale_id: Option<SaleId>,
        now: DateTime<Utc>,
    ) -> InstallmentPlan {
        InstallmentPlan {
            id: Uuid::new_v4(),
            customer_id,
            sale_id,
            terms: self.terms,
            financed_amount: self.financed_amount,
            total_interest: self.total_interest,
            total_amount: self.total_amount,
            paid_amount: Money::ZERO,
            remaining_balance: self.total_amount,
            status: PlanStatus::Draft,
            end_date: Some(self.end_date),
            schedule: self.entries,
            payments: Vec::new(),
            paid_installments: 0,
            overdue_installments: 0,
            status_changed_at: now,
            version: 0,
        }
    }
}
