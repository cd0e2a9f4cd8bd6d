use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{CustomerId, EntryStatus, Frequency, PlanId, PlanStatus, SaleId};

/// the terms a plan is drafted from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanTerms {
    pub principal_amount: Money,
    pub down_payment: Money,
    /// flat interest, percent per period (not annualized)
    pub interest_rate: Rate,
    pub number_of_installments: u32,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
}

/// one scheduled due date within a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentEntry {
    /// 1-based position within the schedule
    pub installment_number: u32,
    pub due_date: NaiveDate,
    /// amount due, including any materialized late fee
    pub amount: Money,
    pub paid_amount: Money,
    pub status: EntryStatus,
    /// set once, when the entry becomes fully paid
    pub paid_date: Option<NaiveDate>,
    /// late fee folded into `amount` by the overdue sweep
    pub late_fee: Money,
    pub late_fee_applied: bool,
}

impl InstallmentEntry {
    pub fn new(installment_number: u32, due_date: NaiveDate, amount: Money) -> Self {
        Self {
            installment_number,
            due_date,
            amount,
            paid_amount: Money::ZERO,
            status: EntryStatus::Pending,
            paid_date: None,
            late_fee: Money::ZERO,
            late_fee_applied: false,
        }
    }

    /// amount still owed on this entry
    pub fn outstanding(&self) -> Money {
        self.amount - self.paid_amount
    }

    pub fn is_paid(&self) -> bool {
        self.status == EntryStatus::Paid
    }

    /// recompute status from the underlying amounts; Paid is sticky
    pub fn refresh_status(&mut self, today: NaiveDate) {
        if self.status == EntryStatus::Paid {
            return;
        }
        self.status = derive_entry_status(self.paid_amount, self.amount, self.due_date, today);
        if self.status == EntryStatus::Paid && self.paid_date.is_none() {
            self.paid_date = Some(today);
        }
    }
}

/// pure status derivation for an installment entry
pub fn derive_entry_status(
    paid_amount: Money,
    amount: Money,
    due_date: NaiveDate,
    today: NaiveDate,
) -> EntryStatus {
    if paid_amount >= amount {
        EntryStatus::Paid
    } else if paid_amount.is_positive() {
        EntryStatus::PartiallyPaid
    } else if due_date < today {
        EntryStatus::Overdue
    } else {
        EntryStatus::Pending
    }
}

/// a payment recorded against a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub amount: Money,
    pub date: NaiveDate,
    pub external_transaction_id: Option<String>,
}

/// installment plan aggregate
///
/// holds a non-owning reference to its customer by id; the plan
/// exclusively owns its schedule entries and payment records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallmentPlan {
    pub id: PlanId,
    pub customer_id: CustomerId,
    pub sale_id: Option<SaleId>,
    pub terms: PlanTerms,

    // derived amounts, recomputed whenever terms or payments change
    pub financed_amount: Money,
    pub total_interest: Money,
    /// financed + interest, plus any late fees materialized by the sweep
    pub total_amount: Money,
    pub paid_amount: Money,
    pub remaining_balance: Money,

    pub status: PlanStatus,
    pub end_date: Option<NaiveDate>,
    pub schedule: Vec<InstallmentEntry>,
    pub payments: Vec<PaymentRecord>,

    // progress counters
    pub paid_installments: u32,
    pub overdue_installments: u32,

    pub status_changed_at: DateTime<Utc>,
    pub version: u64,
}

impl InstallmentPlan {
    /// recompute paid/remaining totals and progress from the schedule
    pub fn recompute_totals(&mut self) {
        self.paid_amount = self.schedule.iter().map(|e| e.paid_amount).sum();
        self.remaining_balance = (self.total_amount - self.paid_amount).max(Money::ZERO);
        self.update_progress();
    }

    fn update_progress(&mut self) {
        self.paid_installments = self
            .schedule
            .iter()
            .filter(|e| e.status == EntryStatus::Paid)
            .count() as u32;
        self.overdue_installments = self
            .schedule
            .iter()
            .filter(|e| e.status == EntryStatus::Overdue)
            .count() as u32;
    }

    pub fn is_fully_paid(&self) -> bool {
        !self.schedule.is_empty() && self.schedule.iter().all(|e| e.is_paid())
    }

    pub fn update_status(&mut self, new_status: PlanStatus, timestamp: DateTime<Utc>) {
        self.status = new_status;
        self.status_changed_at = timestamp;
    }

    /// indices into the schedule ordered by (due_date, installment_number)
    pub fn allocation_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.schedule.len()).collect();
        order.sort_by_key(|&i| {
            let e = &self.schedule[i];
            (e.due_date, e.installment_number)
        });
        order
    }
}
