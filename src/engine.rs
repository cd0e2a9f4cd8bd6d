use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::MerchantConfig;
use crate::credit;
use crate::customer::Customer;
use crate::decimal::{Money, Rate};
use crate::errors::{EngineError, Result};
use crate::events::{Event, EventStore};
use crate::lifecycle;
use crate::payments::{allocate, PaymentReceipt, PaymentRequest};
use crate::plan::{InstallmentEntry, InstallmentPlan, PaymentRecord, PlanTerms};
use crate::schedule::ScheduleQuote;
use crate::sweep::{OverdueSweep, SweepReport};
use crate::types::{CustomerId, CustomerStatus, EntryStatus, Frequency, PlanId, PlanStatus, SaleId};

/// financing request handed over by the sales collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleFinancing {
    pub sale_id: SaleId,
    /// full sale total; the financed amount is total less down payment
    pub total_amount: Money,
    pub down_payment: Money,
    pub start_date: NaiveDate,
    /// merchant defaults apply when absent
    pub interest_rate: Option<Rate>,
    pub number_of_installments: Option<u32>,
    pub frequency: Option<Frequency>,
}

/// flattened schedule row for the notification collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DueEntry {
    pub plan_id: PlanId,
    pub customer_id: CustomerId,
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub outstanding: Money,
    pub days_overdue: i64,
}

/// period collection figures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub collected: Money,
    pub expected: Money,
    pub overdue_total: Money,
    pub efficiency_percent: Decimal,
}

/// the installment accounting engine
///
/// in-memory record stores behind per-record mutexes. every multi-lock
/// sequence acquires the customer before any of their plans, so submit,
/// cancel and cache refreshes serialize per customer while payments on
/// different plans proceed in parallel.
#[derive(Default)]
pub struct InstallmentEngine {
    customers: RwLock<HashMap<CustomerId, Arc<Mutex<Customer>>>>,
    plans: RwLock<HashMap<PlanId, Arc<Mutex<InstallmentPlan>>>>,
    customer_plans: RwLock<HashMap<CustomerId, Vec<PlanId>>>,
    events: Mutex<EventStore>,
}

fn poisoned(entity: &str) -> EngineError {
    EngineError::ConcurrentModification {
        entity: entity.to_string(),
        detail: "lock poisoned by a panicked writer".to_string(),
    }
}

fn lock<'a, T>(mutex: &'a Mutex<T>, entity: &str) -> Result<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| poisoned(entity))
}

impl InstallmentEngine {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // customers
    // ------------------------------------------------------------------

    pub fn register_customer(&self, name: impl Into<String>, credit_limit: Money) -> Result<CustomerId> {
        let customer = Customer::new(name, credit_limit);
        let id = customer.id;
        self.customers
            .write()
            .map_err(|_| poisoned("customer registry"))?
            .insert(id, Arc::new(Mutex::new(customer)));
        self.customer_plans
            .write()
            .map_err(|_| poisoned("plan index"))?
            .insert(id, Vec::new());
        Ok(id)
    }

    /// snapshot of a customer record
    pub fn customer(&self, customer_id: CustomerId) -> Result<Customer> {
        let arc = self.customer_arc(customer_id)?;
        let guard = lock(&arc, "customer")?;
        Ok(guard.clone())
    }

    pub fn set_customer_status(&self, customer_id: CustomerId, status: CustomerStatus) -> Result<()> {
        let arc = self.customer_arc(customer_id)?;
        let mut guard = lock(&arc, "customer")?;
        guard.status = status;
        guard.version += 1;
        Ok(())
    }

    /// live available limit, computed under the customer's serialization scope
    pub fn available_limit(&self, customer_id: CustomerId) -> Result<Money> {
        let arc = self.customer_arc(customer_id)?;
        let guard = lock(&arc, "customer")?;
        self.available_for(&guard)
    }

    // ------------------------------------------------------------------
    // plan lifecycle
    // ------------------------------------------------------------------

    /// pure schedule preview; identical in shape and values to what
    /// `create_plan` persists for the same terms
    pub fn preview(&self, terms: &PlanTerms) -> Result<ScheduleQuote> {
        ScheduleQuote::generate(terms)
    }

    /// draft a plan for a customer
    ///
    /// runs the credit check speculatively so obviously over-limit drafts
    /// fail fast; the authoritative check happens again at submit time.
    pub fn create_plan(
        &self,
        customer_id: CustomerId,
        terms: &PlanTerms,
        config: &MerchantConfig,
        sale_id: Option<SaleId>,
        time: &SafeTimeProvider,
    ) -> Result<PlanId> {
        lifecycle::validate_terms(terms, config)?;

        let financed = terms.principal_amount - terms.down_payment;
        {
            let arc = self.customer_arc(customer_id)?;
            let guard = lock(&arc, "customer")?;
            if !guard.is_active() {
                return Err(EngineError::CustomerInactive { customer_id });
            }
            let available = self.available_for(&guard)?;
            if financed > available {
                return Err(EngineError::CreditLimitExceeded {
                    requested: financed,
                    available,
                });
            }
        }

        let now = time.now();
        let quote = ScheduleQuote::generate(terms)?;
        let plan = quote.into_plan(customer_id, sale_id, now);
        let plan_id = plan.id;

        let mut scratch = EventStore::new();
        scratch.emit(Event::PlanCreated {
            plan_id,
            customer_id,
            financed_amount: plan.financed_amount,
            total_amount: plan.total_amount,
            timestamp: now,
        });

        self.plans
            .write()
            .map_err(|_| poisoned("plan registry"))?
            .insert(plan_id, Arc::new(Mutex::new(plan)));
        self.customer_plans
            .write()
            .map_err(|_| poisoned("plan index"))?
            .entry(customer_id)
            .or_default()
            .push(plan_id);

        self.append_events(scratch);
        info!(%plan_id, %customer_id, "plan drafted");
        Ok(plan_id)
    }

    /// snapshot of a plan
    pub fn plan(&self, plan_id: PlanId) -> Result<InstallmentPlan> {
        let arc = self.plan_arc(plan_id)?;
        let guard = lock(&arc, "plan")?;
        Ok(guard.clone())
    }

    /// snapshots of all plans belonging to a customer
    pub fn plans_for_customer(&self, customer_id: CustomerId) -> Result<Vec<InstallmentPlan>> {
        let arcs = self.customer_plan_arcs(customer_id)?;
        let mut out = Vec::with_capacity(arcs.len());
        for arc in arcs {
            out.push(lock(&arc, "plan")?.clone());
        }
        Ok(out)
    }

    /// replace a draft's terms and regenerate its schedule
    ///
    /// regeneration is a draft-only operation; the version precondition
    /// rejects edits racing another writer.
    pub fn update_draft_terms(
        &self,
        plan_id: PlanId,
        terms: &PlanTerms,
        expected_version: u64,
        config: &MerchantConfig,
    ) -> Result<()> {
        lifecycle::validate_terms(terms, config)?;
        let quote = ScheduleQuote::generate(terms)?;

        let arc = self.plan_arc(plan_id)?;
        let mut plan = lock(&arc, "plan")?;

        if plan.version != expected_version {
            return Err(EngineError::ConcurrentModification {
                entity: format!("plan {plan_id}"),
                detail: format!(
                    "expected version {expected_version}, found {}",
                    plan.version
                ),
            });
        }
        match plan.status {
            PlanStatus::Draft => {}
            PlanStatus::Active => {
                return Err(EngineError::InvalidTerms {
                    message: "schedule can only be regenerated while the plan is a draft"
                        .to_string(),
                });
            }
            _ => {
                return Err(EngineError::PlanClosed {
                    plan_id,
                    status: plan.status,
                });
            }
        }

        plan.terms = quote.terms.clone();
        plan.financed_amount = quote.financed_amount;
        plan.total_interest = quote.total_interest;
        plan.total_amount = quote.total_amount;
        plan.end_date = Some(quote.end_date);
        plan.schedule = quote.entries;
        plan.recompute_totals();
        plan.version += 1;

        Ok(())
    }

    /// submit a draft: the single serialization point for the credit check
    pub fn submit_plan(&self, plan_id: PlanId, time: &SafeTimeProvider) -> Result<()> {
        let plan_arc = self.plan_arc(plan_id)?;
        let customer_id = lock(&plan_arc, "plan")?.customer_id;

        let customer_arc = self.customer_arc(customer_id)?;
        let mut scratch = EventStore::new();
        {
            let mut customer = lock(&customer_arc, "customer")?;

            // live limit over the customer's other plans; the draft itself
            // carries no exposure yet
            let mut used = Money::ZERO;
            for arc in self.customer_plan_arcs(customer_id)? {
                if Arc::ptr_eq(&arc, &plan_arc) {
                    continue;
                }
                used += credit::outstanding_exposure(&*lock(&arc, "plan")?);
            }
            let available = (customer.credit_limit - used).max(Money::ZERO);

            let mut plan = lock(&plan_arc, "plan")?;
            lifecycle::submit(&mut plan, &mut customer, available, time.now(), &mut scratch)?;
        }

        self.append_events(scratch);
        Ok(())
    }

    /// cancel a draft or active plan and release its credit exposure
    pub fn cancel_plan(&self, plan_id: PlanId, time: &SafeTimeProvider) -> Result<()> {
        let plan_arc = self.plan_arc(plan_id)?;
        let customer_id = lock(&plan_arc, "plan")?.customer_id;

        let customer_arc = self.customer_arc(customer_id)?;
        let mut scratch = EventStore::new();
        {
            let mut customer = lock(&customer_arc, "customer")?;
            {
                let mut plan = lock(&plan_arc, "plan")?;
                lifecycle::cancel(&mut plan, time.now(), &mut scratch)?;
            }
            self.refresh_available(&mut customer, time, &mut scratch)?;
        }

        self.append_events(scratch);
        Ok(())
    }

    /// draft and submit a plan for a financed sale in one step
    pub fn finance_sale(
        &self,
        customer_id: CustomerId,
        sale: &SaleFinancing,
        config: &MerchantConfig,
        time: &SafeTimeProvider,
    ) -> Result<(PlanId, PlanStatus)> {
        let terms = PlanTerms {
            principal_amount: sale.total_amount,
            down_payment: sale.down_payment,
            interest_rate: sale.interest_rate.unwrap_or(config.default_interest_rate),
            number_of_installments: sale
                .number_of_installments
                .unwrap_or(config.default_installments),
            frequency: sale.frequency.unwrap_or(config.default_frequency),
            start_date: sale.start_date,
        };

        let plan_id = self.create_plan(customer_id, &terms, config, Some(sale.sale_id), time)?;
        self.submit_plan(plan_id, time)?;

        let status = lock(&*self.plan_arc(plan_id)?, "plan")?.status;
        Ok((plan_id, status))
    }

    // ------------------------------------------------------------------
    // payments
    // ------------------------------------------------------------------

    /// apply a posted payment to a plan's schedule
    ///
    /// allocation runs against a working copy and commits only on success,
    /// so a failed validation leaves the plan untouched. requests carrying
    /// an already-recorded transaction id are replayed as a no-op.
    pub fn post_payment(
        &self,
        request: &PaymentRequest,
        time: &SafeTimeProvider,
    ) -> Result<PaymentReceipt> {
        let plan_arc = self.plan_arc(request.plan_id)?;
        let payment_date = request.payment_date.unwrap_or_else(|| time.now().date_naive());

        let mut scratch = EventStore::new();
        let (receipt, customer_id, completed) = {
            let mut guard = lock(&plan_arc, "plan")?;

            if let Some(txn_id) = &request.external_transaction_id {
                let seen = guard
                    .payments
                    .iter()
                    .any(|p| p.external_transaction_id.as_deref() == Some(txn_id.as_str()));
                if seen {
                    info!(plan_id = %guard.id, %txn_id, "duplicate payment replayed as no-op");
                    return Ok(PaymentReceipt {
                        plan_id: guard.id,
                        amount: request.amount,
                        applied: Money::ZERO,
                        leftover: Money::ZERO,
                        updated_balance: guard.remaining_balance,
                        duplicate: true,
                    });
                }
            }

            let mut working = guard.clone();
            let outcome = allocate(&mut working, request.amount, payment_date)?;
            working.payments.push(PaymentRecord {
                amount: request.amount,
                date: payment_date,
                external_transaction_id: request.external_transaction_id.clone(),
            });
            working.version += 1;

            let now = time.now();
            scratch.emit(Event::PaymentReceived {
                plan_id: working.id,
                amount: request.amount,
                applied: outcome.applied,
                leftover: outcome.leftover,
                remaining_balance: working.remaining_balance,
                timestamp: now,
            });
            for number in &outcome.entries_paid {
                let entry = &working.schedule[*number as usize - 1];
                scratch.emit(Event::InstallmentPaid {
                    plan_id: working.id,
                    installment_number: *number,
                    amount: entry.amount,
                    paid_date: payment_date,
                });
            }
            for (number, paid) in &outcome.entries_partial {
                let entry = &working.schedule[*number as usize - 1];
                scratch.emit(Event::InstallmentPartiallyPaid {
                    plan_id: working.id,
                    installment_number: *number,
                    paid_amount: *paid,
                    outstanding: entry.outstanding(),
                });
            }
            if outcome.completed {
                working.status_changed_at = now;
                scratch.emit(Event::StatusChanged {
                    plan_id: working.id,
                    old_status: PlanStatus::Active,
                    new_status: PlanStatus::Completed,
                    timestamp: now,
                });
                scratch.emit(Event::PlanCompleted {
                    plan_id: working.id,
                    total_paid: working.paid_amount,
                    timestamp: now,
                });
            }

            let receipt = PaymentReceipt {
                plan_id: working.id,
                amount: request.amount,
                applied: outcome.applied,
                leftover: outcome.leftover,
                updated_balance: working.remaining_balance,
                duplicate: false,
            };
            let customer_id = working.customer_id;
            *guard = working;
            (receipt, customer_id, outcome.completed)
        };

        // exposure changed; bring the cached limit back in line. plan lock
        // is released first to preserve customer-before-plan ordering.
        let customer_arc = self.customer_arc(customer_id)?;
        {
            let mut customer = lock(&customer_arc, "customer")?;
            self.refresh_available(&mut customer, time, &mut scratch)?;
        }

        if completed {
            info!(plan_id = %request.plan_id, "plan completed");
        }
        self.append_events(scratch);
        Ok(receipt)
    }

    /// whether a payment with this date and amount is already recorded;
    /// the import collaborator's (date, amount, plan) dedup probe
    pub fn has_payment(&self, plan_id: PlanId, date: NaiveDate, amount: Money) -> Result<bool> {
        let arc = self.plan_arc(plan_id)?;
        let guard = lock(&arc, "plan")?;
        Ok(guard
            .payments
            .iter()
            .any(|p| p.date == date && p.amount == amount))
    }

    // ------------------------------------------------------------------
    // overdue sweep
    // ------------------------------------------------------------------

    /// daily batch over every active plan
    ///
    /// a failure on one plan is logged and counted, never fatal to the batch.
    pub fn run_sweep(&self, config: &MerchantConfig, time: &SafeTimeProvider) -> SweepReport {
        let today = time.now().date_naive();
        let mut report = SweepReport::default();
        let mut scratch = EventStore::new();
        let sweep = OverdueSweep::new(config);

        info!(%today, "overdue sweep started");

        for arc in self.all_plan_arcs() {
            let mut plan = match arc.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    warn!("skipping plan with poisoned lock");
                    report.failures += 1;
                    continue;
                }
            };
            if plan.status != PlanStatus::Active {
                continue;
            }
            report.plans_examined += 1;

            let outcome = sweep.sweep_plan(&mut plan, today, &mut scratch);
            if outcome.marked_overdue > 0 || outcome.fees_applied > 0 {
                plan.version += 1;
            }
            report.entries_marked_overdue += outcome.marked_overdue;
            report.late_fees_applied += outcome.fees_applied;
            report.total_fees += outcome.fee_total;
        }

        info!(
            plans = report.plans_examined,
            overdue = report.entries_marked_overdue,
            fees = report.late_fees_applied,
            failures = report.failures,
            "overdue sweep finished"
        );

        self.append_events(scratch);
        report
    }

    // ------------------------------------------------------------------
    // queries for collaborators
    // ------------------------------------------------------------------

    /// unpaid entries due within the inclusive date window
    pub fn entries_due_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<DueEntry> {
        self.collect_entries(|plan, entry| {
            (!entry.is_paid() && entry.due_date >= from && entry.due_date <= to).then(|| DueEntry {
                plan_id: plan.id,
                customer_id: plan.customer_id,
                installment_number: entry.installment_number,
                due_date: entry.due_date,
                amount: entry.amount,
                outstanding: entry.outstanding(),
                days_overdue: 0,
            })
        })
    }

    /// entries currently overdue, oldest first
    pub fn overdue_entries(&self, today: NaiveDate) -> Vec<DueEntry> {
        self.collect_entries(|plan, entry| {
            (entry.status == EntryStatus::Overdue).then(|| DueEntry {
                plan_id: plan.id,
                customer_id: plan.customer_id,
                installment_number: entry.installment_number,
                due_date: entry.due_date,
                amount: entry.amount,
                outstanding: entry.outstanding(),
                days_overdue: (today - entry.due_date).num_days(),
            })
        })
    }

    /// weekly-report figures: what came in, what was expected, what is late
    pub fn collection_summary(&self, from: NaiveDate, to: NaiveDate) -> CollectionSummary {
        let mut collected = Money::ZERO;
        let mut expected = Money::ZERO;
        let mut overdue_total = Money::ZERO;

        for arc in self.all_plan_arcs() {
            let plan = match arc.lock() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            collected += plan
                .payments
                .iter()
                .filter(|p| p.date >= from && p.date <= to)
                .map(|p| p.amount)
                .sum();
            for entry in &plan.schedule {
                if entry.due_date >= from && entry.due_date <= to {
                    expected += entry.amount;
                }
                if entry.status == EntryStatus::Overdue {
                    overdue_total += entry.outstanding();
                }
            }
        }

        let efficiency_percent = if expected.is_zero() {
            Decimal::ZERO
        } else {
            (collected.as_decimal() / expected.as_decimal() * Decimal::from(100)).round_dp(1)
        };

        CollectionSummary {
            period_start: from,
            period_end: to,
            collected,
            expected,
            overdue_total,
            efficiency_percent,
        }
    }

    /// drain events collected since the last call
    pub fn take_events(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(mut store) => store.take_events(),
            Err(_) => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // internals
    // ------------------------------------------------------------------

    fn customer_arc(&self, customer_id: CustomerId) -> Result<Arc<Mutex<Customer>>> {
        self.customers
            .read()
            .map_err(|_| poisoned("customer registry"))?
            .get(&customer_id)
            .cloned()
            .ok_or(EngineError::CustomerNotFound { customer_id })
    }

    fn plan_arc(&self, plan_id: PlanId) -> Result<Arc<Mutex<InstallmentPlan>>> {
        self.plans
            .read()
            .map_err(|_| poisoned("plan registry"))?
            .get(&plan_id)
            .cloned()
            .ok_or(EngineError::PlanNotFound { plan_id })
    }

    fn customer_plan_arcs(&self, customer_id: CustomerId) -> Result<Vec<Arc<Mutex<InstallmentPlan>>>> {
        let ids = self
            .customer_plans
            .read()
            .map_err(|_| poisoned("plan index"))?
            .get(&customer_id)
            .cloned()
            .ok_or(EngineError::CustomerNotFound { customer_id })?;
        let plans = self.plans.read().map_err(|_| poisoned("plan registry"))?;
        Ok(ids.iter().filter_map(|id| plans.get(id).cloned()).collect())
    }

    fn all_plan_arcs(&self) -> Vec<Arc<Mutex<InstallmentPlan>>> {
        match self.plans.read() {
            Ok(plans) => plans.values().cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    /// compute the live limit for a customer whose lock is already held
    fn available_for(&self, customer: &Customer) -> Result<Money> {
        let mut used = Money::ZERO;
        for arc in self.customer_plan_arcs(customer.id)? {
            used += credit::outstanding_exposure(&*lock(&arc, "plan")?);
        }
        Ok((customer.credit_limit - used).max(Money::ZERO))
    }

    /// recompute and store the cached available limit; the ledger is the
    /// only writer of this field
    fn refresh_available(
        &self,
        customer: &mut Customer,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let new_available = self.available_for(customer)?;
        if new_available != customer.available_limit {
            events.emit(Event::CreditLimitChanged {
                customer_id: customer.id,
                old_available: customer.available_limit,
                new_available,
                timestamp: time.now(),
            });
            customer.available_limit = new_available;
            customer.version += 1;
        }
        Ok(())
    }

    fn append_events(&self, mut scratch: EventStore) {
        if let Ok(mut store) = self.events.lock() {
            for event in scratch.take_events() {
                store.emit(event);
            }
        }
    }

    fn collect_entries<F>(&self, mut select: F) -> Vec<DueEntry>
    where
        F: FnMut(&InstallmentPlan, &InstallmentEntry) -> Option<DueEntry>,
    {
        let mut out = Vec::new();
        for arc in self.all_plan_arcs() {
            let plan = match arc.lock() {
                Ok(guard) => guard,
                Err(_) => continue,
            };
            if plan.status != PlanStatus::Active {
                continue;
            }
            for entry in &plan.schedule {
                if let Some(row) = select(&plan, entry) {
                    out.push(row);
                }
            }
        }
        out.sort_by_key(|row| (row.due_date, row.plan_id, row.installment_number));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn test_time(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap(),
        ))
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_terms(principal: i64, down: i64, term: u32, start: NaiveDate) -> PlanTerms {
        PlanTerms {
            principal_amount: Money::from_major(principal),
            down_payment: Money::from_major(down),
            interest_rate: Rate::ZERO,
            number_of_installments: term,
            frequency: Frequency::Monthly,
            start_date: start,
        }
    }

    #[test]
    fn test_end_to_end_payoff() {
        let engine = InstallmentEngine::new();
        let time = test_time(2026, 1, 20);
        let config = MerchantConfig::default();

        let customer_id = engine
            .register_customer("Aziz Karimov", Money::from_major(2_000_000))
            .unwrap();
        let plan_id = engine
            .create_plan(
                customer_id,
                &monthly_terms(1_020_000, 300_000, 6, date(2026, 1, 20)),
                &config,
                None,
                &time,
            )
            .unwrap();
        engine.submit_plan(plan_id, &time).unwrap();

        assert_eq!(
            engine.available_limit(customer_id).unwrap(),
            Money::from_major(1_280_000)
        );

        // six on-time payments of 120,000
        for month in 0..6u32 {
            let receipt = engine
                .post_payment(
                    &PaymentRequest {
                        plan_id,
                        amount: Money::from_major(120_000),
                        payment_date: Some(date(2026, 2 + month, 20)),
                        external_transaction_id: None,
                    },
                    &time,
                )
                .unwrap();
            assert_eq!(receipt.leftover, Money::ZERO);
        }

        let plan = engine.plan(plan_id).unwrap();
        assert_eq!(plan.status, PlanStatus::Completed);
        assert_eq!(plan.remaining_balance, Money::ZERO);
        assert_eq!(plan.paid_installments, 6);

        // completed plan no longer consumes limit
        assert_eq!(
            engine.available_limit(customer_id).unwrap(),
            Money::from_major(2_000_000)
        );
    }

    #[test]
    fn test_credit_limit_sequence() {
        let engine = InstallmentEngine::new();
        let time = test_time(2026, 1, 10);
        let config = MerchantConfig::default();

        let customer_id = engine
            .register_customer("Test", Money::from_major(1_000_000))
            .unwrap();

        let plan_a = engine
            .create_plan(
                customer_id,
                &monthly_terms(700_000, 0, 6, date(2026, 1, 10)),
                &config,
                None,
                &time,
            )
            .unwrap();
        let plan_b = engine
            .create_plan(
                customer_id,
                &monthly_terms(400_000, 0, 6, date(2026, 1, 10)),
                &config,
                None,
                &time,
            )
            .unwrap();

        engine.submit_plan(plan_a, &time).unwrap();
        assert_eq!(
            engine.available_limit(customer_id).unwrap(),
            Money::from_major(300_000)
        );

        // jointly over-limit: second submission must fail with both figures
        match engine.submit_plan(plan_b, &time).unwrap_err() {
            EngineError::CreditLimitExceeded {
                requested,
                available,
            } => {
                assert_eq!(requested, Money::from_major(400_000));
                assert_eq!(available, Money::from_major(300_000));
            }
            other => panic!("unexpected error: {other}"),
        }

        engine.cancel_plan(plan_a, &time).unwrap();
        assert_eq!(
            engine.available_limit(customer_id).unwrap(),
            Money::from_major(1_000_000)
        );
        assert_eq!(
            engine.customer(customer_id).unwrap().available_limit,
            Money::from_major(1_000_000)
        );

        engine.submit_plan(plan_b, &time).unwrap();
        assert_eq!(
            engine.available_limit(customer_id).unwrap(),
            Money::from_major(600_000)
        );
    }

    #[test]
    fn test_over_limit_draft_fails_fast() {
        let engine = InstallmentEngine::new();
        let time = test_time(2026, 1, 10);
        let config = MerchantConfig::default();

        let customer_id = engine
            .register_customer("Test", Money::from_major(100_000))
            .unwrap();

        let err = engine
            .create_plan(
                customer_id,
                &monthly_terms(500_000, 0, 6, date(2026, 1, 10)),
                &config,
                None,
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::CreditLimitExceeded { .. }));
    }

    #[test]
    fn test_inactive_customer_rejected() {
        let engine = InstallmentEngine::new();
        let time = test_time(2026, 1, 10);
        let config = MerchantConfig::default();

        let customer_id = engine
            .register_customer("Test", Money::from_major(1_000_000))
            .unwrap();
        engine
            .set_customer_status(customer_id, CustomerStatus::Inactive)
            .unwrap();

        let err = engine
            .create_plan(
                customer_id,
                &monthly_terms(100_000, 0, 6, date(2026, 1, 10)),
                &config,
                None,
                &time,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::CustomerInactive { .. }));
    }

    #[test]
    fn test_finance_sale_uses_merchant_defaults() {
        let engine = InstallmentEngine::new();
        let time = test_time(2026, 1, 10);
        let config = MerchantConfig {
            default_installments: 6,
            default_interest_rate: Rate::ZERO,
            ..Default::default()
        };

        let customer_id = engine
            .register_customer("Test", Money::from_major(5_000_000))
            .unwrap();

        let (plan_id, status) = engine
            .finance_sale(
                customer_id,
                &SaleFinancing {
                    sale_id: Uuid::new_v4(),
                    total_amount: Money::from_major(1_020_000),
                    down_payment: Money::from_major(300_000),
                    start_date: date(2026, 1, 10),
                    interest_rate: None,
                    number_of_installments: None,
                    frequency: None,
                },
                &config,
                &time,
            )
            .unwrap();

        assert_eq!(status, PlanStatus::Active);
        let plan = engine.plan(plan_id).unwrap();
        assert!(plan.sale_id.is_some());
        assert_eq!(plan.financed_amount, Money::from_major(720_000));
        assert_eq!(plan.schedule.len(), 6);
        assert_eq!(plan.schedule[0].amount, Money::from_major(120_000));
    }

    #[test]
    fn test_preview_matches_persisted_schedule() {
        let engine = InstallmentEngine::new();
        let time = test_time(2026, 1, 10);
        let config = MerchantConfig::default();
        let terms = monthly_terms(900_000, 100_000, 8, date(2026, 1, 10));

        let quote = engine.preview(&terms).unwrap();

        let customer_id = engine
            .register_customer("Test", Money::from_major(5_000_000))
            .unwrap();
        let plan_id = engine
            .create_plan(customer_id, &terms, &config, None, &time)
            .unwrap();
        let plan = engine.plan(plan_id).unwrap();

        assert_eq!(quote.entries, plan.schedule);
        assert_eq!(quote.total_amount, plan.total_amount);
        assert_eq!(Some(quote.end_date), plan.end_date);
    }

    #[test]
    fn test_duplicate_transaction_replayed_as_noop() {
        let engine = InstallmentEngine::new();
        let time = test_time(2026, 2, 20);
        let config = MerchantConfig::default();

        let customer_id = engine
            .register_customer("Test", Money::from_major(1_000_000))
            .unwrap();
        let plan_id = engine
            .create_plan(
                customer_id,
                &monthly_terms(600_000, 0, 6, date(2026, 1, 20)),
                &config,
                None,
                &time,
            )
            .unwrap();
        engine.submit_plan(plan_id, &time).unwrap();

        let request = PaymentRequest {
            plan_id,
            amount: Money::from_major(100_000),
            payment_date: Some(date(2026, 2, 20)),
            external_transaction_id: Some("click-0001".to_string()),
        };

        let first = engine.post_payment(&request, &time).unwrap();
        assert!(!first.duplicate);
        assert_eq!(first.applied, Money::from_major(100_000));

        let replay = engine.post_payment(&request, &time).unwrap();
        assert!(replay.duplicate);
        assert_eq!(replay.applied, Money::ZERO);

        let plan = engine.plan(plan_id).unwrap();
        assert_eq!(plan.paid_amount, Money::from_major(100_000));
        assert_eq!(plan.payments.len(), 1);

        assert!(engine
            .has_payment(plan_id, date(2026, 2, 20), Money::from_major(100_000))
            .unwrap());
        assert!(!engine
            .has_payment(plan_id, date(2026, 2, 21), Money::from_major(100_000))
            .unwrap());
    }

    #[test]
    fn test_draft_edit_version_conflict() {
        let engine = InstallmentEngine::new();
        let time = test_time(2026, 1, 10);
        let config = MerchantConfig::default();

        let customer_id = engine
            .register_customer("Test", Money::from_major(5_000_000))
            .unwrap();
        let plan_id = engine
            .create_plan(
                customer_id,
                &monthly_terms(600_000, 0, 6, date(2026, 1, 10)),
                &config,
                None,
                &time,
            )
            .unwrap();

        let new_terms = monthly_terms(600_000, 0, 12, date(2026, 1, 10));
        engine
            .update_draft_terms(plan_id, &new_terms, 0, &config)
            .unwrap();
        let plan = engine.plan(plan_id).unwrap();
        assert_eq!(plan.schedule.len(), 12);
        assert_eq!(plan.version, 1);

        // stale version loses
        let err = engine
            .update_draft_terms(plan_id, &new_terms, 0, &config)
            .unwrap_err();
        assert!(matches!(err, EngineError::ConcurrentModification { .. }));

        // once active, regeneration is refused
        engine.submit_plan(plan_id, &time).unwrap();
        let plan = engine.plan(plan_id).unwrap();
        let err = engine
            .update_draft_terms(plan_id, &new_terms, plan.version, &config)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTerms { .. }));
    }

    #[test]
    fn test_sweep_and_queries() {
        let engine = InstallmentEngine::new();
        let start = test_time(2026, 1, 20);
        let config = MerchantConfig::default(); // grace 3 days, 1% fee

        let customer_id = engine
            .register_customer("Test", Money::from_major(1_000_000))
            .unwrap();
        let plan_id = engine
            .create_plan(
                customer_id,
                &monthly_terms(600_000, 0, 6, date(2026, 1, 20)),
                &config,
                None,
                &start,
            )
            .unwrap();
        engine.submit_plan(plan_id, &start).unwrap();

        // first entry due 2026-02-20; run the sweep 5 days later
        let later = test_time(2026, 2, 25);
        let report = engine.run_sweep(&config, &later);

        assert_eq!(report.plans_examined, 1);
        assert_eq!(report.entries_marked_overdue, 1);
        assert_eq!(report.late_fees_applied, 1);
        assert_eq!(report.total_fees, Money::from_major(1_000)); // 1% of 100,000
        assert_eq!(report.failures, 0);

        let overdue = engine.overdue_entries(date(2026, 2, 25));
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].installment_number, 1);
        assert_eq!(overdue[0].days_overdue, 5);
        assert_eq!(overdue[0].outstanding, Money::from_major(101_000));

        // re-running the same day applies nothing new
        let again = engine.run_sweep(&config, &later);
        assert_eq!(again.late_fees_applied, 0);
        assert_eq!(again.entries_marked_overdue, 0);

        let due = engine.entries_due_between(date(2026, 3, 1), date(2026, 3, 31));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].installment_number, 2);
        assert_eq!(due[0].due_date, date(2026, 3, 20));
    }

    #[test]
    fn test_collection_summary() {
        let engine = InstallmentEngine::new();
        let time = test_time(2026, 2, 20);
        let config = MerchantConfig::default();

        let customer_id = engine
            .register_customer("Test", Money::from_major(1_000_000))
            .unwrap();
        let plan_id = engine
            .create_plan(
                customer_id,
                &monthly_terms(600_000, 0, 6, date(2026, 1, 20)),
                &config,
                None,
                &time,
            )
            .unwrap();
        engine.submit_plan(plan_id, &time).unwrap();

        engine
            .post_payment(
                &PaymentRequest {
                    plan_id,
                    amount: Money::from_major(60_000),
                    payment_date: Some(date(2026, 2, 18)),
                    external_transaction_id: None,
                },
                &time,
            )
            .unwrap();

        let summary = engine.collection_summary(date(2026, 2, 14), date(2026, 2, 21));
        assert_eq!(summary.collected, Money::from_major(60_000));
        assert_eq!(summary.expected, Money::from_major(100_000)); // entry 1 due 2026-02-20
        assert_eq!(summary.efficiency_percent, rust_decimal_macros::dec!(60.0));
    }

    #[test]
    fn test_payment_after_sweep_clears_overdue() {
        let engine = InstallmentEngine::new();
        let start = test_time(2026, 1, 20);
        let config = MerchantConfig::default();

        let customer_id = engine
            .register_customer("Test", Money::from_major(1_000_000))
            .unwrap();
        let plan_id = engine
            .create_plan(
                customer_id,
                &monthly_terms(600_000, 0, 6, date(2026, 1, 20)),
                &config,
                None,
                &start,
            )
            .unwrap();
        engine.submit_plan(plan_id, &start).unwrap();

        let later = test_time(2026, 2, 25);
        engine.run_sweep(&config, &later);

        // pay the overdue entry including its fee
        engine
            .post_payment(
                &PaymentRequest {
                    plan_id,
                    amount: Money::from_major(101_000),
                    payment_date: Some(date(2026, 2, 25)),
                    external_transaction_id: None,
                },
                &later,
            )
            .unwrap();

        let plan = engine.plan(plan_id).unwrap();
        assert_eq!(plan.schedule[0].status, crate::types::EntryStatus::Paid);
        assert_eq!(plan.overdue_installments, 0);
        assert!(engine.overdue_entries(date(2026, 2, 25)).is_empty());

        // a sweep after the payment does not touch the paid entry
        let report = engine.run_sweep(&config, &later);
        assert_eq!(report.entries_marked_overdue, 0);
        assert_eq!(report.late_fees_applied, 0);
    }

    #[test]
    fn test_concurrent_payments_serialize_per_plan() {
        use std::sync::Arc as StdArc;
        use std::thread;

        let engine = StdArc::new(InstallmentEngine::new());
        let time = test_time(2026, 2, 20);
        let config = MerchantConfig::default();

        let customer_id = engine
            .register_customer("Test", Money::from_major(1_000_000))
            .unwrap();
        let plan_id = engine
            .create_plan(
                customer_id,
                &monthly_terms(600_000, 0, 6, date(2026, 1, 20)),
                &config,
                None,
                &time,
            )
            .unwrap();
        engine.submit_plan(plan_id, &time).unwrap();

        let mut handles = Vec::new();
        for i in 0..4 {
            let engine = StdArc::clone(&engine);
            handles.push(thread::spawn(move || {
                let time = test_time(2026, 2, 20);
                engine
                    .post_payment(
                        &PaymentRequest {
                            plan_id,
                            amount: Money::from_major(50_000),
                            payment_date: Some(date(2026, 2, 20) + Duration::days(i)),
                            external_transaction_id: None,
                        },
                        &time,
                    )
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let plan = engine.plan(plan_id).unwrap();
        assert_eq!(plan.paid_amount, Money::from_major(200_000));
        let entry_sum: Money = plan.schedule.iter().map(|e| e.paid_amount).sum();
        assert_eq!(entry_sum, Money::from_major(200_000));
        assert_eq!(plan.payments.len(), 4);
        assert_eq!(
            engine.available_limit(customer_id).unwrap(),
            Money::from_major(600_000)
        );
    }
}
