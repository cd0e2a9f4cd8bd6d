/// overdue sweep - drive the clock past a due date and watch the daily
/// batch reclassify entries and charge a late fee
use installment_engine_rs::chrono::{Duration, TimeZone, Utc};
use installment_engine_rs::{
    Frequency, InstallmentEngine, MerchantConfig, Money, PlanTerms, Rate, SafeTimeProvider,
    TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let start = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
    let time = SafeTimeProvider::new(TimeSource::Test(start));
    let control = time.test_control().expect("test clock");

    let config = MerchantConfig::default(); // 3 day grace, 1% late fee
    let engine = InstallmentEngine::new();

    let customer_id = engine.register_customer("Dilnoza Rashidova", Money::from_major(1_000_000))?;
    let plan_id = engine.create_plan(
        customer_id,
        &PlanTerms {
            principal_amount: Money::from_major(600_000),
            down_payment: Money::ZERO,
            interest_rate: Rate::ZERO,
            number_of_installments: 6,
            frequency: Frequency::Monthly,
            start_date: start.date_naive(),
        },
        &config,
        None,
        &time,
    )?;
    engine.submit_plan(plan_id, &time)?;

    // first entry falls due 2026-02-20; jump one day past it
    control.advance(Duration::days(32));
    let report = engine.run_sweep(&config, &time);
    println!(
        "day 1 past due: {} overdue, {} fees",
        report.entries_marked_overdue, report.late_fees_applied
    );

    // jump past the grace period; the fee lands exactly once
    control.advance(Duration::days(4));
    let report = engine.run_sweep(&config, &time);
    println!(
        "day 5 past due: {} fees totalling {}",
        report.late_fees_applied, report.total_fees
    );

    let again = engine.run_sweep(&config, &time);
    println!("same day re-run: {} fees", again.late_fees_applied);

    for row in engine.overdue_entries(time.now().date_naive()) {
        println!(
            "overdue: installment {} due {} ({} days late), owes {}",
            row.installment_number, row.due_date, row.days_overdue, row.outstanding
        );
    }

    Ok(())
}
