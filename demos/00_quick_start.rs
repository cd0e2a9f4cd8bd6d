/// quick start - draft, submit, and pay down an installment plan
use installment_engine_rs::{
    Frequency, InstallmentEngine, MerchantConfig, Money, PaymentRequest, PlanTerms, Rate,
    SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let config = MerchantConfig::default();
    let engine = InstallmentEngine::new();

    // a customer with a 2,000,000 credit limit
    let customer_id = engine.register_customer("Aziz Karimov", Money::from_major(2_000_000))?;

    // finance a 1,020,000 purchase: 300,000 down, the rest over 6 months
    let plan_id = engine.create_plan(
        customer_id,
        &PlanTerms {
            principal_amount: Money::from_major(1_020_000),
            down_payment: Money::from_major(300_000),
            interest_rate: Rate::ZERO,
            number_of_installments: 6,
            frequency: Frequency::Monthly,
            start_date: time.now().date_naive(),
        },
        &config,
        None,
        &time,
    )?;
    engine.submit_plan(plan_id, &time)?;

    // the first installment comes in
    let receipt = engine.post_payment(
        &PaymentRequest {
            plan_id,
            amount: Money::from_major(120_000),
            payment_date: None,
            external_transaction_id: None,
        },
        &time,
    )?;

    println!("applied {}, balance {}", receipt.applied, receipt.updated_balance);
    println!(
        "available limit: {}",
        engine.available_limit(customer_id)?
    );

    let plan = engine.plan(plan_id)?;
    println!("{}", serde_json::to_string_pretty(&plan)?);

    Ok(())
}
