/// credit limits - two plans racing for one customer's headroom
use installment_engine_rs::{
    EngineError, Frequency, InstallmentEngine, MerchantConfig, Money, PlanTerms, Rate,
    SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::System);
    let config = MerchantConfig::default();
    let engine = InstallmentEngine::new();

    let customer_id = engine.register_customer("Bobur Toshmatov", Money::from_major(1_000_000))?;
    let start = time.now().date_naive();

    let terms = |principal: i64| PlanTerms {
        principal_amount: Money::from_major(principal),
        down_payment: Money::ZERO,
        interest_rate: Rate::ZERO,
        number_of_installments: 6,
        frequency: Frequency::Monthly,
        start_date: start,
    };

    let plan_a = engine.create_plan(customer_id, &terms(700_000), &config, None, &time)?;
    let plan_b = engine.create_plan(customer_id, &terms(400_000), &config, None, &time)?;

    engine.submit_plan(plan_a, &time)?;
    println!("after plan A: available {}", engine.available_limit(customer_id)?);

    // individually fine, jointly over the limit
    match engine.submit_plan(plan_b, &time) {
        Err(EngineError::CreditLimitExceeded {
            requested,
            available,
        }) => println!("plan B rejected: wanted {requested}, only {available} left"),
        other => println!("unexpected: {other:?}"),
    }

    engine.cancel_plan(plan_a, &time)?;
    println!("after cancelling A: available {}", engine.available_limit(customer_id)?);

    engine.submit_plan(plan_b, &time)?;
    println!("plan B accepted: available {}", engine.available_limit(customer_id)?);

    Ok(())
}
