pub mod calendar;
pub mod config;
pub mod credit;
pub mod customer;
pub mod decimal;
pub mod engine;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod payments;
pub mod plan;
pub mod schedule;
pub mod sweep;
pub mod types;

// re-export key types
pub use config::MerchantConfig;
pub use customer::Customer;
pub use decimal::{Money, Rate};
pub use engine::{CollectionSummary, DueEntry, InstallmentEngine, SaleFinancing};
pub use errors::{EngineError, Result};
pub use events::{Event, EventStore};
pub use payments::{PaymentReceipt, PaymentRequest};
pub use plan::{InstallmentEntry, InstallmentPlan, PaymentRecord, PlanTerms};
pub use schedule::ScheduleQuote;
pub use sweep::{OverdueSweep, SweepReport};
pub use types::{
    CustomerId, CustomerStatus, EntryStatus, Frequency, PlanId, PlanStatus, SaleId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
