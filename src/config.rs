use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{EngineError, Result};
use crate::types::Frequency;

/// per-tenant merchant settings
///
/// callers pass this into plan creation and the overdue sweep explicitly;
/// the engine never reads tenant configuration from global state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantConfig {
    /// days past due before a late fee becomes chargeable
    pub grace_period_days: u32,
    /// late fee as a percent of the overdue installment amount
    pub late_fee_percentage: Decimal,
    /// default interest rate (percent per period) for financed sales
    pub default_interest_rate: Rate,
    /// default number of installments for financed sales
    pub default_installments: u32,
    /// default billing frequency for financed sales
    pub default_frequency: Frequency,
    /// default down payment percent of the sale total
    pub default_down_payment_percent: Decimal,
    /// smallest allowed term
    pub min_installments: u32,
    /// largest allowed term
    pub max_installments: u32,
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            grace_period_days: 3,
            late_fee_percentage: dec!(1),
            default_interest_rate: Rate::ZERO,
            default_installments: 6,
            default_frequency: Frequency::Monthly,
            default_down_payment_percent: dec!(20),
            min_installments: 1,
            max_installments: 24,
        }
    }
}

impl MerchantConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_installments > self.max_installments {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "minimum installments {} cannot exceed maximum {}",
                    self.min_installments, self.max_installments
                ),
            });
        }

        if self.min_installments < 1 {
            return Err(EngineError::InvalidConfiguration {
                message: "minimum installments must be at least 1".to_string(),
            });
        }

        if self.default_interest_rate.as_percentage() > dec!(100) {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "interest rate {} cannot exceed 100%",
                    self.default_interest_rate
                ),
            });
        }

        if self.default_down_payment_percent > dec!(100) {
            return Err(EngineError::InvalidConfiguration {
                message: format!(
                    "down payment percent {} cannot exceed 100",
                    self.default_down_payment_percent
                ),
            });
        }

        if self.late_fee_percentage < Decimal::ZERO {
            return Err(EngineError::InvalidConfiguration {
                message: "late fee percentage cannot be negative".to_string(),
            });
        }

        if self.late_fee_percentage > dec!(50) {
            tracing::warn!(
                late_fee_percentage = %self.late_fee_percentage,
                "late fee percentage is very high"
            );
        }

        Ok(())
    }
}
