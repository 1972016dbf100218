//! Billing configuration
//!
//! Global billing toggles are passed as an explicit configuration object
//! into the services that need them rather than read from ambient state.

use serde::{Deserialize, Serialize};

use core_kernel::{Currency, Timezone};

/// Engine-wide billing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    /// Currency all charges and splits are denominated in
    pub currency: Currency,
    /// Facility timezone used to bucket charge timestamps into the
    /// calendar dates that rule and tariff windows are evaluated against
    pub facility_timezone: Timezone,
    /// A claim check code may be reused, but not by two active claims for
    /// the same patient within this window
    pub claim_check_reuse_window_hours: u32,
    /// When false, charges are never routed into claims (cash-only mode)
    pub insurance_billing_enabled: bool,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            currency: Currency::GHS,
            facility_timezone: Timezone::default(),
            claim_check_reuse_window_hours: 24,
            insurance_billing_enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BillingConfig::default();
        assert_eq!(config.currency, Currency::GHS);
        assert_eq!(config.claim_check_reuse_window_hours, 24);
        assert!(config.insurance_billing_enabled);
    }
}
