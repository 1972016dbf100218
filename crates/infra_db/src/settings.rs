//! Engine configuration
//!
//! Runtime settings loaded from the environment (with `.env` support in
//! development). Billing behaviour is carried as an explicit
//! [`BillingConfig`] into the domain services; nothing reads ambient state.

use serde::Deserialize;

use core_kernel::{Currency, Timezone};
use domain_coverage::BillingConfig;

use crate::pool::DatabaseConfig;

/// Engine configuration
///
/// Fields missing from the environment fall back to their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Database URL
    pub database_url: String,
    /// Maximum database connections
    pub database_max_connections: u32,
    /// Billing currency code
    pub currency: Currency,
    /// Facility timezone, e.g. "Africa/Accra"
    pub facility_timezone: Timezone,
    /// Claim check code reuse window in hours
    pub claim_check_reuse_window_hours: u32,
    /// Master switch for routing charges into claims
    pub insurance_billing_enabled: bool,
    /// Log level
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/claims".to_string(),
            database_max_connections: 10,
            currency: Currency::GHS,
            facility_timezone: Timezone::default(),
            claim_check_reuse_window_hours: 24,
            insurance_billing_enabled: true,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Loads configuration from `CLAIMS_*` environment variables,
    /// reading a `.env` file first when one is present
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        config::Config::builder()
            .add_source(config::Environment::with_prefix("CLAIMS"))
            .build()?
            .try_deserialize()
    }

    /// The database pool configuration these settings describe
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url).max_connections(self.database_max_connections)
    }

    /// The billing configuration these settings describe
    pub fn billing_config(&self) -> BillingConfig {
        BillingConfig {
            currency: self.currency,
            facility_timezone: self.facility_timezone,
            claim_check_reuse_window_hours: self.claim_check_reuse_window_hours,
            insurance_billing_enabled: self.insurance_billing_enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_round_trip_into_billing_config() {
        let settings = Settings::default();
        let billing = settings.billing_config();
        assert_eq!(billing.currency, Currency::GHS);
        assert_eq!(billing.claim_check_reuse_window_hours, 24);
        assert!(billing.insurance_billing_enabled);
        assert_eq!(settings.database_config().max_connections, 10);
    }
}
