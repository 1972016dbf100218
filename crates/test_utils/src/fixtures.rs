//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for common entities across the billing engine.
//! Fixtures are consistent and predictable for unit tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use core_kernel::{Currency, EffectiveWindow, Money};

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Standard consultation fee
    pub fn ghs_50() -> Money {
        Money::new(dec!(50.00), Currency::GHS)
    }

    /// Standard drug price
    pub fn ghs_100() -> Money {
        Money::new(dec!(100.00), Currency::GHS)
    }

    /// A zero amount
    pub fn ghs_zero() -> Money {
        Money::zero(Currency::GHS)
    }

    /// An amount that produces a half-cent split at common percentages
    pub fn ghs_awkward() -> Money {
        Money::new(dec!(33.35), Currency::GHS)
    }

    /// A USD amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Standard rule effective-from date (Jan 1, 2024)
    pub fn window_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Standard rule effective-to date (Dec 31, 2024)
    pub fn window_end() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()
    }

    /// A service date inside the standard window
    pub fn mid_year() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// A service date before the standard window
    pub fn before_window() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 12, 1).unwrap()
    }

    /// A service date after the standard window
    pub fn after_window() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
    }

    /// The standard bounded window
    pub fn standard_window() -> EffectiveWindow {
        EffectiveWindow::new(Some(Self::window_start()), Some(Self::window_end()))
            .expect("fixture window is valid")
    }

    /// A charge timestamp inside the standard window
    pub fn charge_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 10, 30, 0).unwrap()
    }

    /// A charge timestamp just before midnight UTC, for timezone
    /// bucketing tests
    pub fn late_night_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 23, 55, 0).unwrap()
    }
}

/// Fixture for common billing codes
pub struct CodeFixtures;

impl CodeFixtures {
    pub fn drug_code() -> &'static str {
        "AMOX-500"
    }

    pub fn lab_code() -> &'static str {
        "FBC"
    }

    pub fn consultation_code() -> &'static str {
        "OPD-GEN"
    }

    pub fn nhis_drug_code() -> &'static str {
        "NHISMED0123"
    }

    pub fn gdrg_code() -> &'static str {
        "OPDC01"
    }
}
