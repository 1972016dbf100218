//! Property-Based Test Generators
//!
//! Proptest strategies for generating random test data that maintains
//! domain invariants.

use fake::faker::lorem::en::Words;
use fake::Fake;
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{Currency, Money};
use domain_coverage::{CoverageTerms, CoverageType};

/// Strategy for two-decimal-place unit prices in the billing range
pub fn unit_price_strategy() -> impl Strategy<Value = Money> {
    (1i64..5_000_00i64).prop_map(|minor| Money::new(Decimal::new(minor, 2), Currency::GHS))
}

/// Strategy for non-negative amounts including zero
pub fn amount_strategy() -> impl Strategy<Value = Money> {
    (0i64..5_000_00i64).prop_map(|minor| Money::new(Decimal::new(minor, 2), Currency::GHS))
}

/// Strategy for insurer percentages (0-100, two decimal places)
pub fn percentage_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=100_00i64).prop_map(|hundredths| Decimal::new(hundredths, 2))
}

/// Strategy for realistic per-visit quantities
pub fn quantity_strategy() -> impl Strategy<Value = u32> {
    1u32..=30u32
}

/// Strategy for valid percentage coverage terms with optional copays
pub fn percentage_terms_strategy() -> impl Strategy<Value = CoverageTerms> {
    (
        percentage_strategy(),
        proptest::option::of(0i64..50_00i64),
        proptest::option::of(1u32..10u32),
    )
        .prop_map(|(percent, copay_minor, max_qty)| {
            let mut terms = CoverageTerms::percentage(percent);
            terms.coverage_type = CoverageType::Percentage;
            terms.patient_copay_amount =
                copay_minor.map(|m| Money::new(Decimal::new(m, 2), Currency::GHS));
            terms.max_quantity_per_visit = max_qty;
            terms
        })
}

/// A fake item description for seeded test data
pub fn fake_description() -> String {
    let words: Vec<String> = Words(2..4).fake();
    words.join(" ")
}

/// A fake NHIS membership number
pub fn fake_membership_id() -> String {
    let serial: u32 = (10_000_000..99_999_999).fake();
    format!("NHIS-{serial}")
}
