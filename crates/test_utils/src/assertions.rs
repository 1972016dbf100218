//! Custom Test Assertions
//!
//! Specialized assertion helpers for domain types that give more meaningful
//! failure messages than standard assertions.

use rust_decimal::Decimal;

use core_kernel::Money;
use domain_claims::InsuranceClaim;
use domain_coverage::CoverageSplit;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more
/// than the tolerance.
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ by more than tolerance: actual={}, expected={}, diff={}, tolerance={}",
        actual.amount(),
        expected.amount(),
        diff,
        tolerance
    );
}

/// Asserts that a coverage split sums exactly back to its subtotal
///
/// # Panics
///
/// Panics if `insurance_pays + patient_pays != subtotal`.
pub fn assert_split_balances(split: &CoverageSplit) {
    assert!(
        split.balances(),
        "Split does not balance: insurance={} + patient={} != subtotal={}",
        split.insurance_pays,
        split.patient_pays,
        split.subtotal
    );
}

/// Asserts that a claim's money rollups match its active items
///
/// # Panics
///
/// Panics if any rollup disagrees with the item sums or the shares do not
/// sum to the total.
pub fn assert_claim_totals_consistent(claim: &InsuranceClaim) {
    let currency = claim.currency();
    let mut total = Money::zero(currency);
    let mut insurance = Money::zero(currency);
    let mut patient = Money::zero(currency);
    for item in claim.active_items() {
        total = total.checked_add(&item.subtotal).expect("same currency");
        insurance = insurance
            .checked_add(&item.insurance_pays)
            .expect("same currency");
        patient = patient
            .checked_add(&item.patient_pays)
            .expect("same currency");
    }
    assert_eq!(
        claim.total_claim_amount, total,
        "total_claim_amount {} disagrees with item sum {}",
        claim.total_claim_amount, total
    );
    assert_eq!(
        claim.insurance_covered_amount, insurance,
        "insurance_covered_amount {} disagrees with item sum {}",
        claim.insurance_covered_amount, insurance
    );
    assert_eq!(
        claim.patient_copay_amount, patient,
        "patient_copay_amount {} disagrees with item sum {}",
        claim.patient_copay_amount, patient
    );
    claim
        .verify_totals()
        .expect("insurer + patient shares must sum to the claim total");
}
