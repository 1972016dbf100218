//! Behavioural tests for Money rounding used by the copay calculator

use core_kernel::{Currency, Money};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[test]
fn half_up_rounding_differs_from_bankers() {
    // 12.345 * 1 -> 12.35 under half-up (bankers would give 12.34)
    let m = Money::new(dec!(12.345), Currency::GHS);
    assert_eq!(m.round_half_up().amount(), dec!(12.35));
}

#[test]
fn split_share_remainder_carries_rounding_loss() {
    // 80% of 0.01 rounds the insurer share to 0.01, leaving 0.00 for the patient
    let subtotal = Money::new(dec!(0.01), Currency::GHS);
    let (insurer, patient) = subtotal.split_share(dec!(0.80));

    assert_eq!(insurer.amount(), dec!(0.01));
    assert_eq!(patient.amount(), dec!(0.00));
    assert_eq!(insurer.amount() + patient.amount(), subtotal.amount());
}

#[test]
fn split_share_with_awkward_percentage() {
    let subtotal = Money::new(dec!(99.99), Currency::GHS);
    let (insurer, patient) = subtotal.split_share(Decimal::new(333, 3)); // 33.3%

    assert_eq!(insurer.amount() + patient.amount(), subtotal.amount());
    assert_eq!(insurer, insurer.round_half_up());
}

#[test]
fn zero_subtotal_splits_to_zero() {
    let subtotal = Money::zero(Currency::GHS);
    let (insurer, patient) = subtotal.split_share(dec!(0.80));

    assert!(insurer.is_zero());
    assert!(patient.is_zero());
}
