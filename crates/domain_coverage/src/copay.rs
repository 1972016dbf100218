//! Copay calculation
//!
//! Pure, stateless splitting of a charge subtotal into insurer and patient
//! shares. Amounts are rounded half-up to 2 decimal places with the rounding
//! remainder always assigned to the patient side, so
//! `insurance_pays + patient_pays == subtotal` holds exactly for every call.
//!
//! Per-visit amount caps (`max_amount_per_visit`) are NOT applied here: they
//! need the running insurer total for the claim, which the claim aggregator
//! tracks. Quantity caps are local to one charge and are applied here.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::Money;
use crate::error::CoverageError;
use crate::rule::{CoverageTerms, CoverageType};

/// The insurer/patient split for one charge
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSplit {
    /// `unit_price x quantity`, rounded to 2 dp
    pub subtotal: Money,
    pub insurance_pays: Money,
    pub patient_pays: Money,
    /// Effective insurer percentage of the subtotal, for display
    pub coverage_percentage: Decimal,
    /// Quantity exceeded `max_quantity_per_visit`; the excess is patient-payable
    pub exceeded_quantity_limit: bool,
    /// Human-readable note when a limit was hit
    pub limit_note: Option<String>,
}

impl CoverageSplit {
    /// Checks the exact-sum invariant
    pub fn balances(&self) -> bool {
        self.insurance_pays.amount() + self.patient_pays.amount() == self.subtotal.amount()
    }
}

/// A fully patient-payable split, used for unmapped and unpriced items
pub fn patient_pays_all(unit_price: Money, quantity: u32) -> CoverageSplit {
    let subtotal = unit_price
        .multiply(Decimal::from(quantity))
        .round_half_up();
    CoverageSplit {
        subtotal,
        insurance_pays: Money::zero(unit_price.currency()),
        patient_pays: subtotal,
        coverage_percentage: dec!(0),
        exceeded_quantity_limit: false,
        limit_note: None,
    }
}

/// Splits `unit_price x quantity` between insurer and patient per the terms
///
/// # Errors
///
/// Returns [`CoverageError::SplitImbalance`] if the computed shares fail to
/// sum back to the subtotal (an internal invariant violation, not a user
/// error) and [`CoverageError::Money`] on currency mismatches between the
/// terms' money fields and the unit price.
pub fn split(
    terms: &CoverageTerms,
    unit_price: Money,
    quantity: u32,
) -> Result<CoverageSplit, CoverageError> {
    let currency = unit_price.currency();
    let qty = Decimal::from(quantity);
    let subtotal = unit_price.multiply(qty).round_half_up();

    // Quantity cap: only the capped quantity is billable to the insurer,
    // the excess quantity's cost reverts to the patient.
    let (covered_subtotal, excess, exceeded_quantity_limit, limit_note) =
        match terms.max_quantity_per_visit {
            Some(max_qty) if quantity > max_qty => {
                let covered = unit_price
                    .multiply(Decimal::from(max_qty))
                    .round_half_up();
                let excess = subtotal.checked_sub(&covered)?;
                let note = format!(
                    "Quantity {} exceeds plan limit of {} per visit",
                    quantity, max_qty
                );
                (covered, excess, true, Some(note))
            }
            _ => (subtotal, Money::zero(currency), false, None),
        };

    // The fixed add-on is per unit and always patient-borne.
    let copay_total = terms
        .patient_copay_amount
        .map(|c| c.multiply(qty).round_half_up())
        .unwrap_or_else(|| Money::zero(currency));

    let (mut insurance_pays, mut patient_pays) = match terms.effective_type() {
        CoverageType::Excluded => (Money::zero(currency), subtotal),

        CoverageType::Full => {
            // Insurer takes the covered portion, patient keeps the excess.
            (covered_subtotal, excess)
        }

        CoverageType::Percentage => {
            // An explicit patient percentage overrides the coverage value.
            let factor = match terms.patient_copay_percentage {
                Some(cp) if cp > Decimal::ZERO => (dec!(100) - cp) / dec!(100),
                _ => terms.coverage_value.unwrap_or(Decimal::ZERO) / dec!(100),
            };
            let (insurer, patient_base) = covered_subtotal.split_share(factor);
            (insurer, patient_base.checked_add(&excess)?)
        }

        CoverageType::Fixed => {
            // Flat insurer-payable ceiling; negotiated tariff wins if set.
            let ceiling = terms.tariff_amount.unwrap_or_else(|| {
                Money::new(terms.coverage_value.unwrap_or(Decimal::ZERO), currency)
            });
            let insurer = ceiling.min(covered_subtotal)?.round_half_up();
            let patient = subtotal.checked_sub(&insurer)?;
            (insurer, patient)
        }
    };

    // Fold the fixed copay in by moving it from the insurer share to the
    // patient share, clamped so neither side goes negative. The shift keeps
    // the exact-sum invariant intact by construction.
    if copay_total.is_positive() && insurance_pays.is_positive() {
        let shift = copay_total.min(insurance_pays)?;
        insurance_pays = insurance_pays.checked_sub(&shift)?;
        patient_pays = patient_pays.checked_add(&shift)?;
    }

    if insurance_pays.amount() + patient_pays.amount() != subtotal.amount() {
        return Err(CoverageError::SplitImbalance {
            insurance: insurance_pays.amount(),
            patient: patient_pays.amount(),
            subtotal: subtotal.amount(),
        });
    }

    let coverage_percentage = if subtotal.is_positive() {
        (insurance_pays.amount() / subtotal.amount() * dec!(100)).round_dp(2)
    } else {
        dec!(0)
    };

    Ok(CoverageSplit {
        subtotal,
        insurance_pays,
        patient_pays,
        coverage_percentage,
        exceeded_quantity_limit,
        limit_note,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    fn ghs(amount: Decimal) -> Money {
        Money::new(amount, Currency::GHS)
    }

    fn percentage_terms(value: Decimal) -> CoverageTerms {
        CoverageTerms::percentage(value)
    }

    #[test]
    fn test_scenario_a_eighty_percent_drug() {
        // 80% coverage, unit 50.00 x1 -> insurer 40.00, patient 10.00
        let terms = percentage_terms(dec!(80));
        let result = split(&terms, ghs(dec!(50.00)), 1).unwrap();

        assert_eq!(result.insurance_pays.amount(), dec!(40.00));
        assert_eq!(result.patient_pays.amount(), dec!(10.00));
        assert!(result.balances());
    }

    #[test]
    fn test_scenario_b_fixed_ceiling() {
        // fixed 30.00 ceiling, unit 50.00 x1 -> insurer 30.00, patient 20.00
        let mut terms = percentage_terms(dec!(0));
        terms.coverage_type = CoverageType::Fixed;
        terms.coverage_value = Some(dec!(30.00));

        let result = split(&terms, ghs(dec!(50.00)), 1).unwrap();
        assert_eq!(result.insurance_pays.amount(), dec!(30.00));
        assert_eq!(result.patient_pays.amount(), dec!(20.00));
    }

    #[test]
    fn test_scenario_c_unmapped_item() {
        let result = patient_pays_all(ghs(dec!(25.00)), 2);
        assert_eq!(result.insurance_pays.amount(), dec!(0.00));
        assert_eq!(result.patient_pays.amount(), dec!(50.00));
        assert!(result.balances());
    }

    #[test]
    fn test_full_coverage_with_fixed_copay() {
        let mut terms = percentage_terms(dec!(100));
        terms.coverage_type = CoverageType::Full;
        terms.patient_copay_amount = Some(ghs(dec!(5.00)));

        let result = split(&terms, ghs(dec!(50.00)), 1).unwrap();
        assert_eq!(result.insurance_pays.amount(), dec!(45.00));
        assert_eq!(result.patient_pays.amount(), dec!(5.00));
    }

    #[test]
    fn test_fixed_ceiling_above_subtotal_pays_subtotal() {
        let mut terms = percentage_terms(dec!(0));
        terms.coverage_type = CoverageType::Fixed;
        terms.coverage_value = Some(dec!(100.00));

        let result = split(&terms, ghs(dec!(40.00)), 1).unwrap();
        assert_eq!(result.insurance_pays.amount(), dec!(40.00));
        assert_eq!(result.patient_pays.amount(), dec!(0.00));
    }

    #[test]
    fn test_excluded_pays_nothing() {
        let terms = CoverageTerms::excluded();
        let result = split(&terms, ghs(dec!(50.00)), 2).unwrap();

        assert!(result.insurance_pays.is_zero());
        assert_eq!(result.patient_pays.amount(), dec!(100.00));
    }

    #[test]
    fn test_not_covered_flag_overrides_type() {
        let mut terms = percentage_terms(dec!(80));
        terms.is_covered = false;

        let result = split(&terms, ghs(dec!(50.00)), 1).unwrap();
        assert!(result.insurance_pays.is_zero());
    }

    #[test]
    fn test_quantity_cap_reverts_excess_to_patient() {
        let mut terms = percentage_terms(dec!(100));
        terms.coverage_type = CoverageType::Full;
        terms.max_quantity_per_visit = Some(2);

        // 5 units of 10.00; insurer covers 2, patient covers 3
        let result = split(&terms, ghs(dec!(10.00)), 5).unwrap();
        assert_eq!(result.subtotal.amount(), dec!(50.00));
        assert_eq!(result.insurance_pays.amount(), dec!(20.00));
        assert_eq!(result.patient_pays.amount(), dec!(30.00));
        assert!(result.exceeded_quantity_limit);
        assert!(result.limit_note.is_some());
    }

    #[test]
    fn test_patient_copay_percentage_overrides_coverage_value() {
        let mut terms = percentage_terms(dec!(80));
        terms.patient_copay_percentage = Some(dec!(30));

        let result = split(&terms, ghs(dec!(100.00)), 1).unwrap();
        assert_eq!(result.insurance_pays.amount(), dec!(70.00));
        assert_eq!(result.patient_pays.amount(), dec!(30.00));
    }

    #[test]
    fn test_rounding_remainder_goes_to_patient() {
        // 33.33% of 10.01 = 3.336333 -> insurer 3.34, patient 6.67
        let terms = percentage_terms(dec!(33.33));
        let result = split(&terms, ghs(dec!(10.01)), 1).unwrap();

        assert!(result.balances());
        assert_eq!(
            result.insurance_pays.amount() + result.patient_pays.amount(),
            dec!(10.01)
        );
    }

    #[test]
    fn test_copay_never_drives_insurer_negative() {
        let mut terms = percentage_terms(dec!(10));
        terms.patient_copay_amount = Some(ghs(dec!(20.00)));

        let result = split(&terms, ghs(dec!(50.00)), 1).unwrap();
        assert!(!result.insurance_pays.is_negative());
        assert!(result.balances());
    }

    #[test]
    fn test_zero_quantity_is_all_zero() {
        let terms = percentage_terms(dec!(80));
        let result = split(&terms, ghs(dec!(50.00)), 0).unwrap();

        assert!(result.subtotal.is_zero());
        assert!(result.insurance_pays.is_zero());
        assert!(result.patient_pays.is_zero());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use core_kernel::Currency;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn split_sum_invariant_holds(
            unit_minor in 1i64..10_000_00i64,
            quantity in 0u32..500u32,
            pct in 0u32..=100u32,
            copay_minor in 0i64..50_00i64
        ) {
            let mut terms = CoverageTerms::percentage(Decimal::from(pct));
            if copay_minor > 0 {
                terms.patient_copay_amount =
                    Some(Money::from_minor(copay_minor, Currency::GHS));
            }

            let unit_price = Money::from_minor(unit_minor, Currency::GHS);
            let result = split(&terms, unit_price, quantity).unwrap();

            prop_assert!(result.balances());
            prop_assert!(!result.insurance_pays.is_negative());
            prop_assert!(!result.patient_pays.is_negative());
        }

        #[test]
        fn quantity_cap_never_breaks_invariant(
            unit_minor in 1i64..1_000_00i64,
            quantity in 1u32..100u32,
            cap in 1u32..100u32
        ) {
            let mut terms = CoverageTerms::percentage(Decimal::from(80u32));
            terms.coverage_type = CoverageType::Full;
            terms.max_quantity_per_visit = Some(cap);

            let unit_price = Money::from_minor(unit_minor, Currency::GHS);
            let result = split(&terms, unit_price, quantity).unwrap();

            prop_assert!(result.balances());
            prop_assert_eq!(result.exceeded_quantity_limit, quantity > cap);
        }
    }
}
