//! Property tests for charge linking
//!
//! Whatever the price, quantity, and insurer percentage, the claim's
//! rollups must balance and re-running the linker must change nothing.

use proptest::prelude::*;

use core_kernel::Currency;
use domain_claims::{ClaimAssembler, PlanContext};
use domain_coverage::{BillingConfig, CoverageCategory};
use domain_tariff::TariffResolver;
use test_utils::{
    assert_claim_totals_consistent, percentage_strategy, quantity_strategy,
    unit_price_strategy, ChargeBuilder, ClaimBuilder, PlanBuilder, RuleBuilder,
};

proptest! {
    #[test]
    fn linked_claim_rollups_always_balance(
        price in unit_price_strategy(),
        quantity in quantity_strategy(),
        percent in percentage_strategy(),
    ) {
        let plan = PlanBuilder::new().build();
        let rules =
            vec![RuleBuilder::percentage(plan.id, CoverageCategory::Drug, percent).build()];
        let tariffs = TariffResolver::new(Currency::GHS);
        let assembler = ClaimAssembler::new(BillingConfig::default());

        let mut claim = ClaimBuilder::for_plan(plan.id).build();
        let mut charges = vec![ChargeBuilder::new()
            .for_visit(claim.patient_id, claim.visit_id)
            .with_amount(price)
            .with_quantity(quantity)
            .build()];

        let ctx = PlanContext { plan: &plan, rules: &rules, tariffs: &tariffs };
        let outcome = assembler.add_charges(&mut claim, &mut charges, &ctx).unwrap();

        prop_assert_eq!(outcome.linked, 1);
        assert_claim_totals_consistent(&claim);
        let recombined = claim
            .insurance_covered_amount
            .checked_add(&claim.patient_copay_amount)
            .unwrap();
        prop_assert_eq!(recombined, claim.total_claim_amount);
    }

    #[test]
    fn relinking_is_a_no_op(
        price in unit_price_strategy(),
        quantity in quantity_strategy(),
        percent in percentage_strategy(),
    ) {
        let plan = PlanBuilder::new().build();
        let rules =
            vec![RuleBuilder::percentage(plan.id, CoverageCategory::Drug, percent).build()];
        let tariffs = TariffResolver::new(Currency::GHS);
        let assembler = ClaimAssembler::new(BillingConfig::default());

        let mut claim = ClaimBuilder::for_plan(plan.id).build();
        let mut charges = vec![ChargeBuilder::new()
            .for_visit(claim.patient_id, claim.visit_id)
            .with_amount(price)
            .with_quantity(quantity)
            .build()];

        let ctx = PlanContext { plan: &plan, rules: &rules, tariffs: &tariffs };
        assembler.add_charges(&mut claim, &mut charges, &ctx).unwrap();
        let first_total = claim.total_claim_amount;
        let first_items = claim.active_items().count();

        let rerun = assembler.add_charges(&mut claim, &mut charges, &ctx).unwrap();

        prop_assert_eq!(rerun.linked, 0);
        prop_assert_eq!(rerun.skipped, 1);
        prop_assert_eq!(claim.total_claim_amount, first_total);
        prop_assert_eq!(claim.active_items().count(), first_items);
        assert_claim_totals_consistent(&claim);
    }
}
