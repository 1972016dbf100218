//! End-to-end claim workflow tests
//!
//! Walks charges through linking, vetting, batching, and settlement the
//! way the billing desk would, checking the money invariants at each step.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use rust_decimal_macros::dec;

use core_kernel::{Currency, Money, UserId};
use domain_claims::{
    apply_outcome_to_claim, complete_vetting, generate_batch_number, vet_item, BatchItemOutcome,
    BatchStatus, ClaimAssembler, ClaimBatch, ClaimStatus, Diagnosis, ItemVetting, PlanContext,
};
use domain_coverage::{BillingConfig, CoverageCategory};
use domain_tariff::TariffResolver;
use test_utils::{
    assert_claim_totals_consistent, ChargeBuilder, ClaimBuilder, PlanBuilder, RuleBuilder,
};

fn ghs(value: rust_decimal::Decimal) -> Money {
    Money::new(value, Currency::GHS)
}

#[test]
fn full_lifecycle_from_charges_to_paid_claim() {
    let plan = PlanBuilder::new().build();
    let rules = vec![
        RuleBuilder::percentage(plan.id, CoverageCategory::Drug, dec!(80))
            .for_item("AMOX-500")
            .build(),
        RuleBuilder::percentage(plan.id, CoverageCategory::Lab, dec!(50)).build(),
    ];
    let tariffs = TariffResolver::new(Currency::GHS);
    let assembler = ClaimAssembler::new(BillingConfig::default());

    let mut claim = ClaimBuilder::for_plan(plan.id).build();
    let mut charges = vec![
        ChargeBuilder::new()
            .for_visit(claim.patient_id, claim.visit_id)
            .with_code("AMOX-500")
            .with_amount(ghs(dec!(50.00)))
            .build(),
        ChargeBuilder::new()
            .for_visit(claim.patient_id, claim.visit_id)
            .with_source(domain_claims::BillableSource::LabOrder(uuid::Uuid::new_v4()))
            .with_code("FBC")
            .with_amount(ghs(dec!(30.00)))
            .build(),
    ];

    let ctx = PlanContext { plan: &plan, rules: &rules, tariffs: &tariffs };
    let outcome = assembler.add_charges(&mut claim, &mut charges, &ctx).unwrap();
    assert_eq!(outcome.linked, 2);
    assert_claim_totals_consistent(&claim);
    // 80% of 50 plus 50% of 30.
    assert_eq!(claim.insurance_covered_amount, ghs(dec!(55.00)));
    assert_eq!(claim.patient_copay_amount, ghs(dec!(25.00)));

    claim.submit_for_vetting().unwrap();
    let lab_item = claim
        .active_items()
        .find(|i| i.category == CoverageCategory::Lab)
        .map(|i| i.id)
        .unwrap();
    vet_item(
        &mut claim,
        &ItemVetting {
            item_id: lab_item,
            is_approved: false,
            rejection_reason: Some("no supporting lab request".into()),
        },
    )
    .unwrap();
    complete_vetting(
        &mut claim,
        UserId::new(),
        Diagnosis { code: "J06.9".into(), description: "Acute URTI".into() },
        vec![],
        None,
        Utc::now(),
    )
    .unwrap();
    // Only the approved drug line counts toward the submission.
    assert_eq!(claim.approved_amount, ghs(dec!(40.00)));

    let officer = UserId::new();
    claim.submit(officer, Utc::now()).unwrap();
    assert_eq!(claim.status, ClaimStatus::Submitted);

    claim.approve(ghs(dec!(38.00))).unwrap();
    claim
        .mark_paid(NaiveDate::from_ymd_opt(2024, 8, 15).unwrap())
        .unwrap();
    assert!(claim.status.is_terminal());

    // A settled claim never takes more charges.
    let mut late = vec![ChargeBuilder::new()
        .for_visit(claim.patient_id, claim.visit_id)
        .build()];
    assert!(assembler.add_charges(&mut claim, &mut late, &ctx).is_err());
}

#[test]
fn retried_linking_never_double_bills() {
    let plan = PlanBuilder::new().build();
    let rules = vec![RuleBuilder::percentage(plan.id, CoverageCategory::Drug, dec!(80)).build()];
    let tariffs = TariffResolver::new(Currency::GHS);
    let assembler = ClaimAssembler::new(BillingConfig::default());
    let mut claim = ClaimBuilder::for_plan(plan.id).build();
    let mut charges = vec![
        ChargeBuilder::new().with_amount(ghs(dec!(25.00))).build(),
        ChargeBuilder::new().with_amount(ghs(dec!(40.00))).build(),
    ];
    let ctx = PlanContext { plan: &plan, rules: &rules, tariffs: &tariffs };

    assembler.add_charges(&mut claim, &mut charges, &ctx).unwrap();
    let total_after_first = claim.total_claim_amount;

    // Retry the same batch, then retry with one extra charge.
    assembler.add_charges(&mut claim, &mut charges, &ctx).unwrap();
    assert_eq!(claim.total_claim_amount, total_after_first);
    assert_eq!(claim.items.len(), 2);

    charges.push(ChargeBuilder::new().with_amount(ghs(dec!(10.00))).build());
    let outcome = assembler.add_charges(&mut claim, &mut charges, &ctx).unwrap();
    assert_eq!(outcome.linked, 1);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(claim.items.len(), 3);
    assert_claim_totals_consistent(&claim);
}

#[test]
fn rejected_claim_can_be_corrected_and_resubmitted() {
    let plan = PlanBuilder::new().build();
    let rules = vec![RuleBuilder::percentage(plan.id, CoverageCategory::Drug, dec!(80)).build()];
    let tariffs = TariffResolver::new(Currency::GHS);
    let assembler = ClaimAssembler::new(BillingConfig::default());
    let mut claim = ClaimBuilder::for_plan(plan.id).build();
    let mut charges = vec![ChargeBuilder::new().with_amount(ghs(dec!(60.00))).build()];
    let ctx = PlanContext { plan: &plan, rules: &rules, tariffs: &tariffs };
    assembler.add_charges(&mut claim, &mut charges, &ctx).unwrap();

    claim.submit_for_vetting().unwrap();
    complete_vetting(
        &mut claim,
        UserId::new(),
        Diagnosis { code: "B50.9".into(), description: "Malaria".into() },
        vec![],
        None,
        Utc::now(),
    )
    .unwrap();
    claim.submit(UserId::new(), Utc::now()).unwrap();
    claim.reject("membership number illegible").unwrap();

    claim.resubmit(Utc::now()).unwrap();
    assert_eq!(claim.status, ClaimStatus::Draft);
    assert_eq!(claim.resubmission_count, 1);

    // The corrected claim goes around again.
    let mut extra = vec![ChargeBuilder::new().with_amount(ghs(dec!(5.00))).build()];
    assembler.add_charges(&mut claim, &mut extra, &ctx).unwrap();
    claim.submit_for_vetting().unwrap();
    complete_vetting(
        &mut claim,
        UserId::new(),
        Diagnosis { code: "B50.9".into(), description: "Malaria".into() },
        vec![],
        None,
        Utc::now(),
    )
    .unwrap();
    claim.submit(UserId::new(), Utc::now()).unwrap();
    assert_eq!(claim.status, ClaimStatus::Submitted);
}

#[test]
fn monthly_batch_settles_mixed_outcomes() {
    let plan = PlanBuilder::new().build();
    let rules = vec![RuleBuilder::percentage(plan.id, CoverageCategory::Drug, dec!(100)).build()];
    let tariffs = TariffResolver::new(Currency::GHS);
    let assembler = ClaimAssembler::new(BillingConfig::default());
    let ctx = PlanContext { plan: &plan, rules: &rules, tariffs: &tariffs };

    let mut claims = Vec::new();
    for amount in [dec!(120.00), dec!(75.50), dec!(210.00)] {
        let mut claim = ClaimBuilder::for_plan(plan.id).build();
        let mut charges = vec![ChargeBuilder::new().with_amount(ghs(amount)).build()];
        assembler.add_charges(&mut claim, &mut charges, &ctx).unwrap();
        claim.submit_for_vetting().unwrap();
        complete_vetting(
            &mut claim,
            UserId::new(),
            Diagnosis { code: "J06.9".into(), description: "URTI".into() },
            vec![],
            None,
            Utc::now(),
        )
        .unwrap();
        claims.push(claim);
    }

    let period = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
    let mut batch = ClaimBatch::new(
        plan.provider_id,
        generate_batch_number("NHIS", period, 1),
        "June submission",
        period,
        UserId::new(),
        Currency::GHS,
    );
    let refs: Vec<&_> = claims.iter().collect();
    let outcome = batch.add_claims(&refs, &HashSet::new()).unwrap();
    assert_eq!(outcome.added, 3);
    assert_eq!(batch.total_amount, ghs(dec!(405.50)));

    let actor = UserId::new();
    batch.finalize(actor, Utc::now()).unwrap();
    batch.mark_submitted(actor, Utc::now()).unwrap();
    for claim in claims.iter_mut() {
        claim.submit(actor, Utc::now()).unwrap();
    }

    let responses = vec![
        (claims[0].id, BatchItemOutcome::Approved { amount: ghs(dec!(120.00)) }),
        (claims[1].id, BatchItemOutcome::Rejected { reason: "expired card".into() }),
        (claims[2].id, BatchItemOutcome::Approved { amount: ghs(dec!(200.00)) }),
    ];
    batch.record_responses(&responses, Some(actor), Utc::now()).unwrap();
    assert_eq!(batch.status, BatchStatus::Completed);
    assert_eq!(batch.approved_amount, ghs(dec!(320.00)));

    for (claim_id, outcome) in &responses {
        let claim = claims.iter_mut().find(|c| c.id == *claim_id).unwrap();
        apply_outcome_to_claim(claim, outcome).unwrap();
    }
    assert_eq!(claims[0].status, ClaimStatus::Approved);
    assert_eq!(claims[1].status, ClaimStatus::Rejected);
    assert_eq!(claims[2].approved_amount, ghs(dec!(200.00)));

    // A completed batch no longer holds its claims, so a rejected claim
    // can be resubmitted in next month's batch.
    assert!(!batch.status.is_open());
}
