//! Charge-to-claim linking
//!
//! Takes raw visit charges, resolves coverage and price for each one, and
//! materialises claim items with their insurer/patient splits. Linking is
//! idempotent: a charge already carried by an active item on the claim is
//! skipped, so retrying a partially failed batch never double-bills.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use core_kernel::Money;
use domain_coverage::{
    patient_pays_all, resolve, split, BillingConfig, CoverageCategory, CoverageSplit,
    CoverageTerms, CoverageType, InsuranceCoverageRule, InsurancePlan, ResolvedRule, RuleMatch,
};
use domain_tariff::{PriceRequest, PriceSource, TariffResolver};

use crate::charge::Charge;
use crate::claim::InsuranceClaim;
use crate::error::ClaimError;
use crate::item::InsuranceClaimItem;

/// Everything needed to bill against one plan on one date range
#[derive(Debug)]
pub struct PlanContext<'a> {
    pub plan: &'a InsurancePlan,
    pub rules: &'a [InsuranceCoverageRule],
    pub tariffs: &'a TariffResolver,
}

/// Result of one linking pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Charges turned into new claim items
    pub linked: usize,
    /// Charges skipped: already linked, waived, or outside the plan window
    pub skipped: usize,
}

/// Builds claim items from charges
#[derive(Debug, Clone)]
pub struct ClaimAssembler {
    config: BillingConfig,
}

impl ClaimAssembler {
    pub fn new(config: BillingConfig) -> Self {
        Self { config }
    }

    /// Links the given charges to the claim
    ///
    /// Each linked charge gets exactly one active claim item; the charge's
    /// own split fields are rewritten so the patient ledger carries only
    /// the copay. The claim must still be draft.
    pub fn add_charges(
        &self,
        claim: &mut InsuranceClaim,
        charges: &mut [Charge],
        ctx: &PlanContext<'_>,
    ) -> Result<LinkOutcome, ClaimError> {
        if !claim.can_modify_items() {
            return Err(ClaimError::ItemsLocked {
                status: claim.status.to_string(),
            });
        }
        let mut outcome = LinkOutcome::default();
        if !self.config.insurance_billing_enabled {
            debug!(claim_id = %claim.id, "insurance billing disabled; leaving charges cash-payable");
            outcome.skipped = charges.len();
            return Ok(outcome);
        }

        // Insurer spend so far per category, for the per-visit amount caps.
        let currency = self.config.currency;
        let mut category_spend: HashMap<CoverageCategory, Money> = HashMap::new();
        for item in claim.active_items() {
            let spent = category_spend
                .entry(item.category)
                .or_insert_with(|| Money::zero(currency));
            *spent = spent.checked_add(&item.insurance_pays)?;
        }

        for charge in charges.iter_mut() {
            if claim.has_active_item_for(charge.id) {
                outcome.skipped += 1;
                continue;
            }
            if charge.is_waived {
                outcome.skipped += 1;
                continue;
            }

            let as_of = self.config.facility_timezone.local_date(charge.charged_at);
            if !ctx.plan.is_billable_on(as_of) {
                warn!(
                    charge_id = %charge.id,
                    plan_id = %ctx.plan.id,
                    %as_of,
                    "plan not billable on service date; charge stays patient-payable"
                );
                outcome.skipped += 1;
                continue;
            }

            let category = charge.source.category();
            let rule_match = resolve(
                ctx.plan,
                ctx.rules,
                category,
                Some(&charge.item_code),
                as_of,
            )?;
            let line = self.build_line(charge, ctx, &rule_match, as_of)?;

            // Per-visit insurer spend cap for the category.
            let line = apply_amount_cap(line, &mut category_spend, category, currency)?;

            let item = InsuranceClaimItem::from_split(
                claim.id,
                charge.id,
                as_of,
                category,
                charge.item_code.clone(),
                charge.description.clone(),
                charge.quantity,
                line.unit_tariff,
                &line.split,
                line.price_source,
                line.scheme_code,
                line.rule_id,
                line.is_unmapped,
                line.requires_preauthorization,
            );
            charge.attach_to_claim(
                claim.id,
                item.id,
                line.unit_tariff,
                item.insurance_pays,
                item.patient_pays,
            );
            claim.items.push(item);
            outcome.linked += 1;
        }

        claim.recompute_totals()?;
        claim.verify_totals()?;
        Ok(outcome)
    }

    /// Cancels the item carrying `charge` and restores the charge to full
    /// patient liability
    pub fn remove_charge(
        &self,
        claim: &mut InsuranceClaim,
        charge: &mut Charge,
    ) -> Result<(), ClaimError> {
        let item_id = claim
            .active_items()
            .find(|i| i.charge_id == charge.id)
            .map(|i| i.id)
            .ok_or_else(|| ClaimError::ItemNotFound(charge.id.to_string()))?;
        claim.cancel_item(item_id)?;
        charge.detach_from_claim();
        Ok(())
    }

    /// Prices one charge and computes its split
    fn build_line(
        &self,
        charge: &Charge,
        ctx: &PlanContext<'_>,
        rule_match: &RuleMatch,
        as_of: chrono::NaiveDate,
    ) -> Result<Line, ClaimError> {
        let rule_override = match rule_match {
            RuleMatch::Resolved(r) => r.terms.tariff_amount,
            RuleMatch::Unmapped => None,
        };
        let priced = ctx.tariffs.price(&PriceRequest {
            plan_id: ctx.plan.id,
            is_nhis_plan: ctx.plan.is_nhis(),
            item_type: charge.source.tariff_item_type(),
            item_code: &charge.item_code,
            item_id: Some(charge.source.item_id()),
            standard_price: Some(charge.amount),
            rule_override,
            as_of,
        });

        match rule_match {
            RuleMatch::Unmapped => Ok(Line {
                unit_tariff: priced.unit_price,
                split: patient_pays_all(priced.unit_price, charge.quantity),
                price_source: priced.source,
                scheme_code: priced.scheme_code,
                rule_id: None,
                is_unmapped: true,
                requires_preauthorization: false,
                max_amount_per_visit: None,
            }),
            RuleMatch::Resolved(resolved) if ctx.plan.is_nhis() => {
                self.build_scheme_line(charge, resolved, priced.unit_price, priced.source, priced.scheme_code)
            }
            RuleMatch::Resolved(resolved) => {
                let split = split(&resolved.terms, priced.unit_price, charge.quantity)?;
                Ok(Line {
                    unit_tariff: priced.unit_price,
                    split,
                    price_source: priced.source,
                    scheme_code: priced.scheme_code,
                    rule_id: resolved.rule_id,
                    is_unmapped: resolved.is_unmapped,
                    requires_preauthorization: resolved.terms.requires_preauthorization,
                    max_amount_per_visit: resolved.terms.max_amount_per_visit,
                })
            }
        }
    }

    /// Scheme billing: a mapped item bills at the scheme tariff with the
    /// scheme carrying the whole tariff and the patient owing only the
    /// fixed copay. An unmapped scheme item with a flexible copay bills
    /// the patient the copay alone; without one it is fully patient-payable.
    fn build_scheme_line(
        &self,
        charge: &Charge,
        resolved: &ResolvedRule,
        unit_price: Money,
        price_source: PriceSource,
        scheme_code: Option<String>,
    ) -> Result<Line, ClaimError> {
        match price_source {
            PriceSource::Nhis | PriceSource::Gdrg => {
                let scheme_terms = CoverageTerms {
                    is_covered: true,
                    coverage_type: CoverageType::Full,
                    coverage_value: None,
                    tariff_amount: None,
                    patient_copay_percentage: None,
                    patient_copay_amount: resolved.terms.patient_copay_amount,
                    max_quantity_per_visit: resolved.terms.max_quantity_per_visit,
                    max_amount_per_visit: resolved.terms.max_amount_per_visit,
                    requires_preauthorization: resolved.terms.requires_preauthorization,
                };
                let split = split(&scheme_terms, unit_price, charge.quantity)?;
                Ok(Line {
                    unit_tariff: unit_price,
                    split,
                    price_source,
                    scheme_code,
                    rule_id: resolved.rule_id,
                    is_unmapped: false,
                    requires_preauthorization: resolved.terms.requires_preauthorization,
                    max_amount_per_visit: resolved.terms.max_amount_per_visit,
                })
            }
            _ => {
                // No scheme tariff resolved for this item.
                if let Some(copay) = resolved.terms.patient_copay_amount {
                    // Flexible copay: the item bills at the agreed copay,
                    // all of it patient-borne.
                    debug!(charge_id = %charge.id, "unmapped scheme item billed at flexible copay");
                    Ok(Line {
                        unit_tariff: copay,
                        split: patient_pays_all(copay, charge.quantity),
                        price_source,
                        scheme_code,
                        rule_id: resolved.rule_id,
                        is_unmapped: true,
                        requires_preauthorization: false,
                        max_amount_per_visit: None,
                    })
                } else {
                    Ok(Line {
                        unit_tariff: unit_price,
                        split: patient_pays_all(unit_price, charge.quantity),
                        price_source,
                        scheme_code,
                        rule_id: resolved.rule_id,
                        is_unmapped: true,
                        requires_preauthorization: false,
                        max_amount_per_visit: None,
                    })
                }
            }
        }
    }
}

struct Line {
    unit_tariff: Money,
    split: CoverageSplit,
    price_source: PriceSource,
    scheme_code: Option<String>,
    rule_id: Option<core_kernel::RuleId>,
    is_unmapped: bool,
    requires_preauthorization: bool,
    /// Per-visit insurer spend cap from the matched terms
    max_amount_per_visit: Option<Money>,
}

/// Caps the insurer share of a line against the category's per-visit limit,
/// shifting any excess to the patient
fn apply_amount_cap(
    mut line: Line,
    category_spend: &mut HashMap<CoverageCategory, Money>,
    category: CoverageCategory,
    currency: core_kernel::Currency,
) -> Result<Line, ClaimError> {
    let cap = match line.max_amount_per_visit {
        Some(cap) => cap,
        None => {
            record_spend(category_spend, category, currency, line.split.insurance_pays)?;
            return Ok(line);
        }
    };
    let spent = category_spend
        .get(&category)
        .copied()
        .unwrap_or_else(|| Money::zero(currency));
    let headroom = match cap.checked_sub(&spent) {
        Ok(h) if h.is_positive() => h,
        _ => Money::zero(currency),
    };
    if line.split.insurance_pays.amount() > headroom.amount() {
        let shifted = line.split.insurance_pays.checked_sub(&headroom)?;
        line.split.insurance_pays = headroom;
        line.split.patient_pays = line.split.patient_pays.checked_add(&shifted)?;
        line.split.coverage_percentage = if line.split.subtotal.is_zero() {
            Decimal::ZERO
        } else {
            (line.split.insurance_pays.amount() / line.split.subtotal.amount()
                * Decimal::ONE_HUNDRED)
                .round_dp(2)
        };
        let note = format!("insurer share capped at {} for the visit", cap);
        line.split.limit_note = Some(match line.split.limit_note.take() {
            Some(existing) => format!("{existing}; {note}"),
            None => note,
        });
    }
    record_spend(category_spend, category, currency, line.split.insurance_pays)?;
    Ok(line)
}

fn record_spend(
    category_spend: &mut HashMap<CoverageCategory, Money>,
    category: CoverageCategory,
    currency: core_kernel::Currency,
    insurance_pays: Money,
) -> Result<(), ClaimError> {
    let spent = category_spend
        .entry(category)
        .or_insert_with(|| Money::zero(currency));
    *spent = spent.checked_add(&insurance_pays)?;
    Ok(())
}
