//! Claim line items
//!
//! Each item mirrors exactly one charge and freezes the price, coverage
//! split, and provenance that applied when the charge was linked.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{ChargeId, ClaimId, ClaimItemId, Money, RuleId};
use domain_coverage::{CoverageCategory, CoverageSplit};
use domain_tariff::PriceSource;

/// One line on an insurance claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceClaimItem {
    pub id: ClaimItemId,
    pub claim_id: ClaimId,
    /// The charge this line bills for; one charge appears on at most one
    /// active item per claim
    pub charge_id: ChargeId,
    pub item_date: NaiveDate,
    pub category: CoverageCategory,
    pub item_code: String,
    pub description: String,
    pub quantity: u32,
    /// Unit price the line billed at
    pub unit_tariff: Money,
    pub subtotal: Money,
    pub insurance_pays: Money,
    pub patient_pays: Money,
    /// Effective insurer percentage, for display and reports
    pub coverage_percentage: Decimal,
    pub price_source: PriceSource,
    /// Scheme code used when priced from a scheme tariff
    pub scheme_code: Option<String>,
    /// Rule the split came from; None for plan defaults and unmapped items
    pub rule_id: Option<RuleId>,
    /// No rule or default matched; the line is fully patient-payable
    pub is_unmapped: bool,
    /// No price source resolved; the line billed at zero pending correction
    pub is_unpriced: bool,
    pub exceeded_quantity_limit: bool,
    pub limit_note: Option<String>,
    pub requires_preauthorization: bool,
    /// Vetting outcome; None until an officer decides
    pub is_approved: Option<bool>,
    pub vetting_rejection_reason: Option<String>,
    pub is_cancelled: bool,
}

impl InsuranceClaimItem {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_split(
        claim_id: ClaimId,
        charge_id: ChargeId,
        item_date: NaiveDate,
        category: CoverageCategory,
        item_code: String,
        description: String,
        quantity: u32,
        unit_tariff: Money,
        split: &CoverageSplit,
        price_source: PriceSource,
        scheme_code: Option<String>,
        rule_id: Option<RuleId>,
        is_unmapped: bool,
        requires_preauthorization: bool,
    ) -> Self {
        Self {
            id: ClaimItemId::new(),
            claim_id,
            charge_id,
            item_date,
            category,
            item_code,
            description,
            quantity,
            unit_tariff,
            subtotal: split.subtotal,
            insurance_pays: split.insurance_pays,
            patient_pays: split.patient_pays,
            coverage_percentage: split.coverage_percentage,
            price_source,
            scheme_code,
            rule_id,
            is_unmapped,
            is_unpriced: price_source == PriceSource::Unpriced,
            exceeded_quantity_limit: split.exceeded_quantity_limit,
            limit_note: split.limit_note.clone(),
            requires_preauthorization,
            is_approved: None,
            vetting_rejection_reason: None,
            is_cancelled: false,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.is_cancelled
    }

    /// Insurer share the claim can actually bill: zero for lines an
    /// officer rejected during vetting
    pub fn billable_insurance_amount(&self) -> Money {
        if self.is_approved == Some(false) {
            Money::zero(self.insurance_pays.currency())
        } else {
            self.insurance_pays
        }
    }
}
