//! Insurance plan configuration
//!
//! A plan belongs to a provider and carries the category-level default copay
//! percentages that back up explicit coverage rules. Plans are created by
//! administrators, rarely mutated, and never hard-deleted: retirement is a
//! soft lifecycle via `is_active` plus the effective window.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{EffectiveWindow, Money, PlanId, ProviderId};
use crate::rule::CoverageCategory;

/// Which settlement scheme a plan bills under
///
/// National-scheme plans (NHIS) price items from the scheme tariff master
/// rather than the hospital's standard price list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeKind {
    /// Private insurer billed on hospital/negotiated tariffs
    Private,
    /// National Health Insurance Scheme
    Nhis,
}

/// An insurance plan offered by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsurancePlan {
    /// Unique identifier
    pub id: PlanId,
    /// Owning provider
    pub provider_id: ProviderId,
    /// Display name
    pub name: String,
    /// Scheme the plan settles under
    pub scheme: SchemeKind,
    /// Default insurer percentage for consultations when no rule matches
    pub consultation_default: Option<Decimal>,
    /// Default insurer percentage for drugs when no rule matches
    pub drugs_default: Option<Decimal>,
    /// Default insurer percentage for lab tests when no rule matches
    pub labs_default: Option<Decimal>,
    /// Default insurer percentage for procedures when no rule matches
    pub procedures_default: Option<Decimal>,
    /// Cap on insurer spend per enrollment year
    pub annual_limit: Option<Money>,
    /// Cap on claimable visits per enrollment year
    pub visit_limit: Option<u32>,
    /// Whether the plan requires a referral letter for specialist services
    pub requires_referral: bool,
    /// Whether the plan requires explicit approval before high-cost items
    pub requires_preauthorization: bool,
    /// Soft lifecycle flag
    pub is_active: bool,
    /// Dates the plan can be billed against
    pub effective_window: EffectiveWindow,
}

impl InsurancePlan {
    /// Creates an active, open-ended plan with no category defaults
    pub fn new(provider_id: ProviderId, name: impl Into<String>, scheme: SchemeKind) -> Self {
        Self {
            id: PlanId::new_v7(),
            provider_id,
            name: name.into(),
            scheme,
            consultation_default: None,
            drugs_default: None,
            labs_default: None,
            procedures_default: None,
            annual_limit: None,
            visit_limit: None,
            requires_referral: false,
            requires_preauthorization: false,
            is_active: true,
            effective_window: EffectiveWindow::unbounded(),
        }
    }

    /// Whether the plan bills through the national scheme
    pub fn is_nhis(&self) -> bool {
        self.scheme == SchemeKind::Nhis
    }

    /// Whether the plan can be billed against on the given date
    pub fn is_billable_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.effective_window.contains(date)
    }

    /// The plan-level default insurer percentage for a category, if any
    ///
    /// Ward and nursing have no plan-level defaults; items in those
    /// categories are unmapped unless an explicit rule exists.
    pub fn category_default(&self, category: CoverageCategory) -> Option<Decimal> {
        match category {
            CoverageCategory::Consultation => self.consultation_default,
            CoverageCategory::Drug => self.drugs_default,
            CoverageCategory::Lab => self.labs_default,
            CoverageCategory::Procedure => self.procedures_default,
            CoverageCategory::Ward | CoverageCategory::Nursing => None,
        }
    }
}
