//! Coverage rules
//!
//! A rule is scoped to one plan and one coverage category, optionally
//! narrowed to a single item code. At most one active, effective rule may
//! match a given `(plan, category, item_code)` on a given date; the
//! resolver rejects ambiguous configurations instead of picking one.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use core_kernel::{EffectiveWindow, Money, PlanId, RuleId};
use crate::error::CoverageError;

/// Categories of billable work a rule can cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageCategory {
    Consultation,
    Drug,
    Lab,
    Procedure,
    Ward,
    Nursing,
}

impl CoverageCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageCategory::Consultation => "consultation",
            CoverageCategory::Drug => "drug",
            CoverageCategory::Lab => "lab",
            CoverageCategory::Procedure => "procedure",
            CoverageCategory::Ward => "ward",
            CoverageCategory::Nursing => "nursing",
        }
    }
}

impl std::fmt::Display for CoverageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the insurer share of a covered item is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageType {
    /// Insurer pays the full subtotal (less any fixed copay)
    Full,
    /// Insurer pays `coverage_value` percent of the subtotal
    Percentage,
    /// `coverage_value` is a flat insurer-payable ceiling
    Fixed,
    /// Item is explicitly not covered
    Excluded,
}

/// The financial terms of a rule, as consumed by the copay calculator
///
/// Terms are separated from rule identity so that virtual rules synthesised
/// from plan category defaults can flow through the same calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageTerms {
    /// Master switch; false is treated identically to `Excluded`
    pub is_covered: bool,
    pub coverage_type: CoverageType,
    /// Percentage (0-100) or flat ceiling depending on `coverage_type`
    pub coverage_value: Option<Decimal>,
    /// Insurer-negotiated unit price override
    pub tariff_amount: Option<Money>,
    /// Patient share as a percentage, overriding the coverage percentage
    pub patient_copay_percentage: Option<Decimal>,
    /// Fixed patient add-on per unit, always patient-borne
    pub patient_copay_amount: Option<Money>,
    /// Cap on the quantity billable to the insurer per visit
    pub max_quantity_per_visit: Option<u32>,
    /// Cap on insurer spend per category per visit
    pub max_amount_per_visit: Option<Money>,
    /// Whether the item needs scheme approval before service
    pub requires_preauthorization: bool,
}

impl CoverageTerms {
    /// Terms excluding an item from coverage entirely
    pub fn excluded() -> Self {
        Self {
            is_covered: false,
            coverage_type: CoverageType::Excluded,
            coverage_value: None,
            tariff_amount: None,
            patient_copay_percentage: None,
            patient_copay_amount: None,
            max_quantity_per_visit: None,
            max_amount_per_visit: None,
            requires_preauthorization: false,
        }
    }

    /// Simple percentage terms with no caps or copays
    pub fn percentage(value: Decimal) -> Self {
        Self {
            is_covered: value > Decimal::ZERO,
            coverage_type: CoverageType::Percentage,
            coverage_value: Some(value),
            tariff_amount: None,
            patient_copay_percentage: None,
            patient_copay_amount: None,
            max_quantity_per_visit: None,
            max_amount_per_visit: None,
            requires_preauthorization: false,
        }
    }

    /// The effective coverage type, folding `is_covered = false` into
    /// `Excluded` regardless of the stored type
    pub fn effective_type(&self) -> CoverageType {
        if !self.is_covered {
            CoverageType::Excluded
        } else {
            self.coverage_type
        }
    }
}

/// The `(plan, category, item_code)` scope a rule applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleScope {
    pub plan_id: PlanId,
    pub category: CoverageCategory,
    /// None means the rule is the category-wide fallback
    pub item_code: Option<String>,
}

/// A persisted coverage rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceCoverageRule {
    /// Unique identifier
    pub id: RuleId,
    /// Scope the rule applies to
    pub scope: RuleScope,
    /// Financial terms
    pub terms: CoverageTerms,
    /// Flags an item known to be absent from the scheme tariff master,
    /// billed to the patient at a flexible copay
    pub is_unmapped: bool,
    /// Soft lifecycle flag
    pub is_active: bool,
    /// Dates the rule applies
    pub effective_window: EffectiveWindow,
}

impl InsuranceCoverageRule {
    /// Whether the rule participates in resolution on the given date
    pub fn matches_on(&self, date: NaiveDate) -> bool {
        self.is_active && self.effective_window.contains(date)
    }

    /// Whether the rule is item-specific (wins over category-wide rules)
    pub fn is_specific(&self) -> bool {
        self.scope.item_code.is_some()
    }
}

fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_out_of_range"));
    }
    Ok(())
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

/// Admin input for creating or updating a rule
///
/// Monetary fields arrive as bare decimals from the admin surface and are
/// lifted into [`Money`] in the configured billing currency on acceptance.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RuleDraft {
    pub plan_id: PlanId,
    pub category: CoverageCategory,
    #[validate(length(min = 1, max = 64))]
    pub item_code: Option<String>,
    pub is_covered: bool,
    pub coverage_type: CoverageType,
    #[validate(custom(function = "validate_non_negative"))]
    pub coverage_value: Option<Decimal>,
    #[validate(custom(function = "validate_non_negative"))]
    pub tariff_amount: Option<Decimal>,
    #[validate(custom(function = "validate_percentage"))]
    pub patient_copay_percentage: Option<Decimal>,
    #[validate(custom(function = "validate_non_negative"))]
    pub patient_copay_amount: Option<Decimal>,
    pub max_quantity_per_visit: Option<u32>,
    #[validate(custom(function = "validate_non_negative"))]
    pub max_amount_per_visit: Option<Decimal>,
    pub requires_preauthorization: bool,
    pub is_unmapped: bool,
    pub effective_from: Option<NaiveDate>,
    pub effective_to: Option<NaiveDate>,
}

impl RuleDraft {
    /// Validates the draft and builds a persistable rule
    pub fn into_rule(self, currency: core_kernel::Currency) -> Result<InsuranceCoverageRule, CoverageError> {
        self.validate()?;

        if self.coverage_type == CoverageType::Percentage {
            match self.coverage_value {
                Some(v) if v >= Decimal::ZERO && v <= Decimal::ONE_HUNDRED => {}
                _ => {
                    return Err(CoverageError::InvalidRule(
                        "percentage rules require coverage_value between 0 and 100".to_string(),
                    ))
                }
            }
        }

        let effective_window = EffectiveWindow::new(self.effective_from, self.effective_to)
            .map_err(|e| CoverageError::InvalidRule(e.to_string()))?;

        Ok(InsuranceCoverageRule {
            id: RuleId::new_v7(),
            scope: RuleScope {
                plan_id: self.plan_id,
                category: self.category,
                item_code: self.item_code,
            },
            terms: CoverageTerms {
                is_covered: self.is_covered,
                coverage_type: self.coverage_type,
                coverage_value: self.coverage_value,
                tariff_amount: self.tariff_amount.map(|a| Money::new(a, currency)),
                patient_copay_percentage: self.patient_copay_percentage,
                patient_copay_amount: self.patient_copay_amount.map(|a| Money::new(a, currency)),
                max_quantity_per_visit: self.max_quantity_per_visit,
                max_amount_per_visit: self.max_amount_per_visit.map(|a| Money::new(a, currency)),
                requires_preauthorization: self.requires_preauthorization,
            },
            is_unmapped: self.is_unmapped,
            is_active: true,
            effective_window,
        })
    }
}
