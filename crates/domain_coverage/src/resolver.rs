//! Coverage rule resolution
//!
//! Given a plan and an item, find the single applicable coverage rule or
//! declare the item unmapped. Precedence: an item-specific rule wins over a
//! category-wide rule, which wins over the plan's category default. Ties
//! between rules of equal specificity are a configuration error.

use chrono::NaiveDate;
use tracing::warn;

use core_kernel::RuleId;
use crate::error::CoverageError;
use crate::plan::InsurancePlan;
use crate::rule::{
    CoverageCategory, CoverageTerms, InsuranceCoverageRule, RuleScope,
};

/// Where the resolved terms came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOrigin {
    /// An item-specific rule
    Specific,
    /// The category-wide fallback rule
    CategoryWide,
    /// A virtual rule synthesised from the plan's category default
    PlanDefault,
}

/// The outcome of a successful resolution
#[derive(Debug, Clone)]
pub struct ResolvedRule {
    /// The persisted rule's id; None for synthesised plan-default terms
    pub rule_id: Option<RuleId>,
    pub origin: RuleOrigin,
    pub terms: CoverageTerms,
    /// Carried from the matched rule so the claim item can be flagged
    pub is_unmapped: bool,
}

/// Result of resolving coverage for one item
#[derive(Debug, Clone)]
pub enum RuleMatch {
    Resolved(ResolvedRule),
    /// No rule and no plan default: the item is fully patient-payable
    Unmapped,
}

impl RuleMatch {
    pub fn is_unmapped(&self) -> bool {
        matches!(self, RuleMatch::Unmapped)
    }
}

/// Resolves the applicable coverage rule for an item
///
/// `rules` is the plan's rule set (typically loaded per plan+category by the
/// repository); rules scoped to other plans or categories are ignored rather
/// than rejected.
///
/// # Errors
///
/// Returns [`CoverageError::AmbiguousRules`] when more than one active rule
/// of the same specificity is effective on `as_of` - the caller must surface
/// this as a configuration problem, not pick a winner.
pub fn resolve(
    plan: &InsurancePlan,
    rules: &[InsuranceCoverageRule],
    category: CoverageCategory,
    item_code: Option<&str>,
    as_of: NaiveDate,
) -> Result<RuleMatch, CoverageError> {
    let in_scope = |rule: &&InsuranceCoverageRule| {
        rule.scope.plan_id == plan.id
            && rule.scope.category == category
            && rule.matches_on(as_of)
    };

    // Item-specific rules first
    if let Some(code) = item_code {
        let specific: Vec<&InsuranceCoverageRule> = rules
            .iter()
            .filter(in_scope)
            .filter(|r| r.scope.item_code.as_deref() == Some(code))
            .collect();

        match specific.as_slice() {
            [] => {}
            [rule] => {
                return Ok(RuleMatch::Resolved(ResolvedRule {
                    rule_id: Some(rule.id),
                    origin: RuleOrigin::Specific,
                    terms: rule.terms.clone(),
                    is_unmapped: rule.is_unmapped,
                }))
            }
            _ => return Err(ambiguous(plan, category, Some(code))),
        }
    }

    // Category-wide fallback
    let general: Vec<&InsuranceCoverageRule> = rules
        .iter()
        .filter(in_scope)
        .filter(|r| r.scope.item_code.is_none())
        .collect();

    match general.as_slice() {
        [] => {}
        [rule] => {
            return Ok(RuleMatch::Resolved(ResolvedRule {
                rule_id: Some(rule.id),
                origin: RuleOrigin::CategoryWide,
                terms: rule.terms.clone(),
                is_unmapped: rule.is_unmapped,
            }))
        }
        _ => return Err(ambiguous(plan, category, None)),
    }

    // Plan category default as a last resort
    if let Some(pct) = plan.category_default(category) {
        return Ok(RuleMatch::Resolved(ResolvedRule {
            rule_id: None,
            origin: RuleOrigin::PlanDefault,
            terms: CoverageTerms::percentage(pct),
            is_unmapped: false,
        }));
    }

    Ok(RuleMatch::Unmapped)
}

fn ambiguous(
    plan: &InsurancePlan,
    category: CoverageCategory,
    item_code: Option<&str>,
) -> CoverageError {
    warn!(
        plan_id = %plan.id,
        category = %category,
        item_code = ?item_code,
        "ambiguous coverage rule configuration"
    );
    CoverageError::AmbiguousRules {
        plan_id: plan.id.to_string(),
        category: category.to_string(),
        item_code: item_code.map(str::to_string),
    }
}

/// Write-time guard against ambiguous configuration
///
/// Called before saving a rule, under a lock scoped to the rule's
/// `(plan, category, item_code)`. Rejects the candidate when an existing
/// active rule with the same scope has an overlapping effective window.
pub fn check_no_overlap(
    existing: &[InsuranceCoverageRule],
    candidate: &InsuranceCoverageRule,
) -> Result<(), CoverageError> {
    let conflict = existing.iter().find(|r| {
        r.id != candidate.id
            && r.is_active
            && same_scope(&r.scope, &candidate.scope)
            && r.effective_window.overlaps(&candidate.effective_window)
    });

    match conflict {
        Some(rule) => Err(CoverageError::OverlappingRule(format!(
            "rule {} already covers {}/{}/{:?} in an overlapping window",
            rule.id, rule.scope.plan_id, rule.scope.category, rule.scope.item_code
        ))),
        None => Ok(()),
    }
}

fn same_scope(a: &RuleScope, b: &RuleScope) -> bool {
    a.plan_id == b.plan_id && a.category == b.category && a.item_code == b.item_code
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{EffectiveWindow, PlanId, ProviderId};
    use crate::plan::SchemeKind;
    use crate::rule::CoverageType;
    use rust_decimal_macros::dec;

    fn plan() -> InsurancePlan {
        InsurancePlan::new(ProviderId::new(), "Test Plan", SchemeKind::Private)
    }

    fn rule(plan_id: PlanId, item_code: Option<&str>, pct: rust_decimal::Decimal) -> InsuranceCoverageRule {
        InsuranceCoverageRule {
            id: RuleId::new_v7(),
            scope: RuleScope {
                plan_id,
                category: CoverageCategory::Drug,
                item_code: item_code.map(str::to_string),
            },
            terms: CoverageTerms::percentage(pct),
            is_unmapped: false,
            is_active: true,
            effective_window: EffectiveWindow::unbounded(),
        }
    }

    fn today() -> chrono::NaiveDate {
        chrono::Utc::now().date_naive()
    }

    #[test]
    fn test_specific_beats_category_wide() {
        let plan = plan();
        let rules = vec![
            rule(plan.id, None, dec!(50)),
            rule(plan.id, Some("PARA500"), dec!(80)),
        ];

        let result = resolve(&plan, &rules, CoverageCategory::Drug, Some("PARA500"), today())
            .unwrap();
        match result {
            RuleMatch::Resolved(r) => {
                assert_eq!(r.origin, RuleOrigin::Specific);
                assert_eq!(r.terms.coverage_value, Some(dec!(80)));
            }
            RuleMatch::Unmapped => panic!("expected a resolved rule"),
        }
    }

    #[test]
    fn test_falls_back_to_category_wide() {
        let plan = plan();
        let rules = vec![rule(plan.id, None, dec!(50))];

        let result = resolve(&plan, &rules, CoverageCategory::Drug, Some("XYZ"), today()).unwrap();
        match result {
            RuleMatch::Resolved(r) => assert_eq!(r.origin, RuleOrigin::CategoryWide),
            RuleMatch::Unmapped => panic!("expected the category-wide rule"),
        }
    }

    #[test]
    fn test_plan_default_when_no_rules() {
        let mut plan = plan();
        plan.drugs_default = Some(dec!(70));

        let result = resolve(&plan, &[], CoverageCategory::Drug, Some("XYZ"), today()).unwrap();
        match result {
            RuleMatch::Resolved(r) => {
                assert_eq!(r.origin, RuleOrigin::PlanDefault);
                assert_eq!(r.rule_id, None);
                assert_eq!(r.terms.coverage_type, CoverageType::Percentage);
            }
            RuleMatch::Unmapped => panic!("expected plan-default terms"),
        }
    }

    #[test]
    fn test_unmapped_when_nothing_matches() {
        let plan = plan();
        let result = resolve(&plan, &[], CoverageCategory::Ward, Some("BED1"), today()).unwrap();
        assert!(result.is_unmapped());
    }

    #[test]
    fn test_expired_rule_ignored() {
        let plan = plan();
        let mut expired = rule(plan.id, Some("PARA500"), dec!(80));
        expired.effective_window = EffectiveWindow::new(
            Some(chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()),
            Some(chrono::NaiveDate::from_ymd_opt(2020, 12, 31).unwrap()),
        )
        .unwrap();

        let result =
            resolve(&plan, &[expired], CoverageCategory::Drug, Some("PARA500"), today()).unwrap();
        assert!(result.is_unmapped());
    }

    #[test]
    fn test_ambiguous_rules_rejected() {
        let plan = plan();
        let rules = vec![
            rule(plan.id, Some("PARA500"), dec!(80)),
            rule(plan.id, Some("PARA500"), dec!(60)),
        ];

        let result = resolve(&plan, &rules, CoverageCategory::Drug, Some("PARA500"), today());
        assert!(matches!(result, Err(CoverageError::AmbiguousRules { .. })));
    }

    #[test]
    fn test_overlap_guard_blocks_save() {
        let plan = plan();
        let existing = vec![rule(plan.id, Some("PARA500"), dec!(80))];
        let candidate = rule(plan.id, Some("PARA500"), dec!(70));

        assert!(check_no_overlap(&existing, &candidate).is_err());

        let disjoint = rule(plan.id, Some("AMOX250"), dec!(70));
        assert!(check_no_overlap(&existing, &disjoint).is_ok());
    }
}
