//! Claim vetting
//!
//! Before submission a claims officer reviews each line, attaches the
//! diagnoses the scheme requires, and approves or rejects individual
//! items. Only the approved lines count toward the amount put to the
//! insurer.

use chrono::{DateTime, Utc};

use core_kernel::{ClaimItemId, UserId};

use crate::claim::{ClaimStatus, Diagnosis, InsuranceClaim};
use crate::error::ClaimError;

/// An officer's decision on one claim line
#[derive(Debug, Clone)]
pub struct ItemVetting {
    pub item_id: ClaimItemId,
    pub is_approved: bool,
    /// Required when `is_approved` is false
    pub rejection_reason: Option<String>,
}

/// Records one item decision on a claim under vetting
pub fn vet_item(claim: &mut InsuranceClaim, decision: &ItemVetting) -> Result<(), ClaimError> {
    if claim.status != ClaimStatus::PendingVetting {
        return Err(ClaimError::InvalidStatusTransition {
            from: claim.status.to_string(),
            to: "item vetting".to_string(),
        });
    }
    if !decision.is_approved
        && decision
            .rejection_reason
            .as_deref()
            .map_or(true, |r| r.trim().is_empty())
    {
        return Err(ClaimError::MissingRejectionReason);
    }
    let item = claim
        .items
        .iter_mut()
        .find(|i| i.id == decision.item_id && i.is_active())
        .ok_or_else(|| ClaimError::ItemNotFound(decision.item_id.to_string()))?;
    item.is_approved = Some(decision.is_approved);
    item.vetting_rejection_reason = decision.rejection_reason.clone();
    claim.recompute_totals()?;
    Ok(())
}

/// Completes vetting and moves the claim to vetted
///
/// Undecided items count as approved; the scheme's own adjudication is the
/// final word anyway. The approved amount becomes the sum of the approved
/// lines' insurer shares.
pub fn complete_vetting(
    claim: &mut InsuranceClaim,
    officer: UserId,
    primary_diagnosis: Diagnosis,
    secondary_diagnoses: Vec<Diagnosis>,
    notes: Option<String>,
    at: DateTime<Utc>,
) -> Result<(), ClaimError> {
    if !claim.status.can_transition_to(ClaimStatus::Vetted) {
        return Err(ClaimError::InvalidStatusTransition {
            from: claim.status.to_string(),
            to: ClaimStatus::Vetted.to_string(),
        });
    }
    claim.primary_diagnosis = Some(primary_diagnosis);
    claim.secondary_diagnoses = secondary_diagnoses;
    claim.vetting_notes = notes;
    claim.vetted_by = Some(officer);
    claim.vetted_at = Some(at);
    claim.recompute_totals()?;
    claim.status = ClaimStatus::Vetted;
    claim.touch();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use core_kernel::{
        ChargeId, ClaimId, Currency, EnrollmentId, Money, PatientId, PlanId, VisitId,
    };
    use domain_coverage::{CoverageCategory, CoverageSplit};
    use domain_tariff::PriceSource;

    use crate::claim::{AttendanceType, ServiceType};
    use crate::item::InsuranceClaimItem;

    fn ghs(value: rust_decimal::Decimal) -> Money {
        Money::new(value, Currency::GHS)
    }

    fn item(claim_id: ClaimId, insurance: rust_decimal::Decimal, patient: rust_decimal::Decimal) -> InsuranceClaimItem {
        let split = CoverageSplit {
            subtotal: ghs(insurance + patient),
            insurance_pays: ghs(insurance),
            patient_pays: ghs(patient),
            coverage_percentage: dec!(0),
            exceeded_quantity_limit: false,
            limit_note: None,
        };
        InsuranceClaimItem::from_split(
            claim_id,
            ChargeId::new(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            CoverageCategory::Drug,
            "AMOX".into(),
            "Amoxicillin".into(),
            1,
            split.subtotal,
            &split,
            PriceSource::Standard,
            None,
            None,
            false,
            false,
        )
    }

    fn pending_claim() -> InsuranceClaim {
        let mut claim = InsuranceClaim::new(
            PatientId::new(),
            VisitId::new(),
            PlanId::new(),
            Some(EnrollmentId::new()),
            ServiceType::Outpatient,
            AttendanceType::Routine,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            Currency::GHS,
        );
        let items = vec![item(claim.id, dec!(40), dec!(10)), item(claim.id, dec!(25), dec!(0))];
        claim.items = items;
        claim.recompute_totals().unwrap();
        claim.submit_for_vetting().unwrap();
        claim
    }

    #[test]
    fn test_rejected_item_drops_out_of_approved_amount() {
        let mut claim = pending_claim();
        let reject_id = claim.items[1].id;
        vet_item(
            &mut claim,
            &ItemVetting {
                item_id: reject_id,
                is_approved: false,
                rejection_reason: Some("not on formulary".into()),
            },
        )
        .unwrap();
        complete_vetting(
            &mut claim,
            UserId::new(),
            Diagnosis { code: "J06.9".into(), description: "URTI".into() },
            vec![],
            None,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(claim.status, ClaimStatus::Vetted);
        assert_eq!(claim.approved_amount, ghs(dec!(40)));
        // Rollups still reflect every active line.
        assert_eq!(claim.insurance_covered_amount, ghs(dec!(65)));
    }

    #[test]
    fn test_item_rejection_requires_reason() {
        let mut claim = pending_claim();
        let id = claim.items[0].id;
        let err = vet_item(
            &mut claim,
            &ItemVetting { item_id: id, is_approved: false, rejection_reason: None },
        )
        .unwrap_err();
        assert!(matches!(err, ClaimError::MissingRejectionReason));
    }

    #[test]
    fn test_vetting_only_while_pending() {
        let mut claim = pending_claim();
        claim.status = ClaimStatus::Submitted;
        let id = claim.items[0].id;
        let err = vet_item(
            &mut claim,
            &ItemVetting { item_id: id, is_approved: true, rejection_reason: None },
        )
        .unwrap_err();
        assert!(matches!(err, ClaimError::InvalidStatusTransition { .. }));
    }
}
