//! Insurance claims and their lifecycle
//!
//! A claim collects the insurer-billable lines of one visit episode and
//! walks a fixed status machine:
//!
//! ```text
//! draft -> pending_vetting -> vetted -> submitted -> approved -> paid
//!            |    ^                        |            \-> partial -> paid
//!            v    |                        v
//!          draft (reopen)               rejected -> draft (resubmit)
//! ```
//!
//! Items can only be added or cancelled while the claim is draft. Paid is
//! terminal.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{
    ChargeId, ClaimId, ClaimItemId, Currency, EnrollmentId, Money, PatientId, PlanId, UserId,
    VisitId,
};

use crate::error::ClaimError;
use crate::item::InsuranceClaimItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Draft,
    PendingVetting,
    Vetted,
    Submitted,
    Approved,
    Rejected,
    Paid,
    /// Insurer paid part of the approved amount; the rest is outstanding
    Partial,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingVetting => "pending_vetting",
            Self::Vetted => "vetted",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Paid => "paid",
            Self::Partial => "partial",
        }
    }

    pub fn can_transition_to(&self, next: ClaimStatus) -> bool {
        use ClaimStatus::*;
        matches!(
            (self, next),
            (Draft, PendingVetting)
                | (PendingVetting, Vetted)
                | (PendingVetting, Draft)
                | (Vetted, Submitted)
                | (Submitted, Approved)
                | (Submitted, Rejected)
                | (Approved, Paid)
                | (Approved, Partial)
                | (Partial, Paid)
                | (Rejected, Draft)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid)
    }

    /// Statuses that hold a claim check code against reuse
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Paid | Self::Rejected)
    }
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Outpatient,
    Inpatient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceType {
    Routine,
    Emergency,
    Referral,
}

/// A coded diagnosis attached during vetting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// ICD-10 or G-DRG code
    pub code: String,
    pub description: String,
}

/// An insurance claim for one visit episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceClaim {
    pub id: ClaimId,
    /// Scheme authorization code issued at check-in, when the scheme uses one
    pub claim_check_code: Option<String>,
    pub patient_id: PatientId,
    pub visit_id: VisitId,
    pub plan_id: PlanId,
    pub enrollment_id: Option<EnrollmentId>,
    pub status: ClaimStatus,
    pub type_of_service: ServiceType,
    pub type_of_attendance: AttendanceType,
    pub date_of_attendance: NaiveDate,
    pub date_of_discharge: Option<NaiveDate>,
    pub primary_diagnosis: Option<Diagnosis>,
    pub secondary_diagnoses: Vec<Diagnosis>,
    pub items: Vec<InsuranceClaimItem>,
    /// Sum of active item subtotals
    pub total_claim_amount: Money,
    /// Sum of active item insurer shares
    pub insurance_covered_amount: Money,
    /// Sum of active item patient shares
    pub patient_copay_amount: Money,
    /// Amount the insurer committed to; set from vetting, then overwritten
    /// by the insurer's response
    pub approved_amount: Money,
    pub vetted_by: Option<UserId>,
    pub vetted_at: Option<DateTime<Utc>>,
    pub vetting_notes: Option<String>,
    pub submitted_by: Option<UserId>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub resubmission_count: u32,
    pub last_resubmitted_at: Option<DateTime<Utc>>,
    pub payment_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsuranceClaim {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        patient_id: PatientId,
        visit_id: VisitId,
        plan_id: PlanId,
        enrollment_id: Option<EnrollmentId>,
        type_of_service: ServiceType,
        type_of_attendance: AttendanceType,
        date_of_attendance: NaiveDate,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ClaimId::new(),
            claim_check_code: None,
            patient_id,
            visit_id,
            plan_id,
            enrollment_id,
            status: ClaimStatus::Draft,
            type_of_service,
            type_of_attendance,
            date_of_attendance,
            date_of_discharge: None,
            primary_diagnosis: None,
            secondary_diagnoses: Vec::new(),
            items: Vec::new(),
            total_claim_amount: Money::zero(currency),
            insurance_covered_amount: Money::zero(currency),
            patient_copay_amount: Money::zero(currency),
            approved_amount: Money::zero(currency),
            vetted_by: None,
            vetted_at: None,
            vetting_notes: None,
            submitted_by: None,
            submitted_at: None,
            rejection_reason: None,
            resubmission_count: 0,
            last_resubmitted_at: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn currency(&self) -> Currency {
        self.total_claim_amount.currency()
    }

    /// Items can only be mutated while the claim is draft
    pub fn can_modify_items(&self) -> bool {
        self.status == ClaimStatus::Draft
    }

    pub fn active_items(&self) -> impl Iterator<Item = &InsuranceClaimItem> {
        self.items.iter().filter(|i| i.is_active())
    }

    pub fn has_active_item_for(&self, charge_id: ChargeId) -> bool {
        self.active_items().any(|i| i.charge_id == charge_id)
    }

    /// Assigns the scheme check code after verifying it is free among the
    /// patient's other open claims inside the reuse window
    pub fn set_claim_check_code(
        &mut self,
        code: impl Into<String>,
        other_claims: &[InsuranceClaim],
        now: DateTime<Utc>,
        reuse_window_hours: u32,
    ) -> Result<(), ClaimError> {
        let code = code.into();
        if !check_code_available(other_claims, self.id, self.patient_id, &code, now, reuse_window_hours)
        {
            return Err(ClaimError::DuplicateCheckCode { code });
        }
        self.claim_check_code = Some(code);
        self.touch();
        Ok(())
    }

    /// Recomputes the money rollups from the active items
    ///
    /// `approved_amount` only tracks vetting outcomes while the claim is in
    /// the vetting phase; once the insurer responds it is set explicitly.
    pub fn recompute_totals(&mut self) -> Result<(), ClaimError> {
        let currency = self.currency();
        let mut total = Money::zero(currency);
        let mut insurance = Money::zero(currency);
        let mut patient = Money::zero(currency);
        for item in self.items.iter().filter(|i| i.is_active()) {
            total = total.checked_add(&item.subtotal)?;
            insurance = insurance.checked_add(&item.insurance_pays)?;
            patient = patient.checked_add(&item.patient_pays)?;
        }
        self.total_claim_amount = total;
        self.insurance_covered_amount = insurance;
        self.patient_copay_amount = patient;

        if matches!(self.status, ClaimStatus::PendingVetting | ClaimStatus::Vetted) {
            let mut approved = Money::zero(currency);
            for item in self.items.iter().filter(|i| i.is_active()) {
                approved = approved.checked_add(&item.billable_insurance_amount())?;
            }
            self.approved_amount = approved;
        }
        self.touch();
        Ok(())
    }

    /// Checks the rollup invariant: total = insurer share + patient share
    pub fn verify_totals(&self) -> Result<(), ClaimError> {
        let sum = self
            .insurance_covered_amount
            .checked_add(&self.patient_copay_amount)?;
        if sum != self.total_claim_amount {
            return Err(ClaimError::InvariantViolation(format!(
                "insurer {} + patient {} != total {}",
                self.insurance_covered_amount, self.patient_copay_amount, self.total_claim_amount
            )));
        }
        Ok(())
    }

    fn require_transition(&self, next: ClaimStatus) -> Result<(), ClaimError> {
        if !self.status.can_transition_to(next) {
            return Err(ClaimError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        Ok(())
    }

    /// Sends the claim to the vetting queue
    pub fn submit_for_vetting(&mut self) -> Result<(), ClaimError> {
        self.require_transition(ClaimStatus::PendingVetting)?;
        if self.active_items().next().is_none() {
            return Err(ClaimError::EmptyClaim);
        }
        if self.enrollment_id.is_none() {
            return Err(ClaimError::MissingEnrollment);
        }
        self.status = ClaimStatus::PendingVetting;
        self.touch();
        Ok(())
    }

    /// Returns a pending claim to draft for corrections
    pub fn reopen(&mut self) -> Result<(), ClaimError> {
        self.require_transition(ClaimStatus::Draft)?;
        self.status = ClaimStatus::Draft;
        self.touch();
        Ok(())
    }

    /// Submits a vetted claim to the insurer
    pub fn submit(&mut self, actor: UserId, at: DateTime<Utc>) -> Result<(), ClaimError> {
        self.require_transition(ClaimStatus::Submitted)?;
        self.status = ClaimStatus::Submitted;
        self.submitted_by = Some(actor);
        self.submitted_at = Some(at);
        self.touch();
        Ok(())
    }

    /// Records the insurer's approval and committed amount
    pub fn approve(&mut self, approved_amount: Money) -> Result<(), ClaimError> {
        self.require_transition(ClaimStatus::Approved)?;
        self.status = ClaimStatus::Approved;
        self.approved_amount = approved_amount;
        self.rejection_reason = None;
        self.touch();
        Ok(())
    }

    /// Records the insurer's rejection
    pub fn reject(&mut self, reason: impl Into<String>) -> Result<(), ClaimError> {
        self.require_transition(ClaimStatus::Rejected)?;
        let reason = reason.into();
        if reason.trim().is_empty() {
            return Err(ClaimError::MissingRejectionReason);
        }
        self.status = ClaimStatus::Rejected;
        self.rejection_reason = Some(reason);
        self.touch();
        Ok(())
    }

    /// Records full settlement of the approved amount
    pub fn mark_paid(&mut self, payment_date: NaiveDate) -> Result<(), ClaimError> {
        self.require_transition(ClaimStatus::Paid)?;
        self.status = ClaimStatus::Paid;
        self.payment_date = Some(payment_date);
        self.touch();
        Ok(())
    }

    /// Records a partial settlement; the claim stays open for the balance
    pub fn mark_partial(
        &mut self,
        paid_amount: Money,
        payment_date: NaiveDate,
    ) -> Result<(), ClaimError> {
        self.require_transition(ClaimStatus::Partial)?;
        if paid_amount.amount() >= self.approved_amount.amount() {
            return Err(ClaimError::InvariantViolation(format!(
                "partial payment {} is not below the approved amount {}",
                paid_amount, self.approved_amount
            )));
        }
        self.status = ClaimStatus::Partial;
        self.payment_date = Some(payment_date);
        self.touch();
        Ok(())
    }

    /// Reopens a rejected claim for correction and resubmission
    pub fn resubmit(&mut self, at: DateTime<Utc>) -> Result<(), ClaimError> {
        self.require_transition(ClaimStatus::Draft)?;
        self.status = ClaimStatus::Draft;
        self.resubmission_count += 1;
        self.last_resubmitted_at = Some(at);
        self.rejection_reason = None;
        self.submitted_by = None;
        self.submitted_at = None;
        self.touch();
        Ok(())
    }

    /// Cancels an item while the claim is still draft
    pub fn cancel_item(&mut self, item_id: ClaimItemId) -> Result<ChargeId, ClaimError> {
        if !self.can_modify_items() {
            return Err(ClaimError::ItemsLocked {
                status: self.status.to_string(),
            });
        }
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id && i.is_active())
            .ok_or_else(|| ClaimError::ItemNotFound(item_id.to_string()))?;
        item.is_cancelled = true;
        let charge_id = item.charge_id;
        self.recompute_totals()?;
        Ok(charge_id)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Whether `code` may be assigned to `claim_id` for this patient
///
/// A code is taken when another open claim for the same patient already
/// holds it and was created inside the reuse window.
pub fn check_code_available(
    claims: &[InsuranceClaim],
    claim_id: ClaimId,
    patient_id: PatientId,
    code: &str,
    now: DateTime<Utc>,
    reuse_window_hours: u32,
) -> bool {
    let window_start = now - chrono::Duration::hours(i64::from(reuse_window_hours));
    !claims.iter().any(|c| {
        c.id != claim_id
            && c.patient_id == patient_id
            && c.status.is_open()
            && c.claim_check_code.as_deref() == Some(code)
            && c.created_at >= window_start
    })
}
