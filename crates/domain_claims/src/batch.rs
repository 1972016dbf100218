//! Claim submission batches
//!
//! Vetted claims are grouped into a monthly batch per insurer, frozen, and
//! sent off as one submission. Every status change is appended to the
//! batch's history so the submission trail can be reconstructed.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{BatchId, BatchItemId, ClaimId, Currency, Money, ProviderId, UserId};

use crate::claim::{ClaimStatus, InsuranceClaim};
use crate::error::BatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Claims may still be added and removed
    Draft,
    /// Contents frozen, ready to send
    Finalized,
    /// Sent to the insurer
    Submitted,
    /// Insurer responses arriving; some claims still undecided
    Processing,
    /// Every claim in the batch has a decision
    Completed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Finalized => "finalized",
            Self::Submitted => "submitted",
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        use BatchStatus::*;
        matches!(
            (self, next),
            (Draft, Finalized)
                | (Finalized, Submitted)
                | (Submitted, Processing)
                | (Submitted, Completed)
                | (Processing, Completed)
        )
    }

    /// A batch still holding its claims against inclusion elsewhere
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

/// One claim's membership in a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimBatchItem {
    pub id: BatchItemId,
    pub batch_id: BatchId,
    pub claim_id: ClaimId,
    /// Claim total frozen at the time of inclusion
    pub claim_amount: Money,
    pub status: BatchItemStatus,
    pub approved_amount: Option<Money>,
    pub rejection_reason: Option<String>,
}

/// One entry in the batch's append-only status trail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStatusRecord {
    pub batch_id: BatchId,
    pub previous_status: Option<BatchStatus>,
    pub new_status: BatchStatus,
    pub changed_by: Option<UserId>,
    pub notes: Option<String>,
    pub changed_at: DateTime<Utc>,
}

/// The insurer's decision on one batched claim
#[derive(Debug, Clone)]
pub enum BatchItemOutcome {
    Approved { amount: Money },
    Rejected { reason: String },
}

/// A monthly claim submission to one insurer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimBatch {
    pub id: BatchId,
    pub provider_id: ProviderId,
    /// e.g. "NHIS-202406-0007"
    pub batch_number: String,
    pub name: String,
    /// First day of the month the batch covers
    pub submission_period: NaiveDate,
    pub status: BatchStatus,
    pub total_claims: u32,
    pub total_amount: Money,
    pub approved_amount: Money,
    pub created_by: UserId,
    pub notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub items: Vec<ClaimBatchItem>,
    pub status_history: Vec<BatchStatusRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of adding a set of claims to a batch
#[derive(Debug, Default)]
pub struct BatchAddOutcome {
    pub added: usize,
    /// Claims skipped because they were already in this batch
    pub skipped: usize,
    pub errors: Vec<BatchError>,
}

impl ClaimBatch {
    pub fn new(
        provider_id: ProviderId,
        batch_number: impl Into<String>,
        name: impl Into<String>,
        submission_period: NaiveDate,
        created_by: UserId,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        let id = BatchId::new();
        Self {
            id,
            provider_id,
            batch_number: batch_number.into(),
            name: name.into(),
            submission_period,
            status: BatchStatus::Draft,
            total_claims: 0,
            total_amount: Money::zero(currency),
            approved_amount: Money::zero(currency),
            created_by,
            notes: None,
            submitted_at: None,
            paid_at: None,
            items: Vec::new(),
            status_history: vec![BatchStatusRecord {
                batch_id: id,
                previous_status: None,
                new_status: BatchStatus::Draft,
                changed_by: Some(created_by),
                notes: None,
                changed_at: now,
            }],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn currency(&self) -> Currency {
        self.total_amount.currency()
    }

    pub fn contains(&self, claim_id: ClaimId) -> bool {
        self.items.iter().any(|i| i.claim_id == claim_id)
    }

    /// Adds vetted claims to a draft batch
    ///
    /// A claim already in this batch is skipped; a claim held by another
    /// open batch, or not yet vetted, is reported as an error. Partial
    /// success is fine: good claims land, bad ones are reported.
    pub fn add_claims(
        &mut self,
        claims: &[&InsuranceClaim],
        claims_in_open_batches: &HashSet<ClaimId>,
    ) -> Result<BatchAddOutcome, BatchError> {
        self.require_draft()?;
        let mut outcome = BatchAddOutcome::default();
        for claim in claims {
            if self.contains(claim.id) {
                outcome.skipped += 1;
                continue;
            }
            if claims_in_open_batches.contains(&claim.id) {
                outcome.errors.push(BatchError::InOpenBatch {
                    claim_id: claim.id.to_string(),
                });
                continue;
            }
            if claim.status != ClaimStatus::Vetted {
                outcome.errors.push(BatchError::ClaimNotVetted {
                    claim_id: claim.id.to_string(),
                });
                continue;
            }
            self.items.push(ClaimBatchItem {
                id: BatchItemId::new(),
                batch_id: self.id,
                claim_id: claim.id,
                claim_amount: claim.approved_amount,
                status: BatchItemStatus::Pending,
                approved_amount: None,
                rejection_reason: None,
            });
            outcome.added += 1;
        }
        self.recompute_totals()?;
        Ok(outcome)
    }

    /// Removes a claim from a draft batch
    pub fn remove_claim(&mut self, claim_id: ClaimId) -> Result<(), BatchError> {
        self.require_draft()?;
        let before = self.items.len();
        self.items.retain(|i| i.claim_id != claim_id);
        if self.items.len() == before {
            return Err(BatchError::NotInBatch {
                claim_id: claim_id.to_string(),
            });
        }
        self.recompute_totals()?;
        Ok(())
    }

    /// Freezes the batch contents
    pub fn finalize(&mut self, actor: UserId, at: DateTime<Utc>) -> Result<(), BatchError> {
        self.require_transition(BatchStatus::Finalized)?;
        if self.items.is_empty() {
            return Err(BatchError::EmptyBatch);
        }
        self.recompute_totals()?;
        self.set_status(BatchStatus::Finalized, Some(actor), None, at);
        Ok(())
    }

    /// Records the physical/electronic submission to the insurer
    pub fn mark_submitted(&mut self, actor: UserId, at: DateTime<Utc>) -> Result<(), BatchError> {
        self.require_transition(BatchStatus::Submitted)?;
        self.submitted_at = Some(at);
        self.set_status(BatchStatus::Submitted, Some(actor), None, at);
        Ok(())
    }

    /// Applies insurer decisions to the batched claims
    ///
    /// May be called repeatedly as responses trickle in. The batch moves to
    /// processing on the first response and to completed once every item
    /// has a decision.
    pub fn record_responses(
        &mut self,
        outcomes: &[(ClaimId, BatchItemOutcome)],
        actor: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Result<usize, BatchError> {
        if !matches!(self.status, BatchStatus::Submitted | BatchStatus::Processing) {
            return Err(BatchError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: BatchStatus::Processing.to_string(),
            });
        }
        let mut applied = 0;
        for (claim_id, outcome) in outcomes {
            let item = self
                .items
                .iter_mut()
                .find(|i| i.claim_id == *claim_id)
                .ok_or_else(|| BatchError::NotInBatch {
                    claim_id: claim_id.to_string(),
                })?;
            match outcome {
                BatchItemOutcome::Approved { amount } => {
                    item.status = BatchItemStatus::Approved;
                    item.approved_amount = Some(*amount);
                    item.rejection_reason = None;
                }
                BatchItemOutcome::Rejected { reason } => {
                    item.status = BatchItemStatus::Rejected;
                    item.approved_amount = None;
                    item.rejection_reason = Some(reason.clone());
                }
            }
            applied += 1;
        }
        self.recompute_totals()?;

        let all_decided = self
            .items
            .iter()
            .all(|i| i.status != BatchItemStatus::Pending);
        let next = if all_decided {
            BatchStatus::Completed
        } else {
            BatchStatus::Processing
        };
        if self.status != next {
            self.set_status(next, actor, None, at);
        } else {
            self.updated_at = at;
        }
        Ok(applied)
    }

    /// Records the insurer's settlement of the batch
    pub fn record_payment(&mut self, at: DateTime<Utc>) -> Result<(), BatchError> {
        if self.status != BatchStatus::Completed {
            return Err(BatchError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: "paid".to_string(),
            });
        }
        self.paid_at = Some(at);
        for item in self
            .items
            .iter_mut()
            .filter(|i| i.status == BatchItemStatus::Approved)
        {
            item.status = BatchItemStatus::Paid;
        }
        self.updated_at = at;
        Ok(())
    }

    fn recompute_totals(&mut self) -> Result<(), BatchError> {
        let currency = self.currency();
        self.total_claims = self.items.len() as u32;
        let mut total = Money::zero(currency);
        let mut approved = Money::zero(currency);
        for item in &self.items {
            total = total.checked_add(&item.claim_amount)?;
            if let Some(amount) = item.approved_amount {
                approved = approved.checked_add(&amount)?;
            }
        }
        self.total_amount = total;
        self.approved_amount = approved;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn require_draft(&self) -> Result<(), BatchError> {
        if self.status != BatchStatus::Draft {
            return Err(BatchError::NotDraft {
                status: self.status.to_string(),
            });
        }
        Ok(())
    }

    fn require_transition(&self, next: BatchStatus) -> Result<(), BatchError> {
        if !self.status.can_transition_to(next) {
            return Err(BatchError::InvalidStatusTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        Ok(())
    }

    fn set_status(
        &mut self,
        next: BatchStatus,
        changed_by: Option<UserId>,
        notes: Option<String>,
        at: DateTime<Utc>,
    ) {
        self.status_history.push(BatchStatusRecord {
            batch_id: self.id,
            previous_status: Some(self.status),
            new_status: next,
            changed_by,
            notes,
            changed_at: at,
        });
        self.status = next;
        self.updated_at = at;
    }
}

/// Builds a batch number like `NHIS-202406-0007`
pub fn generate_batch_number(scheme_tag: &str, period: NaiveDate, sequence: u32) -> String {
    format!(
        "{}-{:04}{:02}-{:04}",
        scheme_tag,
        period.year(),
        period.month(),
        sequence
    )
}

/// Advances a claim per the insurer's batched decision
pub fn apply_outcome_to_claim(
    claim: &mut InsuranceClaim,
    outcome: &BatchItemOutcome,
) -> Result<(), crate::error::ClaimError> {
    match outcome {
        BatchItemOutcome::Approved { amount } => claim.approve(*amount),
        BatchItemOutcome::Rejected { reason } => claim.reject(reason.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use core_kernel::{EnrollmentId, PatientId, PlanId, VisitId};

    use crate::claim::{AttendanceType, ServiceType};

    fn ghs(value: rust_decimal::Decimal) -> Money {
        Money::new(value, Currency::GHS)
    }

    fn vetted_claim(amount: rust_decimal::Decimal) -> InsuranceClaim {
        let mut claim = InsuranceClaim::new(
            PatientId::new(),
            VisitId::new(),
            PlanId::new(),
            Some(EnrollmentId::new()),
            ServiceType::Outpatient,
            AttendanceType::Routine,
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            Currency::GHS,
        );
        claim.status = ClaimStatus::Vetted;
        claim.approved_amount = ghs(amount);
        claim
    }

    fn draft_batch() -> ClaimBatch {
        ClaimBatch::new(
            ProviderId::new(),
            generate_batch_number("NHIS", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 7),
            "June NHIS submission",
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            UserId::new(),
            Currency::GHS,
        )
    }

    #[test]
    fn test_batch_number_format() {
        assert_eq!(
            generate_batch_number("NHIS", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 7),
            "NHIS-202406-0007"
        );
    }

    #[test]
    fn test_add_claims_totals_and_history() {
        let mut batch = draft_batch();
        let a = vetted_claim(dec!(120.00));
        let b = vetted_claim(dec!(80.00));
        let outcome = batch.add_claims(&[&a, &b], &HashSet::new()).unwrap();

        assert_eq!(outcome.added, 2);
        assert!(outcome.errors.is_empty());
        assert_eq!(batch.total_claims, 2);
        assert_eq!(batch.total_amount, ghs(dec!(200.00)));
        assert_eq!(batch.status_history.len(), 1);
    }

    #[test]
    fn test_duplicate_add_is_skipped_not_doubled() {
        let mut batch = draft_batch();
        let a = vetted_claim(dec!(120.00));
        batch.add_claims(&[&a], &HashSet::new()).unwrap();
        let outcome = batch.add_claims(&[&a], &HashSet::new()).unwrap();

        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(batch.total_claims, 1);
    }

    #[test]
    fn test_claim_in_another_open_batch_is_refused() {
        let mut batch = draft_batch();
        let a = vetted_claim(dec!(120.00));
        let mut held = HashSet::new();
        held.insert(a.id);
        let outcome = batch.add_claims(&[&a], &held).unwrap();

        assert_eq!(outcome.added, 0);
        assert!(matches!(outcome.errors[0], BatchError::InOpenBatch { .. }));
    }

    #[test]
    fn test_unvetted_claim_is_refused() {
        let mut batch = draft_batch();
        let mut a = vetted_claim(dec!(120.00));
        a.status = ClaimStatus::Draft;
        let outcome = batch.add_claims(&[&a], &HashSet::new()).unwrap();
        assert!(matches!(outcome.errors[0], BatchError::ClaimNotVetted { .. }));
    }

    #[test]
    fn test_finalized_batch_is_frozen() {
        let mut batch = draft_batch();
        let a = vetted_claim(dec!(120.00));
        let b = vetted_claim(dec!(10.00));
        batch.add_claims(&[&a], &HashSet::new()).unwrap();
        batch.finalize(UserId::new(), Utc::now()).unwrap();

        let err = batch.add_claims(&[&b], &HashSet::new()).unwrap_err();
        assert!(matches!(err, BatchError::NotDraft { .. }));
        let err = batch.remove_claim(a.id).unwrap_err();
        assert!(matches!(err, BatchError::NotDraft { .. }));
    }

    #[test]
    fn test_cannot_finalize_empty_batch() {
        let mut batch = draft_batch();
        assert!(matches!(
            batch.finalize(UserId::new(), Utc::now()),
            Err(BatchError::EmptyBatch)
        ));
    }

    #[test]
    fn test_partial_responses_then_completion() {
        let mut batch = draft_batch();
        let a = vetted_claim(dec!(120.00));
        let b = vetted_claim(dec!(80.00));
        batch.add_claims(&[&a, &b], &HashSet::new()).unwrap();
        batch.finalize(UserId::new(), Utc::now()).unwrap();
        batch.mark_submitted(UserId::new(), Utc::now()).unwrap();

        batch
            .record_responses(
                &[(a.id, BatchItemOutcome::Approved { amount: ghs(dec!(110.00)) })],
                None,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(batch.status, BatchStatus::Processing);
        assert_eq!(batch.approved_amount, ghs(dec!(110.00)));

        batch
            .record_responses(
                &[(b.id, BatchItemOutcome::Rejected { reason: "expired card".into() })],
                None,
                Utc::now(),
            )
            .unwrap();
        assert_eq!(batch.status, BatchStatus::Completed);
        assert_eq!(batch.approved_amount, ghs(dec!(110.00)));

        // Trail: draft, finalized, submitted, processing, completed.
        let statuses: Vec<_> = batch.status_history.iter().map(|r| r.new_status).collect();
        assert_eq!(
            statuses,
            vec![
                BatchStatus::Draft,
                BatchStatus::Finalized,
                BatchStatus::Submitted,
                BatchStatus::Processing,
                BatchStatus::Completed,
            ]
        );
    }

    #[test]
    fn test_payment_marks_approved_items_paid() {
        let mut batch = draft_batch();
        let a = vetted_claim(dec!(120.00));
        batch.add_claims(&[&a], &HashSet::new()).unwrap();
        batch.finalize(UserId::new(), Utc::now()).unwrap();
        batch.mark_submitted(UserId::new(), Utc::now()).unwrap();
        batch
            .record_responses(
                &[(a.id, BatchItemOutcome::Approved { amount: ghs(dec!(120.00)) })],
                None,
                Utc::now(),
            )
            .unwrap();
        batch.record_payment(Utc::now()).unwrap();

        assert!(batch.paid_at.is_some());
        assert_eq!(batch.items[0].status, BatchItemStatus::Paid);
    }

    #[test]
    fn test_outcome_advances_the_claim() {
        let mut claim = vetted_claim(dec!(90.00));
        claim.status = ClaimStatus::Submitted;
        apply_outcome_to_claim(
            &mut claim,
            &BatchItemOutcome::Approved { amount: ghs(dec!(85.00)) },
        )
        .unwrap();
        assert_eq!(claim.status, ClaimStatus::Approved);
        assert_eq!(claim.approved_amount, ghs(dec!(85.00)));
    }
}
