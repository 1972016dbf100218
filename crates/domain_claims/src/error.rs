//! Claims domain errors

use core_kernel::MoneyError;
use domain_coverage::CoverageError;

/// Errors raised by claim assembly and lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("invalid claim status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("claim items are locked while the claim is {status}")]
    ItemsLocked { status: String },

    #[error("claim has no patient insurance enrollment attached")]
    MissingEnrollment,

    #[error("claim has no active items")]
    EmptyClaim,

    #[error("a rejection requires a non-empty reason")]
    MissingRejectionReason,

    #[error("claim check code {code} is already held by an active claim for this patient")]
    DuplicateCheckCode { code: String },

    #[error("claim item {0} not found on this claim")]
    ItemNotFound(String),

    #[error("payment of {payment} exceeds the outstanding balance {outstanding}")]
    PaymentExceedsCharge { payment: String, outstanding: String },

    #[error("claim totals are inconsistent: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Coverage(#[from] CoverageError),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// Errors raised by batch assembly and submission
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("batch is {status}; claims can only be changed while the batch is draft")]
    NotDraft { status: String },

    #[error("invalid batch status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    #[error("cannot finalize an empty batch")]
    EmptyBatch,

    #[error("claim {claim_id} is not vetted")]
    ClaimNotVetted { claim_id: String },

    #[error("claim {claim_id} already belongs to another open batch")]
    InOpenBatch { claim_id: String },

    #[error("claim {claim_id} is not in this batch")]
    NotInBatch { claim_id: String },

    #[error(transparent)]
    Money(#[from] MoneyError),
}
