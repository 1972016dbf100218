//! Claims Domain
//!
//! Turns visit charges into insurance claims and walks them through their
//! lifecycle: linking and splitting charges, vetting, submission batching,
//! and settlement.
//!
//! The money invariant holds at every level: each item's insurer and
//! patient shares sum exactly to its subtotal, and the claim rollups sum
//! the active items. [`InsuranceClaim::verify_totals`] re-checks this after
//! every mutation that touches money.

pub mod charge;
pub mod enrollment;
pub mod claim;
pub mod item;
pub mod aggregator;
pub mod vetting;
pub mod batch;
pub mod error;

pub use charge::{BillableSource, Charge};
pub use enrollment::{active_enrollment, EnrollmentStatus, PatientInsurance};
pub use claim::{
    check_code_available, AttendanceType, ClaimStatus, Diagnosis, InsuranceClaim, ServiceType,
};
pub use item::InsuranceClaimItem;
pub use aggregator::{ClaimAssembler, LinkOutcome, PlanContext};
pub use vetting::{complete_vetting, vet_item, ItemVetting};
pub use batch::{
    apply_outcome_to_claim, generate_batch_number, BatchAddOutcome, BatchItemOutcome,
    BatchItemStatus, BatchStatus, BatchStatusRecord, ClaimBatch, ClaimBatchItem,
};
pub use error::{BatchError, ClaimError};
