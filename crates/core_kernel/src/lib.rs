//! Core Kernel - Foundational types for the coverage and claims billing engine
//!
//! This crate provides the building blocks shared by all domain modules:
//! - Money types with precise decimal arithmetic
//! - Effective-date windows and facility-timezone handling
//! - Strongly-typed identifiers

pub mod money;
pub mod temporal;
pub mod identifiers;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{EffectiveWindow, Timezone, TemporalError};
pub use identifiers::{
    PlanId, ProviderId, RuleId, RuleHistoryId, ChangeBatchId, TariffId, MappingId,
    ChargeId, ClaimId, ClaimItemId, BatchId, BatchItemId,
    PatientId, VisitId, EnrollmentId, UserId,
};
