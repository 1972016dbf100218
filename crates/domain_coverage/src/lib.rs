//! Coverage Domain
//!
//! This crate implements the rules that decide how much of a hospital charge
//! an insurer pays: plan configuration, coverage rules with effective windows,
//! rule precedence resolution, and the copay calculator.
//!
//! # Resolution precedence
//!
//! ```text
//! item-specific rule > category-wide rule > plan category default > unmapped
//! ```
//!
//! An unmapped item is never an error: the charge simply becomes fully
//! patient-payable and is flagged for later manual vetting.

pub mod plan;
pub mod rule;
pub mod resolver;
pub mod copay;
pub mod history;
pub mod config;
pub mod error;

pub use plan::{InsurancePlan, SchemeKind};
pub use rule::{
    CoverageCategory, CoverageType, CoverageTerms, InsuranceCoverageRule, RuleDraft, RuleScope,
};
pub use resolver::{resolve, check_no_overlap, ResolvedRule, RuleMatch, RuleOrigin};
pub use copay::{split, patient_pays_all, CoverageSplit};
pub use history::{RuleAuditor, RuleChangeAction, RuleChangeRecord};
pub use config::BillingConfig;
pub use error::CoverageError;
