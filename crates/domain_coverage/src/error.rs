//! Coverage domain errors

use thiserror::Error;
use rust_decimal::Decimal;

/// Errors that can occur in the coverage domain
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Two active rules of equal specificity cover the same scope on the
    /// same date. This is a configuration error: the resolver refuses to
    /// pick one silently, and rule saves that would create the situation
    /// are rejected.
    #[error("Ambiguous coverage rules for plan {plan_id}, category {category}, item {item_code:?}")]
    AmbiguousRules {
        plan_id: String,
        category: String,
        item_code: Option<String>,
    },

    #[error("Rule overlaps an existing active rule for the same scope: {0}")]
    OverlappingRule(String),

    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    #[error("Rule validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The computed split failed to sum back to the subtotal. This should
    /// never happen; it aborts the surrounding transaction rather than
    /// persisting inconsistent money.
    #[error("Split imbalance: insurance {insurance} + patient {patient} != subtotal {subtotal}")]
    SplitImbalance {
        insurance: Decimal,
        patient: Decimal,
        subtotal: Decimal,
    },

    #[error("Money error: {0}")]
    Money(#[from] core_kernel::MoneyError),
}
