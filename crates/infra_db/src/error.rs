//! Database error types

use thiserror::Error;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Two coverage rules with the same scope have overlapping windows
    #[error("Effective window overlap: {0}")]
    WindowOverlap(String),

    /// A domain rule rejected the persisted state
    #[error("Domain rule violated: {0}")]
    DomainRule(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic SQL error
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Creates a not found error for a specific entity type and identifier
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} with id {id}"))
    }
}

impl From<domain_coverage::CoverageError> for DatabaseError {
    fn from(err: domain_coverage::CoverageError) -> Self {
        match err {
            domain_coverage::CoverageError::OverlappingRule(msg) => Self::WindowOverlap(msg),
            other => Self::DomainRule(other.to_string()),
        }
    }
}

impl From<domain_claims::ClaimError> for DatabaseError {
    fn from(err: domain_claims::ClaimError) -> Self {
        Self::DomainRule(err.to_string())
    }
}

impl From<domain_claims::BatchError> for DatabaseError {
    fn from(err: domain_claims::BatchError) -> Self {
        Self::DomainRule(err.to_string())
    }
}
