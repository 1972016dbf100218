//! Tariff domain errors

use thiserror::Error;

/// Errors that can occur in the tariff domain
#[derive(Debug, Error)]
pub enum TariffError {
    /// An internal item may map to at most one scheme code
    #[error("Item {item_type}/{item_id} is already mapped to scheme code {existing_code}")]
    DuplicateMapping {
        item_type: String,
        item_id: String,
        existing_code: String,
    },

    #[error("Invalid tariff: {0}")]
    InvalidTariff(String),
}
