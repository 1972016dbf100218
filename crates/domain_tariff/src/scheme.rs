//! National scheme tariff masters
//!
//! NHIS prices medicines by scheme code and services/procedures by G-DRG
//! code. Internal items link to scheme codes through [`NhisItemMapping`];
//! an item maps to exactly one code per `(item_type, item_id)`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{EffectiveWindow, MappingId, Money, TariffId};
use crate::error::TariffError;
use crate::tariff::TariffItemType;

/// An NHIS medicines-list tariff entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NhisTariff {
    pub id: TariffId,
    /// Scheme code, e.g. "NHISMED0123"
    pub nhis_code: String,
    pub description: String,
    pub price: Money,
    pub effective_window: EffectiveWindow,
}

/// A G-DRG (Ghana Diagnosis Related Groupings) service tariff entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GdrgTariff {
    pub id: TariffId,
    /// Scheme code, e.g. "OPDC01"
    pub gdrg_code: String,
    pub description: String,
    pub price: Money,
    /// Specialty the code bills under, e.g. "OPD", "Surgery"
    pub specialty: Option<String>,
    pub effective_window: EffectiveWindow,
}

/// Links an internal item to its scheme code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NhisItemMapping {
    pub id: MappingId,
    pub item_type: TariffItemType,
    /// The internal item's primary key (drug id, lab test id, ...)
    pub item_id: Uuid,
    /// The scheme code the item bills under
    pub scheme_code: String,
}

impl NhisItemMapping {
    pub fn new(item_type: TariffItemType, item_id: Uuid, scheme_code: impl Into<String>) -> Self {
        Self {
            id: MappingId::new_v7(),
            item_type,
            item_id,
            scheme_code: scheme_code.into(),
        }
    }
}

/// Guards the one-mapping-per-item rule before saving a new mapping
pub fn check_unique_mapping(
    existing: &[NhisItemMapping],
    candidate: &NhisItemMapping,
) -> Result<(), TariffError> {
    match existing.iter().find(|m| {
        m.id != candidate.id
            && m.item_type == candidate.item_type
            && m.item_id == candidate.item_id
    }) {
        Some(m) => Err(TariffError::DuplicateMapping {
            item_type: m.item_type.to_string(),
            item_id: m.item_id.to_string(),
            existing_code: m.scheme_code.clone(),
        }),
        None => Ok(()),
    }
}

/// Looks up the mapping for an internal item
pub fn mapping_for<'a>(
    mappings: &'a [NhisItemMapping],
    item_type: TariffItemType,
    item_id: Uuid,
) -> Option<&'a NhisItemMapping> {
    mappings
        .iter()
        .find(|m| m.item_type == item_type && m.item_id == item_id)
}

/// Picks the NHIS tariff for a scheme code: latest effective wins
pub fn nhis_tariff_for<'a>(
    tariffs: &'a [NhisTariff],
    scheme_code: &str,
    as_of: NaiveDate,
) -> Option<&'a NhisTariff> {
    tariffs
        .iter()
        .filter(|t| t.nhis_code == scheme_code && t.effective_window.contains(as_of))
        .max_by_key(|t| t.effective_window.from)
}

/// Picks the G-DRG tariff for a scheme code: latest effective wins
pub fn gdrg_tariff_for<'a>(
    tariffs: &'a [GdrgTariff],
    scheme_code: &str,
    as_of: NaiveDate,
) -> Option<&'a GdrgTariff> {
    tariffs
        .iter()
        .filter(|t| t.gdrg_code == scheme_code && t.effective_window.contains(as_of))
        .max_by_key(|t| t.effective_window.from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    #[test]
    fn test_duplicate_mapping_rejected() {
        let item_id = Uuid::new_v4();
        let existing = vec![NhisItemMapping::new(
            TariffItemType::Drug,
            item_id,
            "NHISMED0001",
        )];
        let candidate = NhisItemMapping::new(TariffItemType::Drug, item_id, "NHISMED0002");

        assert!(matches!(
            check_unique_mapping(&existing, &candidate),
            Err(TariffError::DuplicateMapping { .. })
        ));
    }

    #[test]
    fn test_same_item_id_different_type_allowed() {
        let item_id = Uuid::new_v4();
        let existing = vec![NhisItemMapping::new(
            TariffItemType::Drug,
            item_id,
            "NHISMED0001",
        )];
        let candidate = NhisItemMapping::new(TariffItemType::LabService, item_id, "NHISLAB0001");

        assert!(check_unique_mapping(&existing, &candidate).is_ok());
    }

    #[test]
    fn test_nhis_tariff_lookup_respects_window() {
        let tariffs = vec![NhisTariff {
            id: TariffId::new_v7(),
            nhis_code: "NHISMED0001".to_string(),
            description: "Paracetamol 500mg".to_string(),
            price: Money::new(dec!(0.50), Currency::GHS),
            effective_window: EffectiveWindow::starting(
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            ),
        }];

        let hit = nhis_tariff_for(
            &tariffs,
            "NHISMED0001",
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        );
        assert!(hit.is_some());

        let miss = nhis_tariff_for(
            &tariffs,
            "NHISMED0001",
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
        );
        assert!(miss.is_none());
    }
}
