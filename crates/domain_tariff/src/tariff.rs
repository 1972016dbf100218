//! Plan-negotiated tariffs
//!
//! An insurer can negotiate its own price for an item, keyed by
//! `(plan, item_type, item_code)` with an effective window. When several
//! windows cover the same date the most recently effective one wins.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{EffectiveWindow, Money, PlanId, TariffId};

/// The kind of billable item a tariff prices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TariffItemType {
    Consultation,
    Drug,
    LabService,
    Procedure,
    WardService,
    NursingService,
}

impl TariffItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TariffItemType::Consultation => "consultation",
            TariffItemType::Drug => "drug",
            TariffItemType::LabService => "lab_service",
            TariffItemType::Procedure => "procedure",
            TariffItemType::WardService => "ward_service",
            TariffItemType::NursingService => "nursing_service",
        }
    }
}

impl std::fmt::Display for TariffItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An insurer-specific price for one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsuranceTariff {
    pub id: TariffId,
    pub plan_id: PlanId,
    pub item_type: TariffItemType,
    pub item_code: String,
    /// The negotiated unit price
    pub insurance_tariff: Money,
    pub effective_window: EffectiveWindow,
}

impl InsuranceTariff {
    /// Whether this tariff prices the given item on the given date
    pub fn applies_to(
        &self,
        plan_id: PlanId,
        item_type: TariffItemType,
        item_code: &str,
        as_of: NaiveDate,
    ) -> bool {
        self.plan_id == plan_id
            && self.item_type == item_type
            && self.item_code == item_code
            && self.effective_window.contains(as_of)
    }
}

/// Picks the applicable tariff from a list: latest `effective_from` wins
pub fn latest_applicable<'a>(
    tariffs: &'a [InsuranceTariff],
    plan_id: PlanId,
    item_type: TariffItemType,
    item_code: &str,
    as_of: NaiveDate,
) -> Option<&'a InsuranceTariff> {
    tariffs
        .iter()
        .filter(|t| t.applies_to(plan_id, item_type, item_code, as_of))
        .max_by_key(|t| t.effective_window.from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tariff(plan_id: PlanId, price: rust_decimal::Decimal, from: NaiveDate) -> InsuranceTariff {
        InsuranceTariff {
            id: TariffId::new_v7(),
            plan_id,
            item_type: TariffItemType::Drug,
            item_code: "PARA500".to_string(),
            insurance_tariff: Money::new(price, Currency::GHS),
            effective_window: EffectiveWindow::starting(from),
        }
    }

    #[test]
    fn test_latest_effective_tariff_wins() {
        let plan_id = PlanId::new();
        let tariffs = vec![
            tariff(plan_id, dec!(4.00), date(2023, 1, 1)),
            tariff(plan_id, dec!(5.00), date(2024, 1, 1)),
        ];

        let picked = latest_applicable(
            &tariffs,
            plan_id,
            TariffItemType::Drug,
            "PARA500",
            date(2024, 6, 1),
        )
        .unwrap();
        assert_eq!(picked.insurance_tariff.amount(), dec!(5.00));
    }

    #[test]
    fn test_future_tariff_not_yet_applicable() {
        let plan_id = PlanId::new();
        let tariffs = vec![tariff(plan_id, dec!(5.00), date(2024, 1, 1))];

        let picked = latest_applicable(
            &tariffs,
            plan_id,
            TariffItemType::Drug,
            "PARA500",
            date(2023, 6, 1),
        );
        assert!(picked.is_none());
    }
}
