//! Price resolution
//!
//! Decides which unit price an item bills at for a given plan and date.
//!
//! Private plans: coverage-rule override > plan tariff > standard price >
//! unpriced. National-scheme plans: the mapped scheme tariff IS the billed
//! price; unmapped scheme items fall back to the standard (cash) price.
//!
//! Failure to price never blocks the workflow - the result is flagged
//! `Unpriced` with a zero price for later correction.

use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use core_kernel::{Currency, Money, PlanId};
use crate::scheme::{
    gdrg_tariff_for, mapping_for, nhis_tariff_for, GdrgTariff, NhisItemMapping, NhisTariff,
};
use crate::tariff::{latest_applicable, InsuranceTariff, TariffItemType};

/// Where the resolved price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// The matched coverage rule's negotiated `tariff_amount`
    RuleOverride,
    /// The plan's tariff table
    PlanTariff,
    /// The item's own standard (cash) price
    Standard,
    /// NHIS medicines-list tariff via the item mapping
    Nhis,
    /// G-DRG service tariff via the item mapping
    Gdrg,
    /// Nothing resolved; price is zero and the item is flagged
    Unpriced,
}

/// A resolved unit price
#[derive(Debug, Clone, PartialEq)]
pub struct PricedItem {
    pub unit_price: Money,
    pub source: PriceSource,
    /// The scheme code used, when priced from a scheme tariff
    pub scheme_code: Option<String>,
}

impl PricedItem {
    pub fn is_unpriced(&self) -> bool {
        self.source == PriceSource::Unpriced
    }
}

/// One pricing question
#[derive(Debug, Clone)]
pub struct PriceRequest<'a> {
    pub plan_id: PlanId,
    /// Whether the plan bills through the national scheme
    pub is_nhis_plan: bool,
    pub item_type: TariffItemType,
    pub item_code: &'a str,
    /// Internal item key, needed for scheme mapping lookups
    pub item_id: Option<Uuid>,
    /// The item's standard (cash) unit price, if it has one
    pub standard_price: Option<Money>,
    /// The matched coverage rule's `tariff_amount`, if set
    pub rule_override: Option<Money>,
    pub as_of: NaiveDate,
}

/// Resolves unit prices against the loaded tariff reference data
#[derive(Debug)]
pub struct TariffResolver {
    pub plan_tariffs: Vec<InsuranceTariff>,
    pub nhis_tariffs: Vec<NhisTariff>,
    pub gdrg_tariffs: Vec<GdrgTariff>,
    pub mappings: Vec<NhisItemMapping>,
    /// Currency used for the zero price of unpriced items
    pub currency: Currency,
}

impl TariffResolver {
    pub fn new(currency: Currency) -> Self {
        Self {
            plan_tariffs: Vec::new(),
            nhis_tariffs: Vec::new(),
            gdrg_tariffs: Vec::new(),
            mappings: Vec::new(),
            currency,
        }
    }

    /// Resolves the unit price for one item
    pub fn price(&self, request: &PriceRequest<'_>) -> PricedItem {
        if request.is_nhis_plan {
            return self.price_scheme(request);
        }

        if let Some(override_price) = request.rule_override {
            return PricedItem {
                unit_price: override_price,
                source: PriceSource::RuleOverride,
                scheme_code: None,
            };
        }

        if let Some(tariff) = latest_applicable(
            &self.plan_tariffs,
            request.plan_id,
            request.item_type,
            request.item_code,
            request.as_of,
        ) {
            return PricedItem {
                unit_price: tariff.insurance_tariff,
                source: PriceSource::PlanTariff,
                scheme_code: None,
            };
        }

        self.standard_or_unpriced(request)
    }

    /// Scheme pricing: the mapped tariff is the billed price
    fn price_scheme(&self, request: &PriceRequest<'_>) -> PricedItem {
        let mapping = request
            .item_id
            .and_then(|id| mapping_for(&self.mappings, request.item_type, id));

        if let Some(mapping) = mapping {
            if let Some(tariff) =
                nhis_tariff_for(&self.nhis_tariffs, &mapping.scheme_code, request.as_of)
            {
                return PricedItem {
                    unit_price: tariff.price,
                    source: PriceSource::Nhis,
                    scheme_code: Some(mapping.scheme_code.clone()),
                };
            }
            if let Some(tariff) =
                gdrg_tariff_for(&self.gdrg_tariffs, &mapping.scheme_code, request.as_of)
            {
                return PricedItem {
                    unit_price: tariff.price,
                    source: PriceSource::Gdrg,
                    scheme_code: Some(mapping.scheme_code.clone()),
                };
            }
            debug!(
                scheme_code = %mapping.scheme_code,
                "mapped scheme code has no effective tariff"
            );
        }

        // Unmapped scheme item: bill at the cash price; the coverage layer
        // decides whether a flexible copay applies.
        self.standard_or_unpriced(request)
    }

    fn standard_or_unpriced(&self, request: &PriceRequest<'_>) -> PricedItem {
        match request.standard_price {
            Some(price) => PricedItem {
                unit_price: price,
                source: PriceSource::Standard,
                scheme_code: None,
            },
            None => {
                debug!(
                    item_type = %request.item_type,
                    item_code = %request.item_code,
                    "no price resolved; flagging unpriced"
                );
                PricedItem {
                    unit_price: Money::zero(self.currency),
                    source: PriceSource::Unpriced,
                    scheme_code: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::{EffectiveWindow, MappingId, TariffId};
    use rust_decimal_macros::dec;

    fn ghs(amount: rust_decimal::Decimal) -> Money {
        Money::new(amount, Currency::GHS)
    }

    fn request(resolver_plan: PlanId) -> PriceRequest<'static> {
        PriceRequest {
            plan_id: resolver_plan,
            is_nhis_plan: false,
            item_type: TariffItemType::Drug,
            item_code: "PARA500",
            item_id: None,
            standard_price: Some(ghs(dec!(2.00))),
            rule_override: None,
            as_of: chrono::Utc::now().date_naive(),
        }
    }

    #[test]
    fn test_rule_override_beats_everything() {
        let plan_id = PlanId::new();
        let mut resolver = TariffResolver::new(Currency::GHS);
        resolver.plan_tariffs.push(InsuranceTariff {
            id: TariffId::new_v7(),
            plan_id,
            item_type: TariffItemType::Drug,
            item_code: "PARA500".to_string(),
            insurance_tariff: ghs(dec!(1.50)),
            effective_window: EffectiveWindow::unbounded(),
        });

        let mut req = request(plan_id);
        req.rule_override = Some(ghs(dec!(1.20)));

        let priced = resolver.price(&req);
        assert_eq!(priced.source, PriceSource::RuleOverride);
        assert_eq!(priced.unit_price.amount(), dec!(1.20));
    }

    #[test]
    fn test_plan_tariff_beats_standard() {
        let plan_id = PlanId::new();
        let mut resolver = TariffResolver::new(Currency::GHS);
        resolver.plan_tariffs.push(InsuranceTariff {
            id: TariffId::new_v7(),
            plan_id,
            item_type: TariffItemType::Drug,
            item_code: "PARA500".to_string(),
            insurance_tariff: ghs(dec!(1.50)),
            effective_window: EffectiveWindow::unbounded(),
        });

        let priced = resolver.price(&request(plan_id));
        assert_eq!(priced.source, PriceSource::PlanTariff);
        assert_eq!(priced.unit_price.amount(), dec!(1.50));
    }

    #[test]
    fn test_standard_price_fallback() {
        let resolver = TariffResolver::new(Currency::GHS);
        let priced = resolver.price(&request(PlanId::new()));

        assert_eq!(priced.source, PriceSource::Standard);
        assert_eq!(priced.unit_price.amount(), dec!(2.00));
    }

    #[test]
    fn test_unpriced_flags_and_returns_zero() {
        let resolver = TariffResolver::new(Currency::GHS);
        let mut req = request(PlanId::new());
        req.standard_price = None;

        let priced = resolver.price(&req);
        assert!(priced.is_unpriced());
        assert!(priced.unit_price.is_zero());
    }

    #[test]
    fn test_nhis_plan_uses_scheme_tariff() {
        let item_id = Uuid::new_v4();
        let mut resolver = TariffResolver::new(Currency::GHS);
        resolver.mappings.push(NhisItemMapping {
            id: MappingId::new_v7(),
            item_type: TariffItemType::Drug,
            item_id,
            scheme_code: "NHISMED0001".to_string(),
        });
        resolver.nhis_tariffs.push(NhisTariff {
            id: TariffId::new_v7(),
            nhis_code: "NHISMED0001".to_string(),
            description: "Paracetamol 500mg".to_string(),
            price: ghs(dec!(0.50)),
            effective_window: EffectiveWindow::unbounded(),
        });

        let mut req = request(PlanId::new());
        req.is_nhis_plan = true;
        req.item_id = Some(item_id);

        let priced = resolver.price(&req);
        assert_eq!(priced.source, PriceSource::Nhis);
        assert_eq!(priced.unit_price.amount(), dec!(0.50));
        assert_eq!(priced.scheme_code.as_deref(), Some("NHISMED0001"));
    }

    #[test]
    fn test_unmapped_nhis_item_bills_cash_price() {
        let mut resolver = TariffResolver::new(Currency::GHS);
        resolver.nhis_tariffs.push(NhisTariff {
            id: TariffId::new_v7(),
            nhis_code: "NHISMED0001".to_string(),
            description: "Paracetamol 500mg".to_string(),
            price: ghs(dec!(0.50)),
            effective_window: EffectiveWindow::unbounded(),
        });

        let mut req = request(PlanId::new());
        req.is_nhis_plan = true;
        req.item_id = Some(Uuid::new_v4());

        let priced = resolver.price(&req);
        assert_eq!(priced.source, PriceSource::Standard);
    }
}
