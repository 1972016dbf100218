//! Patient charges
//!
//! A charge is one billable line raised against a visit. It is born
//! patient-payable; linking it to an insurance claim rewrites its split
//! fields so the patient ledger only carries the copay.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{ChargeId, ClaimId, ClaimItemId, Currency, Money, PatientId, VisitId};
use domain_coverage::CoverageCategory;
use domain_tariff::TariffItemType;

use crate::error::ClaimError;

/// The clinical record a charge bills for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum BillableSource {
    Consultation(Uuid),
    Prescription(Uuid),
    LabOrder(Uuid),
    Procedure(Uuid),
    WardStay(Uuid),
    NursingService(Uuid),
}

impl BillableSource {
    /// Internal key of the underlying record, used for scheme mapping lookups
    pub fn item_id(&self) -> Uuid {
        match self {
            Self::Consultation(id)
            | Self::Prescription(id)
            | Self::LabOrder(id)
            | Self::Procedure(id)
            | Self::WardStay(id)
            | Self::NursingService(id) => *id,
        }
    }

    /// Coverage category rules are resolved against
    pub fn category(&self) -> CoverageCategory {
        match self {
            Self::Consultation(_) => CoverageCategory::Consultation,
            Self::Prescription(_) => CoverageCategory::Drug,
            Self::LabOrder(_) => CoverageCategory::Lab,
            Self::Procedure(_) => CoverageCategory::Procedure,
            Self::WardStay(_) => CoverageCategory::Ward,
            Self::NursingService(_) => CoverageCategory::Nursing,
        }
    }

    /// Tariff item type used for pricing lookups
    pub fn tariff_item_type(&self) -> TariffItemType {
        match self {
            Self::Consultation(_) => TariffItemType::Consultation,
            Self::Prescription(_) => TariffItemType::Drug,
            Self::LabOrder(_) => TariffItemType::LabService,
            Self::Procedure(_) => TariffItemType::Procedure,
            Self::WardStay(_) => TariffItemType::WardService,
            Self::NursingService(_) => TariffItemType::NursingService,
        }
    }
}

/// One billable line on a patient visit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Charge {
    pub id: ChargeId,
    pub patient_id: PatientId,
    pub visit_id: VisitId,
    pub source: BillableSource,
    /// Billing code of the underlying item (drug code, procedure code, ...)
    pub item_code: String,
    pub description: String,
    /// Standard (cash) unit price
    pub amount: Money,
    pub quantity: u32,
    /// When the service was rendered; rule windows are evaluated against
    /// the facility-local date of this instant
    pub charged_at: DateTime<Utc>,
    pub paid_amount: Money,
    pub is_waived: bool,
    pub waived_amount: Option<Money>,
    pub waiver_reason: Option<String>,
    pub is_insurance_claim: bool,
    pub insurance_claim_id: Option<ClaimId>,
    pub insurance_claim_item_id: Option<ClaimItemId>,
    /// Unit price the claim billed at, once linked
    pub insurance_tariff_amount: Option<Money>,
    pub insurance_covered_amount: Option<Money>,
    pub patient_copay_amount: Option<Money>,
}

impl Charge {
    pub fn new(
        patient_id: PatientId,
        visit_id: VisitId,
        source: BillableSource,
        item_code: impl Into<String>,
        description: impl Into<String>,
        amount: Money,
        quantity: u32,
        charged_at: DateTime<Utc>,
    ) -> Self {
        let currency = amount.currency();
        Self {
            id: ChargeId::new(),
            patient_id,
            visit_id,
            source,
            item_code: item_code.into(),
            description: description.into(),
            amount,
            quantity: quantity.max(1),
            charged_at,
            paid_amount: Money::zero(currency),
            is_waived: false,
            waived_amount: None,
            waiver_reason: None,
            is_insurance_claim: false,
            insurance_claim_id: None,
            insurance_claim_item_id: None,
            insurance_tariff_amount: None,
            insurance_covered_amount: None,
            patient_copay_amount: None,
        }
    }

    /// Gross amount: `unit price x quantity`, rounded to 2 dp
    pub fn gross(&self) -> Money {
        self.amount
            .multiply(Decimal::from(self.quantity))
            .round_half_up()
    }

    /// What the patient still owes on this charge
    ///
    /// Waived charges owe nothing. Claim-linked charges owe only the copay
    /// share; unlinked charges owe the full gross.
    pub fn patient_payable(&self) -> Money {
        if self.is_waived {
            return Money::zero(self.currency());
        }
        let owed = match self.patient_copay_amount {
            Some(copay) if self.is_insurance_claim => copay,
            _ => self.gross(),
        };
        match owed.checked_sub(&self.paid_amount) {
            Ok(balance) if balance.is_positive() => balance,
            _ => Money::zero(self.currency()),
        }
    }

    pub fn is_fully_paid(&self) -> bool {
        self.patient_payable().is_zero()
    }

    pub fn currency(&self) -> Currency {
        self.amount.currency()
    }

    /// Records a patient payment against this charge
    pub fn record_payment(&mut self, payment: Money) -> Result<(), ClaimError> {
        let outstanding = self.patient_payable();
        if payment.amount() > outstanding.amount() {
            return Err(ClaimError::PaymentExceedsCharge {
                payment: payment.to_string(),
                outstanding: outstanding.to_string(),
            });
        }
        self.paid_amount = self.paid_amount.checked_add(&payment)?;
        Ok(())
    }

    /// Waives the patient-payable remainder of this charge
    pub fn waive(&mut self, reason: impl Into<String>) {
        let remainder = self.patient_payable();
        self.is_waived = true;
        self.waived_amount = Some(remainder);
        self.waiver_reason = Some(reason.into());
    }

    /// Marks this charge as carried by a claim item
    pub(crate) fn attach_to_claim(
        &mut self,
        claim_id: ClaimId,
        item_id: ClaimItemId,
        billed_unit_price: Money,
        insurance_pays: Money,
        patient_pays: Money,
    ) {
        self.is_insurance_claim = true;
        self.insurance_claim_id = Some(claim_id);
        self.insurance_claim_item_id = Some(item_id);
        self.insurance_tariff_amount = Some(billed_unit_price);
        self.insurance_covered_amount = Some(insurance_pays);
        self.patient_copay_amount = Some(patient_pays);
    }

    /// Detaches this charge from its claim, restoring full patient liability
    pub(crate) fn detach_from_claim(&mut self) {
        self.is_insurance_claim = false;
        self.insurance_claim_id = None;
        self.insurance_claim_item_id = None;
        self.insurance_tariff_amount = None;
        self.insurance_covered_amount = None;
        self.patient_copay_amount = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ghs(value: Decimal) -> Money {
        Money::new(value, Currency::GHS)
    }

    fn charge(amount: Decimal, quantity: u32) -> Charge {
        Charge::new(
            PatientId::new(),
            VisitId::new(),
            BillableSource::Prescription(Uuid::new_v4()),
            "AMOX-500",
            "Amoxicillin 500mg",
            ghs(amount),
            quantity,
            Utc::now(),
        )
    }

    #[test]
    fn test_gross_multiplies_quantity() {
        assert_eq!(charge(dec!(12.50), 3).gross(), ghs(dec!(37.50)));
    }

    #[test]
    fn test_unlinked_charge_owes_full_gross() {
        let c = charge(dec!(50.00), 1);
        assert_eq!(c.patient_payable(), ghs(dec!(50.00)));
    }

    #[test]
    fn test_linked_charge_owes_only_copay() {
        let mut c = charge(dec!(50.00), 1);
        c.attach_to_claim(
            ClaimId::new(),
            ClaimItemId::new(),
            ghs(dec!(50.00)),
            ghs(dec!(40.00)),
            ghs(dec!(10.00)),
        );
        assert_eq!(c.patient_payable(), ghs(dec!(10.00)));
    }

    #[test]
    fn test_payment_cannot_exceed_outstanding() {
        let mut c = charge(dec!(20.00), 1);
        c.record_payment(ghs(dec!(15.00))).unwrap();
        assert_eq!(c.patient_payable(), ghs(dec!(5.00)));
        let err = c.record_payment(ghs(dec!(10.00))).unwrap_err();
        assert!(matches!(err, ClaimError::PaymentExceedsCharge { .. }));
    }

    #[test]
    fn test_waiver_zeroes_the_balance() {
        let mut c = charge(dec!(30.00), 1);
        c.record_payment(ghs(dec!(10.00))).unwrap();
        c.waive("indigent patient fund");
        assert!(c.is_fully_paid());
        assert_eq!(c.waived_amount, Some(ghs(dec!(20.00))));
    }

    #[test]
    fn test_detach_restores_full_liability() {
        let mut c = charge(dec!(50.00), 1);
        c.attach_to_claim(
            ClaimId::new(),
            ClaimItemId::new(),
            ghs(dec!(50.00)),
            ghs(dec!(40.00)),
            ghs(dec!(10.00)),
        );
        c.detach_from_claim();
        assert_eq!(c.patient_payable(), ghs(dec!(50.00)));
        assert!(!c.is_insurance_claim);
    }
}
