//! Test Data Builders
//!
//! Builder patterns for constructing test data with sensible defaults.
//! Tests specify only the relevant fields and take defaults for the rest.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use core_kernel::{
    Currency, EffectiveWindow, EnrollmentId, Money, PatientId, PlanId, ProviderId, RuleId, VisitId,
};
use domain_claims::{
    AttendanceType, BillableSource, Charge, InsuranceClaim, ServiceType,
};
use domain_coverage::{
    CoverageCategory, CoverageTerms, CoverageType, InsuranceCoverageRule, InsurancePlan, RuleScope,
    SchemeKind,
};

use crate::fixtures::{CodeFixtures, TemporalFixtures};

/// Builder for test insurance plans
pub struct PlanBuilder {
    name: String,
    scheme: SchemeKind,
    consultation_default: Option<Decimal>,
    drugs_default: Option<Decimal>,
    labs_default: Option<Decimal>,
    procedures_default: Option<Decimal>,
    is_active: bool,
    effective_window: EffectiveWindow,
}

impl Default for PlanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanBuilder {
    pub fn new() -> Self {
        Self {
            name: "Test Gold Plan".to_string(),
            scheme: SchemeKind::Private,
            consultation_default: Some(dec!(100)),
            drugs_default: Some(dec!(80)),
            labs_default: Some(dec!(80)),
            procedures_default: Some(dec!(70)),
            is_active: true,
            effective_window: EffectiveWindow::unbounded(),
        }
    }

    pub fn nhis(mut self) -> Self {
        self.scheme = SchemeKind::Nhis;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_drugs_default(mut self, percent: Option<Decimal>) -> Self {
        self.drugs_default = percent;
        self
    }

    pub fn without_defaults(mut self) -> Self {
        self.consultation_default = None;
        self.drugs_default = None;
        self.labs_default = None;
        self.procedures_default = None;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_window(mut self, window: EffectiveWindow) -> Self {
        self.effective_window = window;
        self
    }

    pub fn build(self) -> InsurancePlan {
        let mut plan = InsurancePlan::new(ProviderId::new(), self.name, self.scheme);
        plan.consultation_default = self.consultation_default;
        plan.drugs_default = self.drugs_default;
        plan.labs_default = self.labs_default;
        plan.procedures_default = self.procedures_default;
        plan.is_active = self.is_active;
        plan.effective_window = self.effective_window;
        plan
    }
}

/// Builder for test coverage rules
pub struct RuleBuilder {
    plan_id: PlanId,
    category: CoverageCategory,
    item_code: Option<String>,
    terms: CoverageTerms,
    is_unmapped: bool,
    is_active: bool,
    effective_window: EffectiveWindow,
}

impl RuleBuilder {
    /// A percentage rule for the given plan
    pub fn percentage(plan_id: PlanId, category: CoverageCategory, percent: Decimal) -> Self {
        Self {
            plan_id,
            category,
            item_code: None,
            terms: CoverageTerms::percentage(percent),
            is_unmapped: false,
            is_active: true,
            effective_window: EffectiveWindow::unbounded(),
        }
    }

    /// A fixed-ceiling rule for the given plan
    pub fn fixed(plan_id: PlanId, category: CoverageCategory, ceiling: Money) -> Self {
        let mut terms = CoverageTerms::excluded();
        terms.is_covered = true;
        terms.coverage_type = CoverageType::Fixed;
        terms.coverage_value = Some(ceiling.amount());
        Self {
            plan_id,
            category,
            item_code: None,
            terms,
            is_unmapped: false,
            is_active: true,
            effective_window: EffectiveWindow::unbounded(),
        }
    }

    pub fn for_item(mut self, code: impl Into<String>) -> Self {
        self.item_code = Some(code.into());
        self
    }

    pub fn with_copay_amount(mut self, copay: Money) -> Self {
        self.terms.patient_copay_amount = Some(copay);
        self
    }

    pub fn with_max_quantity(mut self, max: u32) -> Self {
        self.terms.max_quantity_per_visit = Some(max);
        self
    }

    pub fn with_max_amount(mut self, max: Money) -> Self {
        self.terms.max_amount_per_visit = Some(max);
        self
    }

    pub fn with_tariff(mut self, tariff: Money) -> Self {
        self.terms.tariff_amount = Some(tariff);
        self
    }

    pub fn unmapped(mut self) -> Self {
        self.is_unmapped = true;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn with_window(mut self, window: EffectiveWindow) -> Self {
        self.effective_window = window;
        self
    }

    pub fn build(self) -> InsuranceCoverageRule {
        InsuranceCoverageRule {
            id: RuleId::new(),
            scope: RuleScope {
                plan_id: self.plan_id,
                category: self.category,
                item_code: self.item_code,
            },
            terms: self.terms,
            is_unmapped: self.is_unmapped,
            is_active: self.is_active,
            effective_window: self.effective_window,
        }
    }
}

/// Builder for test charges
pub struct ChargeBuilder {
    patient_id: PatientId,
    visit_id: VisitId,
    source: BillableSource,
    item_code: String,
    description: String,
    amount: Money,
    quantity: u32,
    charged_at: DateTime<Utc>,
}

impl Default for ChargeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChargeBuilder {
    pub fn new() -> Self {
        Self {
            patient_id: PatientId::new(),
            visit_id: VisitId::new(),
            source: BillableSource::Prescription(Uuid::new_v4()),
            item_code: CodeFixtures::drug_code().to_string(),
            description: "Amoxicillin 500mg".to_string(),
            amount: Money::new(dec!(50.00), Currency::GHS),
            quantity: 1,
            charged_at: TemporalFixtures::charge_instant(),
        }
    }

    pub fn for_visit(mut self, patient_id: PatientId, visit_id: VisitId) -> Self {
        self.patient_id = patient_id;
        self.visit_id = visit_id;
        self
    }

    pub fn with_source(mut self, source: BillableSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.item_code = code.into();
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn charged_at(mut self, at: DateTime<Utc>) -> Self {
        self.charged_at = at;
        self
    }

    pub fn build(self) -> Charge {
        Charge::new(
            self.patient_id,
            self.visit_id,
            self.source,
            self.item_code,
            self.description,
            self.amount,
            self.quantity,
            self.charged_at,
        )
    }
}

/// Builder for test claims
pub struct ClaimBuilder {
    patient_id: PatientId,
    visit_id: VisitId,
    plan_id: PlanId,
    enrollment_id: Option<EnrollmentId>,
    type_of_service: ServiceType,
    type_of_attendance: AttendanceType,
    date_of_attendance: NaiveDate,
}

impl ClaimBuilder {
    pub fn for_plan(plan_id: PlanId) -> Self {
        Self {
            patient_id: PatientId::new(),
            visit_id: VisitId::new(),
            plan_id,
            enrollment_id: Some(EnrollmentId::new()),
            type_of_service: ServiceType::Outpatient,
            type_of_attendance: AttendanceType::Routine,
            date_of_attendance: TemporalFixtures::mid_year(),
        }
    }

    pub fn for_visit(mut self, patient_id: PatientId, visit_id: VisitId) -> Self {
        self.patient_id = patient_id;
        self.visit_id = visit_id;
        self
    }

    pub fn without_enrollment(mut self) -> Self {
        self.enrollment_id = None;
        self
    }

    pub fn inpatient(mut self) -> Self {
        self.type_of_service = ServiceType::Inpatient;
        self
    }

    pub fn emergency(mut self) -> Self {
        self.type_of_attendance = AttendanceType::Emergency;
        self
    }

    pub fn attended_on(mut self, date: NaiveDate) -> Self {
        self.date_of_attendance = date;
        self
    }

    pub fn build(self) -> InsuranceClaim {
        InsuranceClaim::new(
            self.patient_id,
            self.visit_id,
            self.plan_id,
            self.enrollment_id,
            self.type_of_service,
            self.type_of_attendance,
            self.date_of_attendance,
            Currency::GHS,
        )
    }
}
