//! Text encodings for domain enums
//!
//! Enum-valued columns are stored as TEXT with CHECK constraints rather
//! than Postgres enum types, so adding a variant is a constraint change
//! instead of a type migration. These helpers map between the column text
//! and the domain enums; an unrecognised value is a data error, not a
//! panic.

use uuid::Uuid;

use domain_claims::{
    AttendanceType, BatchItemStatus, BatchStatus, BillableSource, ClaimStatus, EnrollmentStatus,
    ServiceType,
};
use domain_coverage::{CoverageCategory, CoverageType, SchemeKind};
use domain_tariff::{PriceSource, TariffItemType};

use crate::error::DatabaseError;

fn bad_value(column: &str, value: &str) -> DatabaseError {
    DatabaseError::SerializationError(format!("unrecognised {column} value: {value}"))
}

pub fn scheme_kind_to_str(v: SchemeKind) -> &'static str {
    match v {
        SchemeKind::Private => "private",
        SchemeKind::Nhis => "nhis",
    }
}

pub fn parse_scheme_kind(s: &str) -> Result<SchemeKind, DatabaseError> {
    match s {
        "private" => Ok(SchemeKind::Private),
        "nhis" => Ok(SchemeKind::Nhis),
        other => Err(bad_value("scheme", other)),
    }
}

pub fn parse_category(s: &str) -> Result<CoverageCategory, DatabaseError> {
    match s {
        "consultation" => Ok(CoverageCategory::Consultation),
        "drug" => Ok(CoverageCategory::Drug),
        "lab" => Ok(CoverageCategory::Lab),
        "procedure" => Ok(CoverageCategory::Procedure),
        "ward" => Ok(CoverageCategory::Ward),
        "nursing" => Ok(CoverageCategory::Nursing),
        other => Err(bad_value("category", other)),
    }
}

pub fn coverage_type_to_str(v: CoverageType) -> &'static str {
    match v {
        CoverageType::Full => "full",
        CoverageType::Percentage => "percentage",
        CoverageType::Fixed => "fixed",
        CoverageType::Excluded => "excluded",
    }
}

pub fn parse_coverage_type(s: &str) -> Result<CoverageType, DatabaseError> {
    match s {
        "full" => Ok(CoverageType::Full),
        "percentage" => Ok(CoverageType::Percentage),
        "fixed" => Ok(CoverageType::Fixed),
        "excluded" => Ok(CoverageType::Excluded),
        other => Err(bad_value("coverage_type", other)),
    }
}

pub fn parse_item_type(s: &str) -> Result<TariffItemType, DatabaseError> {
    match s {
        "consultation" => Ok(TariffItemType::Consultation),
        "drug" => Ok(TariffItemType::Drug),
        "lab_service" => Ok(TariffItemType::LabService),
        "procedure" => Ok(TariffItemType::Procedure),
        "ward_service" => Ok(TariffItemType::WardService),
        "nursing_service" => Ok(TariffItemType::NursingService),
        other => Err(bad_value("item_type", other)),
    }
}

pub fn price_source_to_str(v: PriceSource) -> &'static str {
    match v {
        PriceSource::RuleOverride => "rule_override",
        PriceSource::PlanTariff => "plan_tariff",
        PriceSource::Standard => "standard",
        PriceSource::Nhis => "nhis",
        PriceSource::Gdrg => "gdrg",
        PriceSource::Unpriced => "unpriced",
    }
}

pub fn parse_price_source(s: &str) -> Result<PriceSource, DatabaseError> {
    match s {
        "rule_override" => Ok(PriceSource::RuleOverride),
        "plan_tariff" => Ok(PriceSource::PlanTariff),
        "standard" => Ok(PriceSource::Standard),
        "nhis" => Ok(PriceSource::Nhis),
        "gdrg" => Ok(PriceSource::Gdrg),
        "unpriced" => Ok(PriceSource::Unpriced),
        other => Err(bad_value("price_source", other)),
    }
}

pub fn parse_claim_status(s: &str) -> Result<ClaimStatus, DatabaseError> {
    match s {
        "draft" => Ok(ClaimStatus::Draft),
        "pending_vetting" => Ok(ClaimStatus::PendingVetting),
        "vetted" => Ok(ClaimStatus::Vetted),
        "submitted" => Ok(ClaimStatus::Submitted),
        "approved" => Ok(ClaimStatus::Approved),
        "rejected" => Ok(ClaimStatus::Rejected),
        "paid" => Ok(ClaimStatus::Paid),
        "partial" => Ok(ClaimStatus::Partial),
        other => Err(bad_value("claim status", other)),
    }
}

pub fn service_type_to_str(v: ServiceType) -> &'static str {
    match v {
        ServiceType::Outpatient => "outpatient",
        ServiceType::Inpatient => "inpatient",
    }
}

pub fn parse_service_type(s: &str) -> Result<ServiceType, DatabaseError> {
    match s {
        "outpatient" => Ok(ServiceType::Outpatient),
        "inpatient" => Ok(ServiceType::Inpatient),
        other => Err(bad_value("type_of_service", other)),
    }
}

pub fn attendance_type_to_str(v: AttendanceType) -> &'static str {
    match v {
        AttendanceType::Routine => "routine",
        AttendanceType::Emergency => "emergency",
        AttendanceType::Referral => "referral",
    }
}

pub fn parse_attendance_type(s: &str) -> Result<AttendanceType, DatabaseError> {
    match s {
        "routine" => Ok(AttendanceType::Routine),
        "emergency" => Ok(AttendanceType::Emergency),
        "referral" => Ok(AttendanceType::Referral),
        other => Err(bad_value("type_of_attendance", other)),
    }
}

pub fn parse_batch_status(s: &str) -> Result<BatchStatus, DatabaseError> {
    match s {
        "draft" => Ok(BatchStatus::Draft),
        "finalized" => Ok(BatchStatus::Finalized),
        "submitted" => Ok(BatchStatus::Submitted),
        "processing" => Ok(BatchStatus::Processing),
        "completed" => Ok(BatchStatus::Completed),
        other => Err(bad_value("batch status", other)),
    }
}

pub fn batch_item_status_to_str(v: BatchItemStatus) -> &'static str {
    match v {
        BatchItemStatus::Pending => "pending",
        BatchItemStatus::Approved => "approved",
        BatchItemStatus::Rejected => "rejected",
        BatchItemStatus::Paid => "paid",
    }
}

pub fn parse_batch_item_status(s: &str) -> Result<BatchItemStatus, DatabaseError> {
    match s {
        "pending" => Ok(BatchItemStatus::Pending),
        "approved" => Ok(BatchItemStatus::Approved),
        "rejected" => Ok(BatchItemStatus::Rejected),
        "paid" => Ok(BatchItemStatus::Paid),
        other => Err(bad_value("batch item status", other)),
    }
}

pub fn enrollment_status_to_str(v: EnrollmentStatus) -> &'static str {
    match v {
        EnrollmentStatus::Active => "active",
        EnrollmentStatus::Expired => "expired",
        EnrollmentStatus::Suspended => "suspended",
    }
}

pub fn parse_enrollment_status(s: &str) -> Result<EnrollmentStatus, DatabaseError> {
    match s {
        "active" => Ok(EnrollmentStatus::Active),
        "expired" => Ok(EnrollmentStatus::Expired),
        "suspended" => Ok(EnrollmentStatus::Suspended),
        other => Err(bad_value("enrollment status", other)),
    }
}

pub fn billable_source_to_parts(source: BillableSource) -> (&'static str, Uuid) {
    match source {
        BillableSource::Consultation(id) => ("consultation", id),
        BillableSource::Prescription(id) => ("prescription", id),
        BillableSource::LabOrder(id) => ("lab_order", id),
        BillableSource::Procedure(id) => ("procedure", id),
        BillableSource::WardStay(id) => ("ward_stay", id),
        BillableSource::NursingService(id) => ("nursing_service", id),
    }
}

pub fn parse_billable_source(kind: &str, id: Uuid) -> Result<BillableSource, DatabaseError> {
    match kind {
        "consultation" => Ok(BillableSource::Consultation(id)),
        "prescription" => Ok(BillableSource::Prescription(id)),
        "lab_order" => Ok(BillableSource::LabOrder(id)),
        "procedure" => Ok(BillableSource::Procedure(id)),
        "ward_stay" => Ok(BillableSource::WardStay(id)),
        "nursing_service" => Ok(BillableSource::NursingService(id)),
        other => Err(bad_value("source_type", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_status_round_trip() {
        for status in [
            ClaimStatus::Draft,
            ClaimStatus::PendingVetting,
            ClaimStatus::Vetted,
            ClaimStatus::Submitted,
            ClaimStatus::Approved,
            ClaimStatus::Rejected,
            ClaimStatus::Paid,
            ClaimStatus::Partial,
        ] {
            assert_eq!(parse_claim_status(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_value_is_a_data_error() {
        assert!(parse_claim_status("settled").is_err());
        assert!(parse_category("dental").is_err());
        assert!(parse_billable_source("ambulance", Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_source_parts_round_trip() {
        let id = Uuid::new_v4();
        let (kind, raw) = billable_source_to_parts(BillableSource::LabOrder(id));
        assert_eq!(parse_billable_source(kind, raw).unwrap(), BillableSource::LabOrder(id));
    }
}
