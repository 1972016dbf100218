//! Claims repository
//!
//! Database access for charges, enrollments, claims, and claim items.
//! Anything that rewrites a claim's items or rollups first locks the claim
//! row, so two concurrent linking passes against the same claim serialise
//! rather than double-insert.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{
    ChargeId, ClaimId, Currency, EnrollmentId, Money, PatientId, PlanId, RuleId, UserId, VisitId,
};
use domain_claims::{Charge, Diagnosis, InsuranceClaim, InsuranceClaimItem, PatientInsurance};
use core_kernel::EffectiveWindow;

use crate::error::DatabaseError;
use crate::repositories::codec;

#[derive(Debug, FromRow)]
struct ClaimRow {
    id: Uuid,
    claim_check_code: Option<String>,
    patient_id: Uuid,
    visit_id: Uuid,
    plan_id: Uuid,
    enrollment_id: Option<Uuid>,
    status: String,
    type_of_service: String,
    type_of_attendance: String,
    date_of_attendance: NaiveDate,
    date_of_discharge: Option<NaiveDate>,
    primary_diagnosis_code: Option<String>,
    primary_diagnosis_description: Option<String>,
    secondary_diagnoses: Option<serde_json::Value>,
    total_claim_amount: Decimal,
    insurance_covered_amount: Decimal,
    patient_copay_amount: Decimal,
    approved_amount: Decimal,
    vetted_by: Option<Uuid>,
    vetted_at: Option<DateTime<Utc>>,
    vetting_notes: Option<String>,
    submitted_by: Option<Uuid>,
    submitted_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    resubmission_count: i32,
    last_resubmitted_at: Option<DateTime<Utc>>,
    payment_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ClaimItemRow {
    id: Uuid,
    claim_id: Uuid,
    charge_id: Uuid,
    item_date: NaiveDate,
    category: String,
    item_code: String,
    description: String,
    quantity: i32,
    unit_tariff: Decimal,
    subtotal: Decimal,
    insurance_pays: Decimal,
    patient_pays: Decimal,
    coverage_percentage: Decimal,
    price_source: String,
    scheme_code: Option<String>,
    rule_id: Option<Uuid>,
    is_unmapped: bool,
    is_unpriced: bool,
    exceeded_quantity_limit: bool,
    limit_note: Option<String>,
    requires_preauthorization: bool,
    is_approved: Option<bool>,
    vetting_rejection_reason: Option<String>,
    is_cancelled: bool,
}

#[derive(Debug, FromRow)]
struct ChargeRow {
    id: Uuid,
    patient_id: Uuid,
    visit_id: Uuid,
    source_type: String,
    source_id: Uuid,
    item_code: String,
    description: String,
    amount: Decimal,
    quantity: i32,
    charged_at: DateTime<Utc>,
    paid_amount: Decimal,
    is_waived: bool,
    waived_amount: Option<Decimal>,
    waiver_reason: Option<String>,
    is_insurance_claim: bool,
    insurance_claim_id: Option<Uuid>,
    insurance_claim_item_id: Option<Uuid>,
    insurance_tariff_amount: Option<Decimal>,
    insurance_covered_amount: Option<Decimal>,
    patient_copay_amount: Option<Decimal>,
}

#[derive(Debug, FromRow)]
struct EnrollmentRow {
    id: Uuid,
    patient_id: Uuid,
    plan_id: Uuid,
    membership_id: String,
    status: String,
    coverage_from: Option<NaiveDate>,
    coverage_to: Option<NaiveDate>,
}

impl ClaimRow {
    fn into_domain(
        self,
        items: Vec<InsuranceClaimItem>,
        currency: Currency,
    ) -> Result<InsuranceClaim, DatabaseError> {
        let secondary: Vec<Diagnosis> = match self.secondary_diagnoses {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
            None => Vec::new(),
        };
        let primary = match (self.primary_diagnosis_code, self.primary_diagnosis_description) {
            (Some(code), Some(description)) => Some(Diagnosis { code, description }),
            _ => None,
        };
        Ok(InsuranceClaim {
            id: ClaimId::from_uuid(self.id),
            claim_check_code: self.claim_check_code,
            patient_id: PatientId::from_uuid(self.patient_id),
            visit_id: VisitId::from_uuid(self.visit_id),
            plan_id: PlanId::from_uuid(self.plan_id),
            enrollment_id: self.enrollment_id.map(EnrollmentId::from_uuid),
            status: codec::parse_claim_status(&self.status)?,
            type_of_service: codec::parse_service_type(&self.type_of_service)?,
            type_of_attendance: codec::parse_attendance_type(&self.type_of_attendance)?,
            date_of_attendance: self.date_of_attendance,
            date_of_discharge: self.date_of_discharge,
            primary_diagnosis: primary,
            secondary_diagnoses: secondary,
            items,
            total_claim_amount: Money::new(self.total_claim_amount, currency),
            insurance_covered_amount: Money::new(self.insurance_covered_amount, currency),
            patient_copay_amount: Money::new(self.patient_copay_amount, currency),
            approved_amount: Money::new(self.approved_amount, currency),
            vetted_by: self.vetted_by.map(UserId::from_uuid),
            vetted_at: self.vetted_at,
            vetting_notes: self.vetting_notes,
            submitted_by: self.submitted_by.map(UserId::from_uuid),
            submitted_at: self.submitted_at,
            rejection_reason: self.rejection_reason,
            resubmission_count: self.resubmission_count as u32,
            last_resubmitted_at: self.last_resubmitted_at,
            payment_date: self.payment_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ClaimItemRow {
    fn into_domain(self, currency: Currency) -> Result<InsuranceClaimItem, DatabaseError> {
        Ok(InsuranceClaimItem {
            id: self.id.into(),
            claim_id: ClaimId::from_uuid(self.claim_id),
            charge_id: ChargeId::from_uuid(self.charge_id),
            item_date: self.item_date,
            category: codec::parse_category(&self.category)?,
            item_code: self.item_code,
            description: self.description,
            quantity: self.quantity as u32,
            unit_tariff: Money::new(self.unit_tariff, currency),
            subtotal: Money::new(self.subtotal, currency),
            insurance_pays: Money::new(self.insurance_pays, currency),
            patient_pays: Money::new(self.patient_pays, currency),
            coverage_percentage: self.coverage_percentage,
            price_source: codec::parse_price_source(&self.price_source)?,
            scheme_code: self.scheme_code,
            rule_id: self.rule_id.map(RuleId::from_uuid),
            is_unmapped: self.is_unmapped,
            is_unpriced: self.is_unpriced,
            exceeded_quantity_limit: self.exceeded_quantity_limit,
            limit_note: self.limit_note,
            requires_preauthorization: self.requires_preauthorization,
            is_approved: self.is_approved,
            vetting_rejection_reason: self.vetting_rejection_reason,
            is_cancelled: self.is_cancelled,
        })
    }
}

impl ChargeRow {
    fn into_domain(self, currency: Currency) -> Result<Charge, DatabaseError> {
        Ok(Charge {
            id: ChargeId::from_uuid(self.id),
            patient_id: PatientId::from_uuid(self.patient_id),
            visit_id: VisitId::from_uuid(self.visit_id),
            source: codec::parse_billable_source(&self.source_type, self.source_id)?,
            item_code: self.item_code,
            description: self.description,
            amount: Money::new(self.amount, currency),
            quantity: self.quantity as u32,
            charged_at: self.charged_at,
            paid_amount: Money::new(self.paid_amount, currency),
            is_waived: self.is_waived,
            waived_amount: self.waived_amount.map(|a| Money::new(a, currency)),
            waiver_reason: self.waiver_reason,
            is_insurance_claim: self.is_insurance_claim,
            insurance_claim_id: self.insurance_claim_id.map(ClaimId::from_uuid),
            insurance_claim_item_id: self.insurance_claim_item_id.map(Into::into),
            insurance_tariff_amount: self.insurance_tariff_amount.map(|a| Money::new(a, currency)),
            insurance_covered_amount: self.insurance_covered_amount.map(|a| Money::new(a, currency)),
            patient_copay_amount: self.patient_copay_amount.map(|a| Money::new(a, currency)),
        })
    }
}

/// Repository for claims, claim items, charges, and enrollments
#[derive(Debug, Clone)]
pub struct ClaimsRepository {
    pool: PgPool,
    currency: Currency,
}

impl ClaimsRepository {
    pub fn new(pool: PgPool, currency: Currency) -> Self {
        Self { pool, currency }
    }

    /// Retrieves a claim with its items
    pub async fn get_claim(&self, claim_id: ClaimId) -> Result<InsuranceClaim, DatabaseError> {
        let row = sqlx::query_as::<_, ClaimRow>(&claim_select("WHERE id = $1"))
            .bind(*claim_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("InsuranceClaim", claim_id))?;

        let items = self.fetch_items(claim_id).await?;
        row.into_domain(items, self.currency)
    }

    /// Inserts a freshly created claim
    pub async fn create_claim(&self, claim: &InsuranceClaim) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        insert_claim(&mut tx, claim).await?;
        upsert_items(&mut tx, claim).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Persists a claim mutation together with the charges it rewrote
    ///
    /// Locks the claim row first so concurrent linking passes serialise;
    /// then updates the claim, upserts its items, and rewrites the split
    /// fields of the given charges, all in one transaction.
    pub async fn save_claim_with_charges(
        &self,
        claim: &InsuranceClaim,
        charges: &[Charge],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        lock_claim_row(&mut tx, claim.id).await?;
        update_claim(&mut tx, claim).await?;
        upsert_items(&mut tx, claim).await?;
        for charge in charges {
            update_charge(&mut tx, charge).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Persists a claim-only mutation (status moves, vetting, settlement)
    pub async fn save_claim(&self, claim: &InsuranceClaim) -> Result<(), DatabaseError> {
        self.save_claim_with_charges(claim, &[]).await
    }

    /// Open claims for a patient, newest first, for check-code validation
    ///
    /// Items are not loaded; callers only need the claim headers.
    pub async fn find_open_claims_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<InsuranceClaim>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClaimRow>(&claim_select(
            "WHERE patient_id = $1 AND status NOT IN ('paid', 'rejected') ORDER BY created_at DESC",
        ))
        .bind(*patient_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.into_domain(Vec::new(), self.currency))
            .collect()
    }

    /// Inserts a new charge
    pub async fn create_charge(&self, charge: &Charge) -> Result<(), DatabaseError> {
        let (source_type, source_id) = codec::billable_source_to_parts(charge.source);
        sqlx::query(
            r#"
            INSERT INTO patient_charges (
                id, patient_id, visit_id, source_type, source_id,
                item_code, description, amount, quantity, charged_at,
                paid_amount, is_waived, waived_amount, waiver_reason,
                is_insurance_claim, insurance_claim_id, insurance_claim_item_id,
                insurance_tariff_amount, insurance_covered_amount, patient_copay_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(*charge.id.as_uuid())
        .bind(*charge.patient_id.as_uuid())
        .bind(*charge.visit_id.as_uuid())
        .bind(source_type)
        .bind(source_id)
        .bind(&charge.item_code)
        .bind(&charge.description)
        .bind(charge.amount.amount())
        .bind(charge.quantity as i32)
        .bind(charge.charged_at)
        .bind(charge.paid_amount.amount())
        .bind(charge.is_waived)
        .bind(charge.waived_amount.map(|m| m.amount()))
        .bind(charge.waiver_reason.as_deref())
        .bind(charge.is_insurance_claim)
        .bind(charge.insurance_claim_id.map(|id| *id.as_uuid()))
        .bind(charge.insurance_claim_item_id.map(|id| *id.as_uuid()))
        .bind(charge.insurance_tariff_amount.map(|m| m.amount()))
        .bind(charge.insurance_covered_amount.map(|m| m.amount()))
        .bind(charge.patient_copay_amount.map(|m| m.amount()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Unlinked, unwaived charges of a visit, in service order
    pub async fn find_claimable_charges(
        &self,
        visit_id: VisitId,
    ) -> Result<Vec<Charge>, DatabaseError> {
        let rows = sqlx::query_as::<_, ChargeRow>(
            r#"
            SELECT id, patient_id, visit_id, source_type, source_id,
                   item_code, description, amount, quantity, charged_at,
                   paid_amount, is_waived, waived_amount, waiver_reason,
                   is_insurance_claim, insurance_claim_id, insurance_claim_item_id,
                   insurance_tariff_amount, insurance_covered_amount, patient_copay_amount
            FROM patient_charges
            WHERE visit_id = $1 AND NOT is_insurance_claim AND NOT is_waived
            ORDER BY charged_at
            "#,
        )
        .bind(*visit_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.into_domain(self.currency))
            .collect()
    }

    /// A patient's insurance enrollments
    pub async fn find_enrollments(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<PatientInsurance>, DatabaseError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            r#"
            SELECT id, patient_id, plan_id, membership_id, status, coverage_from, coverage_to
            FROM patient_insurance
            WHERE patient_id = $1
            ORDER BY coverage_from NULLS FIRST
            "#,
        )
        .bind(*patient_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(PatientInsurance {
                    id: EnrollmentId::from_uuid(r.id),
                    patient_id: PatientId::from_uuid(r.patient_id),
                    plan_id: PlanId::from_uuid(r.plan_id),
                    membership_id: r.membership_id,
                    status: codec::parse_enrollment_status(&r.status)?,
                    coverage_window: EffectiveWindow::new(r.coverage_from, r.coverage_to)
                        .map_err(|e| DatabaseError::DomainRule(e.to_string()))?,
                })
            })
            .collect()
    }

    /// Records an enrollment
    pub async fn create_enrollment(&self, enrollment: &PatientInsurance) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO patient_insurance (
                id, patient_id, plan_id, membership_id, status, coverage_from, coverage_to
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*enrollment.id.as_uuid())
        .bind(*enrollment.patient_id.as_uuid())
        .bind(*enrollment.plan_id.as_uuid())
        .bind(&enrollment.membership_id)
        .bind(codec::enrollment_status_to_str(enrollment.status))
        .bind(enrollment.coverage_window.from)
        .bind(enrollment.coverage_window.to)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_items(&self, claim_id: ClaimId) -> Result<Vec<InsuranceClaimItem>, DatabaseError> {
        let rows = sqlx::query_as::<_, ClaimItemRow>(
            r#"
            SELECT id, claim_id, charge_id, item_date, category, item_code, description,
                   quantity, unit_tariff, subtotal, insurance_pays, patient_pays,
                   coverage_percentage, price_source, scheme_code, rule_id,
                   is_unmapped, is_unpriced, exceeded_quantity_limit, limit_note,
                   requires_preauthorization, is_approved, vetting_rejection_reason,
                   is_cancelled
            FROM insurance_claim_items
            WHERE claim_id = $1
            ORDER BY item_date, item_code
            "#,
        )
        .bind(*claim_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.into_domain(self.currency))
            .collect()
    }
}

fn claim_select(suffix: &str) -> String {
    format!(
        r#"
        SELECT id, claim_check_code, patient_id, visit_id, plan_id, enrollment_id,
               status, type_of_service, type_of_attendance,
               date_of_attendance, date_of_discharge,
               primary_diagnosis_code, primary_diagnosis_description, secondary_diagnoses,
               total_claim_amount, insurance_covered_amount, patient_copay_amount,
               approved_amount,
               vetted_by, vetted_at, vetting_notes,
               submitted_by, submitted_at, rejection_reason,
               resubmission_count, last_resubmitted_at, payment_date,
               created_at, updated_at
        FROM insurance_claims
        {suffix}
        "#
    )
}

async fn lock_claim_row(
    tx: &mut Transaction<'_, Postgres>,
    claim_id: ClaimId,
) -> Result<(), DatabaseError> {
    let locked: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM insurance_claims WHERE id = $1 FOR UPDATE")
            .bind(*claim_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;
    if locked.is_none() {
        return Err(DatabaseError::not_found("InsuranceClaim", claim_id));
    }
    Ok(())
}

async fn insert_claim(
    tx: &mut Transaction<'_, Postgres>,
    claim: &InsuranceClaim,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO insurance_claims (
            id, claim_check_code, patient_id, visit_id, plan_id, enrollment_id,
            status, type_of_service, type_of_attendance,
            date_of_attendance, date_of_discharge,
            primary_diagnosis_code, primary_diagnosis_description, secondary_diagnoses,
            total_claim_amount, insurance_covered_amount, patient_copay_amount,
            approved_amount,
            vetted_by, vetted_at, vetting_notes,
            submitted_by, submitted_at, rejection_reason,
            resubmission_count, last_resubmitted_at, payment_date,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28, $29)
        "#,
    )
    .bind(*claim.id.as_uuid())
    .bind(claim.claim_check_code.as_deref())
    .bind(*claim.patient_id.as_uuid())
    .bind(*claim.visit_id.as_uuid())
    .bind(*claim.plan_id.as_uuid())
    .bind(claim.enrollment_id.map(|id| *id.as_uuid()))
    .bind(claim.status.as_str())
    .bind(codec::service_type_to_str(claim.type_of_service))
    .bind(codec::attendance_type_to_str(claim.type_of_attendance))
    .bind(claim.date_of_attendance)
    .bind(claim.date_of_discharge)
    .bind(claim.primary_diagnosis.as_ref().map(|d| d.code.as_str()))
    .bind(claim.primary_diagnosis.as_ref().map(|d| d.description.as_str()))
    .bind(
        serde_json::to_value(&claim.secondary_diagnoses)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
    )
    .bind(claim.total_claim_amount.amount())
    .bind(claim.insurance_covered_amount.amount())
    .bind(claim.patient_copay_amount.amount())
    .bind(claim.approved_amount.amount())
    .bind(claim.vetted_by.map(|u| *u.as_uuid()))
    .bind(claim.vetted_at)
    .bind(claim.vetting_notes.as_deref())
    .bind(claim.submitted_by.map(|u| *u.as_uuid()))
    .bind(claim.submitted_at)
    .bind(claim.rejection_reason.as_deref())
    .bind(claim.resubmission_count as i32)
    .bind(claim.last_resubmitted_at)
    .bind(claim.payment_date)
    .bind(claim.created_at)
    .bind(claim.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_claim(
    tx: &mut Transaction<'_, Postgres>,
    claim: &InsuranceClaim,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE insurance_claims SET
            claim_check_code = $2, enrollment_id = $3, status = $4,
            date_of_discharge = $5,
            primary_diagnosis_code = $6, primary_diagnosis_description = $7,
            secondary_diagnoses = $8,
            total_claim_amount = $9, insurance_covered_amount = $10,
            patient_copay_amount = $11, approved_amount = $12,
            vetted_by = $13, vetted_at = $14, vetting_notes = $15,
            submitted_by = $16, submitted_at = $17, rejection_reason = $18,
            resubmission_count = $19, last_resubmitted_at = $20, payment_date = $21,
            updated_at = $22
        WHERE id = $1
        "#,
    )
    .bind(*claim.id.as_uuid())
    .bind(claim.claim_check_code.as_deref())
    .bind(claim.enrollment_id.map(|id| *id.as_uuid()))
    .bind(claim.status.as_str())
    .bind(claim.date_of_discharge)
    .bind(claim.primary_diagnosis.as_ref().map(|d| d.code.as_str()))
    .bind(claim.primary_diagnosis.as_ref().map(|d| d.description.as_str()))
    .bind(
        serde_json::to_value(&claim.secondary_diagnoses)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?,
    )
    .bind(claim.total_claim_amount.amount())
    .bind(claim.insurance_covered_amount.amount())
    .bind(claim.patient_copay_amount.amount())
    .bind(claim.approved_amount.amount())
    .bind(claim.vetted_by.map(|u| *u.as_uuid()))
    .bind(claim.vetted_at)
    .bind(claim.vetting_notes.as_deref())
    .bind(claim.submitted_by.map(|u| *u.as_uuid()))
    .bind(claim.submitted_at)
    .bind(claim.rejection_reason.as_deref())
    .bind(claim.resubmission_count as i32)
    .bind(claim.last_resubmitted_at)
    .bind(claim.payment_date)
    .bind(claim.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn upsert_items(
    tx: &mut Transaction<'_, Postgres>,
    claim: &InsuranceClaim,
) -> Result<(), DatabaseError> {
    for item in &claim.items {
        sqlx::query(
            r#"
            INSERT INTO insurance_claim_items (
                id, claim_id, charge_id, item_date, category, item_code, description,
                quantity, unit_tariff, subtotal, insurance_pays, patient_pays,
                coverage_percentage, price_source, scheme_code, rule_id,
                is_unmapped, is_unpriced, exceeded_quantity_limit, limit_note,
                requires_preauthorization, is_approved, vetting_rejection_reason,
                is_cancelled
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12,
                    $13, $14, $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            ON CONFLICT (id) DO UPDATE SET
                is_approved = EXCLUDED.is_approved,
                vetting_rejection_reason = EXCLUDED.vetting_rejection_reason,
                is_cancelled = EXCLUDED.is_cancelled
            "#,
        )
        .bind(*item.id.as_uuid())
        .bind(*item.claim_id.as_uuid())
        .bind(*item.charge_id.as_uuid())
        .bind(item.item_date)
        .bind(item.category.as_str())
        .bind(&item.item_code)
        .bind(&item.description)
        .bind(item.quantity as i32)
        .bind(item.unit_tariff.amount())
        .bind(item.subtotal.amount())
        .bind(item.insurance_pays.amount())
        .bind(item.patient_pays.amount())
        .bind(item.coverage_percentage)
        .bind(codec::price_source_to_str(item.price_source))
        .bind(item.scheme_code.as_deref())
        .bind(item.rule_id.map(|id| *id.as_uuid()))
        .bind(item.is_unmapped)
        .bind(item.is_unpriced)
        .bind(item.exceeded_quantity_limit)
        .bind(item.limit_note.as_deref())
        .bind(item.requires_preauthorization)
        .bind(item.is_approved)
        .bind(item.vetting_rejection_reason.as_deref())
        .bind(item.is_cancelled)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

async fn update_charge(
    tx: &mut Transaction<'_, Postgres>,
    charge: &Charge,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE patient_charges SET
            paid_amount = $2, is_waived = $3, waived_amount = $4, waiver_reason = $5,
            is_insurance_claim = $6, insurance_claim_id = $7, insurance_claim_item_id = $8,
            insurance_tariff_amount = $9, insurance_covered_amount = $10,
            patient_copay_amount = $11
        WHERE id = $1
        "#,
    )
    .bind(*charge.id.as_uuid())
    .bind(charge.paid_amount.amount())
    .bind(charge.is_waived)
    .bind(charge.waived_amount.map(|m| m.amount()))
    .bind(charge.waiver_reason.as_deref())
    .bind(charge.is_insurance_claim)
    .bind(charge.insurance_claim_id.map(|id| *id.as_uuid()))
    .bind(charge.insurance_claim_item_id.map(|id| *id.as_uuid()))
    .bind(charge.insurance_tariff_amount.map(|m| m.amount()))
    .bind(charge.insurance_covered_amount.map(|m| m.amount()))
    .bind(charge.patient_copay_amount.map(|m| m.amount()))
    .execute(&mut **tx)
    .await?;
    Ok(())
}
