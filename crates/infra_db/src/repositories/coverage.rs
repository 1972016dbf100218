//! Coverage repository
//!
//! Database access for plans, coverage rules, and the rule change audit
//! trail. Rule writes run inside a transaction that re-checks the
//! no-overlapping-windows invariant against the current table state and
//! appends the audit records captured by the domain's [`RuleAuditor`].

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{ChangeBatchId, Currency, EffectiveWindow, Money, PlanId, RuleId, UserId};
use domain_coverage::{
    check_no_overlap, CoverageTerms, InsuranceCoverageRule, InsurancePlan, RuleAuditor,
    RuleChangeAction, RuleChangeRecord, RuleScope,
};

use crate::error::DatabaseError;
use crate::repositories::codec;

#[derive(Debug, FromRow)]
struct PlanRow {
    id: Uuid,
    provider_id: Uuid,
    name: String,
    scheme: String,
    consultation_default: Option<Decimal>,
    drugs_default: Option<Decimal>,
    labs_default: Option<Decimal>,
    procedures_default: Option<Decimal>,
    annual_limit: Option<Decimal>,
    visit_limit: Option<i32>,
    requires_referral: bool,
    requires_preauthorization: bool,
    is_active: bool,
    effective_from: Option<NaiveDate>,
    effective_to: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct RuleRow {
    id: Uuid,
    plan_id: Uuid,
    category: String,
    item_code: Option<String>,
    is_covered: bool,
    coverage_type: String,
    coverage_value: Option<Decimal>,
    tariff_amount: Option<Decimal>,
    patient_copay_percentage: Option<Decimal>,
    patient_copay_amount: Option<Decimal>,
    max_quantity_per_visit: Option<i32>,
    max_amount_per_visit: Option<Decimal>,
    requires_preauthorization: bool,
    is_unmapped: bool,
    is_active: bool,
    effective_from: Option<NaiveDate>,
    effective_to: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct ChangeRow {
    id: Uuid,
    rule_id: Uuid,
    action: String,
    before_state: Option<serde_json::Value>,
    after_state: Option<serde_json::Value>,
    change_batch_id: Option<Uuid>,
    changed_by: Uuid,
    changed_at: DateTime<Utc>,
}

fn window(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<EffectiveWindow, DatabaseError> {
    EffectiveWindow::new(from, to).map_err(|e| DatabaseError::DomainRule(e.to_string()))
}

impl PlanRow {
    fn into_domain(self, currency: Currency) -> Result<InsurancePlan, DatabaseError> {
        Ok(InsurancePlan {
            id: PlanId::from_uuid(self.id),
            provider_id: self.provider_id.into(),
            name: self.name,
            scheme: codec::parse_scheme_kind(&self.scheme)?,
            consultation_default: self.consultation_default,
            drugs_default: self.drugs_default,
            labs_default: self.labs_default,
            procedures_default: self.procedures_default,
            annual_limit: self.annual_limit.map(|a| Money::new(a, currency)),
            visit_limit: self.visit_limit.map(|v| v as u32),
            requires_referral: self.requires_referral,
            requires_preauthorization: self.requires_preauthorization,
            is_active: self.is_active,
            effective_window: window(self.effective_from, self.effective_to)?,
        })
    }
}

impl RuleRow {
    fn into_domain(self, currency: Currency) -> Result<InsuranceCoverageRule, DatabaseError> {
        Ok(InsuranceCoverageRule {
            id: RuleId::from_uuid(self.id),
            scope: RuleScope {
                plan_id: PlanId::from_uuid(self.plan_id),
                category: codec::parse_category(&self.category)?,
                item_code: self.item_code,
            },
            terms: CoverageTerms {
                is_covered: self.is_covered,
                coverage_type: codec::parse_coverage_type(&self.coverage_type)?,
                coverage_value: self.coverage_value,
                tariff_amount: self.tariff_amount.map(|a| Money::new(a, currency)),
                patient_copay_percentage: self.patient_copay_percentage,
                patient_copay_amount: self.patient_copay_amount.map(|a| Money::new(a, currency)),
                max_quantity_per_visit: self.max_quantity_per_visit.map(|q| q as u32),
                max_amount_per_visit: self.max_amount_per_visit.map(|a| Money::new(a, currency)),
                requires_preauthorization: self.requires_preauthorization,
            },
            is_unmapped: self.is_unmapped,
            is_active: self.is_active,
            effective_window: window(self.effective_from, self.effective_to)?,
        })
    }
}

impl ChangeRow {
    fn into_domain(self) -> Result<RuleChangeRecord, DatabaseError> {
        let action = match self.action.as_str() {
            "created" => RuleChangeAction::Created,
            "updated" => RuleChangeAction::Updated,
            "deleted" => RuleChangeAction::Deleted,
            other => {
                return Err(DatabaseError::SerializationError(format!(
                    "unrecognised rule change action: {other}"
                )))
            }
        };
        Ok(RuleChangeRecord {
            id: self.id.into(),
            rule_id: RuleId::from_uuid(self.rule_id),
            action,
            before: self.before_state,
            after: self.after_state,
            change_batch_id: self.change_batch_id.map(ChangeBatchId::from_uuid),
            changed_by: UserId::from_uuid(self.changed_by),
            changed_at: self.changed_at,
        })
    }
}

/// Repository for plans, coverage rules, and rule audit history
#[derive(Debug, Clone)]
pub struct CoverageRepository {
    pool: PgPool,
    currency: Currency,
}

impl CoverageRepository {
    pub fn new(pool: PgPool, currency: Currency) -> Self {
        Self { pool, currency }
    }

    /// Retrieves a plan by its identifier
    pub async fn get_plan(&self, plan_id: PlanId) -> Result<InsurancePlan, DatabaseError> {
        let row = sqlx::query_as::<_, PlanRow>(
            r#"
            SELECT id, provider_id, name, scheme,
                   consultation_default, drugs_default, labs_default, procedures_default,
                   annual_limit, visit_limit,
                   requires_referral, requires_preauthorization, is_active,
                   effective_from, effective_to
            FROM insurance_plans
            WHERE id = $1
            "#,
        )
        .bind(*plan_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("InsurancePlan", plan_id))?;

        row.into_domain(self.currency)
    }

    /// Loads every rule of a plan, active and inactive
    ///
    /// The resolver itself filters by activity and effective window, so
    /// callers get the full set and the same slice serves write-time
    /// overlap checks.
    pub async fn find_rules(&self, plan_id: PlanId) -> Result<Vec<InsuranceCoverageRule>, DatabaseError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, plan_id, category, item_code,
                   is_covered, coverage_type, coverage_value, tariff_amount,
                   patient_copay_percentage, patient_copay_amount,
                   max_quantity_per_visit, max_amount_per_visit,
                   requires_preauthorization, is_unmapped, is_active,
                   effective_from, effective_to
            FROM insurance_coverage_rules
            WHERE plan_id = $1
            ORDER BY category, item_code NULLS FIRST, effective_from NULLS FIRST
            "#,
        )
        .bind(*plan_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.into_domain(self.currency))
            .collect()
    }

    /// Inserts a new rule after re-checking the overlap invariant inside
    /// the write transaction
    pub async fn create_rule(
        &self,
        rule: &InsuranceCoverageRule,
        actor: UserId,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let existing = self
            .fetch_same_scope_rules(&mut tx, &rule.scope)
            .await?;
        check_no_overlap(&existing, rule)?;
        insert_rule(&mut tx, rule).await?;

        let mut auditor = RuleAuditor::new();
        auditor.record_created(rule, actor);
        persist_audit_records(&mut tx, auditor.take_records()).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Rewrites an existing rule, auditing the before/after states
    pub async fn update_rule(
        &self,
        rule: &InsuranceCoverageRule,
        actor: UserId,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let before = self
            .fetch_rule_in_tx(&mut tx, rule.id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("InsuranceCoverageRule", rule.id))?;
        let existing = self
            .fetch_same_scope_rules(&mut tx, &rule.scope)
            .await?;
        check_no_overlap(&existing, rule)?;
        update_rule_row(&mut tx, rule).await?;

        let mut auditor = RuleAuditor::new();
        auditor.record_updated(&before, rule, actor);
        persist_audit_records(&mut tx, auditor.take_records()).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Soft-deletes a rule, auditing its final state
    pub async fn deactivate_rule(&self, rule_id: RuleId, actor: UserId) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let before = self
            .fetch_rule_in_tx(&mut tx, rule_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found("InsuranceCoverageRule", rule_id))?;
        sqlx::query("UPDATE insurance_coverage_rules SET is_active = FALSE, updated_at = NOW() WHERE id = $1")
            .bind(*rule_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        let mut auditor = RuleAuditor::new();
        auditor.record_deleted(&before, actor);
        persist_audit_records(&mut tx, auditor.take_records()).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Applies a set of rule changes as one audited bulk operation
    ///
    /// Every record written shares one change batch id, so the whole
    /// plan-wide edit can be reviewed (or questioned) as a unit.
    pub async fn apply_bulk_update(
        &self,
        updates: &[InsuranceCoverageRule],
        actor: UserId,
    ) -> Result<ChangeBatchId, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let mut auditor = RuleAuditor::new();
        let batch_id = auditor.begin_bulk();

        for rule in updates {
            match self.fetch_rule_in_tx(&mut tx, rule.id).await? {
                Some(before) => {
                    let existing = self.fetch_same_scope_rules(&mut tx, &rule.scope).await?;
                    check_no_overlap(&existing, rule)?;
                    update_rule_row(&mut tx, rule).await?;
                    auditor.record_updated(&before, rule, actor);
                }
                None => {
                    let existing = self.fetch_same_scope_rules(&mut tx, &rule.scope).await?;
                    check_no_overlap(&existing, rule)?;
                    insert_rule(&mut tx, rule).await?;
                    auditor.record_created(rule, actor);
                }
            }
        }
        auditor.end_bulk();
        persist_audit_records(&mut tx, auditor.take_records()).await?;
        tx.commit().await?;
        Ok(batch_id)
    }

    /// Full change history of one rule, oldest first
    pub async fn rule_history(&self, rule_id: RuleId) -> Result<Vec<RuleChangeRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, ChangeRow>(
            r#"
            SELECT id, rule_id, action, before_state, after_state,
                   change_batch_id, changed_by, changed_at
            FROM rule_change_records
            WHERE rule_id = $1
            ORDER BY changed_at, id
            "#,
        )
        .bind(*rule_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChangeRow::into_domain).collect()
    }

    /// All records written under one bulk change batch
    pub async fn change_batch(
        &self,
        batch_id: ChangeBatchId,
    ) -> Result<Vec<RuleChangeRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, ChangeRow>(
            r#"
            SELECT id, rule_id, action, before_state, after_state,
                   change_batch_id, changed_by, changed_at
            FROM rule_change_records
            WHERE change_batch_id = $1
            ORDER BY changed_at, id
            "#,
        )
        .bind(*batch_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ChangeRow::into_domain).collect()
    }

    async fn fetch_rule_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        rule_id: RuleId,
    ) -> Result<Option<InsuranceCoverageRule>, DatabaseError> {
        let row = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, plan_id, category, item_code,
                   is_covered, coverage_type, coverage_value, tariff_amount,
                   patient_copay_percentage, patient_copay_amount,
                   max_quantity_per_visit, max_amount_per_visit,
                   requires_preauthorization, is_unmapped, is_active,
                   effective_from, effective_to
            FROM insurance_coverage_rules
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(*rule_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await?;

        row.map(|r| r.into_domain(self.currency)).transpose()
    }

    /// Locks and returns the active rules sharing the candidate's scope
    async fn fetch_same_scope_rules(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        scope: &RuleScope,
    ) -> Result<Vec<InsuranceCoverageRule>, DatabaseError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT id, plan_id, category, item_code,
                   is_covered, coverage_type, coverage_value, tariff_amount,
                   patient_copay_percentage, patient_copay_amount,
                   max_quantity_per_visit, max_amount_per_visit,
                   requires_preauthorization, is_unmapped, is_active,
                   effective_from, effective_to
            FROM insurance_coverage_rules
            WHERE plan_id = $1 AND category = $2 AND item_code IS NOT DISTINCT FROM $3
              AND is_active
            FOR UPDATE
            "#,
        )
        .bind(*scope.plan_id.as_uuid())
        .bind(scope.category.as_str())
        .bind(scope.item_code.as_deref())
        .fetch_all(&mut **tx)
        .await?;

        rows.into_iter()
            .map(|r| r.into_domain(self.currency))
            .collect()
    }
}

async fn insert_rule(
    tx: &mut Transaction<'_, Postgres>,
    rule: &InsuranceCoverageRule,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO insurance_coverage_rules (
            id, plan_id, category, item_code,
            is_covered, coverage_type, coverage_value, tariff_amount,
            patient_copay_percentage, patient_copay_amount,
            max_quantity_per_visit, max_amount_per_visit,
            requires_preauthorization, is_unmapped, is_active,
            effective_from, effective_to
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(*rule.id.as_uuid())
    .bind(*rule.scope.plan_id.as_uuid())
    .bind(rule.scope.category.as_str())
    .bind(rule.scope.item_code.as_deref())
    .bind(rule.terms.is_covered)
    .bind(codec::coverage_type_to_str(rule.terms.coverage_type))
    .bind(rule.terms.coverage_value)
    .bind(rule.terms.tariff_amount.map(|m| m.amount()))
    .bind(rule.terms.patient_copay_percentage)
    .bind(rule.terms.patient_copay_amount.map(|m| m.amount()))
    .bind(rule.terms.max_quantity_per_visit.map(|q| q as i32))
    .bind(rule.terms.max_amount_per_visit.map(|m| m.amount()))
    .bind(rule.terms.requires_preauthorization)
    .bind(rule.is_unmapped)
    .bind(rule.is_active)
    .bind(rule.effective_window.from)
    .bind(rule.effective_window.to)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_rule_row(
    tx: &mut Transaction<'_, Postgres>,
    rule: &InsuranceCoverageRule,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE insurance_coverage_rules SET
            is_covered = $2, coverage_type = $3, coverage_value = $4, tariff_amount = $5,
            patient_copay_percentage = $6, patient_copay_amount = $7,
            max_quantity_per_visit = $8, max_amount_per_visit = $9,
            requires_preauthorization = $10, is_unmapped = $11, is_active = $12,
            effective_from = $13, effective_to = $14, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(*rule.id.as_uuid())
    .bind(rule.terms.is_covered)
    .bind(codec::coverage_type_to_str(rule.terms.coverage_type))
    .bind(rule.terms.coverage_value)
    .bind(rule.terms.tariff_amount.map(|m| m.amount()))
    .bind(rule.terms.patient_copay_percentage)
    .bind(rule.terms.patient_copay_amount.map(|m| m.amount()))
    .bind(rule.terms.max_quantity_per_visit.map(|q| q as i32))
    .bind(rule.terms.max_amount_per_visit.map(|m| m.amount()))
    .bind(rule.terms.requires_preauthorization)
    .bind(rule.is_unmapped)
    .bind(rule.is_active)
    .bind(rule.effective_window.from)
    .bind(rule.effective_window.to)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn persist_audit_records(
    tx: &mut Transaction<'_, Postgres>,
    records: Vec<RuleChangeRecord>,
) -> Result<(), DatabaseError> {
    for record in records {
        sqlx::query(
            r#"
            INSERT INTO rule_change_records (
                id, rule_id, action, before_state, after_state,
                change_batch_id, changed_by, changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(*record.id.as_uuid())
        .bind(*record.rule_id.as_uuid())
        .bind(match record.action {
            RuleChangeAction::Created => "created",
            RuleChangeAction::Updated => "updated",
            RuleChangeAction::Deleted => "deleted",
        })
        .bind(record.before)
        .bind(record.after)
        .bind(record.change_batch_id.map(|b| *b.as_uuid()))
        .bind(*record.changed_by.as_uuid())
        .bind(record.changed_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
