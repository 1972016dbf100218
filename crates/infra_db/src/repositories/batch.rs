//! Batch repository
//!
//! Persistence for claim submission batches, their items, and the
//! append-only status trail. Also answers the one cross-cutting question
//! the domain cannot: which claims are already sitting in an open batch.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use core_kernel::{BatchId, ClaimId, Currency, Money, ProviderId, UserId};
use domain_claims::{BatchStatusRecord, ClaimBatch, ClaimBatchItem};

use crate::error::DatabaseError;
use crate::repositories::codec;

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    provider_id: Uuid,
    batch_number: String,
    name: String,
    submission_period: NaiveDate,
    status: String,
    total_claims: i32,
    total_amount: Decimal,
    approved_amount: Decimal,
    created_by: Uuid,
    notes: Option<String>,
    submitted_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct BatchItemRow {
    id: Uuid,
    batch_id: Uuid,
    claim_id: Uuid,
    claim_amount: Decimal,
    status: String,
    approved_amount: Option<Decimal>,
    rejection_reason: Option<String>,
}

#[derive(Debug, FromRow)]
struct BatchHistoryRow {
    batch_id: Uuid,
    previous_status: Option<String>,
    new_status: String,
    changed_by: Option<Uuid>,
    notes: Option<String>,
    changed_at: DateTime<Utc>,
}

impl BatchRow {
    fn into_domain(
        self,
        items: Vec<ClaimBatchItem>,
        status_history: Vec<BatchStatusRecord>,
        currency: Currency,
    ) -> Result<ClaimBatch, DatabaseError> {
        Ok(ClaimBatch {
            id: BatchId::from_uuid(self.id),
            provider_id: ProviderId::from_uuid(self.provider_id),
            batch_number: self.batch_number,
            name: self.name,
            submission_period: self.submission_period,
            status: codec::parse_batch_status(&self.status)?,
            total_claims: self.total_claims as u32,
            total_amount: Money::new(self.total_amount, currency),
            approved_amount: Money::new(self.approved_amount, currency),
            created_by: UserId::from_uuid(self.created_by),
            notes: self.notes,
            submitted_at: self.submitted_at,
            paid_at: self.paid_at,
            items,
            status_history,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl BatchItemRow {
    fn into_domain(self, currency: Currency) -> Result<ClaimBatchItem, DatabaseError> {
        Ok(ClaimBatchItem {
            id: self.id.into(),
            batch_id: BatchId::from_uuid(self.batch_id),
            claim_id: ClaimId::from_uuid(self.claim_id),
            claim_amount: Money::new(self.claim_amount, currency),
            status: codec::parse_batch_item_status(&self.status)?,
            approved_amount: self.approved_amount.map(|a| Money::new(a, currency)),
            rejection_reason: self.rejection_reason,
        })
    }
}

impl BatchHistoryRow {
    fn into_domain(self) -> Result<BatchStatusRecord, DatabaseError> {
        let previous_status = match self.previous_status {
            Some(s) => Some(codec::parse_batch_status(&s)?),
            None => None,
        };
        Ok(BatchStatusRecord {
            batch_id: BatchId::from_uuid(self.batch_id),
            previous_status,
            new_status: codec::parse_batch_status(&self.new_status)?,
            changed_by: self.changed_by.map(UserId::from_uuid),
            notes: self.notes,
            changed_at: self.changed_at,
        })
    }
}

/// Repository for claim submission batches
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: PgPool,
    currency: Currency,
}

impl BatchRepository {
    pub fn new(pool: PgPool, currency: Currency) -> Self {
        Self { pool, currency }
    }

    pub async fn get_batch(&self, batch_id: BatchId) -> Result<ClaimBatch, DatabaseError> {
        let row = sqlx::query_as::<_, BatchRow>(&batch_select("WHERE id = $1"))
            .bind(*batch_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("ClaimBatch", batch_id))?;

        let items = self.fetch_items(batch_id).await?;
        let history = self.fetch_history(batch_id).await?;
        row.into_domain(items, history, self.currency)
    }

    pub async fn create_batch(&self, batch: &ClaimBatch) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        insert_batch(&mut tx, batch).await?;
        sync_items(&mut tx, batch).await?;
        append_history(&mut tx, batch, 0).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Persists a batch mutation: header, item set, and any new history rows
    ///
    /// The item set is replaced wholesale while the batch is in draft
    /// (claims come and go); after finalization only item decisions change,
    /// which the upsert covers. History rows beyond what is already stored
    /// are appended, never rewritten.
    pub async fn save_batch(&self, batch: &ClaimBatch) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        lock_batch_row(&mut tx, batch.id).await?;
        update_batch(&mut tx, batch).await?;
        sync_items(&mut tx, batch).await?;
        let stored: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM claim_batch_status_history WHERE batch_id = $1")
                .bind(*batch.id.as_uuid())
                .fetch_one(&mut *tx)
                .await?;
        append_history(&mut tx, batch, stored.0 as usize).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Claims currently held by a batch that has not completed
    ///
    /// A claim in the returned set must not be added to another batch.
    pub async fn claims_in_open_batches(&self) -> Result<HashSet<ClaimId>, DatabaseError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT bi.claim_id
            FROM claim_batch_items bi
            JOIN claim_batches b ON b.id = bi.batch_id
            WHERE b.status <> 'completed'
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| ClaimId::from_uuid(id)).collect())
    }

    /// Next sequence number for a provider's batches in the period's month
    pub async fn next_sequence(
        &self,
        provider_id: ProviderId,
        period: NaiveDate,
    ) -> Result<u32, DatabaseError> {
        let month_start = period
            .with_day(1)
            .ok_or_else(|| DatabaseError::DomainRule("invalid period date".into()))?;
        let count: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM claim_batches
            WHERE provider_id = $1 AND submission_period = $2
            "#,
        )
        .bind(*provider_id.as_uuid())
        .bind(month_start)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0 as u32 + 1)
    }

    pub async fn find_batches_for_provider(
        &self,
        provider_id: ProviderId,
    ) -> Result<Vec<ClaimBatch>, DatabaseError> {
        let rows = sqlx::query_as::<_, BatchRow>(&batch_select(
            "WHERE provider_id = $1 ORDER BY submission_period DESC, batch_number DESC",
        ))
        .bind(*provider_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        let mut batches = Vec::with_capacity(rows.len());
        for row in rows {
            let batch_id = BatchId::from_uuid(row.id);
            let items = self.fetch_items(batch_id).await?;
            let history = self.fetch_history(batch_id).await?;
            batches.push(row.into_domain(items, history, self.currency)?);
        }
        Ok(batches)
    }

    async fn fetch_items(&self, batch_id: BatchId) -> Result<Vec<ClaimBatchItem>, DatabaseError> {
        let rows = sqlx::query_as::<_, BatchItemRow>(
            r#"
            SELECT id, batch_id, claim_id, claim_amount, status,
                   approved_amount, rejection_reason
            FROM claim_batch_items
            WHERE batch_id = $1
            ORDER BY claim_id
            "#,
        )
        .bind(*batch_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.into_domain(self.currency))
            .collect()
    }

    async fn fetch_history(
        &self,
        batch_id: BatchId,
    ) -> Result<Vec<BatchStatusRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, BatchHistoryRow>(
            r#"
            SELECT batch_id, previous_status, new_status, changed_by, notes, changed_at
            FROM claim_batch_status_history
            WHERE batch_id = $1
            ORDER BY changed_at, id
            "#,
        )
        .bind(*batch_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_domain()).collect()
    }
}

fn batch_select(suffix: &str) -> String {
    format!(
        r#"
        SELECT id, provider_id, batch_number, name, submission_period, status,
               total_claims, total_amount, approved_amount, created_by, notes,
               submitted_at, paid_at, created_at, updated_at
        FROM claim_batches
        {suffix}
        "#
    )
}

async fn lock_batch_row(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: BatchId,
) -> Result<(), DatabaseError> {
    let locked: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM claim_batches WHERE id = $1 FOR UPDATE")
            .bind(*batch_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await?;
    if locked.is_none() {
        return Err(DatabaseError::not_found("ClaimBatch", batch_id));
    }
    Ok(())
}

async fn insert_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch: &ClaimBatch,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO claim_batches (
            id, provider_id, batch_number, name, submission_period, status,
            total_claims, total_amount, approved_amount, created_by, notes,
            submitted_at, paid_at, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(*batch.id.as_uuid())
    .bind(*batch.provider_id.as_uuid())
    .bind(&batch.batch_number)
    .bind(&batch.name)
    .bind(batch.submission_period)
    .bind(batch.status.as_str())
    .bind(batch.total_claims as i32)
    .bind(batch.total_amount.amount())
    .bind(batch.approved_amount.amount())
    .bind(*batch.created_by.as_uuid())
    .bind(batch.notes.as_deref())
    .bind(batch.submitted_at)
    .bind(batch.paid_at)
    .bind(batch.created_at)
    .bind(batch.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_batch(
    tx: &mut Transaction<'_, Postgres>,
    batch: &ClaimBatch,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE claim_batches SET
            name = $2, status = $3, total_claims = $4, total_amount = $5,
            approved_amount = $6, notes = $7, submitted_at = $8, paid_at = $9,
            updated_at = $10
        WHERE id = $1
        "#,
    )
    .bind(*batch.id.as_uuid())
    .bind(&batch.name)
    .bind(batch.status.as_str())
    .bind(batch.total_claims as i32)
    .bind(batch.total_amount.amount())
    .bind(batch.approved_amount.amount())
    .bind(batch.notes.as_deref())
    .bind(batch.submitted_at)
    .bind(batch.paid_at)
    .bind(batch.updated_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Replaces the stored item set with the batch's current one
async fn sync_items(
    tx: &mut Transaction<'_, Postgres>,
    batch: &ClaimBatch,
) -> Result<(), DatabaseError> {
    let keep: Vec<Uuid> = batch.items.iter().map(|i| *i.id.as_uuid()).collect();
    sqlx::query("DELETE FROM claim_batch_items WHERE batch_id = $1 AND id <> ALL($2)")
        .bind(*batch.id.as_uuid())
        .bind(&keep)
        .execute(&mut **tx)
        .await?;

    for item in &batch.items {
        sqlx::query(
            r#"
            INSERT INTO claim_batch_items (
                id, batch_id, claim_id, claim_amount, status,
                approved_amount, rejection_reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                approved_amount = EXCLUDED.approved_amount,
                rejection_reason = EXCLUDED.rejection_reason
            "#,
        )
        .bind(*item.id.as_uuid())
        .bind(*item.batch_id.as_uuid())
        .bind(*item.claim_id.as_uuid())
        .bind(item.claim_amount.amount())
        .bind(codec::batch_item_status_to_str(item.status))
        .bind(item.approved_amount.map(|m| m.amount()))
        .bind(item.rejection_reason.as_deref())
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Appends the history rows the store has not seen yet
async fn append_history(
    tx: &mut Transaction<'_, Postgres>,
    batch: &ClaimBatch,
    already_stored: usize,
) -> Result<(), DatabaseError> {
    for record in batch.status_history.iter().skip(already_stored) {
        sqlx::query(
            r#"
            INSERT INTO claim_batch_status_history (
                batch_id, previous_status, new_status, changed_by, notes, changed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*record.batch_id.as_uuid())
        .bind(record.previous_status.map(|s| s.as_str()))
        .bind(record.new_status.as_str())
        .bind(record.changed_by.map(|u| *u.as_uuid()))
        .bind(record.notes.as_deref())
        .bind(record.changed_at)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}
