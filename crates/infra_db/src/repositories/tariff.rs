//! Tariff repository
//!
//! Loads the pricing reference data (plan tariffs, scheme tariff masters,
//! item mappings) and maintains them. The hot path is
//! [`TariffRepository::load_resolver`], which pulls everything one plan
//! needs into an in-memory [`TariffResolver`] for a billing pass.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{Currency, EffectiveWindow, Money, PlanId, TariffId};
use domain_tariff::scheme::check_unique_mapping;
use domain_tariff::{GdrgTariff, InsuranceTariff, NhisItemMapping, NhisTariff, TariffResolver};

use crate::error::DatabaseError;
use crate::repositories::codec;

#[derive(Debug, FromRow)]
struct PlanTariffRow {
    id: Uuid,
    plan_id: Uuid,
    item_type: String,
    item_code: String,
    insurance_tariff: Decimal,
    effective_from: Option<NaiveDate>,
    effective_to: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct NhisTariffRow {
    id: Uuid,
    nhis_code: String,
    description: String,
    price: Decimal,
    effective_from: Option<NaiveDate>,
    effective_to: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct GdrgTariffRow {
    id: Uuid,
    gdrg_code: String,
    description: String,
    price: Decimal,
    specialty: Option<String>,
    effective_from: Option<NaiveDate>,
    effective_to: Option<NaiveDate>,
}

#[derive(Debug, FromRow)]
struct MappingRow {
    id: Uuid,
    item_type: String,
    item_id: Uuid,
    scheme_code: String,
}

fn window(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<EffectiveWindow, DatabaseError> {
    EffectiveWindow::new(from, to).map_err(|e| DatabaseError::DomainRule(e.to_string()))
}

/// Repository for pricing reference data
#[derive(Debug, Clone)]
pub struct TariffRepository {
    pool: PgPool,
    currency: Currency,
}

impl TariffRepository {
    pub fn new(pool: PgPool, currency: Currency) -> Self {
        Self { pool, currency }
    }

    /// Loads the full pricing context for one plan
    pub async fn load_resolver(&self, plan_id: PlanId) -> Result<TariffResolver, DatabaseError> {
        let mut resolver = TariffResolver::new(self.currency);
        resolver.plan_tariffs = self.find_plan_tariffs(plan_id).await?;
        resolver.nhis_tariffs = self.find_nhis_tariffs().await?;
        resolver.gdrg_tariffs = self.find_gdrg_tariffs().await?;
        resolver.mappings = self.find_mappings().await?;
        Ok(resolver)
    }

    /// Plan-negotiated tariffs for one plan
    pub async fn find_plan_tariffs(&self, plan_id: PlanId) -> Result<Vec<InsuranceTariff>, DatabaseError> {
        let rows = sqlx::query_as::<_, PlanTariffRow>(
            r#"
            SELECT id, plan_id, item_type, item_code, insurance_tariff,
                   effective_from, effective_to
            FROM insurance_tariffs
            WHERE plan_id = $1
            ORDER BY item_type, item_code, effective_from NULLS FIRST
            "#,
        )
        .bind(*plan_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(InsuranceTariff {
                    id: TariffId::from_uuid(r.id),
                    plan_id: PlanId::from_uuid(r.plan_id),
                    item_type: codec::parse_item_type(&r.item_type)?,
                    item_code: r.item_code,
                    insurance_tariff: Money::new(r.insurance_tariff, self.currency),
                    effective_window: window(r.effective_from, r.effective_to)?,
                })
            })
            .collect()
    }

    /// The NHIS medicines-list tariff master
    pub async fn find_nhis_tariffs(&self) -> Result<Vec<NhisTariff>, DatabaseError> {
        let rows = sqlx::query_as::<_, NhisTariffRow>(
            r#"
            SELECT id, nhis_code, description, price, effective_from, effective_to
            FROM nhis_tariffs
            ORDER BY nhis_code, effective_from NULLS FIRST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(NhisTariff {
                    id: TariffId::from_uuid(r.id),
                    nhis_code: r.nhis_code,
                    description: r.description,
                    price: Money::new(r.price, self.currency),
                    effective_window: window(r.effective_from, r.effective_to)?,
                })
            })
            .collect()
    }

    /// The G-DRG service tariff master
    pub async fn find_gdrg_tariffs(&self) -> Result<Vec<GdrgTariff>, DatabaseError> {
        let rows = sqlx::query_as::<_, GdrgTariffRow>(
            r#"
            SELECT id, gdrg_code, description, price, specialty, effective_from, effective_to
            FROM gdrg_tariffs
            ORDER BY gdrg_code, effective_from NULLS FIRST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(GdrgTariff {
                    id: TariffId::from_uuid(r.id),
                    gdrg_code: r.gdrg_code,
                    description: r.description,
                    price: Money::new(r.price, self.currency),
                    specialty: r.specialty,
                    effective_window: window(r.effective_from, r.effective_to)?,
                })
            })
            .collect()
    }

    /// All item-to-scheme-code mappings
    pub async fn find_mappings(&self) -> Result<Vec<NhisItemMapping>, DatabaseError> {
        let rows = sqlx::query_as::<_, MappingRow>(
            "SELECT id, item_type, item_id, scheme_code FROM nhis_item_mappings",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(NhisItemMapping {
                    id: r.id.into(),
                    item_type: codec::parse_item_type(&r.item_type)?,
                    item_id: r.item_id,
                    scheme_code: r.scheme_code,
                })
            })
            .collect()
    }

    /// Inserts a plan tariff entry
    pub async fn create_plan_tariff(&self, tariff: &InsuranceTariff) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO insurance_tariffs (
                id, plan_id, item_type, item_code, insurance_tariff,
                effective_from, effective_to
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(*tariff.id.as_uuid())
        .bind(*tariff.plan_id.as_uuid())
        .bind(tariff.item_type.as_str())
        .bind(&tariff.item_code)
        .bind(tariff.insurance_tariff.amount())
        .bind(tariff.effective_window.from)
        .bind(tariff.effective_window.to)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Creates an item-to-scheme-code mapping, enforcing one mapping per
    /// item inside the write transaction
    pub async fn create_mapping(&self, mapping: &NhisItemMapping) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let rows = sqlx::query_as::<_, MappingRow>(
            r#"
            SELECT id, item_type, item_id, scheme_code
            FROM nhis_item_mappings
            WHERE item_type = $1 AND item_id = $2
            FOR UPDATE
            "#,
        )
        .bind(mapping.item_type.as_str())
        .bind(mapping.item_id)
        .fetch_all(&mut *tx)
        .await?;

        let existing: Vec<NhisItemMapping> = rows
            .into_iter()
            .map(|r| {
                Ok(NhisItemMapping {
                    id: r.id.into(),
                    item_type: codec::parse_item_type(&r.item_type)?,
                    item_id: r.item_id,
                    scheme_code: r.scheme_code,
                })
            })
            .collect::<Result<_, DatabaseError>>()?;
        check_unique_mapping(&existing, mapping)
            .map_err(|e| DatabaseError::DuplicateEntry(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO nhis_item_mappings (id, item_type, item_id, scheme_code)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(*mapping.id.as_uuid())
        .bind(mapping.item_type.as_str())
        .bind(mapping.item_id)
        .bind(&mapping.scheme_code)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}
