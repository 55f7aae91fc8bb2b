//! Lease, payment and residence settings repository
//!
//! Leases and residence settings are owned by the lettings system; this
//! crate only reads them. Payments are written by the receipting flow.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaseRow {
    pub lease_id: Uuid,
    pub application_code: String,
    pub tenant_id: Option<Uuid>,
    pub tenant_name: String,
    pub residence_id: Uuid,
    pub residence_name: String,
    pub room: Option<String>,
    pub monthly_rent: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub billing_cycle: String,
    pub status: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub debtor_id: Uuid,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub allocated_month: Option<String>,
    pub status: String,
    pub reference: Option<String>,
}

/// Fee rules are stored as JSON documents; NULL means "not configured"
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ResidenceConfigRow {
    pub residence_id: Uuid,
    pub admin_fee: Option<Value>,
    pub deposit: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct LeaseRepository {
    pool: PgPool,
}

impl LeaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_lease(&self, lease_id: Uuid) -> Result<LeaseRow, DatabaseError> {
        sqlx::query_as::<_, LeaseRow>(
            r#"
            SELECT lease_id, application_code, tenant_id, tenant_name, residence_id, residence_name,
                   room, monthly_rent, start_date, end_date, billing_cycle, status
            FROM leases
            WHERE lease_id = $1
            "#,
        )
        .bind(lease_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Lease", lease_id))
    }

    pub async fn get_residence_config(
        &self,
        residence_id: Uuid,
    ) -> Result<Option<ResidenceConfigRow>, DatabaseError> {
        let row = sqlx::query_as::<_, ResidenceConfigRow>(
            "SELECT residence_id, admin_fee, deposit FROM residence_payment_configs \
             WHERE residence_id = $1",
        )
        .bind(residence_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Payments for a debtor, oldest first
    pub async fn payments_for_debtor(
        &self,
        debtor_id: Uuid,
    ) -> Result<Vec<PaymentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT payment_id, debtor_id, amount, payment_date, allocated_month, status, reference
            FROM payments
            WHERE debtor_id = $1
            ORDER BY payment_date, payment_id
            "#,
        )
        .bind(debtor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn insert_payment(&self, row: &PaymentRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO payments
                (payment_id, debtor_id, amount, payment_date, allocated_month, status, reference)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(row.payment_id)
        .bind(row.debtor_id)
        .bind(row.amount)
        .bind(row.payment_date)
        .bind(&row.allocated_month)
        .bind(&row.status)
        .bind(&row.reference)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
