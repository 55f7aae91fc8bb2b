//! Invoice request outbox
//!
//! One pending request per ledger record; the invoicing service drains rows
//! with `status = 'pending'`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct InvoiceRequestRow {
    pub request_id: Uuid,
    pub entry_id: Uuid,
    pub debtor_id: Uuid,
    pub debtor_code: String,
    pub amount: Decimal,
    pub accrual_date: NaiveDate,
    pub description: String,
    pub status: String,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Queues a request; returns `false` if the record was already queued
    pub async fn enqueue(&self, row: &InvoiceRequestRow) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO invoice_requests (
                request_id, entry_id, debtor_id, debtor_code, amount, accrual_date,
                description, status, requested_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (entry_id) DO NOTHING
            "#,
        )
        .bind(row.request_id)
        .bind(row.entry_id)
        .bind(row.debtor_id)
        .bind(&row.debtor_code)
        .bind(row.amount)
        .bind(row.accrual_date)
        .bind(&row.description)
        .bind(&row.status)
        .bind(row.requested_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
