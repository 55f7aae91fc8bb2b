//! Debtor read-model repository

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DatabaseError;

const DEBTOR_COLUMNS: &str = "debtor_id, code, tenant_id, tenant_name, lease_id, \
     application_code, residence_id, residence_name, room, receivable_account, monthly_rent, \
     lease_start, lease_end, billing_cycle, total_owed, total_paid, current_balance, history, \
     last_reconciled_at, created_at";

/// A row of `debtors`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DebtorRow {
    pub debtor_id: Uuid,
    pub code: String,
    pub tenant_id: Option<Uuid>,
    pub tenant_name: String,
    pub lease_id: Uuid,
    pub application_code: String,
    pub residence_id: Uuid,
    pub residence_name: String,
    pub room: Option<String>,
    pub receivable_account: String,
    pub monthly_rent: Decimal,
    pub lease_start: NaiveDate,
    pub lease_end: NaiveDate,
    pub billing_cycle: String,
    pub total_owed: Decimal,
    pub total_paid: Decimal,
    pub current_balance: Decimal,
    pub history: Value,
    pub last_reconciled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DebtorRepository {
    pool: PgPool,
}

impl DebtorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, debtor_id: Uuid) -> Result<DebtorRow, DatabaseError> {
        sqlx::query_as::<_, DebtorRow>(&format!(
            "SELECT {} FROM debtors WHERE debtor_id = $1",
            DEBTOR_COLUMNS
        ))
        .bind(debtor_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Debtor", debtor_id))
    }

    pub async fn find_by_lease(&self, lease_id: Uuid) -> Result<Option<DebtorRow>, DatabaseError> {
        let row = sqlx::query_as::<_, DebtorRow>(&format!(
            "SELECT {} FROM debtors WHERE lease_id = $1",
            DEBTOR_COLUMNS
        ))
        .bind(lease_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// All debtors ordered by display code
    pub async fn list(&self) -> Result<Vec<DebtorRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, DebtorRow>(&format!(
            "SELECT {} FROM debtors ORDER BY code",
            DEBTOR_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count(&self) -> Result<u64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM debtors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Inserts a debtor; a second debtor for the same lease is a duplicate
    pub async fn insert(&self, row: &DebtorRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO debtors (
                debtor_id, code, tenant_id, tenant_name, lease_id, application_code,
                residence_id, residence_name, room, receivable_account, monthly_rent,
                lease_start, lease_end, billing_cycle, total_owed, total_paid, current_balance,
                history, last_reconciled_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                    $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            "#,
        )
        .bind(row.debtor_id)
        .bind(&row.code)
        .bind(row.tenant_id)
        .bind(&row.tenant_name)
        .bind(row.lease_id)
        .bind(&row.application_code)
        .bind(row.residence_id)
        .bind(&row.residence_name)
        .bind(&row.room)
        .bind(&row.receivable_account)
        .bind(row.monthly_rent)
        .bind(row.lease_start)
        .bind(row.lease_end)
        .bind(&row.billing_cycle)
        .bind(row.total_owed)
        .bind(row.total_paid)
        .bind(row.current_balance)
        .bind(&row.history)
        .bind(row.last_reconciled_at)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Overwrites the mutable columns of an existing debtor
    pub async fn update(&self, row: &DebtorRow) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            r#"
            UPDATE debtors SET
                tenant_id = $2,
                tenant_name = $3,
                residence_name = $4,
                room = $5,
                monthly_rent = $6,
                lease_start = $7,
                lease_end = $8,
                billing_cycle = $9,
                total_owed = $10,
                total_paid = $11,
                current_balance = $12,
                history = $13,
                last_reconciled_at = $14
            WHERE debtor_id = $1
            "#,
        )
        .bind(row.debtor_id)
        .bind(row.tenant_id)
        .bind(&row.tenant_name)
        .bind(&row.residence_name)
        .bind(&row.room)
        .bind(row.monthly_rent)
        .bind(row.lease_start)
        .bind(row.lease_end)
        .bind(&row.billing_cycle)
        .bind(row.total_owed)
        .bind(row.total_paid)
        .bind(row.current_balance)
        .bind(&row.history)
        .bind(row.last_reconciled_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Debtor", row.debtor_id));
        }
        Ok(())
    }
}
