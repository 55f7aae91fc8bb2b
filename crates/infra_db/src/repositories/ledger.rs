//! Ledger record repository
//!
//! Records are append-only. The only mutation is the soft delete, which flips
//! `status` and frees the (receivable owner, correlation key) slot held by the
//! partial unique index `ux_ledger_entries_posted_key`.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::DatabaseError;

const ENTRY_COLUMNS: &str = "entry_id, entry_date, description, lines, source_tag, source, kind, \
     status, debtor_id, receivable_owner, application_code, correlation_key, metadata, created_at, \
     created_by, deleted_at, deleted_reason";

/// A row of `ledger_entries`
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EntryRow {
    pub entry_id: Uuid,
    pub entry_date: NaiveDate,
    pub description: String,
    pub lines: Value,
    pub source_tag: String,
    pub source: Value,
    pub kind: String,
    pub status: String,
    pub debtor_id: Option<Uuid>,
    /// Debtor whose correlation slot the record occupies
    pub receivable_owner: Option<Uuid>,
    pub application_code: Option<String>,
    pub correlation_key: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_reason: Option<String>,
}

/// Candidate filter; keys are ORed, the date range is ANDed
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub debtor_id: Option<Uuid>,
    pub account_code: Option<String>,
    pub application_code: Option<String>,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub include_deleted: bool,
}

impl EntryFilter {
    fn is_keyed(&self) -> bool {
        self.debtor_id.is_some() || self.account_code.is_some() || self.application_code.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a posted record
    ///
    /// # Errors
    ///
    /// `DatabaseError::DuplicateEntry` when the debtor already has a posted
    /// record under the same correlation key.
    pub async fn insert(&self, row: &EntryRow) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                entry_id, entry_date, description, lines, source_tag, source, kind, status,
                debtor_id, receivable_owner, application_code, correlation_key, metadata,
                created_at, created_by, deleted_at, deleted_reason
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(row.entry_id)
        .bind(row.entry_date)
        .bind(&row.description)
        .bind(&row.lines)
        .bind(&row.source_tag)
        .bind(&row.source)
        .bind(&row.kind)
        .bind(&row.status)
        .bind(row.debtor_id)
        .bind(row.receivable_owner)
        .bind(&row.application_code)
        .bind(&row.correlation_key)
        .bind(&row.metadata)
        .bind(row.created_at)
        .bind(&row.created_by)
        .bind(row.deleted_at)
        .bind(&row.deleted_reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, entry_id: Uuid) -> Result<EntryRow, DatabaseError> {
        sqlx::query_as::<_, EntryRow>(&format!(
            "SELECT {} FROM ledger_entries WHERE entry_id = $1",
            ENTRY_COLUMNS
        ))
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("LedgerEntry", entry_id))
    }

    /// Returns matching records in insertion order
    pub async fn find(&self, filter: &EntryFilter) -> Result<Vec<EntryRow>, DatabaseError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM ledger_entries WHERE TRUE", ENTRY_COLUMNS));

        if !filter.include_deleted {
            qb.push(" AND status = 'posted'");
        }
        if let Some((start, end)) = filter.date_range {
            qb.push(" AND entry_date BETWEEN ")
                .push_bind(start)
                .push(" AND ")
                .push_bind(end);
        }
        if filter.is_keyed() {
            qb.push(" AND (FALSE");
            if let Some(debtor_id) = filter.debtor_id {
                qb.push(" OR debtor_id = ").push_bind(debtor_id);
                qb.push(" OR metadata->>'debtor_id' = ").push_bind(debtor_id.to_string());
            }
            if let Some(code) = &filter.account_code {
                qb.push(" OR lines @> ")
                    .push_bind(serde_json::json!([{ "account_code": code }]));
            }
            if let Some(code) = &filter.application_code {
                qb.push(" OR application_code = ").push_bind(code.clone());
            }
            qb.push(")");
        }
        qb.push(" ORDER BY created_at, entry_id");

        let rows = qb.build_query_as::<EntryRow>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Marks a posted record deleted and returns the updated row
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown id, `ConstraintViolation` if the record was
    /// already deleted.
    pub async fn soft_delete(
        &self,
        entry_id: Uuid,
        at: DateTime<Utc>,
        reason: &str,
    ) -> Result<EntryRow, DatabaseError> {
        let updated = sqlx::query_as::<_, EntryRow>(&format!(
            r#"
            UPDATE ledger_entries
            SET status = 'deleted', deleted_at = $2, deleted_reason = $3
            WHERE entry_id = $1 AND status = 'posted'
            RETURNING {}
            "#,
            ENTRY_COLUMNS
        ))
        .bind(entry_id)
        .bind(at)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Ok(row),
            None => {
                // Distinguish a missing record from a repeated delete
                self.get(entry_id).await?;
                Err(DatabaseError::ConstraintViolation(format!(
                    "ledger entry {} is already deleted",
                    entry_id
                )))
            }
        }
    }
}
