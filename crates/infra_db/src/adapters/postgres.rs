//! PostgreSQL Ledger Adapter
//!
//! `PostgresLedgerAdapter` implements every storage port of the ledger
//! domain on one connection pool, so it can be handed to
//! [`LedgerPorts::from_store`](domain_ledger::LedgerPorts::from_store).
//!
//! # Error Handling
//!
//! Database errors are translated to `PortError` variants:
//! - unique violations (including `ux_ledger_entries_posted_key`) -> `Conflict`
//! - missing rows -> `NotFound`
//! - undecodable stored values -> `Transformation`
//!
//! ```rust,ignore
//! let adapter = Arc::new(PostgresLedgerAdapter::new(pool.clone()));
//! let outbox = Arc::new(PgInvoiceOutbox::new(pool));
//! let ports = LedgerPorts::from_store(adapter, outbox);
//! ```

use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, DebtorId, DomainPort, EntryId, HealthCheckResult, HealthCheckable, LeaseId,
    PortError, ResidenceId,
};
use domain_ledger::{
    Debtor, DebtorStore, EntryQuery, Lease, LeaseStore, LedgerStore, Payment, PaymentStore,
    ResidenceConfigStore, ResidencePaymentConfig, TransactionEntry,
};

use super::convert::{
    debtor_to_row, entry_to_row, payment_to_row, row_to_debtor, row_to_entry, row_to_lease,
    row_to_payment, row_to_residence_config,
};
use crate::repositories::{DebtorRepository, EntryFilter, LeaseRepository, LedgerRepository};

/// PostgreSQL-backed implementation of the ledger storage ports
#[derive(Debug, Clone)]
pub struct PostgresLedgerAdapter {
    ledger: LedgerRepository,
    debtors: DebtorRepository,
    leases: LeaseRepository,
    pool: PgPool,
}

impl PostgresLedgerAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self {
            ledger: LedgerRepository::new(pool.clone()),
            debtors: DebtorRepository::new(pool.clone()),
            leases: LeaseRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresLedgerAdapter {}

#[async_trait]
impl HealthCheckable for PostgresLedgerAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };

        HealthCheckResult {
            adapter_id: "postgres-ledger-adapter".to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

fn to_filter(query: &EntryQuery) -> EntryFilter {
    EntryFilter {
        debtor_id: query.debtor_id.map(Into::into),
        account_code: query.account_code.clone(),
        application_code: query.application_code.clone(),
        date_range: query.date_range.map(|range| (range.start, range.end)),
        include_deleted: query.include_deleted,
    }
}

#[async_trait]
impl LedgerStore for PostgresLedgerAdapter {
    #[instrument(skip(self, entry), fields(entry_id = %entry.id, kind = %entry.kind()))]
    async fn insert_entry(&self, entry: &TransactionEntry) -> Result<(), PortError> {
        let row = entry_to_row(entry)?;
        self.ledger.insert(&row).await?;
        debug!("ledger entry inserted");
        Ok(())
    }

    #[instrument(skip(self), fields(entry_id = %id))]
    async fn get_entry(&self, id: EntryId) -> Result<TransactionEntry, PortError> {
        let row = self.ledger.get(id.into()).await?;
        Ok(row_to_entry(row)?)
    }

    #[instrument(skip(self, query))]
    async fn find_entries(&self, query: &EntryQuery) -> Result<Vec<TransactionEntry>, PortError> {
        let rows = self.ledger.find(&to_filter(query)).await?;
        debug!(count = rows.len(), "ledger entries fetched");
        rows.into_iter()
            .map(|row| row_to_entry(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self, reason), fields(entry_id = %id))]
    async fn soft_delete(
        &self,
        id: EntryId,
        at: DateTime<Utc>,
        reason: &str,
    ) -> Result<TransactionEntry, PortError> {
        let row = self.ledger.soft_delete(id.into(), at, reason).await?;
        Ok(row_to_entry(row)?)
    }
}

#[async_trait]
impl DebtorStore for PostgresLedgerAdapter {
    #[instrument(skip(self), fields(debtor_id = %id))]
    async fn get_debtor(&self, id: DebtorId) -> Result<Debtor, PortError> {
        let row = self.debtors.get(id.into()).await?;
        Ok(row_to_debtor(row)?)
    }

    #[instrument(skip(self), fields(lease_id = %lease_id))]
    async fn find_by_lease(&self, lease_id: LeaseId) -> Result<Option<Debtor>, PortError> {
        match self.debtors.find_by_lease(lease_id.into()).await? {
            Some(row) => Ok(Some(row_to_debtor(row)?)),
            None => Ok(None),
        }
    }

    async fn list_debtors(&self) -> Result<Vec<Debtor>, PortError> {
        let rows = self.debtors.list().await?;
        rows.into_iter()
            .map(|row| row_to_debtor(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self, debtor), fields(debtor = %debtor.code))]
    async fn insert_debtor(&self, debtor: &Debtor) -> Result<(), PortError> {
        self.debtors.insert(&debtor_to_row(debtor)?).await?;
        debug!("debtor inserted");
        Ok(())
    }

    #[instrument(skip(self, debtor), fields(debtor = %debtor.code))]
    async fn save_debtor(&self, debtor: &Debtor) -> Result<(), PortError> {
        self.debtors.update(&debtor_to_row(debtor)?).await?;
        Ok(())
    }

    async fn count_debtors(&self) -> Result<u64, PortError> {
        Ok(self.debtors.count().await?)
    }
}

#[async_trait]
impl LeaseStore for PostgresLedgerAdapter {
    #[instrument(skip(self), fields(lease_id = %id))]
    async fn get_lease(&self, id: LeaseId) -> Result<Lease, PortError> {
        let row = self.leases.get_lease(id.into()).await?;
        Ok(row_to_lease(row)?)
    }
}

#[async_trait]
impl PaymentStore for PostgresLedgerAdapter {
    #[instrument(skip(self), fields(debtor_id = %debtor_id))]
    async fn payments_for_debtor(&self, debtor_id: DebtorId) -> Result<Vec<Payment>, PortError> {
        let rows = self.leases.payments_for_debtor(debtor_id.into()).await?;
        rows.into_iter()
            .map(|row| row_to_payment(row).map_err(PortError::from))
            .collect()
    }

    #[instrument(skip(self, payment), fields(payment_id = %payment.id))]
    async fn record_payment(&self, payment: &Payment) -> Result<(), PortError> {
        self.leases.insert_payment(&payment_to_row(payment)?).await?;
        Ok(())
    }
}

#[async_trait]
impl ResidenceConfigStore for PostgresLedgerAdapter {
    async fn get_config(
        &self,
        residence_id: ResidenceId,
    ) -> Result<Option<ResidencePaymentConfig>, PortError> {
        match self.leases.get_residence_config(residence_id.into()).await? {
            Some(row) => Ok(Some(row_to_residence_config(row)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use core_kernel::DateRange;

    #[test]
    fn test_query_maps_to_filter() {
        let debtor_id = DebtorId::new();
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
        )
        .unwrap();
        let query = EntryQuery {
            debtor_id: Some(debtor_id),
            account_code: Some("1100-abc".to_string()),
            application_code: None,
            date_range: Some(range),
            include_deleted: false,
        };

        let filter = to_filter(&query);
        assert_eq!(filter.debtor_id, Some(*debtor_id.as_uuid()));
        assert_eq!(filter.account_code.as_deref(), Some("1100-abc"));
        assert_eq!(filter.date_range, Some((range.start, range.end)));
        assert!(!filter.include_deleted);
    }
}
