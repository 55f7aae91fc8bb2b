//! Invoice request outbox adapter
//!
//! Emitting an invoice queues a row in `invoice_requests`. Re-emitting the
//! same record is a no-op, so a retried backfill never double-bills.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, InvoiceRequestId, PortError};
use domain_ledger::{Debtor, InvoiceEmitter, TransactionEntry};

use super::convert::invoice_amount;
use crate::repositories::{InvoiceRepository, InvoiceRequestRow};

#[derive(Debug, Clone)]
pub struct PgInvoiceOutbox {
    repository: InvoiceRepository,
}

impl PgInvoiceOutbox {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: InvoiceRepository::new(pool),
        }
    }
}

impl DomainPort for PgInvoiceOutbox {}

#[async_trait]
impl InvoiceEmitter for PgInvoiceOutbox {
    #[instrument(skip(self, entry, debtor), fields(entry_id = %entry.id, debtor = %debtor.code))]
    async fn emit(&self, entry: &TransactionEntry, debtor: &Debtor) -> Result<(), PortError> {
        let row = InvoiceRequestRow {
            request_id: InvoiceRequestId::new().into(),
            entry_id: entry.id.into(),
            debtor_id: debtor.id.into(),
            debtor_code: debtor.code.clone(),
            amount: invoice_amount(entry),
            accrual_date: entry.date,
            description: entry.description.clone(),
            status: "pending".to_string(),
            requested_at: Utc::now(),
        };

        let queued = self.repository.enqueue(&row).await?;
        debug!(queued, "invoice request recorded");
        Ok(())
    }
}
