//! Ledger Domain Ports
//!
//! Storage and delivery interfaces the accrual engine depends on. The engine
//! only ever holds `Arc<dyn Port>`; adapters are chosen at startup:
//!
//! - **In-memory**: [`crate::adapters::memory`], for tests and dry runs
//! - **PostgreSQL**: `infra_db`
//!
//! # Uniqueness contract
//!
//! `LedgerStore::insert_entry` must reject a second posted record with the
//! same (debtor, correlation key) with `PortError::Conflict`. The engine
//! serializes writes per debtor as well, but the store is the final guard.
//!
//! ```rust,ignore
//! let ports = LedgerPorts::from_store(store.clone(), emitter.clone());
//! let engine = AccrualEngine::new(directory, config, ports, clock);
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use core_kernel::{DateRange, DebtorId, DomainPort, EntryId, LeaseId, PortError, ResidenceId};

use crate::debtor::Debtor;
use crate::entry::TransactionEntry;
use crate::lease::{Lease, Payment, ResidencePaymentConfig};

/// Candidate lookup for ledger records
///
/// A record matches when ANY of the set keys match (debtor, receivable
/// account, application code). `date_range`, when set, further restricts the
/// result. Soft-deleted records are excluded unless `include_deleted`.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    pub debtor_id: Option<DebtorId>,
    pub account_code: Option<String>,
    pub application_code: Option<String>,
    pub date_range: Option<DateRange>,
    pub include_deleted: bool,
}

impl EntryQuery {
    /// Every record that could belong to the debtor
    pub fn for_debtor(debtor: &Debtor) -> Self {
        Self {
            debtor_id: Some(debtor.id),
            account_code: Some(debtor.receivable_account.clone()),
            application_code: Some(debtor.application_code.clone()),
            ..Default::default()
        }
    }

    pub fn within(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    /// Evaluates the query against a record
    pub fn matches(&self, entry: &TransactionEntry) -> bool {
        if !self.include_deleted && !entry.is_posted() {
            return false;
        }
        if let Some(range) = &self.date_range {
            if !range.contains(entry.date) {
                return false;
            }
        }

        let by_debtor = self.debtor_id.is_some_and(|id| {
            entry.debtor_id() == Some(id) || entry.metadata.debtor_id == Some(id)
        });
        let by_account = self
            .account_code
            .as_deref()
            .is_some_and(|code| entry.touches_account(code));
        let by_application = self.application_code.as_deref().is_some_and(|code| {
            entry.metadata.application_code.as_deref() == Some(code)
        });

        let keyed = self.debtor_id.is_some()
            || self.account_code.is_some()
            || self.application_code.is_some();
        !keyed || by_debtor || by_account || by_application
    }
}

/// Ledger record storage
#[async_trait]
pub trait LedgerStore: DomainPort {
    /// Persists a posted record
    ///
    /// # Returns
    ///
    /// `PortError::Conflict` if a posted record with the same debtor and
    /// correlation key already exists.
    async fn insert_entry(&self, entry: &TransactionEntry) -> Result<(), PortError>;

    async fn get_entry(&self, id: EntryId) -> Result<TransactionEntry, PortError>;

    async fn find_entries(&self, query: &EntryQuery) -> Result<Vec<TransactionEntry>, PortError>;

    /// Soft-deletes a record and returns it in its deleted state
    async fn soft_delete(
        &self,
        id: EntryId,
        at: DateTime<Utc>,
        reason: &str,
    ) -> Result<TransactionEntry, PortError>;
}

/// Debtor read model storage
#[async_trait]
pub trait DebtorStore: DomainPort {
    async fn get_debtor(&self, id: DebtorId) -> Result<Debtor, PortError>;

    async fn find_by_lease(&self, lease_id: LeaseId) -> Result<Option<Debtor>, PortError>;

    async fn list_debtors(&self) -> Result<Vec<Debtor>, PortError>;

    /// Inserts a new debtor; `Conflict` if the lease already has one
    async fn insert_debtor(&self, debtor: &Debtor) -> Result<(), PortError>;

    /// Overwrites an existing debtor
    async fn save_debtor(&self, debtor: &Debtor) -> Result<(), PortError>;

    async fn count_debtors(&self) -> Result<u64, PortError>;
}

/// Read-only lease source
#[async_trait]
pub trait LeaseStore: DomainPort {
    async fn get_lease(&self, id: LeaseId) -> Result<Lease, PortError>;
}

#[async_trait]
pub trait PaymentStore: DomainPort {
    async fn payments_for_debtor(&self, debtor_id: DebtorId) -> Result<Vec<Payment>, PortError>;

    async fn record_payment(&self, payment: &Payment) -> Result<(), PortError>;
}

/// Read-only residence payment settings; absence is not an error
#[async_trait]
pub trait ResidenceConfigStore: DomainPort {
    async fn get_config(
        &self,
        residence_id: ResidenceId,
    ) -> Result<Option<ResidencePaymentConfig>, PortError>;
}

/// Downstream invoice delivery
#[async_trait]
pub trait InvoiceEmitter: DomainPort {
    async fn emit(&self, entry: &TransactionEntry, debtor: &Debtor) -> Result<(), PortError>;
}

/// The set of ports the engine is wired with
#[derive(Clone)]
pub struct LedgerPorts {
    pub ledger: Arc<dyn LedgerStore>,
    pub debtors: Arc<dyn DebtorStore>,
    pub leases: Arc<dyn LeaseStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub residences: Arc<dyn ResidenceConfigStore>,
    pub invoices: Arc<dyn InvoiceEmitter>,
}

impl LedgerPorts {
    /// Wires every storage port to one store implementing all of them
    pub fn from_store<S>(store: Arc<S>, invoices: Arc<dyn InvoiceEmitter>) -> Self
    where
        S: LedgerStore + DebtorStore + LeaseStore + PaymentStore + ResidenceConfigStore + 'static,
    {
        Self {
            ledger: store.clone(),
            debtors: store.clone(),
            leases: store.clone(),
            payments: store.clone(),
            residences: store,
            invoices,
        }
    }
}
