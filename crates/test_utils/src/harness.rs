//! Engine harness
//!
//! Wires an `AccrualEngine` to one `InMemoryStore`, a recording invoice
//! emitter and a fixed clock, so scenario tests read as "given these leases
//! and records, on this day".

use std::sync::Arc;

use chrono::NaiveDate;
use core_kernel::{FixedClock, LeaseId};
use domain_ledger::{
    AccrualConfig, AccrualEngine, BackfillOrchestrator, Debtor, InMemoryStore, Lease, LedgerPorts,
    RecordingInvoiceEmitter, TenantAccrualAuditor,
};

pub struct LedgerHarness {
    pub store: Arc<InMemoryStore>,
    pub invoices: Arc<RecordingInvoiceEmitter>,
    pub engine: Arc<AccrualEngine>,
}

impl LedgerHarness {
    /// Default configuration, clock fixed at noon UTC on `today`
    pub fn on(today: NaiveDate) -> Self {
        Self::with_config(today, AccrualConfig::default())
    }

    pub fn with_config(today: NaiveDate, config: AccrualConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let invoices = Arc::new(RecordingInvoiceEmitter::new());
        let ports = LedgerPorts::from_store(store.clone(), invoices.clone());
        let engine =
            Arc::new(AccrualEngine::standard(config, ports, Arc::new(FixedClock::on(today))));
        Self {
            store,
            invoices,
            engine,
        }
    }

    /// Stores the lease and opens its debtor
    pub async fn open(&self, lease: Lease) -> Debtor {
        let lease_id: LeaseId = lease.id;
        self.store.insert_lease(lease).await;
        self.engine.open_debtor(lease_id).await.unwrap()
    }

    pub fn auditor(&self) -> TenantAccrualAuditor {
        TenantAccrualAuditor::new(self.engine.clone())
    }

    pub fn backfill(&self) -> BackfillOrchestrator {
        BackfillOrchestrator::new(self.engine.clone())
    }
}
