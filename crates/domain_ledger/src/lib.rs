//! Ledger Domain - Rental income accruals on a double-entry ledger
//!
//! Each approved lease gets one debtor with its own receivable sub-account.
//! Rent is recognised on the ledger as it accrues:
//! - one lease-start record covering the (prorated) first month, the admin
//!   fee and the security deposit
//! - one record per subsequent billing period, never in advance
//!
//! Records are idempotent per (debtor, correlation key). Derived debtor
//! totals are rebuilt from posted records and confirmed payments by the
//! reconciler, so they are always safe to recompute.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{AccrualEngine, BackfillOrchestrator, GenerationMode};
//!
//! let debtor = engine.open_debtor(lease_id).await?;
//! let report = BackfillOrchestrator::new(engine.clone())
//!     .run(debtor.id, GenerationMode::Manual)
//!     .await?;
//! ```

pub mod account;
pub mod adapters;
pub mod auditor;
pub mod backfill;
pub mod billing_period;
pub mod config;
pub mod debtor;
pub mod engine;
pub mod entry;
pub mod error;
pub mod generator;
pub mod lease;
pub mod ports;
pub mod reconciler;
pub mod resolver;

pub use account::{Account, AccountCategory, AccountDirectory, AccountRole, AccountType};
pub use adapters::{InMemoryStore, RecordingInvoiceEmitter};
pub use auditor::{
    AccrualFailure, AuditOptions, AuditReport, MonthDiagnosis, MonthVerdict, TenantAccrualAuditor,
    TenantAuditResult,
};
pub use backfill::{BackfillOrchestrator, BackfillReport, GenerationMode};
pub use billing_period::{BillingCycle, BillingPeriod, Proration, ProrationMethod, ProrationPolicy};
pub use config::{AccountCodes, AccrualConfig, LegacyAdminFee};
pub use debtor::{Debtor, DebtorHistory, DebtorState, DebtorTotals};
pub use engine::{AccrualContext, AccrualEngine, AccrualOutcome, AccrualResult};
pub use entry::{
    CorrelationKey, EntryBuilder, EntryKind, EntryMetadata, EntryStatus, LineItem, Source,
    SourceTag, TransactionEntry,
};
pub use error::{FailureKind, LedgerError};
pub use generator::{AccrualGenerator, AccrualRequest, LeaseStartCharges};
pub use lease::{
    ChargeMode, FeeRule, Lease, LeaseStatus, Payment, PaymentStatus, ResidencePaymentConfig,
};
pub use ports::{
    DebtorStore, EntryQuery, InvoiceEmitter, LeaseStore, LedgerPorts, LedgerStore, PaymentStore,
    ResidenceConfigStore,
};
pub use resolver::{
    CorrelationQuery, CorrelationResolver, EntryMatcher, Resolution, ResolutionOutcome,
};
