//! Core Kernel - Foundational types for the rental accrual ledger
//!
//! This crate provides the building blocks shared by the ledger domain and its adapters:
//! - Money with precise decimal arithmetic (single currency)
//! - Month keys, date ranges and clocks for period attribution
//! - Strongly-typed identifiers
//! - The error type every storage port reports through

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, MoneyError, Rate};
pub use temporal::{Clock, DateRange, FixedClock, MonthKey, SystemClock, TemporalError, Timezone};
pub use identifiers::{
    DebtorId, TenantId, LeaseId, ResidenceId, EntryId, PaymentId, InvoiceRequestId,
};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
pub use error::CoreError;
