//! Repository implementations for the ledger tables
//!
//! Repositories own the SQL and map rows to plain row structs. Translation
//! into domain types happens in [`crate::adapters`].

pub mod ledger;
pub mod debtors;
pub mod leases;
pub mod invoices;

pub use ledger::{EntryFilter, EntryRow, LedgerRepository};
pub use debtors::{DebtorRepository, DebtorRow};
pub use leases::{LeaseRepository, LeaseRow, PaymentRow, ResidenceConfigRow};
pub use invoices::{InvoiceRepository, InvoiceRequestRow};
