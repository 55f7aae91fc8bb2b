//! Port adapters
//!
//! Implementations of the ledger domain ports on PostgreSQL. Each adapter
//! delegates SQL to [`crate::repositories`] and converts rows to domain types
//! in one place.

mod convert;
pub mod outbox;
pub mod postgres;

pub use outbox::PgInvoiceOutbox;
pub use postgres::PostgresLedgerAdapter;
