//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the rental accrual ledger, built on SQLx.
//!
//! # Layout
//!
//! - [`repositories`]: SQL and row types, one repository per table group
//! - [`adapters`]: the ledger domain ports implemented over the repositories
//! - [`pool`]: connection pool setup and embedded migrations
//!
//! The partial unique index on `(receivable_owner, correlation_key)` for posted
//! records is the storage-level guard against duplicate accruals.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{
//!     create_pool, run_migrations, DatabaseConfig, PgInvoiceOutbox, PostgresLedgerAdapter,
//! };
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/rental_ledger")).await?;
//! run_migrations(&pool).await?;
//! let store = Arc::new(PostgresLedgerAdapter::new(pool.clone()));
//! let ports = LedgerPorts::from_store(store, Arc::new(PgInvoiceOutbox::new(pool)));
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;
mod codec;

pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
pub use error::DatabaseError;
pub use adapters::{PgInvoiceOutbox, PostgresLedgerAdapter};
