//! Adapters shipped with the domain crate
//!
//! - **memory**: `tokio::sync::RwLock`-backed stores and a recording invoice
//!   emitter, used by tests and dry runs. PostgreSQL adapters live in `infra_db`.

pub mod memory;

pub use memory::{InMemoryStore, RecordingInvoiceEmitter};
