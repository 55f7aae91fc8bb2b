//! Accrual Runner
//!
//! Library half of the `accrual-sweep` binary: configuration loading, logging
//! setup, argument parsing and command execution. The binary only wires the
//! PostgreSQL adapters into an [`AccrualEngine`](domain_ledger::AccrualEngine)
//! and prints the JSON report a command returns.

pub mod cli;
pub mod config;
pub mod runner;
pub mod telemetry;

pub use cli::{Command, USAGE};
pub use config::{LogFormat, RunnerConfig};
pub use runner::Runner;
pub use telemetry::init_tracing;
