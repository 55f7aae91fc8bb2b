//! Rental accrual sweep binary
//!
//! # Usage
//!
//! ```bash
//! ACCRUAL_DATABASE_URL=postgres://... accrual-sweep audit --dry-run
//! accrual-sweep backfill DR-7f1c... bulk
//! accrual-sweep diagnose DR-7f1c... 2025-07
//! ```
//!
//! # Environment Variables
//!
//! * `ACCRUAL_DATABASE_URL` - PostgreSQL connection string
//! * `ACCRUAL_MAX_CONNECTIONS` - Pool size (default: 5)
//! * `ACCRUAL_LOG_LEVEL` - Default log filter (default: info); `RUST_LOG` wins
//! * `ACCRUAL_LOG_FORMAT` - `text` or `json`
//! * `ACCRUAL_RUN_MIGRATIONS` - Apply bundled migrations first
//! * `ACCRUAL_ACCRUAL__TIMEZONE` - Business timezone, e.g. `Africa/Johannesburg`
//! * `ACCRUAL_ACCRUAL__SWEEP_WINDOW_MONTHS` - Months after lease end a debtor is still swept

use std::sync::Arc;

use anyhow::{anyhow, Context};

use accrual_runner::{init_tracing, Command, Runner, RunnerConfig, USAGE};
use core_kernel::SystemClock;
use domain_ledger::{AccrualEngine, LedgerPorts};
use infra_db::{create_pool, run_migrations, DatabaseConfig, PgInvoiceOutbox, PostgresLedgerAdapter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || matches!(args[0].as_str(), "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }
    let command = Command::parse(args).map_err(|e| anyhow!("{}\n\n{}", e, USAGE))?;

    let config = RunnerConfig::load()?;
    init_tracing(&config.log_level, config.log_format);
    tracing::info!(?command, timezone = %config.accrual.timezone.0, "starting accrual sweep");

    let database =
        DatabaseConfig::new(&config.database_url).max_connections(config.max_connections);
    let pool = create_pool(database)
        .await
        .context("connecting to the ledger database")?;
    if config.run_migrations {
        run_migrations(&pool).await?;
    }

    let store = Arc::new(PostgresLedgerAdapter::new(pool.clone()));
    let outbox = Arc::new(PgInvoiceOutbox::new(pool));
    let ports = LedgerPorts::from_store(store.clone(), outbox);
    let clock = Arc::new(SystemClock::new(config.accrual.timezone));
    let engine = Arc::new(AccrualEngine::standard(config.accrual.clone(), ports, clock));

    let output = Runner::new(engine, store).execute(&command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    tracing::info!("accrual sweep complete");
    Ok(())
}
