//! Runner configuration
//!
//! Loaded from an optional `accrual.toml` and `ACCRUAL_*` environment
//! variables; nested keys use a double underscore, for example
//! `ACCRUAL_ACCRUAL__SWEEP_WINDOW_MONTHS=6`.

use anyhow::{bail, Context};
use serde::Deserialize;

use domain_ledger::AccrualConfig;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// PostgreSQL connection string
    pub database_url: String,
    pub max_connections: u32,
    /// Default filter when `RUST_LOG` is unset
    pub log_level: String,
    pub log_format: LogFormat,
    /// Apply bundled migrations before running a command
    pub run_migrations: bool,
    pub accrual: AccrualConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/rental_ledger".to_string(),
            max_connections: 5,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            run_migrations: false,
            accrual: AccrualConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Loads configuration from `accrual.toml` (if present) and the environment
    pub fn load() -> anyhow::Result<Self> {
        let config: Self = config::Config::builder()
            .add_source(config::File::with_name("accrual").required(false))
            .add_source(
                config::Environment::with_prefix("ACCRUAL")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("accrual.legacy_admin_fee.residences"),
            )
            .build()
            .context("reading configuration sources")?
            .try_deserialize()
            .context("deserializing runner configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database_url.trim().is_empty() {
            bail!("database_url must be set");
        }
        if self.max_connections == 0 {
            bail!("max_connections must be at least 1");
        }
        self.accrual.validate().context("invalid accrual configuration")?;
        Ok(())
    }
}
