//! Command execution

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, instrument, warn};

use core_kernel::{AdapterHealth, HealthCheckable};
use domain_ledger::{AccrualEngine, AuditOptions, BackfillOrchestrator, TenantAccrualAuditor};

use crate::cli::Command;

/// Runs parsed commands against a wired engine
pub struct Runner {
    engine: Arc<AccrualEngine>,
    health: Arc<dyn HealthCheckable>,
}

impl Runner {
    pub fn new(engine: Arc<AccrualEngine>, health: Arc<dyn HealthCheckable>) -> Self {
        Self { engine, health }
    }

    /// Executes a command and returns its report as JSON
    ///
    /// Per-debtor failures inside an audit or backfill are part of the
    /// report; only failures that stop the command are returned as errors.
    #[instrument(skip(self))]
    pub async fn execute(&self, command: &Command) -> anyhow::Result<Value> {
        match command {
            Command::Audit { dry_run, window_months } => {
                let options = AuditOptions {
                    window_months: *window_months,
                    dry_run: *dry_run,
                    ..Default::default()
                };
                let report =
                    TenantAccrualAuditor::new(self.engine.clone()).audit_all(options).await?;
                if !report.errors.is_empty() {
                    warn!(errors = report.errors.len(), "audit finished with failures");
                }
                Ok(serde_json::to_value(report)?)
            }
            Command::Backfill { debtor_id, mode } => {
                let report =
                    BackfillOrchestrator::new(self.engine.clone()).run(*debtor_id, *mode).await?;
                Ok(serde_json::to_value(report)?)
            }
            Command::Diagnose { debtor_id, month } => {
                let diagnosis = TenantAccrualAuditor::new(self.engine.clone())
                    .diagnose_month(*debtor_id, *month)
                    .await?;
                Ok(serde_json::to_value(diagnosis)?)
            }
            Command::Reconcile { debtor_id } => {
                let debtor = self.engine.reconcile(*debtor_id).await?;
                info!(
                    debtor = %debtor.code,
                    balance = %debtor.totals.current_balance,
                    "debtor reconciled"
                );
                Ok(serde_json::to_value(debtor)?)
            }
            Command::Open { lease_id } => {
                let debtor = self.engine.open_debtor(*lease_id).await?;
                Ok(serde_json::to_value(debtor)?)
            }
            Command::Health => {
                let result = self.health.health_check().await;
                if result.status == AdapterHealth::Unhealthy {
                    anyhow::bail!(
                        "{} is unhealthy: {}",
                        result.adapter_id,
                        result.message.unwrap_or_default()
                    );
                }
                Ok(serde_json::to_value(result)?)
            }
        }
    }
}
