//! Backfill orchestrator
//!
//! One-shot driver for a single debtor: lease-start record, every monthly
//! record up to the current month, duplicate cleanup, reconciliation, then
//! invoice emission in strict chronological order. Future months are left to
//! the recurring scheduler.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{DebtorId, EntryId, MonthKey};

use crate::auditor::AccrualFailure;
use crate::debtor::DebtorTotals;
use crate::engine::{AccrualEngine, AccrualOutcome, AccrualResult};
use crate::entry::{SourceTag, TransactionEntry};
use crate::error::{FailureKind, LedgerError};

/// Context the backfill was requested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Bulk,
    Manual,
    Auto,
    /// Ordinary request path; backfill does nothing
    Inline,
}

impl GenerationMode {
    pub fn permits_backfill(&self) -> bool {
        !matches!(self, GenerationMode::Inline)
    }
}

impl std::str::FromStr for GenerationMode {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bulk" => Ok(GenerationMode::Bulk),
            "manual" => Ok(GenerationMode::Manual),
            "auto" => Ok(GenerationMode::Auto),
            "inline" => Ok(GenerationMode::Inline),
            other => Err(LedgerError::configuration(format!(
                "unknown generation mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillReport {
    pub debtor_id: DebtorId,
    pub mode: GenerationMode,
    pub skipped_by_mode: bool,
    /// Records posted by this run, in accrual order
    pub created: Vec<EntryId>,
    /// Records that already existed
    pub skipped: usize,
    pub duplicates_removed: Vec<EntryId>,
    pub invoices_emitted: Vec<EntryId>,
    pub totals: Option<DebtorTotals>,
    pub errors: Vec<AccrualFailure>,
    pub warnings: Vec<AccrualFailure>,
}

impl BackfillReport {
    fn new(debtor_id: DebtorId, mode: GenerationMode) -> Self {
        Self {
            debtor_id,
            mode,
            skipped_by_mode: false,
            created: Vec::new(),
            skipped: 0,
            duplicates_removed: Vec::new(),
            invoices_emitted: Vec::new(),
            totals: None,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

pub struct BackfillOrchestrator {
    engine: Arc<AccrualEngine>,
}

impl BackfillOrchestrator {
    pub fn new(engine: Arc<AccrualEngine>) -> Self {
        Self { engine }
    }

    /// Runs the backfill for one debtor
    ///
    /// # Errors
    ///
    /// Only an unknown debtor or a failing debtor lookup is fatal; every
    /// per-record failure is collected in the report.
    #[instrument(skip(self), fields(debtor_id = %debtor_id))]
    pub async fn run(
        &self,
        debtor_id: DebtorId,
        mode: GenerationMode,
    ) -> Result<BackfillReport, LedgerError> {
        let mut report = BackfillReport::new(debtor_id, mode);

        if !mode.permits_backfill() {
            info!(?mode, "backfill skipped for mode");
            report.skipped_by_mode = true;
            return Ok(report);
        }

        let debtor = self.engine.get_debtor(debtor_id).await?;
        let current = self.engine.clock().current_month();
        let mut created: Vec<TransactionEntry> = Vec::new();

        let lease_start = self.engine.ensure_lease_start(debtor_id, SourceTag::Backfill).await;
        self.record(&mut report, &mut created, debtor_id, debtor.lease_start_month(), lease_start);

        let months: Vec<MonthKey> = match self.engine.generator().periods(&debtor) {
            Ok(periods) => periods
                .into_iter()
                .filter(|p| !p.is_first())
                .map(|p| p.month())
                .filter(|m| *m <= current)
                .collect(),
            Err(e) => {
                report.errors.push(AccrualFailure::new(debtor_id, None, &e));
                Vec::new()
            }
        };

        for month in months {
            let outcome = self.engine.ensure_period(debtor_id, month, SourceTag::Backfill).await;
            self.record(&mut report, &mut created, debtor_id, month, outcome);
        }

        match self.engine.remove_duplicates(debtor_id).await {
            Ok(removed) => report.duplicates_removed = removed,
            Err(e) => report.errors.push(AccrualFailure::new(debtor_id, None, &e)),
        }

        let reconciled = match self.engine.reconcile(debtor_id).await {
            Ok(debtor) => {
                report.totals = Some(debtor.totals);
                debtor
            }
            Err(e) => {
                report.errors.push(AccrualFailure::new(debtor_id, None, &e));
                debtor.clone()
            }
        };

        created.retain(|e| !report.duplicates_removed.contains(&e.id));
        created.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        report.created = created.iter().map(|e| e.id).collect();

        for entry in &created {
            match self.engine.emit_invoice(entry, &reconciled).await {
                Ok(()) => report.invoices_emitted.push(entry.id),
                Err(e) => {
                    warn!(entry_id = %entry.id, error = %e, "invoice emission failed");
                    report.errors.push(AccrualFailure {
                        debtor_id,
                        month: Some(entry.month()),
                        kind: FailureKind::InvoiceEmission,
                        message: e.to_string(),
                    });
                }
            }
        }

        info!(
            debtor = %debtor.code,
            created = report.created.len(),
            skipped = report.skipped,
            duplicates_removed = report.duplicates_removed.len(),
            invoices = report.invoices_emitted.len(),
            errors = report.errors.len(),
            "backfill completed"
        );
        Ok(report)
    }

    fn record(
        &self,
        report: &mut BackfillReport,
        created: &mut Vec<TransactionEntry>,
        debtor_id: DebtorId,
        month: MonthKey,
        outcome: Result<AccrualResult, LedgerError>,
    ) {
        match outcome {
            Ok(result) => {
                report.warnings.extend(
                    result
                        .mismatches
                        .iter()
                        .map(|m| AccrualFailure::mismatch(debtor_id, month, m)),
                );
                match result.outcome {
                    AccrualOutcome::Created { entry } => created.push(*entry),
                    AccrualOutcome::AlreadyPresent { .. } => report.skipped += 1,
                }
            }
            Err(e) if e.is_duplicate() => report.skipped += 1,
            Err(e) => {
                warn!(%month, error = %e, "backfill accrual failed");
                report.errors.push(AccrualFailure::new(debtor_id, Some(month), &e));
            }
        }
    }
}
