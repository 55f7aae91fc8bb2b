//! Tenant accrual auditor
//!
//! Sweeps debtors whose lease is running or ended within a trailing window,
//! works out which monthly records should exist by now, and fills the gaps.
//! Per-debtor failures are collected into the report and the sweep moves on;
//! nothing is swallowed.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use core_kernel::{DebtorId, MonthKey};

use crate::debtor::Debtor;
use crate::engine::{AccrualEngine, AccrualOutcome};
use crate::entry::SourceTag;
use crate::error::{FailureKind, LedgerError};
use crate::resolver::{CorrelationMismatch, Resolution, ResolutionOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditOptions {
    /// Months after lease end a debtor stays in the sweep; config default when unset
    pub window_months: Option<u32>,
    /// Report gaps without posting anything
    pub dry_run: bool,
    pub source_tag: SourceTag,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            window_months: None,
            dry_run: false,
            source_tag: SourceTag::Audit,
        }
    }
}

/// A structured per-record failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualFailure {
    pub debtor_id: DebtorId,
    pub month: Option<MonthKey>,
    pub kind: FailureKind,
    pub message: String,
}

impl AccrualFailure {
    pub fn new(debtor_id: DebtorId, month: Option<MonthKey>, error: &LedgerError) -> Self {
        Self {
            debtor_id,
            month,
            kind: error.failure_kind(),
            message: error.to_string(),
        }
    }

    pub fn mismatch(debtor_id: DebtorId, month: MonthKey, mismatch: &CorrelationMismatch) -> Self {
        Self::new(debtor_id, Some(month), &LedgerError::from(mismatch))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAuditResult {
    pub debtor_id: Option<DebtorId>,
    pub debtor_code: String,
    pub tenant_name: String,
    pub months_checked: Vec<MonthKey>,
    pub months_found: Vec<MonthKey>,
    pub months_missing: Vec<MonthKey>,
    pub months_created: Vec<MonthKey>,
    /// Missing months another writer filled first
    pub skipped: usize,
    pub errors: Vec<AccrualFailure>,
    /// Correlation mismatches seen while resolving
    pub warnings: Vec<AccrualFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditReport {
    pub as_of: NaiveDate,
    pub dry_run: bool,
    pub debtors_scanned: usize,
    pub debtors_outside_window: usize,
    pub results: Vec<TenantAuditResult>,
    pub created: usize,
    pub skipped: usize,
    pub errors: Vec<AccrualFailure>,
}

impl AuditReport {
    pub fn missing(&self) -> usize {
        self.results.iter().map(|r| r.months_missing.len()).sum()
    }
}

/// Why a month is or is not required
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonthVerdict {
    Included,
    BeforeLeaseStart,
    LeaseStartMonth,
    AfterLeaseEnd,
    FutureMonth,
    /// Inside a multi-month billing period that started earlier
    CoveredByPeriod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthDiagnosis {
    pub debtor_id: DebtorId,
    pub debtor_code: String,
    pub month: MonthKey,
    pub lease_start_month: MonthKey,
    pub lease_end_month: MonthKey,
    pub current_month: MonthKey,
    pub verdict: MonthVerdict,
    /// Present for included months
    pub resolution: Option<Resolution>,
}

pub struct TenantAccrualAuditor {
    engine: Arc<AccrualEngine>,
}

impl TenantAccrualAuditor {
    pub fn new(engine: Arc<AccrualEngine>) -> Self {
        Self { engine }
    }

    /// Months that should carry a monthly record as of `current_month`
    ///
    /// Starts of every billing period after the first, up to the current
    /// month. The lease-start month and future months never qualify.
    pub fn required_months(
        &self,
        debtor: &Debtor,
        current_month: MonthKey,
    ) -> Result<Vec<MonthKey>, LedgerError> {
        Ok(self
            .engine
            .generator()
            .periods(debtor)?
            .into_iter()
            .filter(|p| !p.is_first())
            .map(|p| p.month())
            .filter(|m| *m <= current_month)
            .collect())
    }

    /// Whether the debtor falls inside the sweep as of `today`
    pub fn in_window(&self, debtor: &Debtor, today: NaiveDate, window_months: u32) -> bool {
        if debtor.lease_start > today {
            return false;
        }
        let cutoff = MonthKey::from_date(today).offset(-(window_months as i32));
        debtor.lease_end_month() >= cutoff
    }

    /// Audits every debtor in the window, one at a time
    #[instrument(skip(self))]
    pub async fn audit_all(&self, options: AuditOptions) -> Result<AuditReport, LedgerError> {
        let today = self.engine.clock().today();
        let window = options
            .window_months
            .unwrap_or_else(|| self.engine.config().sweep_window());
        let debtors = self.engine.ports().debtors.list_debtors().await?;

        let mut report = AuditReport {
            as_of: today,
            dry_run: options.dry_run,
            debtors_scanned: 0,
            debtors_outside_window: 0,
            results: Vec::new(),
            created: 0,
            skipped: 0,
            errors: Vec::new(),
        };

        for debtor in debtors {
            if !self.in_window(&debtor, today, window) {
                report.debtors_outside_window += 1;
                continue;
            }
            report.debtors_scanned += 1;

            match self.audit_debtor(debtor.id, options).await {
                Ok(result) => {
                    report.created += result.months_created.len();
                    report.skipped += result.skipped;
                    report.errors.extend(result.errors.iter().cloned());
                    report.results.push(result);
                }
                Err(e) => {
                    warn!(debtor = %debtor.code, error = %e, "debtor audit failed");
                    report.errors.push(AccrualFailure::new(debtor.id, None, &e));
                }
            }
        }

        info!(
            scanned = report.debtors_scanned,
            outside_window = report.debtors_outside_window,
            missing = report.missing(),
            created = report.created,
            skipped = report.skipped,
            errors = report.errors.len(),
            dry_run = report.dry_run,
            "accrual audit completed"
        );
        Ok(report)
    }

    /// Audits one debtor and fills its missing months
    #[instrument(skip(self, options), fields(debtor_id = %debtor_id))]
    pub async fn audit_debtor(
        &self,
        debtor_id: DebtorId,
        options: AuditOptions,
    ) -> Result<TenantAuditResult, LedgerError> {
        let debtor = self.engine.get_debtor(debtor_id).await?;
        let current = self.engine.clock().current_month();

        let mut result = TenantAuditResult {
            debtor_id: Some(debtor.id),
            debtor_code: debtor.code.clone(),
            tenant_name: debtor.tenant_name.clone(),
            ..Default::default()
        };

        if debtor.lease_start > self.engine.clock().today() {
            return Ok(result);
        }

        result.months_checked = self.required_months(&debtor, current)?;
        let candidates = self.engine.candidates(&debtor).await?;

        for month in result.months_checked.clone() {
            let query = self.engine.monthly_query(&debtor, month);
            let resolution = self.engine.resolve_among(&query, &candidates);

            for mismatch in &resolution.mismatches {
                result.warnings.push(AccrualFailure::mismatch(debtor.id, month, mismatch));
            }
            match resolution.outcome {
                ResolutionOutcome::Found { .. } => result.months_found.push(month),
                _ => result.months_missing.push(month),
            }
        }

        if options.dry_run || result.months_missing.is_empty() {
            return Ok(result);
        }

        for month in result.months_missing.clone() {
            match self.engine.ensure_period(debtor.id, month, options.source_tag).await {
                Ok(accrual) => match accrual.outcome {
                    AccrualOutcome::Created { .. } => result.months_created.push(month),
                    AccrualOutcome::AlreadyPresent { .. } => result.skipped += 1,
                },
                Err(e) if e.is_duplicate() => result.skipped += 1,
                Err(e) => {
                    warn!(debtor = %debtor.code, %month, error = %e, "accrual failed");
                    result.errors.push(AccrualFailure::new(debtor.id, Some(month), &e));
                }
            }
        }

        if !result.months_created.is_empty() {
            if let Err(e) = self.engine.reconcile(debtor.id).await {
                warn!(debtor = %debtor.code, error = %e, "reconciliation after audit failed");
                result.errors.push(AccrualFailure::new(debtor.id, None, &e));
            }
        }

        Ok(result)
    }

    /// Explains which guard includes or excludes a single month
    pub async fn diagnose_month(
        &self,
        debtor_id: DebtorId,
        month: MonthKey,
    ) -> Result<MonthDiagnosis, LedgerError> {
        let debtor = self.engine.get_debtor(debtor_id).await?;
        let current = self.engine.clock().current_month();

        let verdict = if month < debtor.lease_start_month() {
            MonthVerdict::BeforeLeaseStart
        } else if month == debtor.lease_start_month() {
            MonthVerdict::LeaseStartMonth
        } else if month > debtor.lease_end_month() {
            MonthVerdict::AfterLeaseEnd
        } else if month > current {
            MonthVerdict::FutureMonth
        } else if !self.required_months(&debtor, current)?.contains(&month) {
            MonthVerdict::CoveredByPeriod
        } else {
            MonthVerdict::Included
        };

        let resolution = if verdict == MonthVerdict::Included {
            let query = self.engine.monthly_query(&debtor, month);
            Some(self.engine.resolve(&query, &debtor).await?)
        } else {
            None
        };

        Ok(MonthDiagnosis {
            debtor_id: debtor.id,
            debtor_code: debtor.code.clone(),
            month,
            lease_start_month: debtor.lease_start_month(),
            lease_end_month: debtor.lease_end_month(),
            current_month: current,
            verdict,
            resolution,
        })
    }
}
