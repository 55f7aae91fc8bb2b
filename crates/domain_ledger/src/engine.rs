//! Accrual engine
//!
//! The injectable component that owns the account directory, configuration,
//! clock and storage ports. It is constructed once at startup and exposes the
//! single-record operations the auditor and the backfill orchestrator compose.
//!
//! # Concurrency
//!
//! Writes for one debtor are serialized with a per-debtor async mutex. The
//! store's uniqueness guard backs this up: a conflicting insert surfaces as
//! `LedgerError::DuplicateDetected`, which callers count as skipped.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use core_kernel::{Clock, DebtorId, EntryId, LeaseId, MonthKey, PortError};

use crate::account::AccountDirectory;
use crate::config::AccrualConfig;
use crate::debtor::Debtor;
use crate::entry::{CorrelationKey, SourceTag, TransactionEntry};
use crate::error::LedgerError;
use crate::generator::{AccrualGenerator, AccrualRequest};
use crate::lease::{Lease, ResidencePaymentConfig};
use crate::ports::{EntryQuery, LedgerPorts};
use crate::reconciler::DebtorReconciler;
use crate::resolver::{
    CorrelationMismatch, CorrelationQuery, CorrelationResolver, Resolution, ResolutionOutcome,
};

/// What an ensure call did
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccrualOutcome {
    Created { entry: Box<TransactionEntry> },
    AlreadyPresent { entry_id: EntryId, matcher: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccrualResult {
    pub outcome: AccrualOutcome,
    /// Candidates rejected because they belong to another receivable
    pub mismatches: Vec<CorrelationMismatch>,
}

impl AccrualResult {
    pub fn created(&self) -> Option<&TransactionEntry> {
        match &self.outcome {
            AccrualOutcome::Created { entry } => Some(entry),
            AccrualOutcome::AlreadyPresent { .. } => None,
        }
    }
}

/// Everything the generator needs for one debtor
#[derive(Debug, Clone)]
pub struct AccrualContext {
    pub debtor: Debtor,
    pub lease: Option<Lease>,
    pub residence: Option<ResidencePaymentConfig>,
}

/// Keyed async mutexes, one per debtor
#[derive(Debug, Default)]
pub struct DebtorLocks {
    locks: Mutex<HashMap<DebtorId, Arc<tokio::sync::Mutex<()>>>>,
}

impl DebtorLocks {
    pub fn for_debtor(&self, id: DebtorId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(id).or_default().clone()
    }
}

pub struct AccrualEngine {
    directory: Arc<AccountDirectory>,
    config: Arc<AccrualConfig>,
    ports: LedgerPorts,
    clock: Arc<dyn Clock>,
    generator: AccrualGenerator,
    resolver: CorrelationResolver,
    reconciler: DebtorReconciler,
    locks: DebtorLocks,
    onboarding: tokio::sync::Mutex<()>,
}

impl AccrualEngine {
    pub fn new(
        directory: Arc<AccountDirectory>,
        config: Arc<AccrualConfig>,
        ports: LedgerPorts,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_resolver(directory, config, ports, clock, CorrelationResolver::standard())
    }

    /// Engine over the standard chart of accounts for `config`
    pub fn standard(config: AccrualConfig, ports: LedgerPorts, clock: Arc<dyn Clock>) -> Self {
        let directory = Arc::new(AccountDirectory::standard(&config.accounts));
        Self::new(directory, Arc::new(config), ports, clock)
    }

    /// Engine with a custom matcher ranking
    pub fn with_resolver(
        directory: Arc<AccountDirectory>,
        config: Arc<AccrualConfig>,
        ports: LedgerPorts,
        clock: Arc<dyn Clock>,
        resolver: CorrelationResolver,
    ) -> Self {
        let generator = AccrualGenerator::new(directory.clone(), config.clone());
        let reconciler = DebtorReconciler::new(
            ports.ledger.clone(),
            ports.debtors.clone(),
            ports.payments.clone(),
            clock.clone(),
        );
        Self {
            directory,
            config,
            ports,
            clock,
            generator,
            resolver,
            reconciler,
            locks: DebtorLocks::default(),
            onboarding: tokio::sync::Mutex::new(()),
        }
    }

    pub fn config(&self) -> &AccrualConfig {
        &self.config
    }

    pub fn directory(&self) -> &AccountDirectory {
        &self.directory
    }

    pub fn ports(&self) -> &LedgerPorts {
        &self.ports
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn generator(&self) -> &AccrualGenerator {
        &self.generator
    }

    /// Creates the debtor for an approved lease, or returns the existing one
    ///
    /// # Errors
    ///
    /// `LeaseNotFound` for an unknown lease; `InvalidLease` when the lease is
    /// not approved/active or its data cannot be accrued.
    #[instrument(skip(self), fields(lease_id = %lease_id))]
    pub async fn open_debtor(&self, lease_id: LeaseId) -> Result<Debtor, LedgerError> {
        let lease = self.ports.leases.get_lease(lease_id).await.map_err(|e| {
            if e.is_not_found() {
                LedgerError::LeaseNotFound(lease_id.to_string())
            } else {
                LedgerError::Persistence(e)
            }
        })?;
        lease.validate()?;
        if !lease.status.can_open_debtor() {
            return Err(LedgerError::InvalidLease(format!(
                "lease {} is {:?}, expected approved or active",
                lease.id, lease.status
            )));
        }

        let _guard = self.onboarding.lock().await;

        if let Some(existing) = self.ports.debtors.find_by_lease(lease_id).await? {
            debug!(debtor = %existing.code, "debtor already open");
            return Ok(existing);
        }

        let id = DebtorId::new_v7();
        let sequence = self.ports.debtors.count_debtors().await? + 1;
        let receivable = self.directory.receivable_for(&id)?;
        let debtor = Debtor::open(
            id,
            Debtor::format_code(sequence),
            &lease,
            receivable.code,
            self.clock.now(),
        );

        match self.ports.debtors.insert_debtor(&debtor).await {
            Ok(()) => {
                info!(debtor = %debtor.code, tenant = %debtor.tenant_name, "debtor opened");
                Ok(debtor)
            }
            Err(e) if e.is_conflict() => self
                .ports
                .debtors
                .find_by_lease(lease_id)
                .await?
                .ok_or_else(|| LedgerError::Persistence(e)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_debtor(&self, debtor_id: DebtorId) -> Result<Debtor, LedgerError> {
        self.ports.debtors.get_debtor(debtor_id).await.map_err(|e| {
            if e.is_not_found() {
                LedgerError::DebtorNotFound(debtor_id.to_string())
            } else {
                LedgerError::Persistence(e)
            }
        })
    }

    /// Debtor plus the lease and residence settings behind it
    pub async fn load_context(&self, debtor_id: DebtorId) -> Result<AccrualContext, LedgerError> {
        let debtor = self.get_debtor(debtor_id).await?;

        let lease = match self.ports.leases.get_lease(debtor.lease_id).await {
            Ok(lease) => Some(lease),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };
        let residence = self.ports.residences.get_config(debtor.residence_id).await?;

        Ok(AccrualContext {
            debtor,
            lease,
            residence,
        })
    }

    /// Posted records that could belong to the debtor
    pub async fn candidates(&self, debtor: &Debtor) -> Result<Vec<TransactionEntry>, LedgerError> {
        Ok(self.ports.ledger.find_entries(&EntryQuery::for_debtor(debtor)).await?)
    }

    pub fn lease_start_query(&self, debtor: &Debtor) -> CorrelationQuery {
        CorrelationQuery::lease_start(debtor, self.directory.receivable_control())
    }

    pub fn monthly_query(&self, debtor: &Debtor, month: MonthKey) -> CorrelationQuery {
        CorrelationQuery::monthly(debtor, self.directory.receivable_control(), month)
    }

    /// Resolves without writing anything
    pub async fn resolve(
        &self,
        query: &CorrelationQuery,
        debtor: &Debtor,
    ) -> Result<Resolution, LedgerError> {
        let candidates = self.candidates(debtor).await?;
        Ok(self.resolver.resolve(query, &candidates))
    }

    /// Resolves against an already loaded candidate set
    pub fn resolve_among(
        &self,
        query: &CorrelationQuery,
        candidates: &[TransactionEntry],
    ) -> Resolution {
        self.resolver.resolve(query, candidates)
    }

    /// Posts the lease-start record unless an equivalent one exists
    #[instrument(skip(self), fields(debtor_id = %debtor_id))]
    pub async fn ensure_lease_start(
        &self,
        debtor_id: DebtorId,
        tag: SourceTag,
    ) -> Result<AccrualResult, LedgerError> {
        let lock = self.locks.for_debtor(debtor_id);
        let _guard = lock.lock().await;

        let ctx = self.load_context(debtor_id).await?;
        let query = self.lease_start_query(&ctx.debtor);
        let resolution = self.resolve(&query, &ctx.debtor).await?;

        self.post_unless_present(
            &ctx,
            query,
            resolution,
            |request| self.generator.lease_start_entry(request),
            tag,
        )
        .await
    }

    /// Posts the record for the billing period starting in `month` unless an
    /// equivalent one exists
    ///
    /// # Errors
    ///
    /// `InvalidPeriod` for the lease-start month or a month no period starts in.
    #[instrument(skip(self), fields(debtor_id = %debtor_id, month = %month))]
    pub async fn ensure_period(
        &self,
        debtor_id: DebtorId,
        month: MonthKey,
        tag: SourceTag,
    ) -> Result<AccrualResult, LedgerError> {
        let lock = self.locks.for_debtor(debtor_id);
        let _guard = lock.lock().await;

        let ctx = self.load_context(debtor_id).await?;
        self.generator.period_for(&ctx.debtor, month)?;

        let query = self.monthly_query(&ctx.debtor, month);
        let resolution = self.resolve(&query, &ctx.debtor).await?;

        self.post_unless_present(
            &ctx,
            query,
            resolution,
            |request| self.generator.period_entry(request, month),
            tag,
        )
        .await
    }

    async fn post_unless_present<F>(
        &self,
        ctx: &AccrualContext,
        query: CorrelationQuery,
        resolution: Resolution,
        generate: F,
        tag: SourceTag,
    ) -> Result<AccrualResult, LedgerError>
    where
        F: FnOnce(AccrualRequest<'_>) -> Result<TransactionEntry, LedgerError>,
    {
        let Resolution { outcome, mismatches } = resolution;

        match outcome {
            ResolutionOutcome::Found { entry_id, matcher } => {
                debug!(%entry_id, %matcher, key = %query.key(), "already present");
                return Ok(AccrualResult {
                    outcome: AccrualOutcome::AlreadyPresent { entry_id, matcher },
                    mismatches,
                });
            }
            ResolutionOutcome::Ineligible { reason } => {
                return Err(LedgerError::InvalidPeriod(reason))
            }
            ResolutionOutcome::NotFound => {}
        }

        let entry = generate(AccrualRequest {
            debtor: &ctx.debtor,
            lease: ctx.lease.as_ref(),
            residence: ctx.residence.as_ref(),
            source_tag: tag,
            created_at: self.clock.now(),
        })?;

        self.ports
            .ledger
            .insert_entry(&entry)
            .await
            .map_err(|e| map_insert_error(e, &query.key()))?;

        if !mismatches.is_empty() {
            warn!(
                debtor = %ctx.debtor.code,
                key = %query.key(),
                mismatches = mismatches.len(),
                "posted under the correct receivable despite mismatched records"
            );
        }
        info!(
            debtor = %ctx.debtor.code,
            entry_id = %entry.id,
            key = %query.key(),
            amount = %entry.total_debits(),
            source = %tag,
            "accrual posted"
        );

        Ok(AccrualResult {
            outcome: AccrualOutcome::Created { entry: Box::new(entry) },
            mismatches,
        })
    }

    /// Soft-deletes all but the earliest posted record per correlation key
    ///
    /// # Returns
    ///
    /// Ids of the records removed.
    #[instrument(skip(self), fields(debtor_id = %debtor_id))]
    pub async fn remove_duplicates(
        &self,
        debtor_id: DebtorId,
    ) -> Result<Vec<EntryId>, LedgerError> {
        let lock = self.locks.for_debtor(debtor_id);
        let _guard = lock.lock().await;

        let debtor = self.get_debtor(debtor_id).await?;
        let candidates = self.candidates(&debtor).await?;

        let mut groups: BTreeMap<CorrelationKey, Vec<&TransactionEntry>> = BTreeMap::new();
        for entry in candidates.iter().filter(|e| self.belongs_to(e, &debtor)) {
            if let Some(key) = entry.correlation_key() {
                groups.entry(key).or_default().push(entry);
            }
        }

        let now = self.clock.now();
        let mut removed = Vec::new();
        for (key, mut entries) in groups {
            if entries.len() < 2 {
                continue;
            }
            entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
            let keep = entries[0].id;
            for duplicate in &entries[1..] {
                self.ports
                    .ledger
                    .soft_delete(duplicate.id, now, &format!("duplicate of {}", keep))
                    .await?;
                info!(
                    debtor = %debtor.code,
                    %key,
                    removed = %duplicate.id,
                    kept = %keep,
                    "duplicate removed"
                );
                removed.push(duplicate.id);
            }
        }
        Ok(removed)
    }

    /// Debtor-owned accrual records; foreign receivables never qualify
    fn belongs_to(&self, entry: &TransactionEntry, debtor: &Debtor) -> bool {
        if !entry.is_posted() || !entry.kind().is_accrual() {
            return false;
        }
        let receivables: Vec<&str> = entry
            .account_codes(|code| self.directory.is_receivable_code(code))
            .collect();
        if receivables.is_empty() {
            entry.debtor_id() == Some(debtor.id)
        } else {
            receivables.contains(&debtor.receivable_account.as_str())
        }
    }

    /// Rebuilds the debtor's derived state
    pub async fn reconcile(&self, debtor_id: DebtorId) -> Result<Debtor, LedgerError> {
        let lock = self.locks.for_debtor(debtor_id);
        let _guard = lock.lock().await;
        self.reconciler.reconcile(debtor_id).await
    }

    /// Hands one record to the invoice collaborator
    pub async fn emit_invoice(
        &self,
        entry: &TransactionEntry,
        debtor: &Debtor,
    ) -> Result<(), LedgerError> {
        self.ports.invoices.emit(entry, debtor).await?;
        debug!(entry_id = %entry.id, debtor = %debtor.code, "invoice emitted");
        Ok(())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn map_insert_error(error: PortError, key: &CorrelationKey) -> LedgerError {
    if error.is_conflict() {
        LedgerError::DuplicateDetected(key.to_string())
    } else {
        LedgerError::Persistence(error)
    }
}
