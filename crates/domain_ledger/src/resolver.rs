//! Idempotency / correlation resolver
//!
//! Decides whether a record equivalent to the one about to be generated is
//! already on the ledger. Historical records were written with inconsistent
//! keys, so the resolver walks a ranked list of matching strategies, from the
//! exact key down to a date-range fallback, and takes the first hit whose
//! receivable account actually belongs to the debtor.
//!
//! A hit posted against another debtor's receivable is not a match: it is
//! reported as a [`CorrelationMismatch`] and the search continues, so the
//! caller generates a correct record instead of silently skipping.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use core_kernel::{DebtorId, EntryId, MonthKey};

use crate::account::is_receivable_subaccount;
use crate::debtor::Debtor;
use crate::entry::{CorrelationKey, EntryKind, TransactionEntry};
use crate::error::LedgerError;

/// What the caller is about to generate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationQuery {
    pub kind: EntryKind,
    pub debtor_id: DebtorId,
    pub application_code: String,
    pub receivable_account: String,
    /// Receivable control account code, used to spot foreign sub-accounts
    pub receivable_control: String,
    pub month: MonthKey,
    pub lease_start_month: MonthKey,
}

impl CorrelationQuery {
    pub fn lease_start(debtor: &Debtor, receivable_control: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::LeaseStart,
            debtor_id: debtor.id,
            application_code: debtor.application_code.clone(),
            receivable_account: debtor.receivable_account.clone(),
            receivable_control: receivable_control.into(),
            month: debtor.lease_start_month(),
            lease_start_month: debtor.lease_start_month(),
        }
    }

    pub fn monthly(
        debtor: &Debtor,
        receivable_control: impl Into<String>,
        month: MonthKey,
    ) -> Self {
        Self {
            kind: EntryKind::MonthlyRentAccrual,
            month,
            ..Self::lease_start(debtor, receivable_control)
        }
    }

    pub fn key(&self) -> CorrelationKey {
        match self.kind {
            EntryKind::LeaseStart => CorrelationKey::lease_start(&self.application_code),
            _ => CorrelationKey::monthly(self.month),
        }
    }

    fn is_monthly(&self) -> bool {
        self.kind == EntryKind::MonthlyRentAccrual
    }

    /// Only a record of the same economic event can stand in for the queried one;
    /// payments and adjustments on the receivable never do
    fn admits(&self, kind: EntryKind) -> bool {
        kind == self.kind
    }

    fn has_receivable_line(&self, entry: &TransactionEntry) -> bool {
        entry
            .lines
            .iter()
            .any(|l| l.account_code == self.receivable_account
                || is_receivable_subaccount(&l.account_code, &self.receivable_control))
    }
}

/// A matching strategy
pub trait EntryMatcher: Send + Sync {
    fn name(&self) -> &'static str;

    fn matches(&self, entry: &TransactionEntry, query: &CorrelationQuery) -> bool;
}

/// Exact type + debtor/application + period key in metadata
#[derive(Debug, Default, Clone, Copy)]
pub struct ExplicitKeyMatcher;

impl EntryMatcher for ExplicitKeyMatcher {
    fn name(&self) -> &'static str {
        "explicit_key"
    }

    fn matches(&self, entry: &TransactionEntry, query: &CorrelationQuery) -> bool {
        let meta = &entry.metadata;
        if meta.kind != query.kind {
            return false;
        }
        let same_owner = entry.debtor_id() == Some(query.debtor_id)
            || meta.application_code.as_deref() == Some(query.application_code.as_str());
        if !same_owner {
            return false;
        }
        if query.is_monthly() {
            meta.month_key == Some(query.month)
        } else {
            true
        }
    }
}

/// Receivable line plus the period key in metadata or description
#[derive(Debug, Default, Clone, Copy)]
pub struct AccountPeriodMatcher;

impl EntryMatcher for AccountPeriodMatcher {
    fn name(&self) -> &'static str {
        "account_period"
    }

    fn matches(&self, entry: &TransactionEntry, query: &CorrelationQuery) -> bool {
        if !query.has_receivable_line(entry) {
            return false;
        }
        entry.metadata.month_key == Some(query.month)
            || entry.description.contains(&query.month.to_string())
    }
}

/// Receivable line dated inside the target month
#[derive(Debug, Default, Clone, Copy)]
pub struct DateRangeMatcher;

impl EntryMatcher for DateRangeMatcher {
    fn name(&self) -> &'static str {
        "date_range"
    }

    fn matches(&self, entry: &TransactionEntry, query: &CorrelationQuery) -> bool {
        query.month.contains(entry.date) && query.has_receivable_line(entry)
    }
}

/// A candidate rejected because its receivable belongs to someone else
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationMismatch {
    pub entry_id: EntryId,
    pub matcher: String,
    pub expected_account: String,
    pub found_accounts: Vec<String>,
}

impl From<&CorrelationMismatch> for LedgerError {
    fn from(mismatch: &CorrelationMismatch) -> Self {
        LedgerError::CorrelationMismatch {
            entry: mismatch.entry_id.to_string(),
            expected: mismatch.expected_account.clone(),
            found: mismatch.found_accounts.join(","),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// An equivalent record exists
    Found { entry_id: EntryId, matcher: String },
    /// Nothing equivalent; the caller should generate
    NotFound,
    /// The query can never be satisfied by a record
    Ineligible { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome: ResolutionOutcome,
    pub mismatches: Vec<CorrelationMismatch>,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self.outcome, ResolutionOutcome::Found { .. })
    }
}

/// Walks the ranked matchers over a candidate set
pub struct CorrelationResolver {
    matchers: Vec<Box<dyn EntryMatcher>>,
}

impl CorrelationResolver {
    /// Resolver with explicit key, account + period, then date range
    pub fn standard() -> Self {
        Self::with_matchers(vec![
            Box::new(ExplicitKeyMatcher),
            Box::new(AccountPeriodMatcher),
            Box::new(DateRangeMatcher),
        ])
    }

    /// Resolver with a custom ranking, highest priority first
    pub fn with_matchers(matchers: Vec<Box<dyn EntryMatcher>>) -> Self {
        Self { matchers }
    }

    pub fn matcher_names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    /// Finds the record equivalent to `query` among `candidates`
    pub fn resolve(&self, query: &CorrelationQuery, candidates: &[TransactionEntry]) -> Resolution {
        if query.is_monthly() && query.month == query.lease_start_month {
            debug!(month = %query.month, "lease-start month is not eligible for a monthly record");
            return Resolution {
                outcome: ResolutionOutcome::Ineligible {
                    reason: format!("{} is the lease-start month", query.month),
                },
                mismatches: Vec::new(),
            };
        }

        let mut eligible: Vec<&TransactionEntry> = candidates
            .iter()
            .filter(|e| e.is_posted() && query.admits(e.kind()))
            .collect();
        eligible.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut mismatches = Vec::new();
        let mut rejected: HashSet<EntryId> = HashSet::new();

        for matcher in &self.matchers {
            for entry in &eligible {
                if rejected.contains(&entry.id) || !matcher.matches(entry, query) {
                    continue;
                }

                if let Some(found) = foreign_receivables(entry, query) {
                    warn!(
                        entry_id = %entry.id,
                        matcher = matcher.name(),
                        expected = %query.receivable_account,
                        found = %found.join(","),
                        "correlated record belongs to another debtor's receivable"
                    );
                    rejected.insert(entry.id);
                    mismatches.push(CorrelationMismatch {
                        entry_id: entry.id,
                        matcher: matcher.name().to_string(),
                        expected_account: query.receivable_account.clone(),
                        found_accounts: found,
                    });
                    continue;
                }

                debug!(
                    entry_id = %entry.id,
                    matcher = matcher.name(),
                    key = %query.key(),
                    "existing record found"
                );
                return Resolution {
                    outcome: ResolutionOutcome::Found {
                        entry_id: entry.id,
                        matcher: matcher.name().to_string(),
                    },
                    mismatches,
                };
            }
        }

        debug!(key = %query.key(), candidates = candidates.len(), "no existing record");
        Resolution {
            outcome: ResolutionOutcome::NotFound,
            mismatches,
        }
    }
}

impl Default for CorrelationResolver {
    fn default() -> Self {
        Self::standard()
    }
}

/// Receivable sub-accounts on the entry when none of them is the debtor's own
fn foreign_receivables(entry: &TransactionEntry, query: &CorrelationQuery) -> Option<Vec<String>> {
    let receivables: Vec<String> = entry
        .account_codes(|code| is_receivable_subaccount(code, &query.receivable_control))
        .map(str::to_string)
        .collect();

    if receivables.is_empty() || receivables.iter().any(|c| *c == query.receivable_account) {
        None
    } else {
        Some(receivables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{receivable_subaccount, Account, AccountType};
    use crate::entry::{EntryBuilder, EntryMetadata, Source};
    use chrono::{NaiveDate, Utc};
    use core_kernel::Money;
    use rust_decimal_macros::dec;

    fn query(month: MonthKey) -> CorrelationQuery {
        let debtor_id = DebtorId::new();
        CorrelationQuery {
            kind: EntryKind::MonthlyRentAccrual,
            debtor_id,
            application_code: "APP-1".to_string(),
            receivable_account: receivable_subaccount("1100", &debtor_id),
            receivable_control: "1100".to_string(),
            month,
            lease_start_month: MonthKey::new(2025, 6).unwrap(),
        }
    }

    fn entry(
        receivable: &str,
        description: &str,
        date: NaiveDate,
        metadata: EntryMetadata,
        source: Source,
    ) -> TransactionEntry {
        EntryBuilder::new(description, date, metadata.kind)
            .source(source)
            .metadata(metadata)
            .debit(&Account::new(receivable, "AR", AccountType::Asset), Money::new(dec!(200)))
            .credit(&Account::new("4000", "Rent", AccountType::Income), Money::new(dec!(200)))
            .build(Utc::now(), "test")
            .unwrap()
    }

    fn july() -> MonthKey {
        MonthKey::new(2025, 7).unwrap()
    }

    #[test]
    fn test_explicit_key_wins() {
        let q = query(july());
        let mut meta = EntryMetadata::new(EntryKind::MonthlyRentAccrual);
        meta.month_key = Some(july());
        let e = entry(
            &q.receivable_account,
            "rent",
            july().first_day(),
            meta,
            Source::Debtor(q.debtor_id),
        );

        let resolution = CorrelationResolver::standard().resolve(&q, &[e.clone()]);
        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::Found { entry_id: e.id, matcher: "explicit_key".to_string() }
        );
    }

    #[test]
    fn test_description_fallback_for_legacy_record() {
        let q = query(july());
        let meta = EntryMetadata::new(EntryKind::MonthlyRentAccrual);
        let e = entry(
            &q.receivable_account,
            "Rent accrual 2025-07",
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            meta,
            Source::Lease(core_kernel::LeaseId::new()),
        );

        let resolution = CorrelationResolver::standard().resolve(&q, &[e]);
        assert!(matches!(
            resolution.outcome,
            ResolutionOutcome::Found { ref matcher, .. } if matcher == "account_period"
        ));
    }

    #[test]
    fn test_foreign_receivable_is_not_a_match() {
        let q = query(july());
        let other = receivable_subaccount("1100", &DebtorId::new());
        let mut meta = EntryMetadata::new(EntryKind::MonthlyRentAccrual);
        meta.month_key = Some(july());
        meta.application_code = Some(q.application_code.clone());
        let e = entry(
            &other,
            "rent 2025-07",
            july().first_day(),
            meta,
            Source::Lease(core_kernel::LeaseId::new()),
        );

        let resolution = CorrelationResolver::standard().resolve(&q, &[e.clone()]);
        assert_eq!(resolution.outcome, ResolutionOutcome::NotFound);
        assert_eq!(resolution.mismatches.len(), 1);
        assert_eq!(resolution.mismatches[0].entry_id, e.id);
        assert_eq!(resolution.mismatches[0].found_accounts, vec![other]);
    }

    #[test]
    fn test_lease_start_month_is_ineligible() {
        let q = query(MonthKey::new(2025, 6).unwrap());
        let resolution = CorrelationResolver::standard().resolve(&q, &[]);
        assert!(matches!(resolution.outcome, ResolutionOutcome::Ineligible { .. }));
    }

    #[test]
    fn test_monthly_query_ignores_lease_start_and_deleted_records() {
        let q = query(july());
        let mut meta = EntryMetadata::new(EntryKind::LeaseStart);
        meta.month_key = Some(july());
        let lease_start = entry(
            &q.receivable_account,
            "Lease start 2025-07",
            july().first_day(),
            meta,
            Source::Debtor(q.debtor_id),
        );

        let mut meta = EntryMetadata::new(EntryKind::MonthlyRentAccrual);
        meta.month_key = Some(july());
        let mut deleted = entry(
            &q.receivable_account,
            "rent",
            july().first_day(),
            meta,
            Source::Debtor(q.debtor_id),
        );
        deleted.soft_delete(Utc::now(), "duplicate").unwrap();

        let resolution = CorrelationResolver::standard().resolve(&q, &[lease_start, deleted]);
        assert_eq!(resolution.outcome, ResolutionOutcome::NotFound);
    }

    #[test]
    fn test_adjustment_in_target_month_does_not_stand_in_for_rent() {
        let q = query(july());
        let late_fee = entry(
            &q.receivable_account,
            "Late fee 2025-07",
            NaiveDate::from_ymd_opt(2025, 7, 3).unwrap(),
            EntryMetadata::new(EntryKind::Adjustment),
            Source::Debtor(q.debtor_id),
        );
        let mut payment_meta = EntryMetadata::new(EntryKind::Payment);
        payment_meta.month_key = Some(july());
        let payment = entry(
            &q.receivable_account,
            "Payment 2025-07",
            NaiveDate::from_ymd_opt(2025, 7, 5).unwrap(),
            payment_meta,
            Source::Debtor(q.debtor_id),
        );

        let resolution = CorrelationResolver::standard().resolve(&q, &[late_fee, payment]);
        assert_eq!(resolution.outcome, ResolutionOutcome::NotFound);

        let lease_start = CorrelationQuery {
            kind: EntryKind::LeaseStart,
            month: q.lease_start_month,
            ..q
        };
        let opening_adjustment = entry(
            &lease_start.receivable_account,
            "Lease start correction 2025-06",
            NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            EntryMetadata::new(EntryKind::Adjustment),
            Source::Debtor(lease_start.debtor_id),
        );
        let resolution =
            CorrelationResolver::standard().resolve(&lease_start, &[opening_adjustment]);
        assert_eq!(resolution.outcome, ResolutionOutcome::NotFound);
    }

    #[test]
    fn test_custom_ranking() {
        let resolver = CorrelationResolver::with_matchers(vec![Box::new(DateRangeMatcher)]);
        assert_eq!(resolver.matcher_names(), vec!["date_range"]);
    }
}
