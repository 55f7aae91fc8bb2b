//! Ledger records
//!
//! A `TransactionEntry` is immutable once posted. The only permitted mutation
//! is a soft delete, which keeps the record with a timestamp and a reason.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DebtorId, EntryId, LeaseId, Money, MonthKey, ResidenceId, TenantId};

use crate::account::{subaccount_owner, Account};
use crate::error::LedgerError;

/// Kind of ledger record, stored as the metadata `type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    LeaseStart,
    MonthlyRentAccrual,
    Payment,
    Adjustment,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::LeaseStart => "lease_start",
            EntryKind::MonthlyRentAccrual => "monthly_rent_accrual",
            EntryKind::Payment => "payment",
            EntryKind::Adjustment => "adjustment",
        }
    }

    /// Accrual kinds are the ones the generator produces
    pub fn is_accrual(&self) -> bool {
        matches!(self, EntryKind::LeaseStart | EntryKind::MonthlyRentAccrual)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Posted,
    Deleted,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Posted => "posted",
            EntryStatus::Deleted => "deleted",
        }
    }
}

/// What a ledger record refers back to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Source {
    Debtor(DebtorId),
    Lease(LeaseId),
}

/// Which process wrote a ledger record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    #[default]
    AccrualEngine,
    Backfill,
    Audit,
    Manual,
    Import,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::AccrualEngine => "accrual_engine",
            SourceTag::Backfill => "backfill",
            SourceTag::Audit => "audit",
            SourceTag::Manual => "manual",
            SourceTag::Import => "import",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line of a ledger record; exactly one of debit/credit is non-zero
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub account_code: String,
    pub account_name: String,
    pub debit: Money,
    pub credit: Money,
    pub description: Option<String>,
}

impl LineItem {
    pub fn debit(account: &Account, amount: Money) -> Self {
        Self {
            account_code: account.code.clone(),
            account_name: account.name.clone(),
            debit: amount,
            credit: Money::zero(),
            description: None,
        }
    }

    pub fn credit(account: &Account, amount: Money) -> Self {
        Self {
            account_code: account.code.clone(),
            account_name: account.name.clone(),
            debit: Money::zero(),
            credit: amount,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Debit minus credit
    pub fn net(&self) -> Money {
        self.debit - self.credit
    }
}

/// Correlation fields carried on every record
///
/// Historical records used inconsistent keys, so the generator fills every
/// field it knows rather than only the ones its own lookups need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMetadata {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub debtor_id: Option<DebtorId>,
    #[serde(rename = "student_id")]
    pub tenant_id: Option<TenantId>,
    pub lease_id: Option<LeaseId>,
    pub application_code: Option<String>,
    pub month_key: Option<MonthKey>,
    pub residence_id: Option<ResidenceId>,
}

impl EntryMetadata {
    pub fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            debtor_id: None,
            tenant_id: None,
            lease_id: None,
            application_code: None,
            month_key: None,
            residence_id: None,
        }
    }
}

/// Idempotency key of an accrual record, unique per debtor among posted records
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    pub fn lease_start(application_code: &str) -> Self {
        Self(format!("{}:{}", EntryKind::LeaseStart.as_str(), application_code))
    }

    pub fn monthly(month: MonthKey) -> Self {
        Self(format!("{}:{}", EntryKind::MonthlyRentAccrual.as_str(), month))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Rebuilds a key read back from storage
    pub fn from_stored(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A posted ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEntry {
    pub id: EntryId,
    /// Accrual date: the start of the period earned, not the write time
    pub date: NaiveDate,
    pub description: String,
    pub lines: Vec<LineItem>,
    pub source_tag: SourceTag,
    pub source: Source,
    pub status: EntryStatus,
    pub metadata: EntryMetadata,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_reason: Option<String>,
}

impl TransactionEntry {
    /// Debtor the record belongs to
    pub fn debtor_id(&self) -> Option<DebtorId> {
        match self.source {
            Source::Debtor(id) => Some(id),
            Source::Lease(_) => self.metadata.debtor_id,
        }
    }

    /// Debtor whose correlation slot the record occupies
    ///
    /// A record that names a debtor but posts only to other debtors' receivable
    /// sub-accounts occupies no slot.
    pub fn receivable_owner(&self) -> Option<DebtorId> {
        let debtor = self.debtor_id()?;
        let mut owners = self
            .lines
            .iter()
            .filter_map(|l| subaccount_owner(&l.account_code))
            .peekable();
        if owners.peek().is_none() {
            return Some(debtor);
        }
        owners.any(|owner| owner == debtor).then_some(debtor)
    }

    pub fn kind(&self) -> EntryKind {
        self.metadata.kind
    }

    pub fn is_posted(&self) -> bool {
        self.status == EntryStatus::Posted
    }

    /// Month the record is attributed to
    pub fn month(&self) -> MonthKey {
        self.metadata
            .month_key
            .unwrap_or_else(|| MonthKey::from_date(self.date))
    }

    /// Correlation key for accrual kinds; payments and adjustments have none
    pub fn correlation_key(&self) -> Option<CorrelationKey> {
        match self.metadata.kind {
            EntryKind::LeaseStart => {
                let application = self
                    .metadata
                    .application_code
                    .clone()
                    .or_else(|| self.metadata.lease_id.map(|id| id.to_string()))?;
                Some(CorrelationKey::lease_start(&application))
            }
            EntryKind::MonthlyRentAccrual => Some(CorrelationKey::monthly(self.month())),
            EntryKind::Payment | EntryKind::Adjustment => None,
        }
    }

    pub fn total_debits(&self) -> Money {
        self.lines.iter().map(|l| l.debit).sum()
    }

    pub fn total_credits(&self) -> Money {
        self.lines.iter().map(|l| l.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debits() == self.total_credits()
    }

    /// Net debit posted to `account_code`
    pub fn account_effect(&self, account_code: &str) -> Money {
        self.lines
            .iter()
            .filter(|l| l.account_code == account_code)
            .map(LineItem::net)
            .sum()
    }

    pub fn touches_account(&self, account_code: &str) -> bool {
        self.lines.iter().any(|l| l.account_code == account_code)
    }

    /// Account codes of lines matching `predicate`
    pub fn account_codes<'a>(
        &'a self,
        predicate: impl Fn(&str) -> bool + 'a,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.lines
            .iter()
            .map(|l| l.account_code.as_str())
            .filter(move |code| predicate(code))
    }

    /// Checks the double-entry rules
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.lines.iter().any(|l| l.debit.is_negative() || l.credit.is_negative()) {
            return Err(LedgerError::InvalidEntry("negative line amount".to_string()));
        }
        if self.lines.iter().any(|l| l.debit.is_positive() && l.credit.is_positive()) {
            return Err(LedgerError::InvalidEntry(
                "line carries both a debit and a credit".to_string(),
            ));
        }
        if !self.lines.iter().any(|l| l.debit.is_positive()) {
            return Err(LedgerError::InvalidEntry("entry has no debit line".to_string()));
        }
        if !self.lines.iter().any(|l| l.credit.is_positive()) {
            return Err(LedgerError::InvalidEntry("entry has no credit line".to_string()));
        }
        if !self.is_balanced() {
            return Err(LedgerError::UnbalancedEntry {
                debits: self.total_debits().amount(),
                credits: self.total_credits().amount(),
            });
        }
        Ok(())
    }

    /// Marks the record deleted, keeping it for the audit trail
    pub fn soft_delete(
        &mut self,
        at: DateTime<Utc>,
        reason: impl Into<String>,
    ) -> Result<(), LedgerError> {
        if self.status == EntryStatus::Deleted {
            return Err(LedgerError::InvalidEntry(format!("entry {} is already deleted", self.id)));
        }
        self.status = EntryStatus::Deleted;
        self.deleted_at = Some(at);
        self.deleted_reason = Some(reason.into());
        Ok(())
    }
}

/// Builder for ledger records
///
/// ```ignore
/// let entry = EntryBuilder::new("Rent 2025-07", date, EntryKind::MonthlyRentAccrual)
///     .source(Source::Debtor(debtor_id))
///     .debit(&receivable, rent)
///     .credit(&income, rent)
///     .build(now, "accrual_engine")?;
/// ```
#[derive(Debug, Clone)]
pub struct EntryBuilder {
    description: String,
    date: NaiveDate,
    lines: Vec<LineItem>,
    source: Option<Source>,
    source_tag: SourceTag,
    metadata: EntryMetadata,
}

impl EntryBuilder {
    pub fn new(description: impl Into<String>, date: NaiveDate, kind: EntryKind) -> Self {
        Self {
            description: description.into(),
            date,
            lines: Vec::new(),
            source: None,
            source_tag: SourceTag::default(),
            metadata: EntryMetadata::new(kind),
        }
    }

    pub fn source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn tagged(mut self, tag: SourceTag) -> Self {
        self.source_tag = tag;
        self
    }

    pub fn metadata(mut self, metadata: EntryMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Adds a debit line; zero amounts are dropped
    pub fn debit(self, account: &Account, amount: Money) -> Self {
        self.line(LineItem::debit(account, amount))
    }

    /// Adds a credit line; zero amounts are dropped
    pub fn credit(self, account: &Account, amount: Money) -> Self {
        self.line(LineItem::credit(account, amount))
    }

    pub fn line(mut self, line: LineItem) -> Self {
        if !(line.debit.is_zero() && line.credit.is_zero()) {
            self.lines.push(line);
        }
        self
    }

    /// Builds and validates the record
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntry` without a source or lines, `UnbalancedEntry`
    /// when debits and credits differ.
    pub fn build(
        self,
        created_at: DateTime<Utc>,
        created_by: impl Into<String>,
    ) -> Result<TransactionEntry, LedgerError> {
        let source = self
            .source
            .ok_or_else(|| LedgerError::InvalidEntry("entry has no source".to_string()))?;

        let entry = TransactionEntry {
            id: EntryId::new_v7(),
            date: self.date,
            description: self.description,
            lines: self.lines,
            source_tag: self.source_tag,
            source,
            status: EntryStatus::Posted,
            metadata: self.metadata,
            created_at,
            created_by: created_by.into(),
            deleted_at: None,
            deleted_reason: None,
        };
        entry.validate()?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountType;
    use rust_decimal_macros::dec;

    fn accounts() -> (Account, Account) {
        (
            Account::new("1100-x", "AR", AccountType::Asset),
            Account::new("4000", "Rental Income", AccountType::Income),
        )
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
    }

    #[test]
    fn test_balanced_entry_builds() {
        let (ar, income) = accounts();
        let debtor = DebtorId::new();
        let entry = EntryBuilder::new("Rent 2025-07", date(), EntryKind::MonthlyRentAccrual)
            .source(Source::Debtor(debtor))
            .debit(&ar, Money::new(dec!(200)))
            .credit(&income, Money::new(dec!(200)))
            .build(Utc::now(), "test")
            .unwrap();

        assert!(entry.is_balanced());
        assert_eq!(entry.debtor_id(), Some(debtor));
        assert_eq!(entry.account_effect("1100-x").amount(), dec!(200));
        assert_eq!(entry.correlation_key().unwrap().as_str(), "monthly_rent_accrual:2025-07");
    }

    #[test]
    fn test_unbalanced_entry_rejected() {
        let (ar, income) = accounts();
        let result = EntryBuilder::new("bad", date(), EntryKind::Adjustment)
            .source(Source::Debtor(DebtorId::new()))
            .debit(&ar, Money::new(dec!(200)))
            .credit(&income, Money::new(dec!(150)))
            .build(Utc::now(), "test");

        assert!(matches!(result, Err(LedgerError::UnbalancedEntry { .. })));
    }

    #[test]
    fn test_zero_lines_are_dropped() {
        let (ar, income) = accounts();
        let result = EntryBuilder::new("empty", date(), EntryKind::Adjustment)
            .source(Source::Debtor(DebtorId::new()))
            .debit(&ar, Money::zero())
            .credit(&income, Money::zero())
            .build(Utc::now(), "test");

        assert!(matches!(result, Err(LedgerError::InvalidEntry(_))));
    }

    #[test]
    fn test_soft_delete_keeps_audit_trail() {
        let (ar, income) = accounts();
        let mut entry = EntryBuilder::new("Rent 2025-07", date(), EntryKind::MonthlyRentAccrual)
            .source(Source::Debtor(DebtorId::new()))
            .debit(&ar, Money::new(dec!(10)))
            .credit(&income, Money::new(dec!(10)))
            .build(Utc::now(), "test")
            .unwrap();

        entry.soft_delete(Utc::now(), "duplicate").unwrap();
        assert_eq!(entry.status, EntryStatus::Deleted);
        assert_eq!(entry.deleted_reason.as_deref(), Some("duplicate"));
        assert!(entry.soft_delete(Utc::now(), "again").is_err());
    }

    #[test]
    fn test_metadata_serializes_legacy_field_names() {
        let mut metadata = EntryMetadata::new(EntryKind::LeaseStart);
        metadata.tenant_id = Some(TenantId::new());
        let json = serde_json::to_value(&metadata).unwrap();
        assert_eq!(json["type"], "lease_start");
        assert!(json.get("student_id").is_some());
    }

    #[test]
    fn test_record_on_foreign_receivable_holds_no_slot() {
        use crate::account::receivable_subaccount;

        let debtor = DebtorId::new();
        let income = Account::new("4000", "Rental Income", AccountType::Income);
        let post_to = |receivable: String| {
            EntryBuilder::new("Monthly rent accrual 2025-07", date(), EntryKind::MonthlyRentAccrual)
                .source(Source::Debtor(debtor))
                .debit(&Account::new(receivable, "AR", AccountType::Asset), Money::new(dec!(200)))
                .credit(&income, Money::new(dec!(200)))
                .build(Utc::now(), "test")
                .unwrap()
        };

        let own = post_to(receivable_subaccount("1100", &debtor));
        assert_eq!(own.receivable_owner(), Some(debtor));

        let misfiled = post_to(receivable_subaccount("1100", &DebtorId::new()));
        assert_eq!(misfiled.debtor_id(), Some(debtor));
        assert_eq!(misfiled.receivable_owner(), None);

        let control_only = post_to("1100".to_string());
        assert_eq!(control_only.receivable_owner(), Some(debtor));
    }
}
