//! Debtor read model
//!
//! A debtor is the tenant's receivable identity, opened once when the lease is
//! approved and never deleted. Its totals and history are derived data: only
//! the reconciler writes them, and always as a full replacement.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{DebtorId, EntryId, LeaseId, Money, MonthKey, PaymentId, ResidenceId, TenantId};

use crate::billing_period::BillingCycle;
use crate::entry::EntryKind;
use crate::lease::Lease;

/// Aggregate balance figures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebtorTotals {
    pub total_owed: Money,
    pub total_paid: Money,
    /// `total_owed - total_paid`
    pub current_balance: Money,
}

/// One receivable-touching ledger record in the debtor's log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerLine {
    pub entry_id: EntryId,
    pub date: NaiveDate,
    pub month: MonthKey,
    pub kind: EntryKind,
    pub description: String,
    /// Signed effect on the receivable sub-account
    pub amount: Money,
    pub running_balance: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub payment_id: PaymentId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
}

/// Accrual position of a single month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MonthSummary {
    pub accrued: Money,
    pub paid: Money,
    pub outstanding: Money,
}

/// Derived history arrays
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebtorHistory {
    pub transactions: Vec<LedgerLine>,
    pub payments_by_month: BTreeMap<MonthKey, Vec<PaymentRecord>>,
    pub monthly: BTreeMap<MonthKey, MonthSummary>,
    /// Months with a positive accrual
    pub accrued_months: Vec<MonthKey>,
    /// Accrued months whose payments cover the accrual
    pub paid_months: Vec<MonthKey>,
}

/// Everything the reconciler derives for a debtor
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DebtorState {
    pub totals: DebtorTotals,
    pub history: DebtorHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debtor {
    pub id: DebtorId,
    /// Sequential display code, `DR0001`
    pub code: String,
    pub tenant_id: Option<TenantId>,
    pub tenant_name: String,
    pub lease_id: LeaseId,
    pub application_code: String,
    pub residence_id: ResidenceId,
    pub residence_name: String,
    pub room: Option<String>,
    /// Receivable sub-account, `<control>-<debtorId>`
    pub receivable_account: String,
    pub monthly_rent: Money,
    pub lease_start: NaiveDate,
    pub lease_end: NaiveDate,
    pub billing_cycle: BillingCycle,
    pub totals: DebtorTotals,
    pub history: DebtorHistory,
    pub last_reconciled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Debtor {
    /// Opens a debtor for an approved lease
    pub fn open(
        id: DebtorId,
        code: impl Into<String>,
        lease: &Lease,
        receivable_account: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            tenant_id: lease.tenant_id,
            tenant_name: lease.tenant_name.clone(),
            lease_id: lease.id,
            application_code: lease.application_code.clone(),
            residence_id: lease.residence_id,
            residence_name: lease.residence_name.clone(),
            room: lease.room.clone(),
            receivable_account: receivable_account.into(),
            monthly_rent: lease.monthly_rent,
            lease_start: lease.start_date,
            lease_end: lease.end_date,
            billing_cycle: lease.billing_cycle,
            totals: DebtorTotals::default(),
            history: DebtorHistory::default(),
            last_reconciled_at: None,
            created_at,
        }
    }

    /// Display code for the n-th debtor
    pub fn format_code(sequence: u64) -> String {
        format!("DR{:04}", sequence)
    }

    pub fn lease_start_month(&self) -> MonthKey {
        MonthKey::from_date(self.lease_start)
    }

    pub fn lease_end_month(&self) -> MonthKey {
        MonthKey::from_date(self.lease_end)
    }

    /// Replaces the derived state wholesale
    pub fn apply_state(&mut self, state: DebtorState, reconciled_at: DateTime<Utc>) {
        self.totals = state.totals;
        self.history = state.history;
        self.last_reconciled_at = Some(reconciled_at);
    }

    /// Derived state without the reconciliation timestamp
    pub fn state(&self) -> DebtorState {
        DebtorState {
            totals: self.totals,
            history: self.history.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debtor_code_format() {
        assert_eq!(Debtor::format_code(1), "DR0001");
        assert_eq!(Debtor::format_code(42), "DR0042");
        assert_eq!(Debtor::format_code(12345), "DR12345");
    }

    #[test]
    fn test_history_serializes_month_keys_as_strings() {
        let mut history = DebtorHistory::default();
        history.monthly.insert(MonthKey::new(2025, 7).unwrap(), MonthSummary::default());
        let json = serde_json::to_value(&history).unwrap();
        assert!(json["monthly"].get("2025-07").is_some());

        let back: DebtorHistory = serde_json::from_value(json).unwrap();
        assert_eq!(back, history);
    }
}
