//! In-memory adapters
//!
//! One store implements every storage port so a test can seed leases,
//! residence settings and legacy records in one place. Uniqueness of posted
//! correlation keys is checked while holding the write lock, which gives the
//! same guarantee as the partial unique index in PostgreSQL.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use core_kernel::{
    AdapterHealth, DebtorId, DomainPort, EntryId, HealthCheckResult, HealthCheckable, LeaseId,
    MonthKey, PortError, ResidenceId,
};

use crate::debtor::Debtor;
use crate::entry::TransactionEntry;
use crate::lease::{Lease, Payment, ResidencePaymentConfig};
use crate::ports::{
    DebtorStore, EntryQuery, InvoiceEmitter, LeaseStore, LedgerStore, PaymentStore,
    ResidenceConfigStore,
};

#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<EntryId, TransactionEntry>>,
    debtors: RwLock<HashMap<DebtorId, Debtor>>,
    leases: RwLock<HashMap<LeaseId, Lease>>,
    payments: RwLock<Vec<Payment>>,
    residences: RwLock<HashMap<ResidenceId, ResidencePaymentConfig>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_lease(&self, lease: Lease) {
        self.leases.write().await.insert(lease.id, lease);
    }

    pub async fn insert_residence_config(&self, config: ResidencePaymentConfig) {
        self.residences.write().await.insert(config.residence_id, config);
    }

    /// Stores a record without the uniqueness check, as legacy imports did
    pub async fn insert_raw_entry(&self, entry: TransactionEntry) {
        self.entries.write().await.insert(entry.id, entry);
    }

    /// Every record, deleted ones included
    pub async fn all_entries(&self) -> Vec<TransactionEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    pub async fn posted_count(&self) -> usize {
        self.entries.read().await.values().filter(|e| e.is_posted()).count()
    }
}

impl DomainPort for InMemoryStore {}

#[async_trait]
impl HealthCheckable for InMemoryStore {
    async fn health_check(&self) -> HealthCheckResult {
        HealthCheckResult {
            adapter_id: "in-memory-ledger".to_string(),
            status: AdapterHealth::Healthy,
            latency_ms: 0,
            message: None,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryStore {
    async fn insert_entry(&self, entry: &TransactionEntry) -> Result<(), PortError> {
        let mut entries = self.entries.write().await;

        if entries.contains_key(&entry.id) {
            return Err(PortError::conflict(format!("entry {} already exists", entry.id)));
        }

        if entry.is_posted() {
            if let (Some(debtor), Some(key)) = (entry.receivable_owner(), entry.correlation_key()) {
                let taken = entries.values().any(|existing| {
                    existing.is_posted()
                        && existing.receivable_owner() == Some(debtor)
                        && existing.correlation_key().as_ref() == Some(&key)
                });
                if taken {
                    return Err(PortError::conflict(format!(
                        "{} already posted for {}",
                        key, debtor
                    )));
                }
            }
        }

        entries.insert(entry.id, entry.clone());
        Ok(())
    }

    async fn get_entry(&self, id: EntryId) -> Result<TransactionEntry, PortError> {
        self.entries
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("TransactionEntry", id))
    }

    async fn find_entries(&self, query: &EntryQuery) -> Result<Vec<TransactionEntry>, PortError> {
        Ok(self
            .entries
            .read()
            .await
            .values()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    async fn soft_delete(
        &self,
        id: EntryId,
        at: DateTime<Utc>,
        reason: &str,
    ) -> Result<TransactionEntry, PortError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(&id)
            .ok_or_else(|| PortError::not_found("TransactionEntry", id))?;
        entry
            .soft_delete(at, reason)
            .map_err(|e| PortError::validation(e.to_string()))?;
        Ok(entry.clone())
    }
}

#[async_trait]
impl DebtorStore for InMemoryStore {
    async fn get_debtor(&self, id: DebtorId) -> Result<Debtor, PortError> {
        self.debtors
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Debtor", id))
    }

    async fn find_by_lease(&self, lease_id: LeaseId) -> Result<Option<Debtor>, PortError> {
        Ok(self
            .debtors
            .read()
            .await
            .values()
            .find(|d| d.lease_id == lease_id)
            .cloned())
    }

    async fn list_debtors(&self) -> Result<Vec<Debtor>, PortError> {
        let mut debtors: Vec<Debtor> = self.debtors.read().await.values().cloned().collect();
        debtors.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(debtors)
    }

    async fn insert_debtor(&self, debtor: &Debtor) -> Result<(), PortError> {
        let mut debtors = self.debtors.write().await;
        if debtors.values().any(|d| d.lease_id == debtor.lease_id || d.id == debtor.id) {
            return Err(PortError::conflict(format!(
                "lease {} already has a debtor",
                debtor.lease_id
            )));
        }
        debtors.insert(debtor.id, debtor.clone());
        Ok(())
    }

    async fn save_debtor(&self, debtor: &Debtor) -> Result<(), PortError> {
        let mut debtors = self.debtors.write().await;
        match debtors.get_mut(&debtor.id) {
            Some(existing) => {
                *existing = debtor.clone();
                Ok(())
            }
            None => Err(PortError::not_found("Debtor", debtor.id)),
        }
    }

    async fn count_debtors(&self) -> Result<u64, PortError> {
        Ok(self.debtors.read().await.len() as u64)
    }
}

#[async_trait]
impl LeaseStore for InMemoryStore {
    async fn get_lease(&self, id: LeaseId) -> Result<Lease, PortError> {
        self.leases
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| PortError::not_found("Lease", id))
    }
}

#[async_trait]
impl PaymentStore for InMemoryStore {
    async fn payments_for_debtor(&self, debtor_id: DebtorId) -> Result<Vec<Payment>, PortError> {
        Ok(self
            .payments
            .read()
            .await
            .iter()
            .filter(|p| p.debtor_id == debtor_id)
            .cloned()
            .collect())
    }

    async fn record_payment(&self, payment: &Payment) -> Result<(), PortError> {
        let mut payments = self.payments.write().await;
        if payments.iter().any(|p| p.id == payment.id) {
            return Err(PortError::conflict(format!("payment {} already recorded", payment.id)));
        }
        payments.push(payment.clone());
        Ok(())
    }
}

#[async_trait]
impl ResidenceConfigStore for InMemoryStore {
    async fn get_config(
        &self,
        residence_id: ResidenceId,
    ) -> Result<Option<ResidencePaymentConfig>, PortError> {
        Ok(self.residences.read().await.get(&residence_id).cloned())
    }
}

/// Invoice emitter that records the order it was called in
#[derive(Debug, Default)]
pub struct RecordingInvoiceEmitter {
    emitted: RwLock<Vec<EntryId>>,
    failing: RwLock<HashSet<EntryId>>,
    failing_months: RwLock<HashSet<MonthKey>>,
}

impl RecordingInvoiceEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes emission of `entry_id` fail
    pub async fn fail_on(&self, entry_id: EntryId) {
        self.failing.write().await.insert(entry_id);
    }

    /// Makes emission fail for every record attributed to `month`
    pub async fn fail_for_month(&self, month: MonthKey) {
        self.failing_months.write().await.insert(month);
    }

    /// Successfully emitted records, in call order
    pub async fn emitted(&self) -> Vec<EntryId> {
        self.emitted.read().await.clone()
    }
}

impl DomainPort for RecordingInvoiceEmitter {}

#[async_trait]
impl InvoiceEmitter for RecordingInvoiceEmitter {
    async fn emit(&self, entry: &TransactionEntry, _debtor: &Debtor) -> Result<(), PortError> {
        let failing = self.failing.read().await.contains(&entry.id)
            || self.failing_months.read().await.contains(&entry.month());
        if failing {
            return Err(PortError::ServiceUnavailable {
                service: "invoice-delivery".to_string(),
            });
        }
        self.emitted.write().await.push(entry.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{receivable_subaccount, Account, AccountType};
    use crate::entry::{EntryBuilder, EntryKind, EntryMetadata, Source};
    use chrono::NaiveDate;
    use core_kernel::Money;
    use rust_decimal_macros::dec;

    fn by_debtor(debtor: DebtorId) -> EntryQuery {
        EntryQuery {
            debtor_id: Some(debtor),
            ..Default::default()
        }
    }

    fn monthly(debtor: DebtorId, month: MonthKey) -> TransactionEntry {
        monthly_on(debtor, month, "1100-a")
    }

    fn monthly_on(debtor: DebtorId, month: MonthKey, receivable: &str) -> TransactionEntry {
        let mut meta = EntryMetadata::new(EntryKind::MonthlyRentAccrual);
        meta.month_key = Some(month);
        meta.debtor_id = Some(debtor);
        let description = format!("Monthly rent accrual {}", month);
        let ar = Account::new(receivable, "AR", AccountType::Asset);
        let rent = Account::new("4000", "Rent", AccountType::Income);
        EntryBuilder::new(description, month.first_day(), EntryKind::MonthlyRentAccrual)
            .source(Source::Debtor(debtor))
            .metadata(meta)
            .debit(&ar, Money::new(dec!(100)))
            .credit(&rent, Money::new(dec!(100)))
            .build(Utc::now(), "test")
            .unwrap()
    }

    #[tokio::test]
    async fn test_posted_correlation_key_is_unique_per_debtor() {
        let store = InMemoryStore::new();
        let debtor = DebtorId::new();
        let july = MonthKey::new(2025, 7).unwrap();

        store.insert_entry(&monthly(debtor, july)).await.unwrap();
        let second = store.insert_entry(&monthly(debtor, july)).await;
        assert!(second.unwrap_err().is_conflict());

        store.insert_entry(&monthly(DebtorId::new(), july)).await.unwrap();
        store.insert_entry(&monthly(debtor, july.succ())).await.unwrap();
    }

    #[tokio::test]
    async fn test_record_on_foreign_receivable_does_not_take_the_slot() {
        let store = InMemoryStore::new();
        let debtor = DebtorId::new();
        let july = MonthKey::new(2025, 7).unwrap();
        let foreign = receivable_subaccount("1100", &DebtorId::new());

        store.insert_entry(&monthly_on(debtor, july, &foreign)).await.unwrap();
        let own = receivable_subaccount("1100", &debtor);
        store.insert_entry(&monthly_on(debtor, july, &own)).await.unwrap();

        let again = store.insert_entry(&monthly_on(debtor, july, &own)).await;
        assert!(again.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_soft_deleted_key_can_be_reposted() {
        let store = InMemoryStore::new();
        let debtor = DebtorId::new();
        let july = MonthKey::new(2025, 7).unwrap();
        let first = monthly(debtor, july);

        store.insert_entry(&first).await.unwrap();
        store.soft_delete(first.id, Utc::now(), "wrong amount").await.unwrap();
        store.insert_entry(&monthly(debtor, july)).await.unwrap();

        let visible = store.find_entries(&by_debtor(debtor)).await.unwrap();
        assert_eq!(visible.len(), 1);
        let all = store
            .find_entries(&by_debtor(debtor).with_deleted())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_debtor_is_not_found() {
        let store = InMemoryStore::new();
        let err = store.get_debtor(DebtorId::new()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.get_config(ResidenceId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_date_range_restricts_keyed_query() {
        let store = InMemoryStore::new();
        let debtor = DebtorId::new();
        let july = MonthKey::new(2025, 7).unwrap();
        store.insert_entry(&monthly(debtor, july)).await.unwrap();
        store.insert_entry(&monthly(debtor, july.succ())).await.unwrap();

        let range = core_kernel::DateRange::new(
            NaiveDate::from_ymd_opt(2025, 8, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 31).unwrap(),
        )
        .unwrap();
        let found = store
            .find_entries(&by_debtor(debtor).within(range))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].month(), july.succ());
    }
}
