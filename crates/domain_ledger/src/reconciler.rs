//! Debtor balance reconciler
//!
//! Rebuilds a debtor's derived state by replaying every posted ledger record
//! and confirmed payment. The result fully replaces what was stored, so the
//! reconciler is safe to re-run at any time and is the repair path after any
//! partial failure.

use std::sync::Arc;

use tracing::{info, instrument};

use core_kernel::{Clock, DebtorId, Money};

use crate::debtor::{Debtor, DebtorHistory, DebtorState, DebtorTotals, LedgerLine, PaymentRecord};
use crate::entry::{EntryKind, TransactionEntry};
use crate::error::LedgerError;
use crate::lease::Payment;
use crate::ports::{DebtorStore, EntryQuery, LedgerStore, PaymentStore};

/// Derives a debtor's state from its records and payments
///
/// Records that do not touch the debtor's receivable sub-account and
/// soft-deleted records are ignored. Payment-kind records appear in the
/// transaction log but do not count towards `total_owed`; cash received is
/// taken from confirmed payments only.
pub fn replay(debtor: &Debtor, entries: &[TransactionEntry], payments: &[Payment]) -> DebtorState {
    let receivable = debtor.receivable_account.as_str();

    let mut relevant: Vec<&TransactionEntry> = entries
        .iter()
        .filter(|e| e.is_posted() && e.touches_account(receivable))
        .collect();
    relevant.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });

    let mut history = DebtorHistory::default();
    let mut running = Money::zero();
    let mut total_owed = Money::zero();

    for entry in relevant {
        let effect = entry.account_effect(receivable);
        running += effect;

        if entry.kind() != EntryKind::Payment {
            total_owed += effect;
            history.monthly.entry(entry.month()).or_default().accrued += effect;
        }

        history.transactions.push(LedgerLine {
            entry_id: entry.id,
            date: entry.date,
            month: entry.month(),
            kind: entry.kind(),
            description: entry.description.clone(),
            amount: effect,
            running_balance: running,
        });
    }

    let mut confirmed: Vec<&Payment> = payments
        .iter()
        .filter(|p| p.debtor_id == debtor.id && p.counts())
        .collect();
    confirmed.sort_by(|a, b| a.payment_date.cmp(&b.payment_date).then(a.id.cmp(&b.id)));

    let mut total_paid = Money::zero();
    for payment in confirmed {
        let month = payment.attributed_month();
        total_paid += payment.amount;
        history.monthly.entry(month).or_default().paid += payment.amount;
        history
            .payments_by_month
            .entry(month)
            .or_default()
            .push(PaymentRecord {
                payment_id: payment.id,
                amount: payment.amount,
                payment_date: payment.payment_date,
                reference: payment.reference.clone(),
            });
    }

    for (month, summary) in history.monthly.iter_mut() {
        summary.outstanding = summary.accrued - summary.paid;
        if summary.accrued.is_positive() {
            history.accrued_months.push(*month);
            if summary.paid >= summary.accrued {
                history.paid_months.push(*month);
            }
        }
    }

    DebtorState {
        totals: DebtorTotals {
            total_owed,
            total_paid,
            current_balance: total_owed - total_paid,
        },
        history,
    }
}

/// Loads, replays and saves debtors
#[derive(Clone)]
pub struct DebtorReconciler {
    ledger: Arc<dyn LedgerStore>,
    debtors: Arc<dyn DebtorStore>,
    payments: Arc<dyn PaymentStore>,
    clock: Arc<dyn Clock>,
}

impl DebtorReconciler {
    pub fn new(
        ledger: Arc<dyn LedgerStore>,
        debtors: Arc<dyn DebtorStore>,
        payments: Arc<dyn PaymentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            debtors,
            payments,
            clock,
        }
    }

    /// Rebuilds and persists the debtor's derived state
    ///
    /// # Errors
    ///
    /// `DebtorNotFound` for an unknown debtor; `Persistence` if a store fails.
    #[instrument(skip(self), fields(debtor_id = %debtor_id))]
    pub async fn reconcile(&self, debtor_id: DebtorId) -> Result<Debtor, LedgerError> {
        let mut debtor = self.debtors.get_debtor(debtor_id).await.map_err(|e| {
            if e.is_not_found() {
                LedgerError::DebtorNotFound(debtor_id.to_string())
            } else {
                LedgerError::Persistence(e)
            }
        })?;

        let entries = self.ledger.find_entries(&EntryQuery::for_debtor(&debtor)).await?;
        let payments = self.payments.payments_for_debtor(debtor_id).await?;

        let state = replay(&debtor, &entries, &payments);
        let changed = state != debtor.state();
        debtor.apply_state(state, self.clock.now());
        self.debtors.save_debtor(&debtor).await?;

        info!(
            debtor = %debtor.code,
            owed = %debtor.totals.total_owed,
            paid = %debtor.totals.total_paid,
            balance = %debtor.totals.current_balance,
            changed,
            "debtor reconciled"
        );
        Ok(debtor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{receivable_subaccount, Account, AccountType};
    use crate::billing_period::BillingCycle;
    use crate::entry::{EntryBuilder, EntryMetadata, Source};
    use crate::lease::{Lease, LeaseStatus, PaymentStatus};
    use chrono::{NaiveDate, Utc};
    use core_kernel::{LeaseId, MonthKey, PaymentId, ResidenceId, TenantId};
    use rust_decimal_macros::dec;

    fn debtor() -> Debtor {
        let lease = Lease {
            id: LeaseId::new(),
            application_code: "APP-7".to_string(),
            tenant_id: Some(TenantId::new()),
            tenant_name: "Rudo".to_string(),
            residence_id: ResidenceId::new(),
            residence_name: "Avondale".to_string(),
            room: None,
            monthly_rent: Money::new(dec!(200)),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            billing_cycle: BillingCycle::Monthly,
            status: LeaseStatus::Active,
        };
        let id = core_kernel::DebtorId::new();
        Debtor::open(id, "DR0001", &lease, receivable_subaccount("1100", &id), Utc::now())
    }

    fn accrual(
        debtor: &Debtor,
        kind: EntryKind,
        month: MonthKey,
        amount: Money,
    ) -> TransactionEntry {
        let mut meta = EntryMetadata::new(kind);
        meta.month_key = Some(month);
        EntryBuilder::new(format!("{} {}", kind, month), month.first_day(), kind)
            .source(Source::Debtor(debtor.id))
            .metadata(meta)
            .debit(&Account::new(&debtor.receivable_account, "AR", AccountType::Asset), amount)
            .credit(&Account::new("4000", "Rent", AccountType::Income), amount)
            .build(Utc::now(), "test")
            .unwrap()
    }

    fn payment(debtor: &Debtor, amount: Money, day: NaiveDate, status: PaymentStatus) -> Payment {
        Payment {
            id: PaymentId::new(),
            debtor_id: debtor.id,
            amount,
            payment_date: day,
            allocated_month: None,
            status,
            reference: None,
        }
    }

    #[test]
    fn test_replay_totals_and_history() {
        let debtor = debtor();
        let june = MonthKey::new(2025, 6).unwrap();
        let july = june.succ();
        let entries = vec![
            accrual(&debtor, EntryKind::MonthlyRentAccrual, july, Money::new(dec!(200))),
            accrual(&debtor, EntryKind::LeaseStart, june, Money::new(dec!(400))),
        ];
        let payments = vec![
            payment(&debtor, Money::new(dec!(400)), june.first_day(), PaymentStatus::Confirmed),
            payment(&debtor, Money::new(dec!(50)), july.first_day(), PaymentStatus::Reversed),
        ];

        let state = replay(&debtor, &entries, &payments);

        assert_eq!(state.totals.total_owed.amount(), dec!(600));
        assert_eq!(state.totals.total_paid.amount(), dec!(400));
        assert_eq!(state.totals.current_balance.amount(), dec!(200));
        assert_eq!(state.history.transactions[0].month, june);
        assert_eq!(state.history.transactions[1].running_balance.amount(), dec!(600));
        assert_eq!(state.history.accrued_months, vec![june, july]);
        assert_eq!(state.history.paid_months, vec![june]);
        assert_eq!(state.history.monthly[&july].outstanding.amount(), dec!(200));
    }

    #[test]
    fn test_replay_ignores_deleted_and_foreign_records() {
        let debtor = debtor();
        let other = self::debtor();
        let july = MonthKey::new(2025, 7).unwrap();

        let mut deleted =
            accrual(&debtor, EntryKind::MonthlyRentAccrual, july, Money::new(dec!(200)));
        deleted.soft_delete(Utc::now(), "duplicate").unwrap();
        let foreign = accrual(&other, EntryKind::MonthlyRentAccrual, july, Money::new(dec!(200)));

        let state = replay(&debtor, &[deleted, foreign], &[]);
        assert!(state.totals.total_owed.is_zero());
        assert!(state.history.transactions.is_empty());
    }

    #[test]
    fn test_replay_is_order_independent() {
        let debtor = debtor();
        let june = MonthKey::new(2025, 6).unwrap();
        let a = accrual(&debtor, EntryKind::LeaseStart, june, Money::new(dec!(400)));
        let b = accrual(&debtor, EntryKind::MonthlyRentAccrual, june.succ(), Money::new(dec!(200)));

        let forward = replay(&debtor, &[a.clone(), b.clone()], &[]);
        let backward = replay(&debtor, &[b, a], &[]);
        assert_eq!(forward, backward);
    }
}
