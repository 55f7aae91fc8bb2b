//! Row and domain conversions

use rust_decimal::Decimal;

use core_kernel::{DebtorId, EntryId, LeaseId, Money, MonthKey, PaymentId, ResidenceId, TenantId};
use domain_ledger::{Debtor, DebtorTotals, Lease, Payment, ResidencePaymentConfig, TransactionEntry};

use crate::codec::{from_json, from_text, to_json, to_text};
use crate::error::DatabaseError;
use crate::repositories::{DebtorRow, EntryRow, LeaseRow, PaymentRow, ResidenceConfigRow};

pub(crate) fn entry_to_row(entry: &TransactionEntry) -> Result<EntryRow, DatabaseError> {
    Ok(EntryRow {
        entry_id: entry.id.into(),
        entry_date: entry.date,
        description: entry.description.clone(),
        lines: to_json(&entry.lines)?,
        source_tag: to_text(&entry.source_tag)?,
        source: to_json(&entry.source)?,
        kind: to_text(&entry.metadata.kind)?,
        status: to_text(&entry.status)?,
        debtor_id: entry.debtor_id().map(Into::into),
        receivable_owner: entry.receivable_owner().map(Into::into),
        application_code: entry.metadata.application_code.clone(),
        correlation_key: entry.correlation_key().map(|key| key.as_str().to_string()),
        metadata: to_json(&entry.metadata)?,
        created_at: entry.created_at,
        created_by: entry.created_by.clone(),
        deleted_at: entry.deleted_at,
        deleted_reason: entry.deleted_reason.clone(),
    })
}

/// The metadata document is authoritative; `kind` and the key columns are
/// projections of it kept for indexing.
pub(crate) fn row_to_entry(row: EntryRow) -> Result<TransactionEntry, DatabaseError> {
    Ok(TransactionEntry {
        id: EntryId::from_uuid(row.entry_id),
        date: row.entry_date,
        description: row.description,
        lines: from_json(row.lines)?,
        source_tag: from_text(&row.source_tag)?,
        source: from_json(row.source)?,
        status: from_text(&row.status)?,
        metadata: from_json(row.metadata)?,
        created_at: row.created_at,
        created_by: row.created_by,
        deleted_at: row.deleted_at,
        deleted_reason: row.deleted_reason,
    })
}

pub(crate) fn debtor_to_row(debtor: &Debtor) -> Result<DebtorRow, DatabaseError> {
    Ok(DebtorRow {
        debtor_id: debtor.id.into(),
        code: debtor.code.clone(),
        tenant_id: debtor.tenant_id.map(Into::into),
        tenant_name: debtor.tenant_name.clone(),
        lease_id: debtor.lease_id.into(),
        application_code: debtor.application_code.clone(),
        residence_id: debtor.residence_id.into(),
        residence_name: debtor.residence_name.clone(),
        room: debtor.room.clone(),
        receivable_account: debtor.receivable_account.clone(),
        monthly_rent: debtor.monthly_rent.amount(),
        lease_start: debtor.lease_start,
        lease_end: debtor.lease_end,
        billing_cycle: to_text(&debtor.billing_cycle)?,
        total_owed: debtor.totals.total_owed.amount(),
        total_paid: debtor.totals.total_paid.amount(),
        current_balance: debtor.totals.current_balance.amount(),
        history: to_json(&debtor.history)?,
        last_reconciled_at: debtor.last_reconciled_at,
        created_at: debtor.created_at,
    })
}

pub(crate) fn row_to_debtor(row: DebtorRow) -> Result<Debtor, DatabaseError> {
    Ok(Debtor {
        id: DebtorId::from_uuid(row.debtor_id),
        code: row.code,
        tenant_id: row.tenant_id.map(TenantId::from_uuid),
        tenant_name: row.tenant_name,
        lease_id: LeaseId::from_uuid(row.lease_id),
        application_code: row.application_code,
        residence_id: ResidenceId::from_uuid(row.residence_id),
        residence_name: row.residence_name,
        room: row.room,
        receivable_account: row.receivable_account,
        monthly_rent: Money::new(row.monthly_rent),
        lease_start: row.lease_start,
        lease_end: row.lease_end,
        billing_cycle: from_text(&row.billing_cycle)?,
        totals: DebtorTotals {
            total_owed: Money::new(row.total_owed),
            total_paid: Money::new(row.total_paid),
            current_balance: Money::new(row.current_balance),
        },
        history: from_json(row.history)?,
        last_reconciled_at: row.last_reconciled_at,
        created_at: row.created_at,
    })
}

pub(crate) fn row_to_lease(row: LeaseRow) -> Result<Lease, DatabaseError> {
    Ok(Lease {
        id: LeaseId::from_uuid(row.lease_id),
        application_code: row.application_code,
        tenant_id: row.tenant_id.map(TenantId::from_uuid),
        tenant_name: row.tenant_name,
        residence_id: ResidenceId::from_uuid(row.residence_id),
        residence_name: row.residence_name,
        room: row.room,
        monthly_rent: Money::new(row.monthly_rent),
        start_date: row.start_date,
        end_date: row.end_date,
        billing_cycle: from_text(&row.billing_cycle)?,
        status: from_text(&row.status)?,
    })
}

pub(crate) fn payment_to_row(payment: &Payment) -> Result<PaymentRow, DatabaseError> {
    Ok(PaymentRow {
        payment_id: payment.id.into(),
        debtor_id: payment.debtor_id.into(),
        amount: payment.amount.amount(),
        payment_date: payment.payment_date,
        allocated_month: payment.allocated_month.map(|month| month.to_string()),
        status: to_text(&payment.status)?,
        reference: payment.reference.clone(),
    })
}

pub(crate) fn row_to_payment(row: PaymentRow) -> Result<Payment, DatabaseError> {
    let allocated_month = row
        .allocated_month
        .as_deref()
        .map(str::parse::<MonthKey>)
        .transpose()
        .map_err(DatabaseError::serialization)?;

    Ok(Payment {
        id: PaymentId::from_uuid(row.payment_id),
        debtor_id: DebtorId::from_uuid(row.debtor_id),
        amount: Money::new(row.amount),
        payment_date: row.payment_date,
        allocated_month,
        status: from_text(&row.status)?,
        reference: row.reference,
    })
}

pub(crate) fn row_to_residence_config(
    row: ResidenceConfigRow,
) -> Result<ResidencePaymentConfig, DatabaseError> {
    Ok(ResidencePaymentConfig {
        residence_id: ResidenceId::from_uuid(row.residence_id),
        admin_fee: row.admin_fee.map(from_json).transpose()?,
        deposit: row.deposit.map(from_json).transpose()?,
    })
}

/// Invoice amount of a record: the sum of its debit lines
pub(crate) fn invoice_amount(entry: &TransactionEntry) -> Decimal {
    entry.total_debits().amount()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use domain_ledger::{
        AccountDirectory, AccountRole, AccrualConfig, BillingCycle, EntryBuilder, EntryKind,
        EntryMetadata, LeaseStatus, Source, SourceTag,
    };
    use rust_decimal_macros::dec;

    fn accrual(debtor_id: DebtorId) -> TransactionEntry {
        let config = AccrualConfig::default();
        let directory = AccountDirectory::standard(&config.accounts);
        let receivable = directory.receivable_for(&debtor_id).unwrap();
        let income = directory.resolve(AccountRole::RentalIncome).unwrap().clone();
        let month = MonthKey::new(2025, 7).unwrap();
        let mut metadata = EntryMetadata::new(EntryKind::MonthlyRentAccrual);
        metadata.debtor_id = Some(debtor_id);
        metadata.application_code = Some("APP-00001".to_string());
        metadata.month_key = Some(month);

        let description = "Monthly rent accrual 2025-07";
        EntryBuilder::new(description, month.first_day(), EntryKind::MonthlyRentAccrual)
            .source(Source::Debtor(debtor_id))
            .tagged(SourceTag::Backfill)
            .metadata(metadata)
            .debit(&receivable, Money::new(dec!(200)))
            .credit(&income, Money::new(dec!(200)))
            .build(Utc::now(), "accrual-engine")
            .unwrap()
    }

    #[test]
    fn test_entry_row_projects_uniqueness_columns() {
        let debtor_id = DebtorId::new();
        let entry = accrual(debtor_id);
        let row = entry_to_row(&entry).unwrap();

        assert_eq!(row.debtor_id, Some(debtor_id.into()));
        assert_eq!(row.receivable_owner, Some(debtor_id.into()));
        assert_eq!(row.correlation_key.as_deref(), Some("monthly_rent_accrual:2025-07"));
        assert_eq!(row.kind, "monthly_rent_accrual");
        assert_eq!(row.status, "posted");
        assert_eq!(row.metadata["debtor_id"], serde_json::json!(debtor_id.as_uuid().to_string()));
        assert_eq!(row_to_entry(row).unwrap(), entry);
    }

    #[test]
    fn test_misfiled_entry_row_has_no_receivable_owner() {
        let debtor_id = DebtorId::new();
        let mut entry = accrual(DebtorId::new());
        entry.source = Source::Debtor(debtor_id);
        entry.metadata.debtor_id = Some(debtor_id);

        let row = entry_to_row(&entry).unwrap();
        assert_eq!(row.debtor_id, Some(debtor_id.into()));
        assert_eq!(row.receivable_owner, None);
    }

    #[test]
    fn test_lease_row_with_unknown_status_is_rejected() {
        let row = LeaseRow {
            lease_id: uuid::Uuid::new_v4(),
            application_code: "APP-00001".to_string(),
            tenant_id: None,
            tenant_name: "Ada".to_string(),
            residence_id: uuid::Uuid::new_v4(),
            residence_name: "Belvedere House".to_string(),
            room: None,
            monthly_rent: dec!(200),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            billing_cycle: "monthly".to_string(),
            status: "approved".to_string(),
        };

        let lease = row_to_lease(row.clone()).unwrap();
        assert_eq!(lease.status, LeaseStatus::Approved);
        assert_eq!(lease.billing_cycle, BillingCycle::Monthly);

        let bad = LeaseRow { status: "archived".to_string(), ..row };
        assert!(matches!(row_to_lease(bad), Err(DatabaseError::SerializationError(_))));
    }

    #[test]
    fn test_payment_month_parses() {
        let row = PaymentRow {
            payment_id: uuid::Uuid::new_v4(),
            debtor_id: uuid::Uuid::new_v4(),
            amount: dec!(150),
            payment_date: NaiveDate::from_ymd_opt(2025, 7, 3).unwrap(),
            allocated_month: Some("2025-06".to_string()),
            status: "confirmed".to_string(),
            reference: None,
        };
        let payment = row_to_payment(row).unwrap();
        assert_eq!(payment.allocated_month, Some(MonthKey::new(2025, 6).unwrap()));
    }
}
