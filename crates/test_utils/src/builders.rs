//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{DebtorId, LeaseId, Money, MonthKey, PaymentId, ResidenceId, TenantId};
use domain_ledger::{
    Account, AccountType, BillingCycle, Debtor, EntryBuilder, EntryKind, EntryMetadata, Lease,
    LeaseStatus, Payment, PaymentStatus, Source, SourceTag, TransactionEntry,
};

use crate::fixtures::{MoneyFixtures, StringFixtures, TemporalFixtures};

/// Builder for constructing test leases
pub struct TestLeaseBuilder {
    lease: Lease,
}

impl Default for TestLeaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLeaseBuilder {
    /// Active monthly lease, $200 rent, June to December 2025
    pub fn new() -> Self {
        Self {
            lease: Lease {
                id: LeaseId::new(),
                application_code: StringFixtures::application_code(1),
                tenant_id: Some(TenantId::new()),
                tenant_name: StringFixtures::tenant_name().to_string(),
                residence_id: ResidenceId::new(),
                residence_name: StringFixtures::residence_name().to_string(),
                room: Some("B12".to_string()),
                monthly_rent: MoneyFixtures::rent_200(),
                start_date: TemporalFixtures::lease_start_june(),
                end_date: TemporalFixtures::lease_end_december(),
                billing_cycle: BillingCycle::Monthly,
                status: LeaseStatus::Active,
            },
        }
    }

    pub fn with_application_code(mut self, code: impl Into<String>) -> Self {
        self.lease.application_code = code.into();
        self
    }

    pub fn with_rent(mut self, rent: Money) -> Self {
        self.lease.monthly_rent = rent;
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.lease.start_date = start;
        self.lease.end_date = end;
        self
    }

    pub fn with_status(mut self, status: LeaseStatus) -> Self {
        self.lease.status = status;
        self
    }

    pub fn with_cycle(mut self, cycle: BillingCycle) -> Self {
        self.lease.billing_cycle = cycle;
        self
    }

    pub fn with_residence(mut self, id: ResidenceId, name: impl Into<String>) -> Self {
        self.lease.residence_id = id;
        self.lease.residence_name = name.into();
        self
    }

    /// Historical record with no tenant reference
    pub fn without_tenant(mut self) -> Self {
        self.lease.tenant_id = None;
        self
    }

    pub fn build(self) -> Lease {
        self.lease
    }
}

/// Builder for constructing test payments
pub struct TestPaymentBuilder {
    payment: Payment,
}

impl TestPaymentBuilder {
    pub fn new(debtor_id: DebtorId, amount: Money, payment_date: NaiveDate) -> Self {
        Self {
            payment: Payment {
                id: PaymentId::new(),
                debtor_id,
                amount,
                payment_date,
                allocated_month: None,
                status: PaymentStatus::Confirmed,
                reference: None,
            },
        }
    }

    pub fn allocated_to(mut self, month: MonthKey) -> Self {
        self.payment.allocated_month = Some(month);
        self
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.payment.status = status;
        self
    }

    pub fn build(self) -> Payment {
        self.payment
    }
}

/// Builder for hand-made records, the shape legacy imports left behind
///
/// Builds a monthly rent accrual unless another kind is chosen.
pub struct LegacyAccrualBuilder {
    kind: EntryKind,
    debtor_id: DebtorId,
    application_code: String,
    receivable: String,
    month: MonthKey,
    amount: Money,
    created_at: DateTime<Utc>,
    explicit_key: bool,
}

impl LegacyAccrualBuilder {
    /// Record posted against the debtor's own receivable
    pub fn for_debtor(debtor: &Debtor, month: MonthKey) -> Self {
        Self {
            kind: EntryKind::MonthlyRentAccrual,
            debtor_id: debtor.id,
            application_code: debtor.application_code.clone(),
            receivable: debtor.receivable_account.clone(),
            month,
            amount: debtor.monthly_rent,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            explicit_key: true,
        }
    }

    /// Lease-start record for the debtor's first month
    pub fn lease_start(debtor: &Debtor) -> Self {
        Self::for_debtor(debtor, debtor.lease_start_month()).of_kind(EntryKind::LeaseStart)
    }

    pub fn of_kind(mut self, kind: EntryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Posts to a different receivable sub-account
    pub fn on_receivable(mut self, code: impl Into<String>) -> Self {
        self.receivable = code.into();
        self
    }

    /// Keeps this debtor's application code but books the record on
    /// `owner`'s receivable, as misattributed imports did
    pub fn misattributed_to(mut self, owner: &Debtor) -> Self {
        self.debtor_id = owner.id;
        self.receivable = owner.receivable_account.clone();
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = amount;
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    /// Drops the month key from metadata, leaving only the description
    pub fn without_month_key(mut self) -> Self {
        self.explicit_key = false;
        self
    }

    pub fn build(self) -> TransactionEntry {
        let mut metadata = EntryMetadata::new(self.kind);
        metadata.debtor_id = Some(self.debtor_id);
        metadata.application_code = Some(self.application_code);
        if self.explicit_key {
            metadata.month_key = Some(self.month);
        }
        let label = match self.kind {
            EntryKind::LeaseStart => "Lease start",
            EntryKind::MonthlyRentAccrual => "Monthly rent accrual",
            EntryKind::Payment => "Payment received",
            EntryKind::Adjustment => "Manual adjustment",
        };
        let receivable = Account::new(&self.receivable, "Accounts Receivable", AccountType::Asset);
        let description = format!("{} {}", label, self.month);
        let builder = EntryBuilder::new(description, self.month.first_day(), self.kind)
            .source(Source::Debtor(self.debtor_id))
            .tagged(SourceTag::Import)
            .metadata(metadata);
        let builder = match self.kind {
            EntryKind::Payment => builder
                .debit(&Account::new("1000", "Bank", AccountType::Asset), self.amount)
                .credit(&receivable, self.amount),
            EntryKind::Adjustment => builder
                .debit(&receivable, self.amount)
                .credit(&Account::new("4900", "Sundry Income", AccountType::Income), self.amount),
            EntryKind::LeaseStart | EntryKind::MonthlyRentAccrual => builder
                .debit(&receivable, self.amount)
                .credit(&Account::new("4000", "Rental Income", AccountType::Income), self.amount),
        };
        builder.build(self.created_at, "legacy_import").unwrap()
    }
}
