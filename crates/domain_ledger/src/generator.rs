//! Accrual transaction generator
//!
//! Builds one balanced ledger record per billing period. The generator is
//! pure: it reads the debtor, lease and residence configuration it is handed
//! and never touches storage. Idempotency is the resolver's job.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{Money, MonthKey, TenantId};

use crate::account::{Account, AccountDirectory, AccountRole};
use crate::billing_period::{
    billing_periods, period_rent, prorate_first_month, BillingPeriod, Proration,
};
use crate::config::AccrualConfig;
use crate::debtor::Debtor;
use crate::entry::{
    EntryBuilder, EntryKind, EntryMetadata, LineItem, Source, SourceTag, TransactionEntry,
};
use crate::error::LedgerError;
use crate::lease::{Lease, ResidencePaymentConfig};

/// Inputs for generating a record
#[derive(Debug, Clone, Copy)]
pub struct AccrualRequest<'a> {
    pub debtor: &'a Debtor,
    /// Consulted for tenant identity when the debtor lacks it
    pub lease: Option<&'a Lease>,
    pub residence: Option<&'a ResidencePaymentConfig>,
    pub source_tag: SourceTag,
    pub created_at: DateTime<Utc>,
}

/// Components of the lease-start record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaseStartCharges {
    pub rent: Money,
    pub proration: Proration,
    pub admin_fee: Money,
    pub deposit: Money,
}

impl LeaseStartCharges {
    pub fn total(&self) -> Money {
        self.rent + self.admin_fee + self.deposit
    }
}

#[derive(Debug, Clone)]
pub struct AccrualGenerator {
    directory: Arc<AccountDirectory>,
    config: Arc<AccrualConfig>,
}

impl AccrualGenerator {
    pub fn new(directory: Arc<AccountDirectory>, config: Arc<AccrualConfig>) -> Self {
        Self { directory, config }
    }

    /// Billing periods of the debtor's lease
    pub fn periods(&self, debtor: &Debtor) -> Result<Vec<BillingPeriod>, LedgerError> {
        billing_periods(debtor.lease_start, debtor.lease_end, debtor.billing_cycle)
    }

    /// Charges that make up the lease-start record
    pub fn lease_start_charges(
        &self,
        debtor: &Debtor,
        residence: Option<&ResidencePaymentConfig>,
    ) -> Result<LeaseStartCharges, LedgerError> {
        let periods = self.periods(debtor)?;
        let first = periods.first().ok_or_else(|| {
            LedgerError::InvalidPeriod(format!("debtor {} has no billing periods", debtor.code))
        })?;

        let proration =
            prorate_first_month(debtor.monthly_rent, debtor.lease_start, &self.config.proration)?;
        let rent = period_rent(first, debtor.monthly_rent, &self.config.proration)?;

        let admin_fee = match residence.and_then(|r| r.admin_fee) {
            Some(rule) => rule.amount_for(debtor.monthly_rent),
            None if self.config.legacy_admin_fee.applies_to(&debtor.residence_name) => {
                self.config.legacy_admin_fee.amount.round_cents()
            }
            None => Money::zero(),
        };

        let deposit = match residence.and_then(|r| r.deposit) {
            Some(rule) => rule.amount_for(debtor.monthly_rent),
            None => debtor.monthly_rent.round_cents(),
        };

        Ok(LeaseStartCharges {
            rent,
            proration,
            admin_fee,
            deposit,
        })
    }

    /// Builds the lease-start record: prorated rent, admin fee and deposit
    ///
    /// # Errors
    ///
    /// - `Configuration` if an account cannot be resolved
    /// - `IdentityResolution` if the tenant cannot be identified
    pub fn lease_start_entry(
        &self,
        request: AccrualRequest<'_>,
    ) -> Result<TransactionEntry, LedgerError> {
        let debtor = request.debtor;
        let tenant_id = resolve_tenant(debtor, request.lease)?;
        let receivable = self.receivable(debtor)?;
        let income = self.directory.resolve(AccountRole::RentalIncome)?;
        let fees = self.directory.resolve(AccountRole::AdminFeeIncome)?;
        let deposits = self.directory.resolve(AccountRole::DepositLiability)?;

        let month = debtor.lease_start_month();
        let charges = self.lease_start_charges(debtor, request.residence)?;

        let description = format!(
            "Lease start {} - {} ({})",
            month, debtor.tenant_name, debtor.application_code
        );

        let builder = EntryBuilder::new(description, debtor.lease_start, EntryKind::LeaseStart)
            .source(Source::Debtor(debtor.id))
            .tagged(request.source_tag)
            .metadata(self.metadata(debtor, tenant_id, EntryKind::LeaseStart, month))
            .debit(&receivable, charges.total())
            .line(
                LineItem::credit(income, charges.rent).with_description(format!(
                    "Rent {} ({}/{} days)",
                    month, charges.proration.days_charged, charges.proration.days_in_month
                )),
            )
            .line(LineItem::credit(fees, charges.admin_fee).with_description("Admin fee"))
            .line(LineItem::credit(deposits, charges.deposit).with_description("Security deposit"));

        builder.build(request.created_at, request.source_tag.as_str())
    }

    /// Builds the record for the billing period starting in `month`
    ///
    /// Monthly leases charge one month of rent; longer cycles charge the
    /// whole period, attributed to its start month.
    ///
    /// # Errors
    ///
    /// `InvalidPeriod` if no billing period after the first starts in `month`.
    pub fn period_entry(
        &self,
        request: AccrualRequest<'_>,
        month: MonthKey,
    ) -> Result<TransactionEntry, LedgerError> {
        let debtor = request.debtor;
        let period = self.period_for(debtor, month)?;
        let tenant_id = resolve_tenant(debtor, request.lease)?;
        let receivable = self.receivable(debtor)?;
        let income = self.directory.resolve(AccountRole::RentalIncome)?;

        let rent = period_rent(&period, debtor.monthly_rent, &self.config.proration)?;
        let description = format!("Monthly rent accrual {} - {}", month, debtor.tenant_name);

        EntryBuilder::new(description, period.start, EntryKind::MonthlyRentAccrual)
            .source(Source::Debtor(debtor.id))
            .tagged(request.source_tag)
            .metadata(self.metadata(debtor, tenant_id, EntryKind::MonthlyRentAccrual, month))
            .debit(&receivable, rent)
            .credit(income, rent)
            .build(request.created_at, request.source_tag.as_str())
    }

    /// The non-initial billing period that starts in `month`
    pub fn period_for(
        &self,
        debtor: &Debtor,
        month: MonthKey,
    ) -> Result<BillingPeriod, LedgerError> {
        if month == debtor.lease_start_month() {
            return Err(LedgerError::InvalidPeriod(format!(
                "{} is the lease-start month of {}",
                month, debtor.code
            )));
        }
        self.periods(debtor)?
            .into_iter()
            .find(|p| !p.is_first() && p.month() == month)
            .ok_or_else(|| {
                LedgerError::InvalidPeriod(format!(
                    "no billing period of {} starts in {}",
                    debtor.code, month
                ))
            })
    }

    fn receivable(&self, debtor: &Debtor) -> Result<Account, LedgerError> {
        let expected = self.directory.receivable_for(&debtor.id)?;
        if debtor.receivable_account != expected.code {
            return Err(LedgerError::configuration(format!(
                "debtor {} carries receivable account {} instead of {}",
                debtor.code, debtor.receivable_account, expected.code
            )));
        }
        Ok(expected)
    }

    fn metadata(
        &self,
        debtor: &Debtor,
        tenant_id: TenantId,
        kind: EntryKind,
        month: MonthKey,
    ) -> EntryMetadata {
        EntryMetadata {
            kind,
            debtor_id: Some(debtor.id),
            tenant_id: Some(tenant_id),
            lease_id: Some(debtor.lease_id),
            application_code: Some(debtor.application_code.clone()),
            month_key: Some(month),
            residence_id: Some(debtor.residence_id),
        }
    }
}

/// Tenant identity from the debtor, else the lease; never a placeholder
fn resolve_tenant(debtor: &Debtor, lease: Option<&Lease>) -> Result<TenantId, LedgerError> {
    if let Some(id) = debtor.tenant_id {
        return Ok(id);
    }
    match lease {
        Some(lease) if lease.id == debtor.lease_id => lease.tenant_id.ok_or_else(|| {
            LedgerError::identity(&debtor.code, "neither debtor nor lease carries a tenant id")
        }),
        Some(lease) => Err(LedgerError::identity(
            &debtor.code,
            format!("lease {} does not belong to this debtor", lease.id),
        )),
        None => Err(LedgerError::identity(
            &debtor.code,
            "debtor has no tenant id and no lease was supplied",
        )),
    }
}
