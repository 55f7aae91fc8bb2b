//! Lease, residence configuration and payment inputs
//!
//! These records are owned by external collaborators (applications,
//! residence setup, payment capture) and are read-only to the ledger.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{DebtorId, LeaseId, Money, MonthKey, PaymentId, Rate, ResidenceId, TenantId};

use crate::billing_period::BillingCycle;
use crate::error::LedgerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaseStatus {
    Pending,
    Approved,
    Active,
    Ended,
    Cancelled,
}

impl LeaseStatus {
    /// A debtor is opened only once the lease is approved
    pub fn can_open_debtor(&self) -> bool {
        matches!(self, LeaseStatus::Approved | LeaseStatus::Active)
    }
}

/// An approved accommodation application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lease {
    pub id: LeaseId,
    pub application_code: String,
    /// Missing on some historical records
    pub tenant_id: Option<TenantId>,
    pub tenant_name: String,
    pub residence_id: ResidenceId,
    pub residence_name: String,
    pub room: Option<String>,
    pub monthly_rent: Money,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub billing_cycle: BillingCycle,
    pub status: LeaseStatus,
}

impl Lease {
    /// Checks the lease can be accrued
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.application_code.trim().is_empty() {
            return Err(LedgerError::InvalidLease(format!(
                "lease {} has no application code",
                self.id
            )));
        }
        if !self.monthly_rent.is_positive() {
            return Err(LedgerError::InvalidLease(format!(
                "lease {} has non-positive rent {}",
                self.id, self.monthly_rent
            )));
        }
        if self.end_date < self.start_date {
            return Err(LedgerError::InvalidLease(format!(
                "lease {} ends {} before it starts {}",
                self.id, self.end_date, self.start_date
            )));
        }
        Ok(())
    }

    pub fn start_month(&self) -> MonthKey {
        MonthKey::from_date(self.start_date)
    }

    pub fn end_month(&self) -> MonthKey {
        MonthKey::from_date(self.end_date)
    }
}

/// How a fee amount is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ChargeMode {
    Fixed { amount: Money },
    Percentage { rate: Rate },
    OneMonthRent,
}

/// An optional charge configured per residence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRule {
    pub enabled: bool,
    #[serde(flatten)]
    pub mode: ChargeMode,
}

impl FeeRule {
    pub fn fixed(amount: Money) -> Self {
        Self {
            enabled: true,
            mode: ChargeMode::Fixed { amount },
        }
    }

    pub fn percentage(rate: Rate) -> Self {
        Self {
            enabled: true,
            mode: ChargeMode::Percentage { rate },
        }
    }

    pub fn one_month_rent() -> Self {
        Self {
            enabled: true,
            mode: ChargeMode::OneMonthRent,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            mode: ChargeMode::Fixed { amount: Money::zero() },
        }
    }

    /// Charge for a lease at `monthly_rent`, zero when disabled
    pub fn amount_for(&self, monthly_rent: Money) -> Money {
        if !self.enabled {
            return Money::zero();
        }
        let amount = match self.mode {
            ChargeMode::Fixed { amount } => amount,
            ChargeMode::Percentage { rate } => rate.apply(&monthly_rent),
            ChargeMode::OneMonthRent => monthly_rent,
        };
        amount.round_cents()
    }
}

/// Payment settings of a residence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidencePaymentConfig {
    pub residence_id: ResidenceId,
    pub admin_fee: Option<FeeRule>,
    pub deposit: Option<FeeRule>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Reversed,
}

/// Cash received from a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub debtor_id: DebtorId,
    pub amount: Money,
    pub payment_date: NaiveDate,
    /// Month the payment settles, when the payer specified one
    pub allocated_month: Option<MonthKey>,
    pub status: PaymentStatus,
    pub reference: Option<String>,
}

impl Payment {
    /// Only confirmed payments reduce the balance
    pub fn counts(&self) -> bool {
        self.status == PaymentStatus::Confirmed
    }

    pub fn attributed_month(&self) -> MonthKey {
        self.allocated_month
            .unwrap_or_else(|| MonthKey::from_date(self.payment_date))
    }
}
