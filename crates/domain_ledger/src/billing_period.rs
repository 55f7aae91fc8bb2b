//! Billing period calculation
//!
//! Splits a lease span into calendar-aligned billing periods and prices each
//! one. Only the first period is prorated; every later period (including a
//! truncated final one) charges full rent for each month it touches.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{DateRange, Money, MonthKey};

use crate::error::LedgerError;

/// How often a lease is billed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingCycle {
    #[default]
    Monthly,
    Quarterly,
    Semester,
    Annual,
}

impl BillingCycle {
    /// Number of calendar months in one block of this cycle
    pub fn months(&self) -> u32 {
        match self {
            BillingCycle::Monthly => 1,
            BillingCycle::Quarterly => 3,
            BillingCycle::Semester => 6,
            BillingCycle::Annual => 12,
        }
    }
}

/// Rules for pricing the first, partial month of a lease
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProrationPolicy {
    /// Day of month from which the flat daily rate replaces pro-rata rent
    pub flat_rate_from_day: u32,
    /// Charge per remaining day when the flat rate applies
    pub flat_daily_rate: Money,
}

impl Default for ProrationPolicy {
    fn default() -> Self {
        Self {
            flat_rate_from_day: 20,
            flat_daily_rate: Money::new(dec!(7)),
        }
    }
}

/// How the first month's rent was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProrationMethod {
    /// Lease starts on the 1st
    FullMonth,
    /// `rent × remaining / days_in_month`
    ProRata,
    /// `daily_rate × remaining`
    FlatDaily,
}

/// Result of pricing the first month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proration {
    pub amount: Money,
    pub days_charged: u32,
    pub days_in_month: u32,
    pub method: ProrationMethod,
}

/// One billing period; `end` is inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingPeriod {
    /// Position in the lease, 0 for the lease-start period
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BillingPeriod {
    /// Month the period is attributed to (the month it starts in)
    pub fn month(&self) -> MonthKey {
        MonthKey::from_date(self.start)
    }

    /// Number of calendar months the period touches
    pub fn months_spanned(&self) -> u32 {
        let span = self.month().months_until(MonthKey::from_date(self.end));
        (span.max(0) as u32) + 1
    }

    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start,
            end: self.end,
        }
    }
}

/// Splits `[start, end]` into contiguous, non-overlapping periods
///
/// The first period runs from `start` to the last day of the cycle block that
/// begins with the start month; each following period begins on the 1st of the
/// next month. The final period is truncated to `end`.
///
/// # Errors
///
/// Returns `InvalidPeriod` when `end` precedes `start`.
pub fn billing_periods(
    start: NaiveDate,
    end: NaiveDate,
    cycle: BillingCycle,
) -> Result<Vec<BillingPeriod>, LedgerError> {
    let range = DateRange::new(start, end)
        .map_err(|e| LedgerError::InvalidPeriod(e.to_string()))?;
    let block = cycle.months() as i32;

    let mut periods = Vec::new();
    let mut period_start = range.start;

    while period_start <= range.end {
        let block_end = MonthKey::from_date(period_start)
            .offset(block - 1)
            .last_day();
        let period_end = block_end.min(range.end);

        periods.push(BillingPeriod {
            index: periods.len(),
            start: period_start,
            end: period_end,
        });

        period_start = match period_end.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    Ok(periods)
}

/// Prices the first month of a lease starting on `start`
///
/// - starting on the 1st charges the full month
/// - starting on or after `flat_rate_from_day` charges the flat daily rate for
///   every remaining day, the start day included
/// - otherwise rent is prorated by remaining days over days in the month,
///   rounded to cents
pub fn prorate_first_month(
    monthly_rent: Money,
    start: NaiveDate,
    policy: &ProrationPolicy,
) -> Result<Proration, LedgerError> {
    let month = MonthKey::from_date(start);
    let days_in_month = month.days_in_month();
    let days_charged = days_in_month - start.day() + 1;

    if start.day() == 1 {
        return Ok(Proration {
            amount: monthly_rent.round_cents(),
            days_charged,
            days_in_month,
            method: ProrationMethod::FullMonth,
        });
    }

    if start.day() >= policy.flat_rate_from_day {
        let amount = policy
            .flat_daily_rate
            .multiply(Decimal::from(days_charged))
            .round_cents();
        return Ok(Proration {
            amount,
            days_charged,
            days_in_month,
            method: ProrationMethod::FlatDaily,
        });
    }

    let amount = monthly_rent.scale(days_charged, days_in_month)?.round_cents();
    Ok(Proration {
        amount,
        days_charged,
        days_in_month,
        method: ProrationMethod::ProRata,
    })
}

/// Rent charged for a period
///
/// The first period charges the prorated first month plus full rent for the
/// rest of its block. Later periods charge full rent per month touched; the
/// final period is not prorated.
pub fn period_rent(
    period: &BillingPeriod,
    monthly_rent: Money,
    policy: &ProrationPolicy,
) -> Result<Money, LedgerError> {
    let full_months = Decimal::from(period.months_spanned());

    if period.is_first() {
        let first = prorate_first_month(monthly_rent, period.start, policy)?;
        let rest = monthly_rent.multiply(full_months - Decimal::ONE);
        return Ok((first.amount + rest).round_cents());
    }

    Ok(monthly_rent.multiply(full_months).round_cents())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_periods_for_mid_month_start() {
        let periods =
            billing_periods(ymd(2025, 6, 15), ymd(2025, 12, 31), BillingCycle::Monthly).unwrap();

        assert_eq!(periods.len(), 7);
        assert_eq!(periods[0].start, ymd(2025, 6, 15));
        assert_eq!(periods[0].end, ymd(2025, 6, 30));
        assert_eq!(periods[1].start, ymd(2025, 7, 1));
        assert_eq!(periods[6].end, ymd(2025, 12, 31));
    }

    #[test]
    fn test_quarterly_first_block_aligns_to_calendar() {
        let periods =
            billing_periods(ymd(2025, 2, 10), ymd(2025, 9, 15), BillingCycle::Quarterly).unwrap();

        assert_eq!(periods[0].end, ymd(2025, 4, 30));
        assert_eq!(periods[1].start, ymd(2025, 5, 1));
        assert_eq!(periods[1].end, ymd(2025, 7, 31));
        assert_eq!(periods[2].end, ymd(2025, 9, 15));
        assert_eq!(periods.len(), 3);
    }

    #[test]
    fn test_one_day_lease() {
        let periods =
            billing_periods(ymd(2025, 3, 31), ymd(2025, 3, 31), BillingCycle::Monthly).unwrap();
        assert_eq!(periods.len(), 1);
        assert_eq!(periods[0].start, periods[0].end);
    }

    #[test]
    fn test_inverted_lease_is_rejected() {
        let result = billing_periods(ymd(2025, 3, 31), ymd(2025, 3, 1), BillingCycle::Monthly);
        assert!(matches!(result, Err(LedgerError::InvalidPeriod(_))));
    }

    #[test]
    fn test_proration_day_19_is_pro_rata() {
        let p = prorate_first_month(
            Money::new(dec!(300)),
            ymd(2025, 6, 19),
            &ProrationPolicy::default(),
        )
        .unwrap();
        assert_eq!(p.method, ProrationMethod::ProRata);
        assert_eq!(p.days_charged, 12);
        assert_eq!(p.amount.amount(), dec!(120.00));
    }

    #[test]
    fn test_proration_day_20_is_flat_daily() {
        let p = prorate_first_month(
            Money::new(dec!(300)),
            ymd(2025, 6, 20),
            &ProrationPolicy::default(),
        )
        .unwrap();
        assert_eq!(p.method, ProrationMethod::FlatDaily);
        assert_eq!(p.days_charged, 11);
        assert_eq!(p.amount.amount(), dec!(77.00));
    }

    #[test]
    fn test_final_partial_month_charges_full_rent() {
        let periods =
            billing_periods(ymd(2025, 6, 1), ymd(2025, 8, 10), BillingCycle::Monthly).unwrap();
        let last = periods.last().unwrap();
        let rent = period_rent(last, Money::new(dec!(200)), &ProrationPolicy::default()).unwrap();
        assert_eq!(rent.amount(), dec!(200));
    }
}
