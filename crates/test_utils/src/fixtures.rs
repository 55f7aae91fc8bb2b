//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the rental ledger. Dates are fixed so
//! month attribution in tests never depends on when the suite runs.

use chrono::NaiveDate;
use core_kernel::{FixedClock, Money, MonthKey};
use rust_decimal_macros::dec;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Standard monthly rent used by most scenarios
    pub fn rent_200() -> Money {
        Money::new(dec!(200))
    }

    /// Rent used in the proration examples
    pub fn rent_300() -> Money {
        Money::new(dec!(300))
    }

    /// The legacy fixed admin fee
    pub fn legacy_admin_fee() -> Money {
        Money::new(dec!(20))
    }

    pub fn zero() -> Money {
        Money::zero()
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Lease start on the first of the month (no proration)
    pub fn lease_start_june() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    /// Mid-month lease start (prorated)
    pub fn lease_start_mid_june() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    pub fn lease_end_december() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
    }

    /// "Today" for scenarios where the whole 2025 lease has accrued
    pub fn audit_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 15).unwrap()
    }

    pub fn month(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    pub fn clock_on(date: NaiveDate) -> FixedClock {
        FixedClock::on(date)
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn tenant_name() -> &'static str {
        "Tariro Moyo"
    }

    pub fn residence_name() -> &'static str {
        "Belvedere House"
    }

    /// Residence on the legacy fixed-admin-fee list
    pub fn legacy_residence_name() -> &'static str {
        "St Kilda"
    }

    pub fn application_code(n: u32) -> String {
        format!("APP-{:05}", n)
    }
}
