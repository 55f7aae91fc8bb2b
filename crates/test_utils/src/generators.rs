//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::{Duration, NaiveDate};
use core_kernel::{DebtorId, Money, MonthKey};
use domain_ledger::BillingCycle;
use proptest::prelude::*;

/// Strategy for monthly rents between $50 and $2,000, whole cents
pub fn rent_strategy() -> impl Strategy<Value = Money> {
    (5_000i64..200_000i64).prop_map(Money::from_minor)
}

/// Strategy for any day between 2023 and the end of 2026
pub fn lease_start_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..(365 * 4))
        .prop_map(|days| NaiveDate::from_ymd_opt(2023, 1, 1).unwrap() + Duration::days(days))
}

/// Strategy for (start, end) with end on or after start, up to three years long
pub fn lease_dates_strategy() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (lease_start_strategy(), 0i64..(365 * 3))
        .prop_map(|(start, length)| (start, start + Duration::days(length)))
}

/// Strategy for day-of-month values valid in every month
pub fn day_of_month_strategy() -> impl Strategy<Value = u32> {
    1u32..=28u32
}

pub fn month_key_strategy() -> impl Strategy<Value = MonthKey> {
    (2023i32..2027i32, 1u32..=12u32).prop_map(|(y, m)| MonthKey::new(y, m).unwrap())
}

pub fn billing_cycle_strategy() -> impl Strategy<Value = BillingCycle> {
    prop_oneof![
        Just(BillingCycle::Monthly),
        Just(BillingCycle::Quarterly),
        Just(BillingCycle::Semester),
        Just(BillingCycle::Annual),
    ]
}

pub fn debtor_id_strategy() -> impl Strategy<Value = DebtorId> {
    any::<[u8; 16]>().prop_map(|bytes| DebtorId::from_uuid(uuid::Uuid::from_bytes(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn rent_is_always_positive(rent in rent_strategy()) {
            prop_assert!(rent.is_positive());
        }

        #[test]
        fn lease_dates_are_ordered((start, end) in lease_dates_strategy()) {
            prop_assert!(end >= start);
        }
    }
}
