//! Unit tests for the temporal module
//!
//! Month arithmetic crosses year boundaries in every accrual sweep, so the
//! tests here lean on December/January transitions.

use chrono::NaiveDate;
use core_kernel::temporal::{add_months, sub_months};
use core_kernel::{Clock, DateRange, FixedClock, MonthKey, TemporalError};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn month(y: i32, m: u32) -> MonthKey {
    MonthKey::new(y, m).unwrap()
}

mod month_key {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_month() {
        assert!(matches!(MonthKey::new(2025, 0), Err(TemporalError::InvalidMonthKey(_))));
        assert!(matches!(MonthKey::new(2025, 13), Err(TemporalError::InvalidMonthKey(_))));
    }

    #[test]
    fn test_ordering_compares_year_first() {
        assert!(month(2024, 12) < month(2025, 1));
        assert!(month(2025, 2) > month(2024, 11));
    }

    #[test]
    fn test_offset_negative_crosses_year() {
        assert_eq!(month(2025, 2).offset(-3), month(2024, 11));
        assert_eq!(month(2025, 1).offset(-13), month(2023, 12));
        assert_eq!(month(2025, 11).offset(14), month(2027, 1));
    }

    #[test]
    fn test_months_until() {
        assert_eq!(month(2025, 6).months_until(month(2025, 12)), 6);
        assert_eq!(month(2025, 12).months_until(month(2025, 6)), -6);
        assert_eq!(month(2024, 10).months_until(month(2025, 1)), 3);
    }

    #[test]
    fn test_contains_and_bounds() {
        let june = month(2025, 6);
        assert!(june.contains(ymd(2025, 6, 1)));
        assert!(june.contains(ymd(2025, 6, 30)));
        assert!(!june.contains(ymd(2024, 6, 15)));
        assert_eq!(june.first_day(), ymd(2025, 6, 1));
        assert_eq!(june.last_day(), ymd(2025, 6, 30));
        assert_eq!(june.days_in_month(), 30);
    }

    #[test]
    fn test_serde_uses_month_string() {
        let json = serde_json::to_string(&month(2025, 7)).unwrap();
        assert_eq!(json, "\"2025-07\"");
        let back: MonthKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, month(2025, 7));
    }

    #[test]
    fn test_through_yields_inclusive_range() {
        let months: Vec<MonthKey> = month(2025, 7).through(month(2025, 12)).collect();
        assert_eq!(months.len(), 6);
        assert_eq!(months.first(), Some(&month(2025, 7)));
        assert_eq!(months.last(), Some(&month(2025, 12)));
    }
}

mod date_range {
    use super::*;

    #[test]
    fn test_new_rejects_inverted_range() {
        let result = DateRange::new(ymd(2025, 12, 31), ymd(2025, 6, 1));
        assert!(matches!(result, Err(TemporalError::InvalidPeriod { .. })));
    }

    #[test]
    fn test_days_counts_both_ends() {
        let range = DateRange::new(ymd(2025, 6, 15), ymd(2025, 6, 30)).unwrap();
        assert_eq!(range.days(), 16);
        let single = DateRange::new(ymd(2025, 6, 15), ymd(2025, 6, 15)).unwrap();
        assert_eq!(single.days(), 1);
    }

    #[test]
    fn test_month_accessors() {
        let range = DateRange::new(ymd(2025, 6, 15), ymd(2026, 1, 10)).unwrap();
        assert_eq!(range.start_month(), month(2025, 6));
        assert_eq!(range.end_month(), month(2026, 1));
        assert!(range.contains(ymd(2025, 12, 31)));
        assert!(!range.contains(ymd(2026, 1, 11)));
    }
}

mod calendar_math {
    use super::*;

    #[test]
    fn test_add_and_sub_months_clamp() {
        assert_eq!(add_months(ymd(2025, 1, 31), 1).unwrap(), ymd(2025, 2, 28));
        assert_eq!(sub_months(ymd(2025, 5, 31), 3).unwrap(), ymd(2025, 2, 28));
        assert_eq!(sub_months(ymd(2025, 2, 15), 3).unwrap(), ymd(2024, 11, 15));
    }

    #[test]
    fn test_fixed_clock_current_month() {
        let clock = FixedClock::on(ymd(2026, 1, 5));
        assert_eq!(clock.today(), ymd(2026, 1, 5));
        assert_eq!(clock.current_month(), month(2026, 1));
    }
}
