//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for ledger types that give
//! more meaningful error messages than standard assertions.

use core_kernel::Money;
use domain_ledger::{Debtor, TransactionEntry};
use rust_decimal::Decimal;

/// Asserts that a Money value equals an amount
pub fn assert_money_eq(actual: Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Money mismatch: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts that a record's debits equal its credits
pub fn assert_balanced(entry: &TransactionEntry) {
    assert!(
        entry.is_balanced(),
        "Record {} ({}) is unbalanced: debits={}, credits={}",
        entry.id,
        entry.description,
        entry.total_debits(),
        entry.total_credits()
    );
}

/// Asserts that the account's net effect in a record equals `expected`
///
/// Debit-positive, so income and liability credits are negative.
pub fn assert_line(entry: &TransactionEntry, account_code: &str, expected: Decimal) {
    let effect = entry.account_effect(account_code);
    assert_eq!(
        effect.amount(),
        expected,
        "Account {} in record {} moved by {}, expected {}",
        account_code,
        entry.description,
        effect,
        expected
    );
}

/// Asserts a debtor's derived totals
pub fn assert_totals(debtor: &Debtor, owed: Decimal, paid: Decimal) {
    let totals = &debtor.totals;
    assert_eq!(
        (totals.total_owed.amount(), totals.total_paid.amount()),
        (owed, paid),
        "Debtor {} totals: owed={}, paid={}",
        debtor.code,
        totals.total_owed,
        totals.total_paid
    );
    assert_eq!(
        totals.current_balance.amount(),
        owed - paid,
        "Debtor {} balance does not equal owed minus paid",
        debtor.code
    );
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(value) => panic!(
                "Expected Err matching {}, got Ok({:?})",
                stringify!($pattern),
                value
            ),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_money_eq_passes() {
        assert_money_eq(Money::new(dec!(100.00)), dec!(100));
    }

    #[test]
    #[should_panic(expected = "Money mismatch")]
    fn test_assert_money_eq_fails() {
        assert_money_eq(Money::new(dec!(99.99)), dec!(100));
    }

    #[test]
    #[should_panic(expected = "Expected zero money")]
    fn test_assert_money_zero_fails() {
        assert_money_zero(&Money::new(dec!(0.01)));
    }
}
