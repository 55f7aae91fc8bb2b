//! Tests for core_kernel error types

use core_kernel::error::CoreError;
use core_kernel::money::MoneyError;
use core_kernel::temporal::TemporalError;

#[test]
fn test_core_error_validation() {
    let error = CoreError::validation("Invalid input");

    match error {
        CoreError::Validation(msg) => assert_eq!(msg, "Invalid input"),
        _ => panic!("Expected Validation error"),
    }
}

#[test]
fn test_core_error_configuration() {
    let error = CoreError::configuration("sweep window must be positive");
    assert!(error.to_string().contains("Configuration error"));
}

#[test]
fn test_core_error_not_found() {
    let error = CoreError::not_found("Debtor not found");
    assert!(matches!(error, CoreError::NotFound(_)));
}

#[test]
fn test_core_error_from_money_error() {
    let core_error: CoreError = MoneyError::DivisionByZero.into();
    assert!(matches!(core_error, CoreError::Money(_)));
}

#[test]
fn test_core_error_from_temporal_error() {
    let core_error: CoreError = TemporalError::InvalidMonthKey("2025-13".into()).into();
    assert!(matches!(core_error, CoreError::Temporal(_)));
    assert!(core_error.to_string().contains("2025-13"));
}
