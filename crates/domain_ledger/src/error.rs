//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use core_kernel::{MoneyError, PortError, TemporalError};

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A required account code is not registered in the directory
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The tenant behind a debtor could not be identified
    #[error("Cannot resolve tenant identity for debtor {debtor}: {reason}")]
    IdentityResolution {
        debtor: String,
        reason: String,
    },

    /// An equivalent record already exists; callers count this as skipped
    #[error("Duplicate detected: {0}")]
    DuplicateDetected(String),

    /// A candidate record was correlated to a different debtor's receivable
    #[error("Correlation mismatch on entry {entry}: expected {expected}, found {found}")]
    CorrelationMismatch {
        entry: String,
        expected: String,
        found: String,
    },

    /// The underlying store failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PortError),

    /// Transaction is not balanced
    #[error("Unbalanced entry: debits={debits}, credits={credits}")]
    UnbalancedEntry {
        debits: Decimal,
        credits: Decimal,
    },

    /// Entry has no lines on one side
    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    /// Period arithmetic rejected the request
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Lease data cannot be accrued
    #[error("Invalid lease: {0}")]
    InvalidLease(String),

    /// Debtor not found
    #[error("Debtor not found: {0}")]
    DebtorNotFound(String),

    /// Lease not found
    #[error("Lease not found: {0}")]
    LeaseNotFound(String),

    /// Account already registered
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),

    #[error("Calculation error: {0}")]
    Calculation(#[from] MoneyError),
}

/// Coarse classification used in batch reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    IdentityResolution,
    CorrelationMismatch,
    Persistence,
    InvoiceEmission,
    Validation,
}

impl LedgerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        LedgerError::Configuration(message.into())
    }

    pub fn identity(debtor: impl std::fmt::Display, reason: impl Into<String>) -> Self {
        LedgerError::IdentityResolution {
            debtor: debtor.to_string(),
            reason: reason.into(),
        }
    }

    /// Returns true for outcomes that batch operations count as skipped
    pub fn is_duplicate(&self) -> bool {
        matches!(self, LedgerError::DuplicateDetected(_))
    }

    /// Classifies the error for batch reports
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            LedgerError::Configuration(_) | LedgerError::AccountAlreadyExists(_) => {
                FailureKind::Configuration
            }
            LedgerError::IdentityResolution { .. } => FailureKind::IdentityResolution,
            LedgerError::CorrelationMismatch { .. } => FailureKind::CorrelationMismatch,
            LedgerError::Persistence(_)
            | LedgerError::DebtorNotFound(_)
            | LedgerError::LeaseNotFound(_) => FailureKind::Persistence,
            _ => FailureKind::Validation,
        }
    }
}
