//! Chart of accounts for rental accruals
//!
//! The directory is immutable reference data: it is built once at startup and
//! shared behind an `Arc`. Each debtor posts to its own receivable sub-account
//! (`<control>-<debtorId>`), which resolves through the control account.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use core_kernel::DebtorId;
use uuid::Uuid;

use crate::config::AccountCodes;
use crate::error::LedgerError;

/// Types of accounts in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Equity accounts (credit normal balance)
    Equity,
    /// Income accounts (credit normal balance)
    Income,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountType {
    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

/// Reporting category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountCategory {
    Receivables,
    Deposits,
    RentalIncome,
    FeeIncome,
    Other,
}

/// Role an account plays in accrual postings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountRole {
    Receivable,
    RentalIncome,
    AdminFeeIncome,
    DepositLiability,
}

/// An account in the chart of accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account code (e.g., "1100")
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub category: AccountCategory,
    /// Control account code for sub-accounts
    pub parent_code: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
}

impl Account {
    /// Creates a new account
    ///
    /// # Arguments
    ///
    /// * `code` - Account code
    /// * `name` - Account name
    /// * `account_type` - Type of account
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            category: AccountCategory::Other,
            parent_code: None,
            description: None,
            is_active: true,
        }
    }

    pub fn with_category(mut self, category: AccountCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_parent(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Receivable sub-account code for a debtor
pub fn receivable_subaccount(control: &str, debtor_id: &DebtorId) -> String {
    format!("{}-{}", control, debtor_id.as_uuid())
}

/// Returns true if `code` is a sub-account of the receivable control account
pub fn is_receivable_subaccount(code: &str, control: &str) -> bool {
    code.strip_prefix(control)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|suffix| !suffix.is_empty())
}

/// Debtor a receivable sub-account code was derived for
///
/// Works on the code alone, so stores can apply it without the directory.
pub fn subaccount_owner(code: &str) -> Option<DebtorId> {
    const SUFFIX_LEN: usize = 37;
    let split = code.len().checked_sub(SUFFIX_LEN).filter(|&at| at > 0)?;
    let suffix = code.get(split..)?.strip_prefix('-')?;
    Uuid::parse_str(suffix).ok().map(DebtorId::from_uuid)
}

/// Lookup of account code to account
#[derive(Debug, Clone)]
pub struct AccountDirectory {
    accounts: HashMap<String, Account>,
    codes: AccountCodes,
}

impl AccountDirectory {
    /// Creates an empty directory that resolves roles through `codes`
    pub fn new(codes: AccountCodes) -> Self {
        Self {
            accounts: HashMap::new(),
            codes,
        }
    }

    /// Directory pre-registered with the four accrual accounts
    pub fn standard(codes: &AccountCodes) -> Self {
        let mut directory = Self::new(codes.clone());
        let accounts = [
            Account::new(&codes.receivable, "Accounts Receivable - Tenants", AccountType::Asset)
                .with_category(AccountCategory::Receivables),
            Account::new(&codes.rental_income, "Rental Income", AccountType::Income)
                .with_category(AccountCategory::RentalIncome),
            Account::new(&codes.admin_fee_income, "Admin Fee Income", AccountType::Income)
                .with_category(AccountCategory::FeeIncome),
            Account::new(&codes.deposit_liability, "Tenant Deposits Held", AccountType::Liability)
                .with_category(AccountCategory::Deposits)
                .with_description("Refundable security deposits"),
        ];
        for account in accounts {
            directory.accounts.insert(account.code.clone(), account);
        }
        directory
    }

    /// Registers an account
    ///
    /// # Errors
    ///
    /// Returns `AccountAlreadyExists` if the code is taken.
    pub fn register(&mut self, account: Account) -> Result<(), LedgerError> {
        if self.accounts.contains_key(&account.code) {
            return Err(LedgerError::AccountAlreadyExists(account.code));
        }
        self.accounts.insert(account.code.clone(), account);
        Ok(())
    }

    pub fn get(&self, code: &str) -> Option<&Account> {
        self.accounts.get(code)
    }

    /// Looks up an active account, treating a miss as a configuration error
    pub fn require(&self, code: &str) -> Result<&Account, LedgerError> {
        match self.accounts.get(code) {
            Some(account) if account.is_active => Ok(account),
            Some(_) => Err(LedgerError::configuration(format!("account {} is inactive", code))),
            None => Err(LedgerError::configuration(format!("account {} is not registered", code))),
        }
    }

    /// Resolves the account playing `role`
    pub fn resolve(&self, role: AccountRole) -> Result<&Account, LedgerError> {
        let code = match role {
            AccountRole::Receivable => &self.codes.receivable,
            AccountRole::RentalIncome => &self.codes.rental_income,
            AccountRole::AdminFeeIncome => &self.codes.admin_fee_income,
            AccountRole::DepositLiability => &self.codes.deposit_liability,
        };
        self.require(code)
    }

    /// Builds the debtor's receivable sub-account under the control account
    pub fn receivable_for(&self, debtor_id: &DebtorId) -> Result<Account, LedgerError> {
        let control = self.resolve(AccountRole::Receivable)?;
        Ok(Account::new(
            receivable_subaccount(&control.code, debtor_id),
            format!("{} ({})", control.name, debtor_id),
            control.account_type,
        )
        .with_category(control.category)
        .with_parent(&control.code))
    }

    /// Control account code for receivables
    pub fn receivable_control(&self) -> &str {
        &self.codes.receivable
    }

    pub fn is_receivable_code(&self, code: &str) -> bool {
        is_receivable_subaccount(code, &self.codes.receivable)
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_directory_resolves_all_roles() {
        let directory = AccountDirectory::standard(&AccountCodes::default());
        assert_eq!(directory.resolve(AccountRole::Receivable).unwrap().code, "1100");
        assert_eq!(
            directory.resolve(AccountRole::RentalIncome).unwrap().account_type,
            AccountType::Income
        );
        assert_eq!(
            directory.resolve(AccountRole::DepositLiability).unwrap().account_type,
            AccountType::Liability
        );
        assert_eq!(directory.accounts().count(), 4);
    }

    #[test]
    fn test_missing_account_is_configuration_error() {
        let directory = AccountDirectory::new(AccountCodes::default());
        let err = directory.resolve(AccountRole::AdminFeeIncome).unwrap_err();
        assert!(matches!(err, LedgerError::Configuration(_)));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut directory = AccountDirectory::standard(&AccountCodes::default());
        let result = directory.register(Account::new("4000", "Other Income", AccountType::Income));
        assert!(matches!(result, Err(LedgerError::AccountAlreadyExists(_))));
    }

    #[test]
    fn test_receivable_subaccount_code() {
        let directory = AccountDirectory::standard(&AccountCodes::default());
        let debtor = DebtorId::new();
        let account = directory.receivable_for(&debtor).unwrap();

        assert_eq!(account.code, format!("1100-{}", debtor.as_uuid()));
        assert_eq!(account.parent_code.as_deref(), Some("1100"));
        assert!(directory.is_receivable_code(&account.code));
        assert!(!directory.is_receivable_code("1100"));
        assert!(!directory.is_receivable_code("11000-x"));
    }

    #[test]
    fn test_subaccount_owner_reads_debtor_from_code() {
        let debtor = DebtorId::new();
        let code = receivable_subaccount("1100", &debtor);

        assert_eq!(subaccount_owner(&code), Some(debtor));
        assert_eq!(subaccount_owner("1100"), None);
        assert_eq!(subaccount_owner("4000"), None);
        assert_eq!(subaccount_owner(&format!("-{}", debtor.as_uuid())), None);
    }
}
