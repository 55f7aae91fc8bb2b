//! Accrual engine configuration
//!
//! Every field has a default so a partially specified source (environment,
//! file) deserializes cleanly.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use core_kernel::{CoreError, Money, Timezone};

use crate::billing_period::{BillingCycle, ProrationPolicy};

/// Account codes the generator posts to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountCodes {
    /// Control account; each debtor gets a `<code>-<debtorId>` sub-account
    pub receivable: String,
    pub rental_income: String,
    pub admin_fee_income: String,
    pub deposit_liability: String,
}

impl Default for AccountCodes {
    fn default() -> Self {
        Self {
            receivable: "1100".to_string(),
            rental_income: "4000".to_string(),
            admin_fee_income: "4100".to_string(),
            deposit_liability: "2020".to_string(),
        }
    }
}

/// Admin fee applied when a residence has no payment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyAdminFee {
    /// Residence names (case-insensitive) that historically charged the fee
    pub residences: Vec<String>,
    pub amount: Money,
}

impl Default for LegacyAdminFee {
    fn default() -> Self {
        Self {
            residences: Vec::new(),
            amount: Money::new(dec!(20)),
        }
    }
}

impl LegacyAdminFee {
    pub fn applies_to(&self, residence_name: &str) -> bool {
        let name = residence_name.trim();
        self.residences
            .iter()
            .any(|r| r.trim().eq_ignore_ascii_case(name))
    }
}

/// Top-level accrual configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccrualConfig {
    pub proration: ProrationPolicy,
    pub accounts: AccountCodes,
    pub legacy_admin_fee: LegacyAdminFee,
    /// How long after lease end the auditor keeps sweeping a debtor
    pub sweep_window_months: u32,
    /// Cycle assumed for leases that do not specify one
    pub default_billing_cycle: BillingCycle,
    /// Calendar that decides which month is current
    pub timezone: Timezone,
}

impl AccrualConfig {
    /// Sweep window used when none is configured
    pub const DEFAULT_SWEEP_WINDOW_MONTHS: u32 = 3;

    pub fn sweep_window(&self) -> u32 {
        if self.sweep_window_months == 0 {
            Self::DEFAULT_SWEEP_WINDOW_MONTHS
        } else {
            self.sweep_window_months
        }
    }

    /// Rejects configurations the generator cannot work with
    pub fn validate(&self) -> Result<(), CoreError> {
        let p = &self.proration;
        if !(2..=31).contains(&p.flat_rate_from_day) {
            return Err(CoreError::configuration(format!(
                "flat_rate_from_day must be between 2 and 31, got {}",
                p.flat_rate_from_day
            )));
        }
        if p.flat_daily_rate.is_negative() {
            return Err(CoreError::configuration("flat_daily_rate cannot be negative"));
        }
        if self.legacy_admin_fee.amount.is_negative() {
            return Err(CoreError::configuration("legacy admin fee cannot be negative"));
        }

        let codes = [
            &self.accounts.receivable,
            &self.accounts.rental_income,
            &self.accounts.admin_fee_income,
            &self.accounts.deposit_liability,
        ];
        if codes.iter().any(|c| c.trim().is_empty()) {
            return Err(CoreError::configuration("account codes cannot be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AccrualConfig::default();
        assert_eq!(config.sweep_window(), 3);
        assert_eq!(config.proration.flat_rate_from_day, 20);
        assert_eq!(config.accounts.receivable, "1100");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{"proration":{"flat_daily_rate":"9"},"sweep_window_months":6}"#;
        let config: AccrualConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.proration.flat_rate_from_day, 20);
        assert_eq!(config.proration.flat_daily_rate.amount(), dec!(9));
        assert_eq!(config.sweep_window(), 6);
    }

    #[test]
    fn test_timezone_by_name() {
        let config: AccrualConfig =
            serde_json::from_str(r#"{"timezone":"Africa/Johannesburg"}"#).unwrap();
        assert_eq!(config.timezone.0.name(), "Africa/Johannesburg");
        assert!(serde_json::from_str::<AccrualConfig>(r#"{"timezone":"Mars/Olympus"}"#).is_err());
    }

    #[test]
    fn test_legacy_admin_fee_match_is_case_insensitive() {
        let fee = LegacyAdminFee {
            residences: vec!["St Kilda".to_string()],
            ..Default::default()
        };
        assert!(fee.applies_to("st kilda "));
        assert!(!fee.applies_to("Belvedere"));
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = AccrualConfig::default();
        config.proration.flat_rate_from_day = 40;
        assert!(config.validate().is_err());
    }
}
