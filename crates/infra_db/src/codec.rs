//! Text and JSON column codecs
//!
//! Domain enums are stored as their serde names so the database and the JSON
//! payloads agree on spelling.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::DatabaseError;

/// Serializes a unit-like enum to its serde name
pub(crate) fn to_text<T: Serialize>(value: &T) -> Result<String, DatabaseError> {
    match serde_json::to_value(value)? {
        Value::String(s) => Ok(s),
        other => Err(DatabaseError::serialization(format!(
            "expected a string value, got {}",
            other
        ))),
    }
}

/// Parses a serde name back into the enum
pub(crate) fn from_text<T: DeserializeOwned>(raw: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|e| DatabaseError::serialization(format!("unrecognised value '{}': {}", raw, e)))
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<Value, DatabaseError> {
    Ok(serde_json::to_value(value)?)
}

pub(crate) fn from_json<T: DeserializeOwned>(value: Value) -> Result<T, DatabaseError> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_ledger::{BillingCycle, EntryKind};

    #[test]
    fn test_enums_round_trip_through_text() {
        assert_eq!(to_text(&EntryKind::MonthlyRentAccrual).unwrap(), "monthly_rent_accrual");
        assert_eq!(from_text::<BillingCycle>("quarterly").unwrap(), BillingCycle::Quarterly);
        assert!(from_text::<BillingCycle>("weekly").is_err());
    }
}
