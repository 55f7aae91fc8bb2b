//! Unit tests for the identifiers module

use core_kernel::{DebtorId, EntryId, InvoiceRequestId, LeaseId, PaymentId, ResidenceId, TenantId};
use uuid::Uuid;

#[test]
fn test_prefixes() {
    assert_eq!(DebtorId::prefix(), "DR");
    assert_eq!(TenantId::prefix(), "TNT");
    assert_eq!(LeaseId::prefix(), "LSE");
    assert_eq!(ResidenceId::prefix(), "RES");
    assert_eq!(EntryId::prefix(), "TXN");
    assert_eq!(PaymentId::prefix(), "PAY");
    assert_eq!(InvoiceRequestId::prefix(), "INV");
}

#[test]
fn test_new_generates_unique_ids() {
    assert_ne!(DebtorId::new(), DebtorId::new());
}

#[test]
fn test_new_v7_ids_sort_by_creation() {
    let first = EntryId::new_v7();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = EntryId::new_v7();
    assert!(first < second);
}

#[test]
fn test_parse_with_and_without_prefix() {
    let id = DebtorId::new();
    let with_prefix: DebtorId = id.to_string().parse().unwrap();
    let bare: DebtorId = id.as_uuid().to_string().parse().unwrap();
    assert_eq!(with_prefix, id);
    assert_eq!(bare, id);
}

#[test]
fn test_uuid_conversion() {
    let uuid = Uuid::new_v4();
    let tenant = TenantId::from_uuid(uuid);
    let back: Uuid = tenant.into();
    assert_eq!(back, uuid);
}

#[test]
fn test_parse_rejects_garbage() {
    assert!("DR-not-a-uuid".parse::<DebtorId>().is_err());
}
