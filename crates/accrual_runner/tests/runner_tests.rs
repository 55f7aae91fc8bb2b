//! Command execution against the in-memory stores

use std::sync::Arc;

use rust_decimal_macros::dec;
use serde_json::json;

use accrual_runner::{Command, Runner};
use domain_ledger::{BackfillReport, Debtor, GenerationMode, MonthDiagnosis, MonthVerdict};
use test_utils::{assert_totals, LedgerHarness, TemporalFixtures, TestLeaseBuilder};

fn harness() -> LedgerHarness {
    LedgerHarness::on(TemporalFixtures::audit_day())
}

fn runner(h: &LedgerHarness) -> Runner {
    Runner::new(h.engine.clone(), h.store.clone())
}

// ============================================================================
// Audit
// ============================================================================

mod audit_tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_reports_without_posting() {
        let h = harness();
        h.open(TestLeaseBuilder::new().build()).await;

        let report = runner(&h)
            .execute(&Command::Audit { dry_run: true, window_months: None })
            .await
            .unwrap();

        assert_eq!(report["dry_run"], json!(true));
        assert_eq!(report["debtors_scanned"], json!(1));
        assert_eq!(report["results"][0]["months_missing"].as_array().unwrap().len(), 6);
        assert_eq!(report["results"][0]["months_missing"][0], json!("2025-07"));
        assert_eq!(report["created"], json!(0));
        assert_eq!(h.store.posted_count().await, 0);
    }

    #[tokio::test]
    async fn test_audit_posts_missing_months() {
        let h = harness();
        h.open(TestLeaseBuilder::new().build()).await;

        let report = runner(&h)
            .execute(&Command::Audit { dry_run: false, window_months: None })
            .await
            .unwrap();

        assert_eq!(report["created"], json!(6));
        assert_eq!(h.store.posted_count().await, 6);
    }
}

// ============================================================================
// Single-debtor commands
// ============================================================================

mod debtor_command_tests {
    use super::*;

    #[tokio::test]
    async fn test_open_then_backfill_then_reconcile() {
        let h = harness();
        let lease = TestLeaseBuilder::new().build();
        let lease_id = lease.id;
        h.store.insert_lease(lease).await;
        let runner = runner(&h);

        let opened = runner.execute(&Command::Open { lease_id }).await.unwrap();
        assert_eq!(opened["code"], json!("DR0001"));
        let debtor: Debtor = serde_json::from_value(opened).unwrap();

        let backfill = runner
            .execute(&Command::Backfill { debtor_id: debtor.id, mode: GenerationMode::Bulk })
            .await
            .unwrap();
        let backfill: BackfillReport = serde_json::from_value(backfill).unwrap();
        assert_eq!(backfill.created.len(), 7);
        assert!(backfill.errors.is_empty());

        let reconciled =
            runner.execute(&Command::Reconcile { debtor_id: debtor.id }).await.unwrap();
        let reconciled: Debtor = serde_json::from_value(reconciled).unwrap();
        assert_totals(&reconciled, dec!(1600), dec!(0));
    }

    #[tokio::test]
    async fn test_diagnose_lease_start_month() {
        let h = harness();
        let debtor = h.open(TestLeaseBuilder::new().build()).await;

        let command = Command::Diagnose {
            debtor_id: debtor.id,
            month: TemporalFixtures::month(2025, 6),
        };
        let value = runner(&h).execute(&command).await.unwrap();
        let diagnosis: MonthDiagnosis = serde_json::from_value(value).unwrap();

        assert_eq!(diagnosis.verdict, MonthVerdict::LeaseStartMonth);
        assert!(diagnosis.resolution.is_none());
    }

    #[tokio::test]
    async fn test_unknown_debtor_is_an_error() {
        let h = harness();
        let result = runner(&h)
            .execute(&Command::Reconcile { debtor_id: core_kernel::DebtorId::new() })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_health_reports_adapter_status() {
        let h = harness();
        let value = runner(&h).execute(&Command::Health).await.unwrap();
        assert_eq!(value["status"], json!("healthy"));
        assert_eq!(value["adapter_id"], json!("in-memory-ledger"));
    }
}

#[tokio::test]
async fn test_runner_shares_engine_between_commands() {
    let h = harness();
    let debtor = h.open(TestLeaseBuilder::new().build()).await;
    let runner = Arc::new(runner(&h));

    let cmd_a = Command::Backfill { debtor_id: debtor.id, mode: GenerationMode::Auto };
    let cmd_b = Command::Backfill { debtor_id: debtor.id, mode: GenerationMode::Auto };
    let (a, b) = tokio::join!(runner.execute(&cmd_a), runner.execute(&cmd_b));
    let a: BackfillReport = serde_json::from_value(a.unwrap()).unwrap();
    let b: BackfillReport = serde_json::from_value(b.unwrap()).unwrap();

    assert_eq!(a.created.len() + b.created.len(), 7);
    assert_eq!(h.store.posted_count().await, 7);
}
