use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::{NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use chart_cell::models::CreateChartRequest;
use chart_cell::services::ChartService;
use chart_cell::store::MemoryChartStore;
use ledger_cell::error::LedgerError;
use ledger_cell::models::{
    LineItemDraft, OpenLedgerRequest, RecordPaymentRequest, ReplaceLineItemsRequest, Settlement,
};
use ledger_cell::services::LedgerService;
use ledger_cell::store::{LedgerStore, MemoryLedgerStore};
use patient_cell::models::CreatePatientRequest;
use patient_cell::services::PatientService;
use patient_cell::store::MemoryPatientStore;
use shared_utils::FixedClock;

// ==============================================================================
// TEST FIXTURES AND UTILITIES
// ==============================================================================

struct TestSetup {
    store: Arc<MemoryLedgerStore>,
    charts: Arc<MemoryChartStore>,
    clock: Arc<FixedClock>,
    chart_id: Uuid,
}

impl TestSetup {
    async fn new() -> Self {
        let clock = Arc::new(FixedClock(
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        ));
        let patients = Arc::new(MemoryPatientStore::new());
        let charts = Arc::new(MemoryChartStore::new());

        let patient = PatientService::new(patients.clone(), clock.clone())
            .create(CreatePatientRequest {
                record_number: "HC-001".to_string(),
                first_name: "Ana".to_string(),
                last_name: "Reyes".to_string(),
                age: None,
                address: None,
                phone: None,
            })
            .await
            .unwrap();

        let chart = ChartService::new(charts.clone(), patients, clock.clone())
            .create(CreateChartRequest {
                patient_id: patient.id,
                tooth: "26".to_string(),
                diagnosis: Some("apical periodontitis".to_string()),
                date: None,
            })
            .await
            .unwrap();

        Self {
            store: Arc::new(MemoryLedgerStore::new()),
            charts,
            clock,
            chart_id: chart.id,
        }
    }

    fn service(&self) -> LedgerService {
        LedgerService::new(self.store.clone(), self.charts.clone(), self.clock.clone())
    }
}

fn draft(sequence: i32, description: &str, unit_cost_cents: i64, quantity: Option<i32>) -> LineItemDraft {
    LineItemDraft {
        sequence,
        description: description.to_string(),
        unit_cost_cents,
        quantity,
    }
}

/// 100.00 x2 plus 50.00 x1 = 250.00 total.
fn standard_items() -> Vec<LineItemDraft> {
    vec![
        draft(1, "root canal treatment", 10_000, Some(2)),
        draft(2, "periapical radiograph", 5_000, None),
    ]
}

fn payment(amount_cents: i64) -> RecordPaymentRequest {
    RecordPaymentRequest {
        amount_cents,
        date: None,
        note: None,
    }
}

fn dated_payment(amount_cents: i64, date: &str) -> RecordPaymentRequest {
    RecordPaymentRequest {
        amount_cents,
        date: Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap()),
        note: None,
    }
}

// ==============================================================================
// OPENING THE LEDGER
// ==============================================================================

#[tokio::test]
async fn open_computes_totals_from_line_items() {
    let setup = TestSetup::new().await;

    let view = setup
        .service()
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();

    assert_eq!(view.ledger.total_cents, 25_000);
    assert_eq!(view.ledger.total_paid_cents, 0);
    assert_eq!(view.ledger.balance_cents, 25_000);
    assert_eq!(view.settlement, Settlement::OpenUnpaid);

    assert_eq!(view.line_items.len(), 2);
    assert_eq!(view.line_items[0].sequence, 1);
    assert_eq!(view.line_items[0].line_total_cents, 20_000);
    assert_eq!(view.line_items[1].quantity, 1);
    assert_eq!(view.line_items[1].line_total_cents, 5_000);
    assert!(view.payments.is_empty());
}

#[tokio::test]
async fn open_requires_line_items() {
    let setup = TestSetup::new().await;

    let err = setup
        .service()
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: vec![],
        })
        .await
        .unwrap_err();

    assert_matches!(err, LedgerError::Validation(_));
}

#[tokio::test]
async fn open_rejects_malformed_line_items() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    for bad in [
        draft(0, "sequence too small", 1_000, None),
        draft(1, "   ", 1_000, None),
        draft(1, "negative cost", -1, None),
        draft(1, "zero quantity", 1_000, Some(0)),
    ] {
        let err = service
            .open(OpenLedgerRequest {
                chart_id: setup.chart_id,
                line_items: vec![bad],
            })
            .await
            .unwrap_err();
        assert_matches!(err, LedgerError::Validation(_));
    }
}

#[tokio::test]
async fn open_for_unknown_chart_is_rejected() {
    let setup = TestSetup::new().await;

    let err = setup
        .service()
        .open(OpenLedgerRequest {
            chart_id: Uuid::new_v4(),
            line_items: standard_items(),
        })
        .await
        .unwrap_err();

    assert_matches!(err, LedgerError::ChartNotFound);
}

#[tokio::test]
async fn one_ledger_per_chart() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();

    let err = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap_err();

    assert_matches!(err, LedgerError::AlreadyExists);
}

// ==============================================================================
// PAYMENTS
// ==============================================================================

#[tokio::test]
async fn payment_above_balance_is_rejected_outright() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let view = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();

    let err = service
        .pay(view.ledger.id, payment(30_000))
        .await
        .unwrap_err();
    assert_matches!(
        err,
        LedgerError::ExceedsBalance {
            requested: 30_000,
            balance: 25_000
        }
    );

    // Rejection rolled back: nothing was applied, not even partially.
    let after = service.read(view.ledger.id).await.unwrap();
    assert_eq!(after.ledger.total_paid_cents, 0);
    assert_eq!(after.ledger.balance_cents, 25_000);
    assert!(after.payments.is_empty());
}

#[tokio::test]
async fn full_payment_settles_the_ledger() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let view = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();

    let receipt = service.pay(view.ledger.id, payment(25_000)).await.unwrap();

    assert_eq!(receipt.payment.balance_before_cents, 25_000);
    assert_eq!(receipt.payment.balance_after_cents, 0);
    assert_eq!(receipt.ledger.total_paid_cents, 25_000);
    assert_eq!(receipt.ledger.balance_cents, 0);
    assert_eq!(receipt.settlement, Settlement::Settled);
    // Payment date defaults to the clock's today.
    assert_eq!(receipt.payment.date, setup.clock.0.date_naive());
}

#[tokio::test]
async fn payments_chain_their_running_balances() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let view = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();

    let first = service
        .pay(view.ledger.id, dated_payment(10_000, "2024-03-02"))
        .await
        .unwrap();
    let second = service
        .pay(view.ledger.id, dated_payment(5_000, "2024-03-05"))
        .await
        .unwrap();

    assert_eq!(first.payment.balance_after_cents, 15_000);
    assert_eq!(second.payment.balance_before_cents, 15_000);
    assert_eq!(second.payment.balance_after_cents, 10_000);
    assert_eq!(second.ledger.total_paid_cents, 15_000);
    assert_eq!(second.settlement, Settlement::PartiallyPaid);

    // Aggregate read lists payments most recent first.
    let read = service.read(view.ledger.id).await.unwrap();
    assert_eq!(read.payments.len(), 2);
    assert_eq!(read.payments[0].id, second.payment.id);
    assert_eq!(read.payments[1].id, first.payment.id);

    // Every payment satisfies balance_after = balance_before - amount.
    for p in &read.payments {
        assert_eq!(p.balance_after_cents, p.balance_before_cents - p.amount_cents);
        assert!(p.balance_after_cents >= 0);
    }
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let view = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();

    assert_matches!(
        service.pay(view.ledger.id, payment(0)).await,
        Err(LedgerError::InvalidAmount)
    );
    assert_matches!(
        service.pay(view.ledger.id, payment(-500)).await,
        Err(LedgerError::InvalidAmount)
    );
}

#[tokio::test]
async fn paying_unknown_ledger_is_not_found() {
    let setup = TestSetup::new().await;

    assert_matches!(
        setup.service().pay(Uuid::new_v4(), payment(1_000)).await,
        Err(LedgerError::NotFound)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_payments_cannot_overdraw_the_balance() {
    let setup = TestSetup::new().await;

    let view = setup
        .service()
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();
    let ledger_id = view.ledger.id;

    // Two 200.00 payments against a 250.00 balance: only one can apply.
    let first = {
        let service = setup.service();
        tokio::spawn(async move { service.pay(ledger_id, payment(20_000)).await })
    };
    let second = {
        let service = setup.service();
        tokio::spawn(async move { service.pay(ledger_id, payment(20_000)).await })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    let rejection = results.iter().find(|r| r.is_err()).unwrap();
    assert_matches!(
        rejection.as_ref().unwrap_err(),
        LedgerError::ExceedsBalance { .. }
    );

    let after = setup.service().read(ledger_id).await.unwrap();
    assert_eq!(after.ledger.total_paid_cents, 20_000);
    assert_eq!(after.ledger.balance_cents, 5_000);
}

// ==============================================================================
// LINE ITEM REPLACEMENT
// ==============================================================================

#[tokio::test]
async fn replacement_recomputes_totals_without_touching_payments() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let view = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();
    service.pay(view.ledger.id, payment(10_000)).await.unwrap();

    let replaced = service
        .replace_line_items(
            view.ledger.id,
            ReplaceLineItemsRequest {
                line_items: vec![draft(1, "retreatment", 30_000, None)],
            },
        )
        .await
        .unwrap();

    assert_eq!(replaced.ledger.total_cents, 30_000);
    assert_eq!(replaced.ledger.total_paid_cents, 10_000);
    assert_eq!(replaced.ledger.balance_cents, 20_000);
    assert_eq!(replaced.line_items.len(), 1);
    assert_eq!(replaced.payments.len(), 1);
}

#[tokio::test]
async fn replacement_below_paid_total_is_rejected() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let view = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();
    service.pay(view.ledger.id, payment(20_000)).await.unwrap();

    let err = service
        .replace_line_items(
            view.ledger.id,
            ReplaceLineItemsRequest {
                line_items: vec![draft(1, "single visit", 15_000, None)],
            },
        )
        .await
        .unwrap_err();
    assert_matches!(
        err,
        LedgerError::ReplacementBelowPaid {
            new_total: 15_000,
            total_paid: 20_000
        }
    );

    // The rejected replacement left the aggregate untouched.
    let after = service.read(view.ledger.id).await.unwrap();
    assert_eq!(after.ledger.total_cents, 25_000);
    assert_eq!(after.line_items.len(), 2);
}

#[tokio::test]
async fn replacement_can_reopen_a_settled_ledger() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let view = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: vec![draft(1, "extraction", 10_000, None)],
        })
        .await
        .unwrap();
    let receipt = service.pay(view.ledger.id, payment(10_000)).await.unwrap();
    assert_eq!(receipt.settlement, Settlement::Settled);

    let replaced = service
        .replace_line_items(
            view.ledger.id,
            ReplaceLineItemsRequest {
                line_items: vec![
                    draft(1, "extraction", 10_000, None),
                    draft(2, "follow-up control", 5_000, None),
                ],
            },
        )
        .await
        .unwrap();

    assert_eq!(replaced.ledger.balance_cents, 5_000);
    assert_eq!(replaced.settlement, Settlement::PartiallyPaid);
}

#[tokio::test]
async fn replacing_unknown_ledger_is_not_found() {
    let setup = TestSetup::new().await;

    let err = setup
        .service()
        .replace_line_items(
            Uuid::new_v4(),
            ReplaceLineItemsRequest {
                line_items: standard_items(),
            },
        )
        .await
        .unwrap_err();

    assert_matches!(err, LedgerError::NotFound);
}

// ==============================================================================
// READS AND DELETE
// ==============================================================================

#[tokio::test]
async fn read_by_chart_finds_the_owned_ledger() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let opened = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();

    let view = service.read_by_chart(setup.chart_id).await.unwrap();
    assert_eq!(view.ledger.id, opened.ledger.id);

    assert_matches!(
        service.read_by_chart(Uuid::new_v4()).await,
        Err(LedgerError::NotFound)
    );
}

#[tokio::test]
async fn repeated_reads_return_identical_state() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let view = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();
    service.pay(view.ledger.id, payment(5_000)).await.unwrap();

    let first = service.read(view.ledger.id).await.unwrap();
    let second = service.read(view.ledger.id).await.unwrap();

    assert_eq!(first.ledger, second.ledger);
    assert_eq!(first.line_items, second.line_items);
    assert_eq!(first.payments, second.payments);
}

#[tokio::test]
async fn delete_cascades_to_line_items_and_payments() {
    let setup = TestSetup::new().await;
    let service = setup.service();

    let view = service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();
    service.pay(view.ledger.id, payment(5_000)).await.unwrap();

    service.delete(view.ledger.id).await.unwrap();

    assert_matches!(
        service.read(view.ledger.id).await,
        Err(LedgerError::NotFound)
    );
    assert!(setup
        .store
        .line_items(view.ledger.id)
        .await
        .unwrap()
        .is_empty());
    assert!(setup
        .store
        .payments(view.ledger.id)
        .await
        .unwrap()
        .is_empty());

    // The chart is free for a fresh ledger again.
    service
        .open(OpenLedgerRequest {
            chart_id: setup.chart_id,
            line_items: standard_items(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn deleting_unknown_ledger_is_not_found() {
    let setup = TestSetup::new().await;

    assert_matches!(
        setup.service().delete(Uuid::new_v4()).await,
        Err(LedgerError::NotFound)
    );
}

// ==============================================================================
// STORE FAILURES
// ==============================================================================

/// Store stub whose every operation fails, standing in for a collaborator
/// outage.
struct UnavailableStore;

#[async_trait::async_trait]
impl ledger_cell::store::LedgerStore for UnavailableStore {
    async fn begin(
        &self,
    ) -> Result<Box<dyn ledger_cell::store::LedgerTx>, shared_database::StoreError> {
        Err(shared_database::StoreError::Unavailable(
            "connection refused".to_string(),
        ))
    }

    async fn get(
        &self,
        _id: Uuid,
    ) -> Result<Option<ledger_cell::models::Ledger>, shared_database::StoreError> {
        Err(shared_database::StoreError::Unavailable(
            "connection refused".to_string(),
        ))
    }

    async fn get_by_chart(
        &self,
        _chart_id: Uuid,
    ) -> Result<Option<ledger_cell::models::Ledger>, shared_database::StoreError> {
        Err(shared_database::StoreError::Unavailable(
            "connection refused".to_string(),
        ))
    }

    async fn line_items(
        &self,
        _ledger_id: Uuid,
    ) -> Result<Vec<ledger_cell::models::LineItem>, shared_database::StoreError> {
        Err(shared_database::StoreError::Unavailable(
            "connection refused".to_string(),
        ))
    }

    async fn payments(
        &self,
        _ledger_id: Uuid,
    ) -> Result<Vec<ledger_cell::models::Payment>, shared_database::StoreError> {
        Err(shared_database::StoreError::Unavailable(
            "connection refused".to_string(),
        ))
    }
}

#[tokio::test]
async fn store_failures_surface_as_store_errors() {
    let setup = TestSetup::new().await;
    let service = LedgerService::new(
        Arc::new(UnavailableStore),
        setup.charts.clone(),
        setup.clock.clone(),
    );

    assert_matches!(
        service.pay(Uuid::new_v4(), payment(1_000)).await,
        Err(LedgerError::Store(_))
    );
    assert_matches!(
        service.read(Uuid::new_v4()).await,
        Err(LedgerError::Store(_))
    );
}
