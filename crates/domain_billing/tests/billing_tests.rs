//! Comprehensive tests for domain_billing

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{BillId, Currency, Money, PatientId, Timezone, TreatmentId};

use domain_billing::{
    ActorRole, Bill, BillChange, BillQuery, BillStatus, BillingError, BillingLedger, BillingPort,
    InMemoryBillingStore, LedgerSettings, NewBillItem, PaymentMethod,
};

fn bdt(amount: Decimal) -> Money {
    Money::new(amount, Currency::BDT)
}

fn consultation() -> Vec<NewBillItem> {
    vec![NewBillItem::new("Consultation", bdt(dec!(500)))]
}

fn ledger_with_store() -> (BillingLedger, InMemoryBillingStore) {
    let store = InMemoryBillingStore::new();
    let ledger = BillingLedger::new(Arc::new(store.clone()), LedgerSettings::default());
    (ledger, store)
}

async fn create_consultation(ledger: &BillingLedger) -> Bill {
    ledger
        .create_bill(ActorRole::Receptionist, PatientId::new(), consultation(), None)
        .await
        .expect("bill creation should succeed")
}

// ============================================================================
// Scenario Tests
// ============================================================================

mod scenario_tests {
    use super::*;

    #[tokio::test]
    async fn test_consultation_bill_lifecycle() {
        let (ledger, _) = ledger_with_store();

        let bill = create_consultation(&ledger).await;
        assert_eq!(bill.total, bdt(dec!(500)));
        assert!(bill.paid.is_zero());
        assert_eq!(bill.due, bdt(dec!(500)));
        assert_eq!(bill.status, BillStatus::Due);
        assert_eq!(bill.items.len(), 1);
        assert!(bill.payments.is_empty());

        let bill = ledger
            .apply_discount(ActorRole::Doctor, bill.id, bdt(dec!(100)))
            .await
            .unwrap();
        assert_eq!(bill.total, bdt(dec!(400)));
        assert_eq!(bill.due, bdt(dec!(400)));
        assert_eq!(bill.status, BillStatus::Due);

        let bill = ledger
            .record_payment(bill.id, bdt(dec!(400)), PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(bill.paid, bdt(dec!(400)));
        assert!(bill.due.is_zero());
        assert_eq!(bill.status, BillStatus::Paid);
        assert_eq!(bill.payments.len(), 1);
        assert_eq!(bill.payments[0].method, PaymentMethod::Cash);
    }

    #[tokio::test]
    async fn test_overpayment_rejected() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let err = ledger
            .record_payment(bill.id, bdt(dec!(600)), PaymentMethod::Card)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidAmount(_)));

        let stored = ledger.get_bill(bill.id).await.unwrap();
        assert!(stored.paid.is_zero());
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_finalize_requires_clinical_role() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let err = ledger
            .finalize_bill(ActorRole::Receptionist, bill.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PermissionDenied(_)));

        let bill = ledger.finalize_bill(ActorRole::Doctor, bill.id).await.unwrap();
        assert!(bill.is_finalized);
    }

    #[tokio::test]
    async fn test_add_item_on_finalized_bill_rejected() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;
        ledger.finalize_bill(ActorRole::Admin, bill.id).await.unwrap();

        let err = ledger
            .add_bill_item(ActorRole::Doctor, bill.id, "X-ray", bdt(dec!(300)))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidState(_)));
    }
}

// ============================================================================
// Creation Tests
// ============================================================================

mod creation_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_sums_items() {
        let (ledger, _) = ledger_with_store();
        let bill = ledger
            .create_bill(
                ActorRole::Doctor,
                PatientId::new(),
                vec![
                    NewBillItem::new("Root canal", bdt(dec!(4500))),
                    NewBillItem::new("X-ray", bdt(dec!(300.50))),
                ],
                Some(TreatmentId::new()),
            )
            .await
            .unwrap();

        assert_eq!(bill.total, bdt(dec!(4800.50)));
        assert_eq!(bill.due, bill.total);
        assert!(bill.discount.is_zero());
        assert!(!bill.is_finalized);
        assert!(bill.is_treatment_bill());
        assert_eq!(bill.items[0].description, "Root canal");
        assert_eq!(bill.items[1].description, "X-ray");
    }

    #[tokio::test]
    async fn test_negative_item_rejected_and_nothing_stored() {
        let (ledger, store) = ledger_with_store();
        let err = ledger
            .create_bill(
                ActorRole::Admin,
                PatientId::new(),
                vec![
                    NewBillItem::new("Consultation", bdt(dec!(500))),
                    NewBillItem::new("Refund", bdt(dec!(-600))),
                ],
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidAmount(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_overflowing_items_rejected_and_nothing_stored() {
        let (ledger, store) = ledger_with_store();
        let err = ledger
            .create_bill(
                ActorRole::Doctor,
                PatientId::new(),
                vec![
                    NewBillItem::new("A", bdt(Decimal::MAX)),
                    NewBillItem::new("B", bdt(Decimal::MAX)),
                ],
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidAmount(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_amount_above_storable_limit_rejected() {
        let (ledger, store) = ledger_with_store();
        let err = ledger
            .create_bill(
                ActorRole::Receptionist,
                PatientId::new(),
                vec![NewBillItem::new("Surgery", bdt(dec!(100000000000000)))],
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidAmount(_)));
        assert!(store.is_empty().await);

        let bill = ledger
            .create_bill(
                ActorRole::Receptionist,
                PatientId::new(),
                vec![NewBillItem::new("Surgery", bdt(Money::MAX_AMOUNT))],
                None,
            )
            .await
            .unwrap();
        assert_eq!(bill.total, bdt(Money::MAX_AMOUNT));
    }

    #[tokio::test]
    async fn test_subtotal_above_storable_limit_rejected() {
        let (ledger, store) = ledger_with_store();
        let err = ledger
            .create_bill(
                ActorRole::Admin,
                PatientId::new(),
                vec![
                    NewBillItem::new("Surgery", bdt(dec!(60000000000000))),
                    NewBillItem::new("Ward", bdt(dec!(60000000000000))),
                ],
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidAmount(_)));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_foreign_currency_item_rejected() {
        let (ledger, _) = ledger_with_store();
        let err = ledger
            .create_bill(
                ActorRole::Admin,
                PatientId::new(),
                vec![NewBillItem::new("Consultation", Money::new(dec!(5), Currency::USD))],
                None,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, BillingError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let (ledger, store) = ledger_with_store();
        store.set_offline(true);

        let err = ledger
            .create_bill(ActorRole::Admin, PatientId::new(), consultation(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::Storage(_)));
    }
}

// ============================================================================
// Item and Discount Tests
// ============================================================================

mod pricing_tests {
    use super::*;

    #[tokio::test]
    async fn test_add_item_recomputes_totals() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;
        ledger
            .record_payment(bill.id, bdt(dec!(500)), PaymentMethod::Mobile)
            .await
            .unwrap();

        let bill = ledger
            .add_bill_item(ActorRole::Doctor, bill.id, "Filling", bdt(dec!(1000)))
            .await
            .unwrap();

        assert_eq!(bill.total, bdt(dec!(1500)));
        assert_eq!(bill.due, bdt(dec!(1000)));
        assert_eq!(bill.status, BillStatus::Partial);
    }

    #[tokio::test]
    async fn test_item_or_discount_past_limit_leaves_bill_unchanged() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let item = ledger
            .add_bill_item(ActorRole::Doctor, bill.id, "Surgery", bdt(Money::MAX_AMOUNT))
            .await
            .unwrap_err();
        let discount = ledger
            .apply_discount(ActorRole::Doctor, bill.id, bdt(Decimal::MAX))
            .await
            .unwrap_err();

        assert!(matches!(item, BillingError::InvalidAmount(_)));
        assert!(matches!(discount, BillingError::InvalidAmount(_)));

        let stored = ledger.get_bill(bill.id).await.unwrap();
        assert_eq!(stored.items.len(), 1);
        assert!(stored.discount.is_zero());
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn test_receptionist_cannot_add_items_or_discount() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let add = ledger
            .add_bill_item(ActorRole::Receptionist, bill.id, "Filling", bdt(dec!(1000)))
            .await
            .unwrap_err();
        let discount = ledger
            .apply_discount(ActorRole::Receptionist, bill.id, bdt(dec!(50)))
            .await
            .unwrap_err();

        assert!(matches!(add, BillingError::PermissionDenied(_)));
        assert!(matches!(discount, BillingError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_discount_replaces_previous_value() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        ledger
            .apply_discount(ActorRole::Doctor, bill.id, bdt(dec!(100)))
            .await
            .unwrap();
        let bill = ledger
            .apply_discount(ActorRole::Doctor, bill.id, bdt(dec!(50)))
            .await
            .unwrap();

        assert_eq!(bill.discount, bdt(dec!(50)));
        assert_eq!(bill.total, bdt(dec!(450)));
    }

    #[tokio::test]
    async fn test_discount_below_paid_marks_paid() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;
        ledger
            .record_payment(bill.id, bdt(dec!(300)), PaymentMethod::Cash)
            .await
            .unwrap();

        let bill = ledger
            .apply_discount(ActorRole::Admin, bill.id, bdt(dec!(250)))
            .await
            .unwrap();

        assert_eq!(bill.total, bdt(dec!(250)));
        assert!(bill.due.is_zero());
        assert_eq!(bill.status, BillStatus::Paid);
    }

    #[tokio::test]
    async fn test_negative_discount_rejected() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let err = ledger
            .apply_discount(ActorRole::Doctor, bill.id, bdt(dec!(-1)))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn test_discount_on_finalized_bill_rejected() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;
        ledger.finalize_bill(ActorRole::Doctor, bill.id).await.unwrap();

        let err = ledger
            .apply_discount(ActorRole::Doctor, bill.id, bdt(dec!(10)))
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidState(_)));
    }
}

// ============================================================================
// Payment Tests
// ============================================================================

mod payment_tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_and_negative_payments_rejected() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        for amount in [dec!(0), dec!(-10)] {
            let err = ledger
                .record_payment(bill.id, bdt(amount), PaymentMethod::Cash)
                .await
                .unwrap_err();
            assert!(matches!(err, BillingError::InvalidAmount(_)));
        }
    }

    #[tokio::test]
    async fn test_partial_payments_accumulate() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let bill = ledger
            .record_payment(bill.id, bdt(dec!(200)), PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(bill.status, BillStatus::Partial);

        let bill = ledger
            .record_payment(bill.id, bdt(dec!(300)), PaymentMethod::Card)
            .await
            .unwrap();
        assert_eq!(bill.status, BillStatus::Paid);
        assert_eq!(bill.payments.len(), 2);

        let sum = Money::sum(Currency::BDT, bill.payments.iter().map(|p| &p.amount)).unwrap();
        assert_eq!(sum, bill.paid);
    }

    #[tokio::test]
    async fn test_payment_allowed_on_finalized_bill() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;
        ledger.finalize_bill(ActorRole::Doctor, bill.id).await.unwrap();

        let bill = ledger
            .record_payment(bill.id, bdt(dec!(500)), PaymentMethod::Cash)
            .await
            .unwrap();
        assert!(bill.is_finalized);
        assert_eq!(bill.status, BillStatus::Paid);
    }

    #[tokio::test]
    async fn test_payment_on_fully_paid_bill_rejected() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;
        ledger
            .record_payment(bill.id, bdt(dec!(500)), PaymentMethod::Cash)
            .await
            .unwrap();

        let err = ledger
            .record_payment(bill.id, bdt(dec!(0.01)), PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidAmount(_)));
    }
}

// ============================================================================
// Finalization and Deletion Tests
// ============================================================================

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_finalize_twice_is_noop() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let first = ledger.finalize_bill(ActorRole::Doctor, bill.id).await.unwrap();
        let second = ledger.finalize_bill(ActorRole::Admin, bill.id).await.unwrap();

        assert!(second.is_finalized);
        assert_eq!(first.version, second.version);
    }

    #[tokio::test]
    async fn test_treatment_bill_finalize_message() {
        let (ledger, _) = ledger_with_store();
        let bill = ledger
            .create_bill(
                ActorRole::Doctor,
                PatientId::new(),
                consultation(),
                Some(TreatmentId::new()),
            )
            .await
            .unwrap();

        let err = ledger
            .finalize_bill(ActorRole::Receptionist, bill.id)
            .await
            .unwrap_err();
        match err {
            BillingError::PermissionDenied(message) => assert!(message.contains("treatment")),
            other => panic!("expected PermissionDenied, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_unfinalized_bill() {
        let (ledger, store) = ledger_with_store();
        let bill = create_consultation(&ledger).await;
        ledger
            .record_payment(bill.id, bdt(dec!(100)), PaymentMethod::Cash)
            .await
            .unwrap();

        ledger.delete_bill(ActorRole::Doctor, bill.id).await.unwrap();

        assert!(store.is_empty().await);
        let err = ledger.get_bill(bill.id).await.unwrap_err();
        assert!(matches!(err, BillingError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_receptionist_cannot_delete() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let err = ledger
            .delete_bill(ActorRole::Receptionist, bill.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_delete_finalized_rejected_for_every_role() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;
        ledger.finalize_bill(ActorRole::Doctor, bill.id).await.unwrap();

        for role in [ActorRole::Admin, ActorRole::Doctor] {
            let err = ledger.delete_bill(role, bill.id).await.unwrap_err();
            assert!(matches!(err, BillingError::InvalidState(_)));
        }
        let err = ledger
            .delete_bill(ActorRole::Receptionist, bill.id)
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_delete_missing_bill() {
        let (ledger, _) = ledger_with_store();
        let err = ledger
            .delete_bill(ActorRole::Admin, BillId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::NotFound { .. }));
    }
}

// ============================================================================
// Concurrency Tests
// ============================================================================

mod concurrency_tests {
    use super::*;

    #[tokio::test]
    async fn test_stale_write_rejected() {
        let (ledger, store) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        // Another request pays in the meantime
        ledger
            .record_payment(bill.id, bdt(dec!(400)), PaymentMethod::Cash)
            .await
            .unwrap();

        let mut stale = bill.clone();
        let payment = stale
            .record_payment(bdt(dec!(400)), PaymentMethod::Card)
            .unwrap();
        stale.version = 1;
        let err = store
            .save_bill(&stale, &BillChange::PaymentRecorded(payment), 0)
            .await
            .unwrap_err();
        assert!(err.is_conflict());

        let current = ledger.get_bill(bill.id).await.unwrap();
        assert_eq!(current.paid, bdt(dec!(400)));
        assert!(current.reconciles());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_payments_never_overpay() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger
                        .record_payment(bill.id, bdt(dec!(300)), PaymentMethod::Cash)
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(BillingError::ConcurrentModification(_))
                | Err(BillingError::InvalidAmount(_)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }

        assert_eq!(succeeded, 1);
        let current = ledger.get_bill(bill.id).await.unwrap();
        assert_eq!(current.paid, bdt(dec!(300)));
        assert_eq!(current.due, bdt(dec!(200)));
        assert!(current.reconciles());
    }
}

// ============================================================================
// Query and Dashboard Tests
// ============================================================================

mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_bills_for_patient_newest_first() {
        let (ledger, _) = ledger_with_store();
        let patient = PatientId::new();

        let first = ledger
            .create_bill(ActorRole::Doctor, patient, consultation(), None)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = ledger
            .create_bill(ActorRole::Doctor, patient, consultation(), None)
            .await
            .unwrap();
        create_consultation(&ledger).await;

        let bills = ledger.bills_for_patient(patient).await.unwrap();
        let ids: Vec<_> = bills.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_list_outstanding_with_pagination() {
        let (ledger, _) = ledger_with_store();
        let paid = create_consultation(&ledger).await;
        ledger
            .record_payment(paid.id, bdt(dec!(500)), PaymentMethod::Cash)
            .await
            .unwrap();
        for _ in 0..3 {
            create_consultation(&ledger).await;
        }

        let outstanding = ledger
            .list_bills(BillQuery::default().outstanding())
            .await
            .unwrap();
        assert_eq!(outstanding.len(), 3);
        assert!(outstanding.iter().all(|b| b.due.is_positive()));

        let page = ledger
            .list_bills(BillQuery::default().outstanding().paginate(2, 2))
            .await
            .unwrap();
        assert_eq!(page.len(), 1);

        let paid_only = ledger
            .list_bills(BillQuery::default().with_status(BillStatus::Paid))
            .await
            .unwrap();
        assert_eq!(paid_only.len(), 1);
        assert_eq!(paid_only[0].id, paid.id);
    }

    #[tokio::test]
    async fn test_dashboard_counts_only_todays_income() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();

        let mut today = Bill::new(PatientId::new(), None, Currency::BDT, consultation()).unwrap();
        today.created_at = now - Duration::hours(2);
        today.record_payment(bdt(dec!(200)), PaymentMethod::Cash).unwrap();

        let mut yesterday =
            Bill::new(PatientId::new(), None, Currency::BDT, consultation()).unwrap();
        yesterday.created_at = now - Duration::days(1);
        yesterday.record_payment(bdt(dec!(500)), PaymentMethod::Cash).unwrap();

        let mut unpaid = Bill::new(PatientId::new(), None, Currency::BDT, consultation()).unwrap();
        unpaid.created_at = now - Duration::minutes(5);

        let store = InMemoryBillingStore::with_bills(vec![today, yesterday, unpaid]).await;
        let ledger = BillingLedger::new(Arc::new(store), LedgerSettings::default());

        let stats = ledger.dashboard_stats_at(now).await.unwrap();
        assert_eq!(stats.income_today, bdt(dec!(200)));
        assert_eq!(stats.pending_count, 2);
        assert_eq!(stats.date, now.date_naive());
    }

    #[tokio::test]
    async fn test_dashboard_uses_clinic_timezone() {
        // 20:00 UTC on 1 June is 02:00 on 2 June in Dhaka
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap();

        let mut late_utc_evening =
            Bill::new(PatientId::new(), None, Currency::BDT, consultation()).unwrap();
        late_utc_evening.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 19, 0, 0).unwrap();
        late_utc_evening.record_payment(bdt(dec!(100)), PaymentMethod::Card).unwrap();

        let mut utc_morning =
            Bill::new(PatientId::new(), None, Currency::BDT, consultation()).unwrap();
        utc_morning.created_at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        utc_morning.record_payment(bdt(dec!(500)), PaymentMethod::Card).unwrap();

        let store = InMemoryBillingStore::with_bills(vec![late_utc_evening, utc_morning]).await;
        let settings = LedgerSettings {
            currency: Currency::BDT,
            timezone: "Asia/Dhaka".parse::<Timezone>().unwrap(),
        };
        let ledger = BillingLedger::new(Arc::new(store), settings);

        let stats = ledger.dashboard_stats_at(now).await.unwrap();
        assert_eq!(stats.income_today, bdt(dec!(100)));
    }
}

// ============================================================================
// Wire Format Tests
// ============================================================================

mod wire_format_tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enums_serialize_lowercase() {
        assert_eq!(serde_json::to_value(BillStatus::Partial).unwrap(), json!("partial"));
        assert_eq!(serde_json::to_value(PaymentMethod::Mobile).unwrap(), json!("mobile"));
        assert_eq!(
            serde_json::to_value(ActorRole::Receptionist).unwrap(),
            json!("receptionist")
        );
    }

    #[test]
    fn test_enums_parse_from_wire_strings() {
        let status: BillStatus = serde_json::from_value(json!("paid")).unwrap();
        let method: PaymentMethod = serde_json::from_value(json!("card")).unwrap();
        let role: ActorRole = serde_json::from_value(json!("doctor")).unwrap();

        assert_eq!(status, BillStatus::Paid);
        assert_eq!(method, PaymentMethod::Card);
        assert_eq!(role, ActorRole::Doctor);
    }

    #[test]
    fn test_unknown_wire_strings_rejected() {
        assert!(serde_json::from_value::<BillStatus>(json!("refunded")).is_err());
        assert!(serde_json::from_value::<PaymentMethod>(json!("cheque")).is_err());
        assert!(serde_json::from_value::<ActorRole>(json!("nurse")).is_err());
    }

    #[tokio::test]
    async fn test_bill_serializes_derived_figures() {
        let (ledger, _) = ledger_with_store();
        let bill = create_consultation(&ledger).await;

        let value = serde_json::to_value(&bill).unwrap();
        assert_eq!(value["status"], json!("due"));
        assert_eq!(value["is_finalized"], json!(false));
        assert_eq!(value["total"]["currency"], json!("BDT"));
        assert_eq!(value["items"][0]["description"], json!("Consultation"));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

mod invariant_proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        AddItem(i64),
        Discount(i64),
        Pay(i64),
        Finalize,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-5_000i64..200_000).prop_map(Op::AddItem),
            (-5_000i64..200_000).prop_map(Op::Discount),
            (-5_000i64..200_000).prop_map(Op::Pay),
            Just(Op::Finalize),
        ]
    }

    fn minor(amount: i64) -> Money {
        Money::from_minor(amount, Currency::BDT)
    }

    fn assert_invariants(bill: &Bill) -> Result<(), TestCaseError> {
        let subtotal: Decimal = bill.items.iter().map(|i| i.amount.amount()).sum();
        let paid: Decimal = bill.payments.iter().map(|p| p.amount.amount()).sum();
        let total = (subtotal - bill.discount.amount()).max(Decimal::ZERO);

        prop_assert_eq!(bill.total.amount(), total);
        prop_assert_eq!(bill.paid.amount(), paid);
        prop_assert_eq!(bill.due.amount(), (total - paid).max(Decimal::ZERO));

        let expected_status = if bill.paid.amount() >= bill.total.amount() {
            BillStatus::Paid
        } else if bill.paid.is_positive() {
            BillStatus::Partial
        } else {
            BillStatus::Due
        };
        prop_assert_eq!(bill.status, expected_status);
        Ok(())
    }

    proptest! {
        #[test]
        fn invariants_hold_after_every_operation(
            initial in proptest::collection::vec(0i64..100_000, 0..4),
            ops in proptest::collection::vec(op_strategy(), 0..30)
        ) {
            let items = initial
                .iter()
                .map(|a| NewBillItem::new("Procedure", minor(*a)))
                .collect();
            let mut bill = Bill::new(PatientId::new(), None, Currency::BDT, items).unwrap();
            assert_invariants(&bill)?;

            for op in ops {
                let before = bill.clone();
                let result = match op {
                    Op::AddItem(a) => bill.add_item("Extra", minor(a)).map(|_| ()),
                    Op::Discount(a) => bill.apply_discount(minor(a)),
                    Op::Pay(a) => bill.record_payment(minor(a), PaymentMethod::Cash).map(|_| ()),
                    Op::Finalize => {
                        bill.finalize();
                        Ok(())
                    }
                };

                if result.is_err() {
                    prop_assert_eq!(&bill, &before);
                }
                if before.is_finalized {
                    prop_assert!(bill.is_finalized);
                    prop_assert_eq!(&bill.items, &before.items);
                    prop_assert_eq!(bill.discount, before.discount);
                }
                if let Op::Pay(a) = op {
                    if a <= 0 || minor(a).amount() > before.due.amount() {
                        prop_assert!(matches!(result, Err(BillingError::InvalidAmount(_))));
                    }
                }
                assert_invariants(&bill)?;
            }
        }
    }
}
