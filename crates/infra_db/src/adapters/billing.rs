//! PostgreSQL Billing Adapter
//!
//! Implements `BillingPort` on top of [`BillingRepository`]. The adapter
//! flattens a `Bill` aggregate into a header row plus child rows on the way
//! in and hydrates it again on the way out.
//!
//! # Error Handling
//!
//! Database errors are translated to `PortError` variants:
//! - `DatabaseError::NotFound` -> `PortError::NotFound`
//! - `DatabaseError::ConcurrentUpdate` -> `PortError::Conflict`
//! - connection failures -> `PortError::Connection`
//! - everything else -> `PortError::Internal`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{
    AdapterHealth, BillId, BillItemId, Currency, DomainPort, HealthCheckResult, HealthCheckable,
    Money, PatientId, PaymentId, PortError, TreatmentId,
};
use domain_billing::{
    Bill, BillChange, BillItem, BillQuery, BillStatus, BillingPort, Payment, PaymentMethod,
};

use crate::error::DatabaseError;
use crate::repositories::billing::{
    BillFilter, BillItemRow, BillRow, BillingRepository, ChildRow, PaymentRow,
};

const ADAPTER_ID: &str = "postgres-billing-adapter";

/// PostgreSQL-backed implementation of the BillingPort trait
#[derive(Debug, Clone)]
pub struct PostgresBillingAdapter {
    repository: BillingRepository,
}

impl PostgresBillingAdapter {
    /// Creates a new PostgreSQL billing adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: BillingRepository::new(pool),
        }
    }

    /// Returns a reference to the underlying repository
    pub fn repository(&self) -> &BillingRepository {
        &self.repository
    }

    /// Loads items and payments for `headers` and assembles the aggregates
    async fn hydrate(&self, headers: Vec<BillRow>) -> Result<Vec<Bill>, PortError> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = headers.iter().map(|h| h.bill_id).collect();
        let items = self.repository.items_for(&ids).await.map_err(db_to_port_error)?;
        let payments = self
            .repository
            .payments_for(&ids)
            .await
            .map_err(db_to_port_error)?;

        let mut items_by_bill: HashMap<Uuid, Vec<BillItemRow>> = HashMap::new();
        for item in items {
            items_by_bill.entry(item.bill_id).or_default().push(item);
        }
        let mut payments_by_bill: HashMap<Uuid, Vec<PaymentRow>> = HashMap::new();
        for payment in payments {
            payments_by_bill.entry(payment.bill_id).or_default().push(payment);
        }

        headers
            .into_iter()
            .map(|header| {
                let items = items_by_bill.remove(&header.bill_id).unwrap_or_default();
                let payments = payments_by_bill.remove(&header.bill_id).unwrap_or_default();
                rows_to_bill(header, items, payments)
            })
            .collect()
    }
}

impl DomainPort for PostgresBillingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBillingAdapter {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(self.repository.pool())
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

#[async_trait]
impl BillingPort for PostgresBillingAdapter {
    #[instrument(skip(self, bill), fields(bill_id = %bill.id))]
    async fn insert_bill(&self, bill: &Bill) -> Result<(), PortError> {
        let items: Vec<BillItemRow> = bill.items.iter().map(item_to_row).collect();
        self.repository
            .insert_bill(&bill_to_row(bill), &items)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self), fields(bill_id = %id))]
    async fn load_bill(&self, id: BillId) -> Result<Bill, PortError> {
        debug!("Loading bill");
        let header = self
            .repository
            .find_bill(id.into())
            .await
            .map_err(db_to_port_error)?;

        self.hydrate(vec![header])
            .await?
            .pop()
            .ok_or_else(|| PortError::not_found("Bill", id))
    }

    #[instrument(skip(self))]
    async fn find_bills(&self, query: &BillQuery) -> Result<Vec<Bill>, PortError> {
        let filter = BillFilter {
            patient_id: query.patient_id.map(Uuid::from),
            status: query.status.map(|s| s.as_str().to_string()),
            outstanding_only: query.outstanding_only,
            created_from: query.created_from,
            created_before: query.created_before,
            limit: query.limit.map(i64::from),
            offset: query.offset.map(i64::from),
        };
        let headers = self
            .repository
            .find_bills(&filter)
            .await
            .map_err(db_to_port_error)?;

        self.hydrate(headers).await
    }

    #[instrument(skip(self, bill, change), fields(bill_id = %bill.id, change = change.name()))]
    async fn save_bill(
        &self,
        bill: &Bill,
        change: &BillChange,
        expected_version: i64,
    ) -> Result<(), PortError> {
        let appended = match change {
            BillChange::ItemAdded(item) => Some(ChildRow::Item(item_to_row(item))),
            BillChange::PaymentRecorded(payment) => {
                Some(ChildRow::Payment(payment_to_row(payment)))
            }
            BillChange::DiscountApplied | BillChange::Finalized => None,
        };

        self.repository
            .update_bill(&bill_to_row(bill), expected_version, appended)
            .await
            .map_err(db_to_port_error)
    }

    #[instrument(skip(self), fields(bill_id = %id))]
    async fn delete_bill(&self, id: BillId, expected_version: i64) -> Result<(), PortError> {
        self.repository
            .delete_bill(id.into(), expected_version)
            .await
            .map_err(db_to_port_error)
    }

    async fn sum_paid_created_between(
        &self,
        from: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Decimal, PortError> {
        self.repository
            .sum_paid_created_between(from, before)
            .await
            .map_err(db_to_port_error)
    }

    async fn count_outstanding(&self) -> Result<u64, PortError> {
        let count = self
            .repository
            .count_outstanding()
            .await
            .map_err(db_to_port_error)?;
        Ok(count.max(0) as u64)
    }
}

/// Converts a database error to a port error
fn db_to_port_error(e: DatabaseError) -> PortError {
    match e {
        DatabaseError::NotFound { entity, id } => PortError::not_found(entity, id),
        DatabaseError::ConcurrentUpdate(msg) => PortError::conflict(msg),
        DatabaseError::DuplicateEntry(msg) => PortError::conflict(msg),
        DatabaseError::ConstraintViolation(msg) | DatabaseError::ForeignKeyViolation(msg) => {
            PortError::validation(msg)
        }
        e if e.is_connection_error() => PortError::Connection {
            message: e.to_string(),
            source: Some(Box::new(e)),
        },
        e => PortError::Internal {
            message: e.to_string(),
            source: Some(Box::new(e)),
        },
    }
}

fn bill_to_row(bill: &Bill) -> BillRow {
    BillRow {
        bill_id: bill.id.into(),
        patient_id: bill.patient_id.into(),
        treatment_id: bill.treatment_id.map(Uuid::from),
        currency: bill.currency.code().to_string(),
        discount: bill.discount.amount(),
        paid: bill.paid.amount(),
        total: bill.total.amount(),
        due: bill.due.amount(),
        status: bill.status.as_str().to_string(),
        is_finalized: bill.is_finalized,
        version: bill.version,
        created_at: bill.created_at,
        updated_at: bill.updated_at,
    }
}

fn item_to_row(item: &BillItem) -> BillItemRow {
    BillItemRow {
        item_id: item.id.into(),
        bill_id: item.bill_id.into(),
        description: item.description.clone(),
        amount: item.amount.amount(),
        created_at: item.created_at,
    }
}

fn payment_to_row(payment: &Payment) -> PaymentRow {
    PaymentRow {
        payment_id: payment.id.into(),
        bill_id: payment.bill_id.into(),
        amount: payment.amount.amount(),
        method: payment.method.as_str().to_string(),
        received_at: payment.received_at,
    }
}

fn rows_to_bill(
    header: BillRow,
    items: Vec<BillItemRow>,
    payments: Vec<PaymentRow>,
) -> Result<Bill, PortError> {
    let currency: Currency = header
        .currency
        .parse()
        .map_err(|e| PortError::internal(format!("bill {}: {}", header.bill_id, e)))?;
    let status: BillStatus = header
        .status
        .parse()
        .map_err(|e| PortError::internal(format!("bill {}: {}", header.bill_id, e)))?;

    let items = items
        .into_iter()
        .map(|row| BillItem {
            id: BillItemId::from(row.item_id),
            bill_id: BillId::from(row.bill_id),
            description: row.description,
            amount: Money::new(row.amount, currency),
            created_at: row.created_at,
        })
        .collect();

    let payments = payments
        .into_iter()
        .map(|row| {
            let method: PaymentMethod = row
                .method
                .parse()
                .map_err(|e| PortError::internal(format!("payment {}: {}", row.payment_id, e)))?;
            Ok(Payment {
                id: PaymentId::from(row.payment_id),
                bill_id: BillId::from(row.bill_id),
                amount: Money::new(row.amount, currency),
                method,
                received_at: row.received_at,
            })
        })
        .collect::<Result<Vec<_>, PortError>>()?;

    let bill = Bill {
        id: BillId::from(header.bill_id),
        patient_id: PatientId::from(header.patient_id),
        treatment_id: header.treatment_id.map(TreatmentId::from),
        currency,
        items,
        payments,
        discount: Money::new(header.discount, currency),
        paid: Money::new(header.paid, currency),
        total: Money::new(header.total, currency),
        due: Money::new(header.due, currency),
        status,
        is_finalized: header.is_finalized,
        version: header.version,
        created_at: header.created_at,
        updated_at: header.updated_at,
    };

    if !bill.reconciles() {
        warn!(bill_id = %bill.id, "Stored bill figures disagree with its items and payments");
    }
    Ok(bill)
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_billing::NewBillItem;
    use rust_decimal_macros::dec;

    fn sample_bill() -> Bill {
        let mut bill = Bill::new(
            PatientId::new(),
            Some(TreatmentId::new()),
            Currency::BDT,
            vec![NewBillItem::new("Extraction", Money::new(dec!(2500), Currency::BDT))],
        )
        .unwrap();
        bill.apply_discount(Money::new(dec!(500), Currency::BDT)).unwrap();
        bill.record_payment(Money::new(dec!(1000), Currency::BDT), PaymentMethod::Mobile)
            .unwrap();
        bill
    }

    #[test]
    fn test_rows_reassemble_into_same_bill() {
        let bill = sample_bill();
        let header = bill_to_row(&bill);
        let items = bill.items.iter().map(item_to_row).collect();
        let payments = bill.payments.iter().map(payment_to_row).collect();

        let restored = rows_to_bill(header, items, payments).unwrap();
        assert_eq!(restored, bill);
        assert_eq!(restored.status, BillStatus::Partial);
    }

    #[test]
    fn test_header_row_uses_wire_strings() {
        let row = bill_to_row(&sample_bill());
        assert_eq!(row.currency, "BDT");
        assert_eq!(row.status, "partial");
        assert_eq!(row.total, dec!(2000));
    }

    #[test]
    fn test_corrupt_status_is_internal_error() {
        let mut header = bill_to_row(&sample_bill());
        header.status = "refunded".to_string();

        let err = rows_to_bill(header, Vec::new(), Vec::new()).unwrap_err();
        assert!(matches!(err, PortError::Internal { .. }));
    }

    #[test]
    fn test_error_translation() {
        assert!(db_to_port_error(DatabaseError::not_found("Bill", "x")).is_not_found());
        assert!(db_to_port_error(DatabaseError::ConcurrentUpdate("v".into())).is_conflict());
        assert!(db_to_port_error(DatabaseError::PoolExhausted).is_transient());
        assert!(matches!(
            db_to_port_error(DatabaseError::QueryFailed("boom".into())),
            PortError::Internal { .. }
        ));
    }
}
