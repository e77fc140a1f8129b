//! Billing repository implementation
//!
//! Database access for bills, their line items and payments. A bill header
//! row stores the derived figures alongside a `version` counter; every
//! header update is conditional on the version the caller read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use crate::error::DatabaseError;

const BILL_COLUMNS: &str = "bill_id, patient_id, treatment_id, currency, discount, paid, total, \
     due, status, is_finalized, version, created_at, updated_at";

/// Repository for bills, bill items and payments
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    /// Creates a new BillingRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts a bill header with its items in a single transaction
    ///
    /// Either the header and every item are stored, or nothing is.
    pub async fn insert_bill(
        &self,
        bill: &BillRow,
        items: &[BillItemRow],
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO bills (
                bill_id, patient_id, treatment_id, currency, discount, paid,
                total, due, status, is_finalized, version, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(bill.bill_id)
        .bind(bill.patient_id)
        .bind(bill.treatment_id)
        .bind(&bill.currency)
        .bind(bill.discount)
        .bind(bill.paid)
        .bind(bill.total)
        .bind(bill.due)
        .bind(&bill.status)
        .bind(bill.is_finalized)
        .bind(bill.version)
        .bind(bill.created_at)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DatabaseError::from(e) {
            DatabaseError::DuplicateEntry(_) => {
                DatabaseError::duplicate("Bill", "bill_id", bill.bill_id)
            }
            other => other,
        })?;

        for item in items {
            insert_item(&mut tx, item).await?;
        }

        tx.commit().await?;
        debug!(bill_id = %bill.bill_id, items = items.len(), "Bill inserted");
        Ok(())
    }

    /// Fetches a bill header row
    pub async fn find_bill(&self, bill_id: Uuid) -> Result<BillRow, DatabaseError> {
        let sql = format!("SELECT {} FROM bills WHERE bill_id = $1", BILL_COLUMNS);
        sqlx::query_as::<_, BillRow>(&sql)
            .bind(bill_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Bill", bill_id))
    }

    /// Lists bill header rows matching `filter`, newest first
    pub async fn find_bills(&self, filter: &BillFilter) -> Result<Vec<BillRow>, DatabaseError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM bills WHERE TRUE", BILL_COLUMNS));

        if let Some(patient_id) = filter.patient_id {
            builder.push(" AND patient_id = ").push_bind(patient_id);
        }
        if let Some(status) = &filter.status {
            builder.push(" AND status = ").push_bind(status.clone());
        }
        if filter.outstanding_only {
            builder.push(" AND due > 0");
        }
        if let Some(from) = filter.created_from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(before) = filter.created_before {
            builder.push(" AND created_at < ").push_bind(before);
        }

        builder.push(" ORDER BY created_at DESC, bill_id DESC");

        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }
        if let Some(offset) = filter.offset {
            builder.push(" OFFSET ").push_bind(offset);
        }

        let rows = builder
            .build_query_as::<BillRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Items for the given bills, in insertion order
    pub async fn items_for(&self, bill_ids: &[Uuid]) -> Result<Vec<BillItemRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, BillItemRow>(
            r#"
            SELECT item_id, bill_id, description, amount, created_at
            FROM bill_items
            WHERE bill_id = ANY($1)
            ORDER BY created_at, seq
            "#,
        )
        .bind(bill_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Payments for the given bills, in the order they were received
    pub async fn payments_for(&self, bill_ids: &[Uuid]) -> Result<Vec<PaymentRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT payment_id, bill_id, amount, method, received_at
            FROM payments
            WHERE bill_id = ANY($1)
            ORDER BY received_at, seq
            "#,
        )
        .bind(bill_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Rewrites a bill header and appends an optional child row atomically
    ///
    /// The header update only applies while the stored version equals
    /// `expected_version`; otherwise the transaction is rolled back and
    /// `ConcurrentUpdate` (or `NotFound` if the bill is gone) is returned.
    pub async fn update_bill(
        &self,
        bill: &BillRow,
        expected_version: i64,
        appended: Option<ChildRow>,
    ) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE bills
            SET discount = $3, paid = $4, total = $5, due = $6, status = $7,
                is_finalized = $8, version = $9, updated_at = $10
            WHERE bill_id = $1 AND version = $2
            "#,
        )
        .bind(bill.bill_id)
        .bind(expected_version)
        .bind(bill.discount)
        .bind(bill.paid)
        .bind(bill.total)
        .bind(bill.due)
        .bind(&bill.status)
        .bind(bill.is_finalized)
        .bind(bill.version)
        .bind(bill.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(self.missing_or_stale(bill.bill_id, expected_version).await);
        }

        match appended {
            Some(ChildRow::Item(item)) => insert_item(&mut tx, &item).await?,
            Some(ChildRow::Payment(payment)) => insert_payment(&mut tx, &payment).await?,
            None => {}
        }

        tx.commit().await?;
        Ok(())
    }

    /// Deletes an unfinalized bill at `expected_version`; items and payments cascade
    pub async fn delete_bill(
        &self,
        bill_id: Uuid,
        expected_version: i64,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM bills WHERE bill_id = $1 AND version = $2 AND NOT is_finalized",
        )
        .bind(bill_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.missing_or_stale(bill_id, expected_version).await);
        }
        Ok(())
    }

    /// Sum of `paid` over bills created in `[from, before)`
    pub async fn sum_paid_created_between(
        &self,
        from: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Decimal, DatabaseError> {
        let sum: Decimal = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(paid), 0)
            FROM bills
            WHERE created_at >= $1 AND created_at < $2
            "#,
        )
        .bind(from)
        .bind(before)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    /// Number of bills with an outstanding balance
    pub async fn count_outstanding(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bills WHERE due > 0")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Distinguishes a vanished bill from one whose version moved on
    async fn missing_or_stale(&self, bill_id: Uuid, expected_version: i64) -> DatabaseError {
        let current: Result<Option<i64>, sqlx::Error> =
            sqlx::query_scalar("SELECT version FROM bills WHERE bill_id = $1")
                .bind(bill_id)
                .fetch_optional(&self.pool)
                .await;

        match current {
            Ok(None) => DatabaseError::not_found("Bill", bill_id),
            Ok(Some(version)) => DatabaseError::ConcurrentUpdate(format!(
                "bill {} is at version {}, expected {}",
                bill_id, version, expected_version
            )),
            Err(e) => e.into(),
        }
    }
}

async fn insert_item(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    item: &BillItemRow,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO bill_items (item_id, bill_id, description, amount, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(item.item_id)
    .bind(item.bill_id)
    .bind(&item.description)
    .bind(item.amount)
    .bind(item.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_payment(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    payment: &PaymentRow,
) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        INSERT INTO payments (payment_id, bill_id, amount, method, received_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(payment.payment_id)
    .bind(payment.bill_id)
    .bind(payment.amount)
    .bind(&payment.method)
    .bind(payment.received_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Filter for listing bill headers
#[derive(Debug, Clone, Default)]
pub struct BillFilter {
    pub patient_id: Option<Uuid>,
    pub status: Option<String>,
    pub outstanding_only: bool,
    pub created_from: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Database row for a bill header
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct BillRow {
    pub bill_id: Uuid,
    pub patient_id: Uuid,
    pub treatment_id: Option<Uuid>,
    pub currency: String,
    pub discount: Decimal,
    pub paid: Decimal,
    pub total: Decimal,
    pub due: Decimal,
    pub status: String,
    pub is_finalized: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for a bill item
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct BillItemRow {
    pub item_id: Uuid,
    pub bill_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Database row for a payment
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub bill_id: Uuid,
    pub amount: Decimal,
    pub method: String,
    pub received_at: DateTime<Utc>,
}

/// Child record appended together with a header update
#[derive(Debug, Clone, PartialEq)]
pub enum ChildRow {
    Item(BillItemRow),
    Payment(PaymentRow),
}
