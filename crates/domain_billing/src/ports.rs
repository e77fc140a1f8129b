//! Billing Domain Ports
//!
//! The `BillingPort` trait is everything the ledger needs from persistent
//! storage. Two adapters implement it:
//!
//! - **PostgreSQL** (`infra_db::adapters::PostgresBillingAdapter`)
//! - **In-memory** ([`crate::memory::InMemoryBillingStore`]) for tests and
//!   local development
//!
//! # Conditional writes
//!
//! Mutations never blindly overwrite a bill. `save_bill` and `delete_bill`
//! take the version the caller read; the adapter applies the write only if
//! the stored version still matches and reports `PortError::Conflict`
//! otherwise. This closes the read-modify-write race where two payments
//! both pass the `amount ≤ due` check against the same stale snapshot.
//!
//! ```rust,ignore
//! let mut bill = port.load_bill(id).await?;
//! let expected = bill.version;
//! let payment = bill.record_payment(amount, PaymentMethod::Cash)?;
//! bill.version = expected + 1;
//! port.save_bill(&bill, &BillChange::PaymentRecorded(payment), expected).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use core_kernel::{BillId, DomainPort, HealthCheckable, PatientId, PortError};

use crate::bill::{Bill, BillItem, BillStatus};
use crate::payment::Payment;

/// Query parameters for listing bills
///
/// Results are always ordered newest first by creation time.
#[derive(Debug, Clone, Default)]
pub struct BillQuery {
    /// Filter by patient
    pub patient_id: Option<PatientId>,
    /// Filter by derived status
    pub status: Option<BillStatus>,
    /// Only bills with `due > 0`
    pub outstanding_only: bool,
    /// Only bills created at or after this instant
    pub created_from: Option<DateTime<Utc>>,
    /// Only bills created strictly before this instant
    pub created_before: Option<DateTime<Utc>>,
    /// Limit results
    pub limit: Option<u32>,
    /// Offset for pagination
    pub offset: Option<u32>,
}

impl BillQuery {
    /// Creates a query for all bills of one patient
    pub fn for_patient(patient_id: PatientId) -> Self {
        Self {
            patient_id: Some(patient_id),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: BillStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn outstanding(mut self) -> Self {
        self.outstanding_only = true;
        self
    }

    pub fn created_between(mut self, from: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self.created_before = Some(before);
        self
    }

    pub fn paginate(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Returns true if `bill` satisfies every filter (pagination aside)
    pub fn matches(&self, bill: &Bill) -> bool {
        if let Some(patient_id) = self.patient_id {
            if bill.patient_id != patient_id {
                return false;
            }
        }
        if let Some(status) = self.status {
            if bill.status != status {
                return false;
            }
        }
        if self.outstanding_only && !bill.due.is_positive() {
            return false;
        }
        if let Some(from) = self.created_from {
            if bill.created_at < from {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if bill.created_at >= before {
                return false;
            }
        }
        true
    }
}

/// The child record a mutation appends, if any
///
/// The bill header (totals, discount, status, finalization, version) is
/// always rewritten from the `Bill` passed alongside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BillChange {
    ItemAdded(BillItem),
    DiscountApplied,
    PaymentRecorded(Payment),
    Finalized,
}

impl BillChange {
    pub fn name(&self) -> &'static str {
        match self {
            BillChange::ItemAdded(_) => "item_added",
            BillChange::DiscountApplied => "discount_applied",
            BillChange::PaymentRecorded(_) => "payment_recorded",
            BillChange::Finalized => "finalized",
        }
    }
}

/// Persistence collaborator for the billing ledger
#[async_trait]
pub trait BillingPort: DomainPort + HealthCheckable {
    /// Stores a new bill with all its items as one unit
    ///
    /// Either the header and every item are written, or nothing is.
    async fn insert_bill(&self, bill: &Bill) -> Result<(), PortError>;

    /// Loads a fully hydrated bill (header, items, payments)
    async fn load_bill(&self, id: BillId) -> Result<Bill, PortError>;

    /// Lists hydrated bills matching `query`, newest first
    async fn find_bills(&self, query: &BillQuery) -> Result<Vec<Bill>, PortError>;

    /// Persists a mutated bill if its stored version equals `expected_version`
    ///
    /// `bill.version` must already be `expected_version + 1`. The header
    /// update and the appended child record are applied atomically.
    async fn save_bill(
        &self,
        bill: &Bill,
        change: &BillChange,
        expected_version: i64,
    ) -> Result<(), PortError>;

    /// Deletes an unfinalized bill if its stored version equals `expected_version`
    ///
    /// Items and payments are removed with it.
    async fn delete_bill(&self, id: BillId, expected_version: i64) -> Result<(), PortError>;

    /// Sum of `paid` over bills created in `[from, before)`
    async fn sum_paid_created_between(
        &self,
        from: DateTime<Utc>,
        before: DateTime<Utc>,
    ) -> Result<Decimal, PortError>;

    /// Number of bills with `due > 0`
    async fn count_outstanding(&self) -> Result<u64, PortError>;
}
