//! Billing ledger service
//!
//! `BillingLedger` owns the lifecycle of a bill: creation, item growth,
//! discounting, payment, finalization and deletion. Each mutation is
//! executed as
//!
//! 1. load the hydrated bill,
//! 2. check the actor's role and the bill's state,
//! 3. apply the change to the aggregate (which recomputes every derived field),
//! 4. write it back conditionally on the version read in step 1.
//!
//! A lost race in step 4 surfaces as `BillingError::ConcurrentModification`;
//! nothing is retried automatically.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{BillId, Currency, Money, PatientId, Timezone, TreatmentId};

use crate::bill::{Bill, NewBillItem};
use crate::error::BillingError;
use crate::payment::PaymentMethod;
use crate::ports::{BillChange, BillQuery, BillingPort};
use crate::role::{ActorRole, BillingAction};

/// Clinic-wide settings the ledger runs under
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Currency every bill is issued in
    pub currency: Currency,
    /// Timezone that defines "today" for dashboard figures
    pub timezone: Timezone,
}

/// Read-only figures shown on the clinic dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Local calendar date the income figure covers
    pub date: NaiveDate,
    /// Sum of `paid` over bills created today
    pub income_today: Money,
    /// Number of bills with an outstanding balance
    pub pending_count: u64,
}

/// Application service enforcing billing rules over a [`BillingPort`]
#[derive(Clone)]
pub struct BillingLedger {
    port: Arc<dyn BillingPort>,
    settings: LedgerSettings,
}

impl std::fmt::Debug for BillingLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BillingLedger")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl BillingLedger {
    /// Creates a ledger backed by `port`
    pub fn new(port: Arc<dyn BillingPort>, settings: LedgerSettings) -> Self {
        Self { port, settings }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    /// Returns the underlying port (for health checks)
    pub fn port(&self) -> &Arc<dyn BillingPort> {
        &self.port
    }

    /// Creates a bill with an initial item set
    ///
    /// Any role may create a bill. The header and items are persisted as one
    /// unit by the port.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if an item is negative or not in the clinic currency
    /// - `Validation` if an item description is blank
    /// - `Storage` if the write fails (nothing is left behind)
    #[instrument(
        skip(self, items),
        fields(role = %role, patient_id = %patient_id, item_count = items.len())
    )]
    pub async fn create_bill(
        &self,
        role: ActorRole,
        patient_id: PatientId,
        items: Vec<NewBillItem>,
        treatment_id: Option<TreatmentId>,
    ) -> Result<Bill, BillingError> {
        self.authorize(role, BillingAction::CreateBill)?;
        let bill = Bill::new(patient_id, treatment_id, self.settings.currency, items)?;

        self.port.insert_bill(&bill).await?;

        info!(bill_id = %bill.id, total = %bill.total, "Bill created");
        Ok(bill)
    }

    /// Appends a line item to an unfinalized bill (doctor/admin only)
    #[instrument(skip(self, description), fields(role = %role, bill_id = %bill_id))]
    pub async fn add_bill_item(
        &self,
        role: ActorRole,
        bill_id: BillId,
        description: impl Into<String>,
        amount: Money,
    ) -> Result<Bill, BillingError> {
        self.authorize(role, BillingAction::AddItem)?;
        let mut bill = self.port.load_bill(bill_id).await?;

        let item = bill.add_item(description, amount)?;
        self.persist(&mut bill, BillChange::ItemAdded(item)).await?;

        info!(total = %bill.total, due = %bill.due, "Bill item added");
        Ok(bill)
    }

    /// Replaces the discount on an unfinalized bill (doctor/admin only)
    #[instrument(skip(self), fields(role = %role, bill_id = %bill_id))]
    pub async fn apply_discount(
        &self,
        role: ActorRole,
        bill_id: BillId,
        discount: Money,
    ) -> Result<Bill, BillingError> {
        self.authorize(role, BillingAction::ApplyDiscount)?;
        let mut bill = self.port.load_bill(bill_id).await?;

        bill.apply_discount(discount)?;
        self.persist(&mut bill, BillChange::DiscountApplied).await?;

        info!(
            discount = %bill.discount,
            total = %bill.total,
            status = %bill.status,
            "Discount applied"
        );
        Ok(bill)
    }

    /// Records a payment of at most the current due amount
    ///
    /// Payments are accepted on finalized bills as well.
    #[instrument(skip(self), fields(bill_id = %bill_id, method = %method))]
    pub async fn record_payment(
        &self,
        bill_id: BillId,
        amount: Money,
        method: PaymentMethod,
    ) -> Result<Bill, BillingError> {
        let mut bill = self.port.load_bill(bill_id).await?;

        let payment = bill.record_payment(amount, method)?;
        self.persist(&mut bill, BillChange::PaymentRecorded(payment)).await?;

        info!(
            amount = %amount,
            paid = %bill.paid,
            due = %bill.due,
            status = %bill.status,
            finalized = bill.is_finalized,
            "Payment recorded"
        );
        Ok(bill)
    }

    /// Locks a bill against item and discount changes (doctor/admin only)
    ///
    /// Finalizing an already finalized bill is a successful no-op.
    #[instrument(skip(self), fields(role = %role, bill_id = %bill_id))]
    pub async fn finalize_bill(
        &self,
        role: ActorRole,
        bill_id: BillId,
    ) -> Result<Bill, BillingError> {
        let mut bill = self.port.load_bill(bill_id).await?;

        if !role.can(BillingAction::Finalize) {
            warn!("Finalize rejected");
            let message = if bill.is_treatment_bill() {
                format!("only doctors or admins may finalize treatment bills (role '{}')", role)
            } else {
                format!("role '{}' may not finalize bills", role)
            };
            return Err(BillingError::PermissionDenied(message));
        }

        if !bill.finalize() {
            debug!("Bill already finalized");
            return Ok(bill);
        }
        self.persist(&mut bill, BillChange::Finalized).await?;

        info!("Bill finalized");
        Ok(bill)
    }

    /// Deletes an unfinalized bill together with its items and payments
    #[instrument(skip(self), fields(role = %role, bill_id = %bill_id))]
    pub async fn delete_bill(&self, role: ActorRole, bill_id: BillId) -> Result<(), BillingError> {
        self.authorize(role, BillingAction::Delete)?;
        let bill = self.port.load_bill(bill_id).await?;
        bill.ensure_deletable()?;

        self.port
            .delete_bill(bill_id, bill.version)
            .await
            .map_err(|e| self.conflict_warning(e))?;

        info!("Bill deleted");
        Ok(())
    }

    /// Loads a fully hydrated bill
    #[instrument(skip(self), fields(bill_id = %bill_id))]
    pub async fn get_bill(&self, bill_id: BillId) -> Result<Bill, BillingError> {
        debug!("Fetching bill");
        Ok(self.port.load_bill(bill_id).await?)
    }

    /// Lists a patient's bills, newest first
    #[instrument(skip(self), fields(patient_id = %patient_id))]
    pub async fn bills_for_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<Bill>, BillingError> {
        self.list_bills(BillQuery::for_patient(patient_id)).await
    }

    /// Lists bills matching `query`, newest first
    #[instrument(skip(self))]
    pub async fn list_bills(&self, query: BillQuery) -> Result<Vec<Bill>, BillingError> {
        let bills = self.port.find_bills(&query).await?;
        debug!(count = bills.len(), "Bills listed");
        Ok(bills)
    }

    /// Income collected on bills created today and the number of bills still owing
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, BillingError> {
        self.dashboard_stats_at(Utc::now()).await
    }

    /// Same as [`Self::dashboard_stats`] with an explicit "now"
    #[instrument(skip(self))]
    pub async fn dashboard_stats_at(
        &self,
        now: DateTime<Utc>,
    ) -> Result<DashboardStats, BillingError> {
        let window = self.settings.timezone.day_window(now);
        let income = self
            .port
            .sum_paid_created_between(window.start, window.end)
            .await?;
        let pending_count = self.port.count_outstanding().await?;

        Ok(DashboardStats {
            date: window.date,
            income_today: Money::new(income, self.settings.currency),
            pending_count,
        })
    }

    fn authorize(&self, role: ActorRole, action: BillingAction) -> Result<(), BillingError> {
        role.authorize(action).inspect_err(|e| {
            warn!(error = %e, "Permission check failed");
        })
    }

    /// Bumps the version and writes the bill conditionally on the version it was read at
    async fn persist(&self, bill: &mut Bill, change: BillChange) -> Result<(), BillingError> {
        let expected = bill.version;
        bill.version = expected + 1;
        bill.updated_at = Utc::now();

        self.port
            .save_bill(bill, &change, expected)
            .await
            .map_err(|e| self.conflict_warning(e))
    }

    fn conflict_warning(&self, error: core_kernel::PortError) -> BillingError {
        if error.is_conflict() {
            warn!(error = %error, "Conditional write rejected");
        }
        error.into()
    }
}
