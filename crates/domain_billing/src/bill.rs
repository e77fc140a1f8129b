//! The Bill aggregate
//!
//! A bill owns its line items and payments. Every derived figure (`total`,
//! `due`, `paid`, `status`) is recomputed from those collections and the
//! discount after each change, so the following always hold:
//!
//! - `total = max(0, Σ items.amount − discount)`
//! - `paid = Σ payments.amount`
//! - `due = max(0, total − paid)`
//! - `status` is `paid` when `paid ≥ total`, `partial` when `0 < paid < total`,
//!   otherwise `due`
//!
//! Finalization locks items and discount; payments may still be recorded.
//! Role checks are not done here; see [`crate::ledger::BillingLedger`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{BillId, BillItemId, Currency, Money, PatientId, TreatmentId};

use crate::error::BillingError;
use crate::payment::{Payment, PaymentMethod};

/// Payment status of a bill, a pure function of `paid` and `total`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    Due,
    Partial,
    Paid,
}

impl BillStatus {
    /// Derives the status from the cumulative paid amount and the bill total
    pub fn derive(paid: &Money, total: &Money) -> Self {
        if paid.amount() >= total.amount() {
            BillStatus::Paid
        } else if paid.is_positive() {
            BillStatus::Partial
        } else {
            BillStatus::Due
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BillStatus::Due => "due",
            BillStatus::Partial => "partial",
            BillStatus::Paid => "paid",
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BillStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "due" => Ok(BillStatus::Due),
            "partial" => Ok(BillStatus::Partial),
            "paid" => Ok(BillStatus::Paid),
            other => Err(BillingError::Validation(format!(
                "unknown bill status '{}'",
                other
            ))),
        }
    }
}

/// Input for a line item that has not been attached to a bill yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBillItem {
    pub description: String,
    pub amount: Money,
}

impl NewBillItem {
    pub fn new(description: impl Into<String>, amount: Money) -> Self {
        Self {
            description: description.into(),
            amount,
        }
    }
}

/// A line item on a bill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillItem {
    pub id: BillItemId,
    pub bill_id: BillId,
    pub description: String,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

/// An invoice issued to a patient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bill {
    pub id: BillId,
    pub patient_id: PatientId,
    /// Treatment record the bill was raised from, if any
    pub treatment_id: Option<TreatmentId>,
    pub currency: Currency,
    /// Line items in insertion order
    pub items: Vec<BillItem>,
    /// Payments in the order they were received
    pub payments: Vec<Payment>,
    pub discount: Money,
    pub paid: Money,
    pub total: Money,
    pub due: Money,
    pub status: BillStatus,
    pub is_finalized: bool,
    /// Incremented by every persisted mutation; precondition for conditional writes
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bill {
    /// Creates a new, unfinalized bill with the given items
    ///
    /// Items must be in `currency`, have a non-negative amount and a
    /// non-blank description. An empty item list is allowed.
    pub fn new(
        patient_id: PatientId,
        treatment_id: Option<TreatmentId>,
        currency: Currency,
        items: Vec<NewBillItem>,
    ) -> Result<Self, BillingError> {
        let now = Utc::now();
        let mut bill = Self {
            id: BillId::new_v7(),
            patient_id,
            treatment_id,
            currency,
            items: Vec::with_capacity(items.len()),
            payments: Vec::new(),
            discount: Money::zero(currency),
            paid: Money::zero(currency),
            total: Money::zero(currency),
            due: Money::zero(currency),
            status: BillStatus::Due,
            is_finalized: false,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        for item in items {
            let item = bill.validated_item(item.description, item.amount, now)?;
            bill.items.push(item);
        }
        bill.recalculate()?;
        Ok(bill)
    }

    /// Sum of item amounts before discount
    ///
    /// Fails with `InvalidAmount` once the sum passes [`Money::MAX_AMOUNT`].
    pub fn subtotal(&self) -> Result<Money, BillingError> {
        let subtotal = Money::sum(self.currency, self.items.iter().map(|item| &item.amount))?;
        Ok(subtotal.ensure_within_limit()?)
    }

    /// True if the bill originated from a treatment record
    pub fn is_treatment_bill(&self) -> bool {
        self.treatment_id.is_some()
    }

    /// Appends a line item
    ///
    /// # Errors
    ///
    /// `InvalidState` if finalized, `InvalidAmount` for a negative,
    /// over-limit or foreign-currency amount (or a subtotal pushed over the
    /// limit), `Validation` for a blank description.
    pub fn add_item(
        &mut self,
        description: impl Into<String>,
        amount: Money,
    ) -> Result<BillItem, BillingError> {
        self.ensure_open("add items to")?;
        let item = self.validated_item(description.into(), amount, Utc::now())?;
        self.items.push(item.clone());
        if let Err(e) = self.recalculate() {
            self.items.pop();
            return Err(e);
        }
        Ok(item)
    }

    /// Replaces the discount (absolute, not additive)
    pub fn apply_discount(&mut self, discount: Money) -> Result<(), BillingError> {
        self.ensure_open("discount")?;
        self.ensure_currency(&discount, "discount")?;
        if discount.is_negative() {
            return Err(BillingError::InvalidAmount(format!(
                "discount must not be negative, got {}",
                discount
            )));
        }
        discount.ensure_within_limit()?;

        let previous = std::mem::replace(&mut self.discount, discount);
        if let Err(e) = self.recalculate() {
            self.discount = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Records a payment of at most the current due amount
    ///
    /// Finalized bills still accept payments: finalization protects pricing,
    /// not collections.
    pub fn record_payment(
        &mut self,
        amount: Money,
        method: PaymentMethod,
    ) -> Result<Payment, BillingError> {
        self.ensure_currency(&amount, "payment")?;
        if !amount.is_positive() {
            return Err(BillingError::InvalidAmount(format!(
                "payment must be greater than zero, got {}",
                amount
            )));
        }
        if amount.amount() > self.due.amount() {
            return Err(BillingError::InvalidAmount(format!(
                "payment of {} exceeds outstanding due of {}",
                amount, self.due
            )));
        }

        let payment = Payment::new(self.id, amount, method);
        self.payments.push(payment.clone());
        if let Err(e) = self.recalculate() {
            self.payments.pop();
            return Err(e);
        }
        Ok(payment)
    }

    /// Locks the bill against structural edits
    ///
    /// Returns `false` if the bill was already finalized.
    pub fn finalize(&mut self) -> bool {
        if self.is_finalized {
            return false;
        }
        self.is_finalized = true;
        true
    }

    /// Fails with `InvalidState` if the bill may no longer be deleted
    pub fn ensure_deletable(&self) -> Result<(), BillingError> {
        self.ensure_open("delete")
    }

    /// Checks every derived field against a fresh recomputation
    pub fn reconciles(&self) -> bool {
        let mut fresh = self.clone();
        fresh.recalculate().is_ok()
            && fresh.total == self.total
            && fresh.paid == self.paid
            && fresh.due == self.due
            && fresh.status == self.status
    }

    /// Recomputes all derived figures from items, discount and payments
    ///
    /// Nothing is assigned unless every figure could be computed.
    fn recalculate(&mut self) -> Result<(), BillingError> {
        let total = self.subtotal()?.checked_sub(&self.discount)?.non_negative();
        let paid = Money::sum(self.currency, self.payments.iter().map(|p| &p.amount))?;
        let due = total.checked_sub(&paid)?.non_negative();

        self.total = total;
        self.paid = paid;
        self.due = due;
        self.status = BillStatus::derive(&paid, &total);
        Ok(())
    }

    fn validated_item(
        &self,
        description: String,
        amount: Money,
        created_at: DateTime<Utc>,
    ) -> Result<BillItem, BillingError> {
        let description = description.trim().to_string();
        if description.is_empty() {
            return Err(BillingError::Validation(
                "bill item description must not be blank".to_string(),
            ));
        }
        self.ensure_currency(&amount, "bill item")?;
        if amount.is_negative() {
            return Err(BillingError::InvalidAmount(format!(
                "bill item '{}' has negative amount {}",
                description, amount
            )));
        }
        amount.ensure_within_limit()?;
        Ok(BillItem {
            id: BillItemId::new_v7(),
            bill_id: self.id,
            description,
            amount,
            created_at,
        })
    }

    fn ensure_open(&self, verb: &str) -> Result<(), BillingError> {
        if self.is_finalized {
            return Err(BillingError::InvalidState(format!(
                "cannot {} finalized bill {}",
                verb, self.id
            )));
        }
        Ok(())
    }

    fn ensure_currency(&self, amount: &Money, what: &str) -> Result<(), BillingError> {
        if amount.currency() != self.currency {
            return Err(BillingError::InvalidAmount(format!(
                "{} is in {}, bill is in {}",
                what,
                amount.currency(),
                self.currency
            )));
        }
        Ok(())
    }
}
