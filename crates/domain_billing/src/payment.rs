//! Payments received against a bill
//!
//! Payments are append-only: once recorded they are never edited or removed
//! (other than by deleting the whole unfinalized bill).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{BillId, Money, PaymentId};

use crate::error::BillingError;

/// How the money was received
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    /// Mobile financial services (bKash, Nagad, ...)
    Mobile,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Mobile => "mobile",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "card" => Ok(PaymentMethod::Card),
            "mobile" => Ok(PaymentMethod::Mobile),
            other => Err(BillingError::Validation(format!(
                "unknown payment method '{}'",
                other
            ))),
        }
    }
}

/// A payment record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Bill being paid
    pub bill_id: BillId,
    /// Amount received (always positive)
    pub amount: Money,
    /// Payment method
    pub method: PaymentMethod,
    /// When the payment was recorded
    pub received_at: DateTime<Utc>,
}

impl Payment {
    pub(crate) fn new(bill_id: BillId, amount: Money, method: PaymentMethod) -> Self {
        Self {
            id: PaymentId::new_v7(),
            bill_id,
            amount,
            method,
            received_at: Utc::now(),
        }
    }
}
