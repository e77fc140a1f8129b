//! Actor roles and the billing actions they may perform
//!
//! The role is always supplied by the caller; nothing in this crate reads an
//! ambient session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::BillingError;

/// Permission class of the user invoking a ledger operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    Doctor,
    Receptionist,
}

/// Ledger actions subject to role checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingAction {
    CreateBill,
    AddItem,
    ApplyDiscount,
    RecordPayment,
    Finalize,
    Delete,
}

impl BillingAction {
    fn describe(&self) -> &'static str {
        match self {
            BillingAction::CreateBill => "create bills",
            BillingAction::AddItem => "add bill items",
            BillingAction::ApplyDiscount => "apply discounts",
            BillingAction::RecordPayment => "record payments",
            BillingAction::Finalize => "finalize bills",
            BillingAction::Delete => "delete bills",
        }
    }
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Doctor => "doctor",
            ActorRole::Receptionist => "receptionist",
        }
    }

    /// Returns true if this role may change pricing or lock a bill
    pub fn is_clinical(&self) -> bool {
        matches!(self, ActorRole::Admin | ActorRole::Doctor)
    }

    /// Returns true if this role may perform `action`
    pub fn can(&self, action: BillingAction) -> bool {
        match action {
            BillingAction::CreateBill | BillingAction::RecordPayment => true,
            BillingAction::AddItem | BillingAction::ApplyDiscount | BillingAction::Finalize => {
                self.is_clinical()
            }
            BillingAction::Delete => *self != ActorRole::Receptionist,
        }
    }

    /// Fails with `PermissionDenied` unless this role may perform `action`
    pub fn authorize(&self, action: BillingAction) -> Result<(), BillingError> {
        if self.can(action) {
            Ok(())
        } else {
            Err(BillingError::PermissionDenied(format!(
                "role '{}' may not {}",
                self,
                action.describe()
            )))
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorRole {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(ActorRole::Admin),
            "doctor" => Ok(ActorRole::Doctor),
            "receptionist" => Ok(ActorRole::Receptionist),
            other => Err(BillingError::PermissionDenied(format!(
                "unknown role '{}'",
                other
            ))),
        }
    }
}
