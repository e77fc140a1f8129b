//! Billing domain errors

use core_kernel::{MoneyError, PortError};
use thiserror::Error;

/// Errors that can occur in the billing domain
#[derive(Debug, Error)]
pub enum BillingError {
    /// The actor's role lacks authority for the requested mutation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The bill's state forbids the operation (e.g. it is finalized)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Negative, zero, over-limit or wrong-currency monetary input
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Referenced bill (or related record) does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: String,
        id: String,
    },

    /// Non-monetary input rejected (e.g. blank item description)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The bill changed between read and conditional write
    #[error("Concurrent modification: {0}")]
    ConcurrentModification(String),

    /// The persistence collaborator failed
    #[error("Storage error: {0}")]
    Storage(#[source] PortError),
}

impl BillingError {
    pub fn not_found(entity: impl Into<String>, id: impl std::fmt::Display) -> Self {
        BillingError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            BillingError::PermissionDenied(_) => "permission_denied",
            BillingError::InvalidState(_) => "invalid_state",
            BillingError::InvalidAmount(_) => "invalid_amount",
            BillingError::NotFound { .. } => "not_found",
            BillingError::Validation(_) => "validation",
            BillingError::ConcurrentModification(_) => "concurrent_modification",
            BillingError::Storage(_) => "storage",
        }
    }
}

impl From<PortError> for BillingError {
    fn from(error: PortError) -> Self {
        match error {
            PortError::NotFound { entity_type, id } => BillingError::NotFound {
                entity: entity_type,
                id,
            },
            PortError::Conflict { message } => BillingError::ConcurrentModification(message),
            PortError::Validation { message } => BillingError::Validation(message),
            other => BillingError::Storage(other),
        }
    }
}

impl From<MoneyError> for BillingError {
    fn from(error: MoneyError) -> Self {
        BillingError::InvalidAmount(error.to_string())
    }
}
