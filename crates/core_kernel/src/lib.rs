//! Core Kernel - Foundational types shared by the clinic billing crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers for patients, bills, items and payments
//! - Clinic timezone handling for day-based reporting
//! - Port error and health-check types for the adapter layer

pub mod money;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use money::{Money, Currency, MoneyError};
pub use temporal::{Timezone, DayWindow, TemporalError};
pub use identifiers::{PatientId, TreatmentId, BillId, BillItemId, PaymentId};
pub use ports::{PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth};
