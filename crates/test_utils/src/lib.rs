//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! clinic ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data (BDT amounts, common line items, ledgers)
//! - `builders`: Builder for bills in any state
//! - `database`: PostgreSQL container management for adapter tests
//! - `assertions`: Assertion helpers for money and bill invariants
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
