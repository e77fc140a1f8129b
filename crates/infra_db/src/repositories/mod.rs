//! Repository implementations
//!
//! Repositories encapsulate SQL and map between database rows and plain
//! row structs. Conversion to domain types happens in [`crate::adapters`].
//!
//! All queries are built at runtime (`sqlx::query`, `QueryBuilder`) so the
//! crate compiles without a live database.

pub mod billing;

pub use billing::BillingRepository;
