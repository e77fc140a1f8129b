//! Domain Adapters
//!
//! Adapter implementations for domain ports, connecting domain interfaces
//! to the PostgreSQL database layer.
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillingAdapter;
//! use domain_billing::{BillingLedger, LedgerSettings};
//! use std::sync::Arc;
//!
//! let adapter = PostgresBillingAdapter::new(pool);
//! let ledger = BillingLedger::new(Arc::new(adapter), LedgerSettings::default());
//! ```

pub mod billing;

pub use billing::PostgresBillingAdapter;
