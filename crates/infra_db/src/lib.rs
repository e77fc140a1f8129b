//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL persistence for the clinic billing
//! ledger using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern. [`repositories::BillingRepository`]
//! owns the SQL and speaks in row types; [`adapters::PostgresBillingAdapter`]
//! implements `domain_billing::BillingPort` on top of it and translates rows
//! to and from the `Bill` aggregate.
//!
//! # Concurrency
//!
//! Every bill row carries a `version` column. Updates and deletes are issued
//! as `... WHERE bill_id = $1 AND version = $2`; zero affected rows means a
//! concurrent writer got there first and is reported as a conflict.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, create_pool, PostgresBillingAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/clinic")).await?;
//! let adapter = PostgresBillingAdapter::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;
pub mod adapters;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use adapters::PostgresBillingAdapter;
