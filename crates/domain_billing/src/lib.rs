//! Billing Domain - Clinic Bill Ledger
//!
//! This crate owns the lifecycle of a patient bill: line items, discount,
//! payments, status derivation, finalization and deletion, with role-based
//! and state-based guards.
//!
//! # Invariants
//!
//! After every mutation:
//! - `total = max(0, Σ items − discount)`
//! - `due = max(0, total − paid)` and `paid = Σ payments`
//! - `status` is `paid`, `partial` or `due` as a pure function of `paid` and `total`
//! - finalized bills never change items or discount
//!
//! # Roles
//!
//! | Action          | admin | doctor | receptionist |
//! |-----------------|:-----:|:------:|:------------:|
//! | create bill     |   ✓   |   ✓    |      ✓       |
//! | add item        |   ✓   |   ✓    |              |
//! | apply discount  |   ✓   |   ✓    |              |
//! | record payment  |   ✓   |   ✓    |      ✓       |
//! | finalize        |   ✓   |   ✓    |              |
//! | delete          |   ✓   |   ✓    |              |
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{
//!     ActorRole, BillingLedger, InMemoryBillingStore, LedgerSettings, NewBillItem, PaymentMethod,
//! };
//!
//! let store = Arc::new(InMemoryBillingStore::new());
//! let ledger = BillingLedger::new(store, LedgerSettings::default());
//! let items = vec![NewBillItem::new("Consultation", fee)];
//! let bill = ledger
//!     .create_bill(ActorRole::Receptionist, patient_id, items, None)
//!     .await?;
//! ledger.record_payment(bill.id, fee, PaymentMethod::Cash).await?;
//! ```

pub mod bill;
pub mod payment;
pub mod role;
pub mod ports;
pub mod memory;
pub mod ledger;
pub mod error;

pub use bill::{Bill, BillItem, BillStatus, NewBillItem};
pub use payment::{Payment, PaymentMethod};
pub use role::{ActorRole, BillingAction};
pub use ports::{BillingPort, BillQuery, BillChange};
pub use memory::InMemoryBillingStore;
pub use ledger::{BillingLedger, LedgerSettings, DashboardStats};
pub use error::BillingError;
