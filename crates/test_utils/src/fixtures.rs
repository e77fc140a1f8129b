//! Pre-built Test Fixtures
//!
//! Ready-to-use test data for the billing domain. Fixtures are fixed values
//! so tests stay predictable.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use core_kernel::{Currency, Money, PatientId, Timezone};
use domain_billing::{BillingLedger, InMemoryBillingStore, LedgerSettings, NewBillItem};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// An amount in the default clinic currency
    pub fn bdt(amount: Decimal) -> Money {
        Money::new(amount, Currency::BDT)
    }

    /// Standard consultation fee
    pub fn consultation_fee() -> Money {
        Self::bdt(dec!(500))
    }

    pub fn bdt_zero() -> Money {
        Money::zero(Currency::BDT)
    }

    /// A foreign amount for currency mismatch tests
    pub fn usd_100() -> Money {
        Money::new(dec!(100.00), Currency::USD)
    }
}

/// Fixture for common line items
pub struct ItemFixtures;

impl ItemFixtures {
    pub fn consultation() -> NewBillItem {
        NewBillItem::new("Consultation", MoneyFixtures::consultation_fee())
    }

    pub fn x_ray() -> NewBillItem {
        NewBillItem::new("Dental X-ray", MoneyFixtures::bdt(dec!(300)))
    }

    pub fn root_canal() -> NewBillItem {
        NewBillItem::new("Root canal treatment", MoneyFixtures::bdt(dec!(4500)))
    }
}

/// Fixture for time-related test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Mid-morning UTC on a regular business day
    pub fn clinic_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 4, 0, 0).unwrap()
    }

    /// A timezone six hours ahead of UTC with no DST
    pub fn dhaka() -> Timezone {
        "Asia/Dhaka".parse().unwrap()
    }
}

/// Fixture for identifiers
pub struct IdFixtures;

impl IdFixtures {
    /// A patient id that stays the same across runs
    pub fn patient_id() -> PatientId {
        PatientId::from(Uuid::from_u128(0x6f1c_2b8e_3f0a_4c55_9a1e_0d2f_5b7c_9e11))
    }
}

/// Builds a ledger over a fresh in-memory store and returns both
pub fn memory_ledger() -> (BillingLedger, InMemoryBillingStore) {
    memory_ledger_with(LedgerSettings::default())
}

/// Same as [`memory_ledger`] with explicit settings
pub fn memory_ledger_with(settings: LedgerSettings) -> (BillingLedger, InMemoryBillingStore) {
    let store = InMemoryBillingStore::new();
    let ledger = BillingLedger::new(Arc::new(store.clone()), settings);
    (ledger, store)
}
