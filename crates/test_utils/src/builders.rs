//! Test Data Builders
//!
//! Builder patterns for constructing bills in a given state. Tests specify
//! only the relevant fields and take defaults for everything else.
//!
//! ```rust,ignore
//! let bill = TestBillBuilder::new()
//!     .with_item("Scaling", MoneyFixtures::bdt(dec!(1200)))
//!     .with_discount(MoneyFixtures::bdt(dec!(200)))
//!     .with_payment(MoneyFixtures::bdt(dec!(400)), PaymentMethod::Cash)
//!     .finalized()
//!     .build();
//! ```

use chrono::{DateTime, Utc};
use core_kernel::{Currency, Money, PatientId, TreatmentId};
use domain_billing::{Bill, NewBillItem, PaymentMethod};

use crate::fixtures::{IdFixtures, ItemFixtures};

/// Builder for [`Bill`] aggregates
///
/// The bill is assembled through its own operations, so every derived figure
/// is consistent. `build` panics if the requested state is not reachable
/// (for example a payment larger than the amount due).
#[derive(Debug, Clone)]
pub struct TestBillBuilder {
    patient_id: PatientId,
    treatment_id: Option<TreatmentId>,
    currency: Currency,
    items: Vec<NewBillItem>,
    discount: Option<Money>,
    payments: Vec<(Money, PaymentMethod)>,
    finalized: bool,
    created_at: Option<DateTime<Utc>>,
}

impl Default for TestBillBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestBillBuilder {
    /// Creates a builder for an open consultation bill
    pub fn new() -> Self {
        Self {
            patient_id: IdFixtures::patient_id(),
            treatment_id: None,
            currency: Currency::BDT,
            items: vec![ItemFixtures::consultation()],
            discount: None,
            payments: Vec::new(),
            finalized: false,
            created_at: None,
        }
    }

    /// Starts with no items at all
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            ..Self::new()
        }
    }

    pub fn with_patient(mut self, patient_id: PatientId) -> Self {
        self.patient_id = patient_id;
        self
    }

    /// Marks the bill as raised from a treatment record
    pub fn from_treatment(mut self) -> Self {
        self.treatment_id = Some(TreatmentId::new());
        self
    }

    pub fn with_item(mut self, description: impl Into<String>, amount: Money) -> Self {
        self.items.push(NewBillItem::new(description, amount));
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = Some(discount);
        self
    }

    pub fn with_payment(mut self, amount: Money, method: PaymentMethod) -> Self {
        self.payments.push((amount, method));
        self
    }

    pub fn finalized(mut self) -> Self {
        self.finalized = true;
        self
    }

    /// Backdates the bill, e.g. for dashboard window tests
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Builds the bill
    pub fn build(self) -> Bill {
        let mut bill = Bill::new(self.patient_id, self.treatment_id, self.currency, self.items)
            .expect("builder items must be valid");

        if let Some(discount) = self.discount {
            bill.apply_discount(discount)
                .expect("builder discount must be valid");
        }
        for (amount, method) in self.payments {
            bill.record_payment(amount, method)
                .expect("builder payment must not exceed the amount due");
        }
        if self.finalized {
            bill.finalize();
        }
        if let Some(at) = self.created_at {
            bill.created_at = at;
            bill.updated_at = at;
        }
        bill
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::MoneyFixtures;
    use domain_billing::BillStatus;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_is_open_consultation() {
        let bill = TestBillBuilder::new().build();
        assert_eq!(bill.total, MoneyFixtures::consultation_fee());
        assert_eq!(bill.status, BillStatus::Due);
        assert!(!bill.is_finalized);
    }

    #[test]
    fn test_builder_applies_every_step() {
        let bill = TestBillBuilder::new()
            .with_item("X-ray", MoneyFixtures::bdt(dec!(300)))
            .with_discount(MoneyFixtures::bdt(dec!(100)))
            .with_payment(MoneyFixtures::bdt(dec!(200)), PaymentMethod::Card)
            .finalized()
            .build();

        assert_eq!(bill.total, MoneyFixtures::bdt(dec!(700)));
        assert_eq!(bill.due, MoneyFixtures::bdt(dec!(500)));
        assert_eq!(bill.status, BillStatus::Partial);
        assert!(bill.is_finalized);
    }

    #[test]
    #[should_panic(expected = "must not exceed")]
    fn test_unreachable_state_panics() {
        TestBillBuilder::new()
            .with_payment(MoneyFixtures::bdt(dec!(900)), PaymentMethod::Cash)
            .build();
    }
}
