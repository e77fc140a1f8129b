//! Property-Based Test Generators
//!
//! Proptest strategies for billing inputs. Amounts are generated in minor
//! units of the clinic currency so they are always representable.

use core_kernel::{Currency, Money};
use domain_billing::{ActorRole, Bill, NewBillItem, PaymentMethod};
use proptest::prelude::*;

use crate::builders::TestBillBuilder;

/// Non-negative item amount, up to ৳100,000.00
pub fn item_amount_strategy() -> impl Strategy<Value = Money> {
    (0i64..10_000_000i64).prop_map(|minor| Money::from_minor(minor, Currency::BDT))
}

/// Strictly positive amount, up to ৳100,000.00
pub fn positive_amount_strategy() -> impl Strategy<Value = Money> {
    (1i64..10_000_000i64).prop_map(|minor| Money::from_minor(minor, Currency::BDT))
}

/// Any amount, negative ones included
pub fn signed_amount_strategy() -> impl Strategy<Value = Money> {
    (-1_000_000i64..10_000_000i64).prop_map(|minor| Money::from_minor(minor, Currency::BDT))
}

pub fn description_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Consultation".to_string()),
        Just("Scaling".to_string()),
        Just("Filling".to_string()),
        Just("Extraction".to_string()),
        Just("Dental X-ray".to_string()),
        "[A-Z][a-z]{3,12}( [a-z]{3,8})?",
    ]
}

pub fn new_item_strategy() -> impl Strategy<Value = NewBillItem> {
    (description_strategy(), item_amount_strategy())
        .prop_map(|(description, amount)| NewBillItem::new(description, amount))
}

/// Up to `max` valid items
pub fn items_strategy(max: usize) -> impl Strategy<Value = Vec<NewBillItem>> {
    proptest::collection::vec(new_item_strategy(), 0..=max)
}

pub fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::Card),
        Just(PaymentMethod::Mobile),
    ]
}

pub fn role_strategy() -> impl Strategy<Value = ActorRole> {
    prop_oneof![
        Just(ActorRole::Admin),
        Just(ActorRole::Doctor),
        Just(ActorRole::Receptionist),
    ]
}

/// A valid bill with random items and discount, paid for a random share of
/// its due amount and finalized half of the time
pub fn bill_strategy() -> impl Strategy<Value = Bill> {
    (
        items_strategy(5),
        item_amount_strategy(),
        0u8..=100u8,
        payment_method_strategy(),
        any::<bool>(),
    )
        .prop_map(|(items, discount, paid_share, method, finalized)| {
            let mut builder = TestBillBuilder::empty().with_discount(discount);
            for item in items {
                builder = builder.with_item(item.description, item.amount);
            }
            let mut bill = builder.build();

            let payment = Money::new(
                (bill.due.amount() * rust_decimal::Decimal::from(paid_share)
                    / rust_decimal::Decimal::ONE_HUNDRED)
                    .round_dp(2),
                Currency::BDT,
            );
            if payment.is_positive() && payment.amount() <= bill.due.amount() {
                bill.record_payment(payment, method)
                    .expect("share of due is payable");
            }
            if finalized {
                bill.finalize();
            }
            bill
        })
}
