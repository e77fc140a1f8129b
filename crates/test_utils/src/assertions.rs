//! Custom Test Assertions
//!
//! Assertion helpers for money and bills that give more meaningful failure
//! messages than plain `assert_eq!`.

use core_kernel::Money;
use domain_billing::{Bill, BillStatus};
use rust_decimal::Decimal;

/// Asserts that two Money values are approximately equal within a tolerance
///
/// # Panics
///
/// Panics if the currencies don't match or the amounts differ by more than tolerance
pub fn assert_money_approx_eq(actual: &Money, expected: &Money, tolerance: Decimal) {
    assert_eq!(
        actual.currency(),
        expected.currency(),
        "Currency mismatch: actual={}, expected={}",
        actual.currency(),
        expected.currency()
    );

    let diff = (actual.amount() - expected.amount()).abs();
    assert!(
        diff <= tolerance,
        "Money amounts differ: actual={}, expected={}, diff={}, tolerance={}",
        actual,
        expected,
        diff,
        tolerance
    );
}

/// Asserts that a Money value is zero
pub fn assert_money_zero(money: &Money) {
    assert!(money.is_zero(), "Expected zero money, got {}", money);
}

/// Asserts every derived figure of a bill against its items, discount and payments
///
/// # Panics
///
/// Panics with the first violated relation
pub fn assert_bill_invariants(bill: &Bill) {
    let subtotal = Money::sum(bill.currency, bill.items.iter().map(|item| &item.amount))
        .expect("items share the bill currency");
    let payments = Money::sum(bill.currency, bill.payments.iter().map(|p| &p.amount))
        .expect("payments share the bill currency");

    let expected_total = subtotal
        .checked_sub(&bill.discount)
        .expect("discount shares the bill currency")
        .non_negative();
    assert_eq!(
        bill.total, expected_total,
        "total {} != max(0, {} - {})",
        bill.total, subtotal, bill.discount
    );
    assert_eq!(bill.paid, payments, "paid {} != sum of payments {}", bill.paid, payments);

    let expected_due = bill
        .total
        .checked_sub(&bill.paid)
        .expect("paid shares the bill currency")
        .non_negative();
    assert_eq!(
        bill.due, expected_due,
        "due {} != max(0, {} - {})",
        bill.due, bill.total, bill.paid
    );

    let expected_status = BillStatus::derive(&bill.paid, &bill.total);
    assert_eq!(
        bill.status, expected_status,
        "status {} inconsistent with paid {} / total {}",
        bill.status, bill.paid, bill.total
    );
}

/// Asserts that a bill has the given status and amount due
pub fn assert_bill_state(bill: &Bill, status: BillStatus, due: Money) {
    assert_eq!(bill.status, status, "unexpected status for bill {}", bill.id);
    assert_eq!(bill.due, due, "unexpected due for bill {}", bill.id);
}

/// Asserts that a result is an error and returns the error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => panic!("{}: got Ok({:?})", $msg, value),
            Err(e) => e,
        }
    };
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(value) => panic!(
                "Expected Err matching {}, got Ok({:?})",
                stringify!($pattern),
                value
            ),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}
