//! Money types with precise decimal arithmetic
//!
//! Monetary values are represented with rust_decimal so that bill totals,
//! discounts and payments reconcile exactly without floating-point drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Currency codes following ISO 4217
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    BDT,
    INR,
    USD,
    EUR,
    GBP,
}

impl Currency {
    /// Returns the number of decimal places for this currency
    pub fn decimal_places(&self) -> u32 {
        2
    }

    /// Returns the currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::BDT => "৳",
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
        }
    }

    /// Returns the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::BDT => "BDT",
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::BDT
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BDT" => Ok(Currency::BDT),
            "INR" => Ok(Currency::INR),
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            other => Err(MoneyError::UnknownCurrency(other.to_string())),
        }
    }
}

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Currency mismatch: cannot operate on {0} and {1}")]
    CurrencyMismatch(String, String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Unknown currency code: {0}")]
    UnknownCurrency(String),

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("{0} exceeds the largest storable amount")]
    LimitExceeded(String),
}

/// A monetary amount with associated currency
///
/// Amounts are kept at 4 decimal places internally and rounded to the
/// currency's minor unit only for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: Currency,
}

impl Money {
    /// Largest magnitude any stored amount may have (fits `NUMERIC(18, 4)`)
    pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, 4);

    /// Creates a new Money value
    pub fn new(amount: Decimal, currency: Currency) -> Self {
        Self {
            amount: amount.round_dp(4),
            currency,
        }
    }

    /// Creates Money from an integer amount in minor units (e.g., paisa)
    pub fn from_minor(minor_units: i64, currency: Currency) -> Self {
        Self::new(Decimal::new(minor_units, currency.decimal_places()), currency)
    }

    /// Creates a zero amount in the specified currency
    pub fn zero(currency: Currency) -> Self {
        Self {
            amount: Decimal::ZERO,
            currency,
        }
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Returns true if the amount is strictly positive
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Returns true if the amount is strictly negative
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Floors the amount at zero, keeping the currency
    pub fn non_negative(&self) -> Self {
        if self.is_negative() {
            Self::zero(self.currency)
        } else {
            *self
        }
    }

    /// Rounds to the currency's standard decimal places
    pub fn round_to_currency(&self) -> Self {
        Self {
            amount: self.amount.round_dp(self.currency.decimal_places()),
            currency: self.currency,
        }
    }

    /// Checked addition that returns an error on currency mismatch or overflow
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount, self.currency))
    }

    /// Checked subtraction that returns an error on currency mismatch or overflow
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.ensure_same_currency(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Self::new(amount, self.currency))
    }

    /// Fails with `LimitExceeded` if the magnitude is above [`Money::MAX_AMOUNT`]
    pub fn ensure_within_limit(self) -> Result<Self, MoneyError> {
        if self.amount.abs() > Self::MAX_AMOUNT {
            return Err(MoneyError::LimitExceeded(self.to_string()));
        }
        Ok(self)
    }

    /// Sums an iterator of amounts, starting from zero in `currency`
    pub fn sum<'a>(
        currency: Currency,
        amounts: impl IntoIterator<Item = &'a Money>,
    ) -> Result<Money, MoneyError> {
        amounts
            .into_iter()
            .try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }

    fn ensure_same_currency(&self, other: &Money) -> Result<(), MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(
                self.currency.to_string(),
                other.currency.to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dp = self.currency.decimal_places();
        write!(
            f,
            "{}{:.dp$}",
            self.currency.symbol(),
            self.amount,
            dp = dp as usize
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_from_minor() {
        let m = Money::from_minor(50025, Currency::BDT);
        assert_eq!(m.amount(), dec!(500.25));
    }

    #[test]
    fn test_non_negative_floors_at_zero() {
        let m = Money::new(dec!(-12.5), Currency::BDT);
        assert_eq!(m.non_negative(), Money::zero(Currency::BDT));

        let p = Money::new(dec!(12.5), Currency::BDT);
        assert_eq!(p.non_negative(), p);
    }

    #[test]
    fn test_sum_rejects_mixed_currencies() {
        let amounts = [
            Money::new(dec!(100), Currency::BDT),
            Money::new(dec!(5), Currency::USD),
        ];
        let result = Money::sum(Currency::BDT, amounts.iter());
        assert!(matches!(result, Err(MoneyError::CurrencyMismatch(_, _))));
    }

    #[test]
    fn test_checked_add_overflow_is_an_error() {
        let max = Money::new(Decimal::MAX, Currency::BDT);
        assert_eq!(max.checked_add(&max), Err(MoneyError::Overflow));

        let min = Money::new(Decimal::MIN, Currency::BDT);
        assert_eq!(min.checked_sub(&max), Err(MoneyError::Overflow));
    }

    #[test]
    fn test_max_amount_fits_numeric_18_4() {
        assert_eq!(Money::MAX_AMOUNT, dec!(99999999999999.9999));

        let largest = Money::new(Money::MAX_AMOUNT, Currency::BDT);
        assert_eq!(largest.ensure_within_limit(), Ok(largest));

        let above = Money::new(dec!(100000000000000), Currency::BDT);
        assert!(matches!(
            above.ensure_within_limit(),
            Err(MoneyError::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_display_uses_symbol() {
        let m = Money::new(dec!(400), Currency::BDT);
        assert_eq!(m.to_string(), "৳400.00");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn money_sum_matches_decimal_sum(
            amounts in proptest::collection::vec(0i64..10_000_000i64, 0..20)
        ) {
            let moneys: Vec<Money> = amounts
                .iter()
                .map(|a| Money::from_minor(*a, Currency::BDT))
                .collect();
            let total = Money::sum(Currency::BDT, moneys.iter()).unwrap();
            let expected: Decimal = moneys.iter().map(|m| m.amount()).sum();
            prop_assert_eq!(total.amount(), expected);
        }

        #[test]
        fn non_negative_is_never_negative(a in -1_000_000i64..1_000_000i64) {
            let m = Money::from_minor(a, Currency::BDT).non_negative();
            prop_assert!(!m.is_negative());
        }
    }
}
