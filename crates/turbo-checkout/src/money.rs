//! Money type for representing monetary values.
//!
//! Amounts are integers in the currency's minor unit (paise, cents), so
//! line totals and surcharges add up exactly. All arithmetic is checked:
//! mixing currencies or overflowing returns an error instead of panicking.

use crate::error::CheckoutError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Parts per million in 100%.
pub const FULL_PPM: u32 = 1_000_000;

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    #[default]
    INR,
    USD,
    EUR,
    GBP,
    JPY,
}

impl Currency {
    /// Get the currency code (e.g., "INR").
    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
        }
    }

    /// Get the display symbol (e.g., "₹").
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "\u{20b9}",
            Currency::USD => "$",
            Currency::EUR => "\u{20ac}",
            Currency::GBP => "\u{00a3}",
            Currency::JPY => "\u{00a5}",
        }
    }

    /// Number of minor-unit digits for this currency.
    pub fn decimal_places(&self) -> u32 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Minor units in one major unit (100 for INR, 1 for JPY).
    pub fn minor_per_major(&self) -> i64 {
        10_i64.pow(self.decimal_places())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A monetary value with currency.
///
/// Not `Ord`; compare with [`Money::checked_cmp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Money {
    /// Amount in the smallest currency unit.
    pub amount_minor: i64,
    /// The currency.
    pub currency: Currency,
}

impl Money {
    /// Create a Money value from an amount in minor units.
    pub fn new(amount_minor: i64, currency: Currency) -> Self {
        Self {
            amount_minor,
            currency,
        }
    }

    /// Create a Money value from whole major units.
    ///
    /// ```
    /// use turbo_checkout::money::{Currency, Money};
    /// assert_eq!(Money::from_major(120, Currency::INR).amount_minor, 12_000);
    /// ```
    pub fn from_major(amount: i64, currency: Currency) -> Self {
        Self::new(amount.saturating_mul(currency.minor_per_major()), currency)
    }

    /// Create a Money value from a decimal amount, rounded to the minor unit.
    ///
    /// ```
    /// use turbo_checkout::money::{Currency, Money};
    /// let price = Money::from_decimal(49.99, Currency::INR);
    /// assert_eq!(price.amount_minor, 4999);
    /// ```
    pub fn from_decimal(amount: f64, currency: Currency) -> Self {
        let amount_minor = (amount * currency.minor_per_major() as f64).round() as i64;
        Self::new(amount_minor, currency)
    }

    /// Zero in `currency`.
    pub fn zero(currency: Currency) -> Self {
        Self::new(0, currency)
    }

    /// Check if amount is zero.
    pub fn is_zero(&self) -> bool {
        self.amount_minor == 0
    }

    /// Check if amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        self.amount_minor > 0
    }

    /// Check if amount is below zero.
    pub fn is_negative(&self) -> bool {
        self.amount_minor < 0
    }

    /// Convert to a decimal value in major units.
    pub fn to_decimal(&self) -> f64 {
        self.amount_minor as f64 / self.currency.minor_per_major() as f64
    }

    /// Format as a display string (e.g., "₹310.00").
    pub fn display(&self) -> String {
        let places = self.currency.decimal_places() as usize;
        format!("{}{:.places$}", self.currency.symbol(), self.to_decimal())
    }

    /// Add another Money value of the same currency.
    pub fn checked_add(&self, other: &Money) -> Result<Money, CheckoutError> {
        self.ensure_same_currency(other)?;
        self.amount_minor
            .checked_add(other.amount_minor)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or(CheckoutError::Overflow)
    }

    /// Subtract another Money value of the same currency.
    pub fn checked_sub(&self, other: &Money) -> Result<Money, CheckoutError> {
        self.ensure_same_currency(other)?;
        self.amount_minor
            .checked_sub(other.amount_minor)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or(CheckoutError::Overflow)
    }

    /// Multiply by a quantity.
    pub fn checked_mul(&self, factor: i64) -> Result<Money, CheckoutError> {
        self.amount_minor
            .checked_mul(factor)
            .map(|amount| Money::new(amount, self.currency))
            .ok_or(CheckoutError::Overflow)
    }

    /// Reduce by `ppm` parts per million, rounding half-up to the minor unit
    /// once, after the reduction.
    ///
    /// `ppm` is clamped to `0..=FULL_PPM`, so the result never drops below
    /// zero for a non-negative amount.
    pub fn reduce_by_ppm(&self, ppm: u32) -> Result<Money, CheckoutError> {
        let full = i128::from(FULL_PPM);
        let kept = full - i128::from(ppm.min(FULL_PPM));
        let scaled = i128::from(self.amount_minor) * kept;
        let half = full / 2;
        let rounded = if scaled >= 0 {
            (scaled + half) / full
        } else {
            (scaled - half) / full
        };
        i64::try_from(rounded)
            .map(|amount| Money::new(amount, self.currency))
            .map_err(|_| CheckoutError::Overflow)
    }

    /// Sum an iterator of Money values in `currency`.
    pub fn try_sum<'a>(
        mut iter: impl Iterator<Item = &'a Money>,
        currency: Currency,
    ) -> Result<Money, CheckoutError> {
        iter.try_fold(Money::zero(currency), |acc, m| acc.checked_add(m))
    }

    /// Compare two amounts of the same currency.
    pub fn checked_cmp(&self, other: &Money) -> Result<Ordering, CheckoutError> {
        self.ensure_same_currency(other)?;
        Ok(self.amount_minor.cmp(&other.amount_minor))
    }

    /// Error unless `other` is in the same currency.
    pub fn ensure_same_currency(&self, other: &Money) -> Result<(), CheckoutError> {
        if self.currency != other.currency {
            return Err(CheckoutError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: other.currency.code().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}
