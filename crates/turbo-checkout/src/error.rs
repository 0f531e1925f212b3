//! Checkout error types.

use crate::money::Money;
use thiserror::Error;

/// Errors raised at the cart and checkout boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckoutError {
    /// Submission input rejected before any transition.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Payable amount is zero or negative.
    #[error("Invalid payable amount: {0}")]
    InvalidAmount(Money),

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// A payment captured for this checkout still awaits its order; only an
    /// online submission for the captured amount may continue.
    #[error("Payment of {captured} already captured; payable is now {payable}")]
    CapturedPaymentPending { captured: Money, payable: Money },

    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Bulk discount rule outside `min_qty >= 1`, `0..=100` percent.
    #[error("Invalid bulk discount rule: {0}")]
    InvalidDiscountRule(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Local validation failures. The session stays in `form`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Select a payment method")]
    PaymentMethodMissing,

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("Enter a valid phone number")]
    InvalidPhone,

    #[error("Enter a valid postal code")]
    InvalidPostalCode,
}

impl From<serde_json::Error> for CheckoutError {
    fn from(e: serde_json::Error) -> Self {
        CheckoutError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for CheckoutError {
    fn from(e: toml::de::Error) -> Self {
        CheckoutError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
