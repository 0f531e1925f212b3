//! Checkout module.
//!
//! Contains the checkout session state machine, shipping details, payment
//! strategies, order payloads, and the collaborator contracts.

mod flow;
mod order;
mod payment;
mod shipping;

pub mod collaborators;

pub use flow::{CheckoutSession, CheckoutStep, Entry, InFlightPayment, PaymentAttempt, Redirect};
pub use order::{OrderConfirmation, OrderLine, OrderSubmission};
pub use payment::{
    CashOnDeliveryStrategy, FailureReason, OnlineGatewayStrategy, PaymentMethod, PaymentStrategies,
    PaymentStrategy, Settlement, SettlementRequest,
};
pub use shipping::{CustomerContact, ShippingDetails};
