//! Cart pricing and checkout orchestration for TurboCommerce storefronts.
//!
//! - **Cart**: line-item ledger with bulk quantity tiers and a derived pricing summary
//! - **Checkout**: session state machine, shipping validation, payment strategies
//! - **Collaborators**: async contracts for the payment gateway, order service, and notifier
//!
//! # Example
//!
//! ```rust,ignore
//! use turbo_checkout::prelude::*;
//!
//! let mut ledger = CartLedger::new(Currency::INR);
//! ledger.add(&ProductSnapshot::new("tea", "Assam Tea", Money::from_major(120, Currency::INR)), 2)?;
//!
//! let Entry::Ready(mut session) = CheckoutSession::enter(&true, &ledger, PricingRules::standard(Currency::INR)) else {
//!     return Ok(());
//! };
//! let strategies = PaymentStrategies::standard(gateway, orders);
//! let step = session
//!     .submit(&mut ledger, shipping, PaymentMethod::CashOnDelivery, &strategies, &SilentNotifier)
//!     .await?;
//! assert_eq!(step, CheckoutStep::Success);
//! ```

pub mod error;
pub mod ids;
pub mod money;

pub mod cart;
pub mod checkout;
pub mod config;
pub mod telemetry;

pub use error::{CheckoutError, ValidationError};
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{CheckoutError, ValidationError};
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Cart
    pub use crate::cart::{
        BulkDiscountRule, CartLedger, LedgerTotals, LineItem, LinePricing, PricingRules,
        PricingSummary, ProductSnapshot,
    };

    // Checkout
    pub use crate::checkout::{
        CheckoutSession, CheckoutStep, CustomerContact, Entry, FailureReason, InFlightPayment,
        OrderConfirmation, OrderLine, OrderSubmission, PaymentAttempt, PaymentMethod,
        PaymentStrategies, PaymentStrategy, Redirect, Settlement, SettlementRequest,
        ShippingDetails,
    };

    // Collaborators
    pub use crate::checkout::collaborators::{
        AuthGuard, GatewayCallback, GatewayError, GatewayRequest, Notification, Notifier,
        OrderPlacement, OrderServiceError, PaymentGateway, SignedPayload, SilentNotifier,
    };

    pub use crate::config::CheckoutConfig;
}
