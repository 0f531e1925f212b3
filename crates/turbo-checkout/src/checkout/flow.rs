//! Checkout session state machine.
//!
//! ```text
//! form --submit--> processing --settled--> success
//!                              \--failed--> error --retry--> form
//! ```
//!
//! Submission is split in two so the payment strategy can run without
//! borrowing the session: [`CheckoutSession::begin_submit`] guards and
//! enters `processing`, handing out a [`PaymentAttempt`]; the attempt is
//! consumed by [`CheckoutSession::resolve`], the only way out of
//! `processing`. [`CheckoutSession::submit`] composes both.

use crate::cart::{project, CartLedger, PricingRules, PricingSummary};
use crate::checkout::collaborators::{AuthGuard, Notification, Notifier};
use crate::checkout::{
    FailureReason, PaymentMethod, PaymentStrategies, Settlement, SettlementRequest, ShippingDetails,
};
use crate::error::{CheckoutError, ValidationError};
use crate::ids::{CheckoutId, OrderId, OrderReference};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// Steps in the checkout flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Collecting shipping details and payment method.
    #[default]
    Form,
    /// Waiting on the payment strategy.
    Processing,
    /// Order committed. Terminal.
    Success,
    /// Attempt failed; recoverable through retry.
    Error,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::Form => "form",
            CheckoutStep::Processing => "processing",
            CheckoutStep::Success => "success",
            CheckoutStep::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self == CheckoutStep::Success
    }
}

/// Where to send the customer instead of opening checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    Login,
    Cart,
}

/// Result of entering the checkout view.
#[derive(Debug)]
pub enum Entry {
    Ready(CheckoutSession),
    Redirect(Redirect),
}

/// Ticket for one in-flight payment.
///
/// Not `Clone`: each attempt resolves the session at most once.
#[derive(Debug)]
pub struct PaymentAttempt {
    checkout_id: CheckoutId,
    sequence: u32,
    pub method: PaymentMethod,
    pub summary: PricingSummary,
    pub request: SettlementRequest,
}

impl PaymentAttempt {
    /// Client-side receipt id for this attempt.
    pub fn order_id(&self) -> &OrderId {
        &self.request.order_id
    }
}

/// A payment that has not ended in a recorded order.
///
/// Either still running at the gateway, or captured (`payment_reference`
/// set) with order recording outstanding. Reconcile by `order_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InFlightPayment {
    pub checkout_id: CheckoutId,
    pub order_id: OrderId,
    pub method: PaymentMethod,
    pub amount: Money,
    /// Gateway payment id once money has been captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

impl InFlightPayment {
    /// Whether the customer has already been charged.
    pub fn is_captured(&self) -> bool {
        self.payment_reference.is_some()
    }
}

/// Checkout state for one visit to the checkout view.
#[derive(Debug)]
pub struct CheckoutSession {
    id: CheckoutId,
    step: CheckoutStep,
    payment_method: PaymentMethod,
    shipping: Option<ShippingDetails>,
    status_message: Option<String>,
    order_reference: Option<OrderReference>,
    rules: PricingRules,
    sequence: u32,
    in_flight: Option<InFlightPayment>,
}

impl CheckoutSession {
    /// Open checkout, or redirect if the customer may not be here.
    pub fn enter(auth: &dyn AuthGuard, ledger: &CartLedger, rules: PricingRules) -> Entry {
        if !auth.is_authenticated() {
            tracing::info!("checkout refused: not authenticated");
            return Entry::Redirect(Redirect::Login);
        }
        if ledger.is_empty() {
            return Entry::Redirect(Redirect::Cart);
        }
        let session = Self::new(rules);
        tracing::info!(checkout_id = %session.id, "checkout session opened");
        Entry::Ready(session)
    }

    fn new(rules: PricingRules) -> Self {
        Self {
            id: CheckoutId::generate(),
            step: CheckoutStep::Form,
            payment_method: PaymentMethod::Unselected,
            shipping: None,
            status_message: None,
            order_reference: None,
            rules,
            sequence: 0,
            in_flight: None,
        }
    }

    /// Current session identity; replaced on retry.
    pub fn id(&self) -> &CheckoutId {
        &self.id
    }

    /// Current step.
    pub fn step(&self) -> CheckoutStep {
        self.step
    }

    /// Selected payment method.
    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    /// Last entered shipping details.
    pub fn shipping(&self) -> Option<&ShippingDetails> {
        self.shipping.as_ref()
    }

    /// Customer-facing message for the current step.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// Reference of the committed order, once in `success`.
    pub fn order_reference(&self) -> Option<&OrderReference> {
        self.order_reference.as_ref()
    }

    /// Payment captured by an earlier attempt whose order is not recorded.
    pub fn captured_payment(&self) -> Option<&InFlightPayment> {
        self.in_flight.as_ref().filter(|p| p.is_captured())
    }

    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.step == CheckoutStep::Form
    }

    /// Choose a payment method. Only allowed in `form`.
    pub fn select_payment_method(&mut self, method: PaymentMethod) -> bool {
        if self.step != CheckoutStep::Form {
            return false;
        }
        self.payment_method = method;
        true
    }

    /// Replace the entered shipping details. Only allowed in `form`.
    pub fn update_shipping(&mut self, shipping: ShippingDetails) -> bool {
        if self.step != CheckoutStep::Form {
            return false;
        }
        self.shipping = Some(shipping);
        true
    }

    /// Project the current pricing. Recomputed on every call.
    pub fn pricing(&self, ledger: &CartLedger) -> Result<PricingSummary, CheckoutError> {
        project(ledger, self.payment_method, &self.rules)
    }

    /// The storefront's "empty cart leaves checkout" rule, suppressed once
    /// the order has been committed and the cart cleared.
    pub fn should_redirect_on_empty_cart(&self, ledger: &CartLedger) -> bool {
        ledger.is_empty() && self.step != CheckoutStep::Success
    }

    /// Validate and enter `processing`.
    ///
    /// Returns `Ok(None)` outside `form`; a duplicate submit while a
    /// payment is in flight is ignored. Validation failures keep the session
    /// in `form` with the entered data and a status message.
    ///
    /// If an earlier attempt captured a payment without recording the order,
    /// the attempt reuses that order id and payment reference so the gateway
    /// is not opened again.
    pub fn begin_submit(
        &mut self,
        ledger: &CartLedger,
        shipping: ShippingDetails,
        method: PaymentMethod,
    ) -> Result<Option<PaymentAttempt>, CheckoutError> {
        if self.step != CheckoutStep::Form {
            tracing::debug!(checkout_id = %self.id, step = self.step.as_str(), "submit ignored");
            return Ok(None);
        }

        self.payment_method = method;
        self.shipping = Some(shipping.clone());

        let summary = match self.validate_submission(ledger, &shipping, method) {
            Ok(summary) => summary,
            Err(e) => {
                tracing::info!(checkout_id = %self.id, error = %e, "submit rejected");
                self.status_message = Some(customer_message(&e));
                return Err(e);
            }
        };

        let captured = self.captured_payment().cloned();
        if let Some(ref payment) = captured {
            if let Err(e) = check_captured(payment, method, &summary) {
                tracing::warn!(checkout_id = %self.id, order_id = %payment.order_id, error = %e, "submit rejected");
                self.status_message = Some(customer_message(&e));
                return Err(e);
            }
        }

        self.sequence += 1;
        let (order_id, captured_payment) = match captured {
            Some(payment) => (payment.order_id, payment.payment_reference),
            None => (OrderId::generate(), None),
        };
        let request = SettlementRequest {
            order_id,
            amount: summary.payable_amount,
            items: ledger.order_lines(),
            contact: shipping.contact(),
            shipping,
            captured_payment,
        };
        self.in_flight = Some(InFlightPayment {
            checkout_id: self.id.clone(),
            order_id: request.order_id.clone(),
            method,
            amount: summary.payable_amount,
            payment_reference: request.captured_payment.clone(),
        });
        self.status_message = None;
        self.transition(CheckoutStep::Processing);

        tracing::info!(
            checkout_id = %self.id,
            order_id = %request.order_id,
            method = method.as_str(),
            amount = %summary.payable_amount,
            "payment attempt started"
        );

        Ok(Some(PaymentAttempt {
            checkout_id: self.id.clone(),
            sequence: self.sequence,
            method,
            summary,
            request,
        }))
    }

    /// Apply a settlement. The single edge out of `processing`.
    ///
    /// On success the ledger is cleared and the notifier signalled, once.
    /// An unrecorded capture keeps the payment reference for the next
    /// attempt. Attempts from another session or an earlier sequence are
    /// ignored.
    pub fn resolve(
        &mut self,
        attempt: PaymentAttempt,
        settlement: Settlement,
        ledger: &mut CartLedger,
        notifier: &dyn Notifier,
    ) -> CheckoutStep {
        if self.step != CheckoutStep::Processing
            || attempt.checkout_id != self.id
            || attempt.sequence != self.sequence
        {
            tracing::warn!(
                checkout_id = %self.id,
                order_id = %attempt.order_id(),
                step = self.step.as_str(),
                "stale payment attempt ignored"
            );
            return self.step;
        }

        self.in_flight = None;
        match settlement {
            Settlement::Settled { order_reference } => {
                ledger.clear();
                self.status_message = Some("Your order has been placed.".to_string());
                self.transition(CheckoutStep::Success);
                tracing::info!(checkout_id = %self.id, %order_reference, "order committed");
                signal(notifier, Notification::OrderPlaced {
                    order_reference: order_reference.clone(),
                });
                self.order_reference = Some(order_reference);
            }
            Settlement::Failed { reason } => {
                let message = reason.user_message().to_string();
                self.status_message = Some(message.clone());
                self.transition(CheckoutStep::Error);
                signal(notifier, Notification::CheckoutFailed { message });
            }
            Settlement::Unrecorded { payment_reference } => {
                let message = FailureReason::OrderRecordingFailed.user_message().to_string();
                tracing::warn!(
                    checkout_id = %self.id,
                    order_id = %attempt.order_id(),
                    %payment_reference,
                    "captured payment awaiting order recording"
                );
                self.in_flight = Some(InFlightPayment {
                    checkout_id: self.id.clone(),
                    order_id: attempt.request.order_id.clone(),
                    method: attempt.method,
                    amount: attempt.request.amount,
                    payment_reference: Some(payment_reference),
                });
                self.status_message = Some(message.clone());
                self.transition(CheckoutStep::Error);
                signal(notifier, Notification::CheckoutFailed { message });
            }
        }
        self.step
    }

    /// Validate, settle through the matching strategy, and resolve.
    pub async fn submit(
        &mut self,
        ledger: &mut CartLedger,
        shipping: ShippingDetails,
        method: PaymentMethod,
        strategies: &PaymentStrategies,
        notifier: &dyn Notifier,
    ) -> Result<CheckoutStep, CheckoutError> {
        let Some(attempt) = self.begin_submit(ledger, shipping, method)? else {
            return Ok(self.step);
        };

        let settlement = match strategies.for_method(attempt.method) {
            Some(strategy) => strategy.execute(&attempt.request).await,
            None => Settlement::failed(FailureReason::Gateway),
        };
        Ok(self.resolve(attempt, settlement, ledger, notifier))
    }

    /// Return from `error` to a fresh `form`, keeping entered data.
    pub fn retry(&mut self) -> bool {
        if self.step != CheckoutStep::Error {
            return false;
        }
        let previous = std::mem::replace(&mut self.id, CheckoutId::generate());
        if let Some(ref mut payment) = self.in_flight {
            payment.checkout_id = self.id.clone();
        }
        tracing::info!(previous_checkout_id = %previous, checkout_id = %self.id, "checkout retried");
        self.status_message = None;
        self.transition(CheckoutStep::Form);
        true
    }

    /// Tear the session down, reporting any payment still in flight or
    /// captured without an order.
    pub fn abandon(mut self) -> Option<InFlightPayment> {
        let in_flight = self.in_flight.take();
        if let Some(ref payment) = in_flight {
            warn_in_flight(payment);
        }
        in_flight
    }

    fn validate_submission(
        &self,
        ledger: &CartLedger,
        shipping: &ShippingDetails,
        method: PaymentMethod,
    ) -> Result<PricingSummary, CheckoutError> {
        if !method.is_selected() {
            return Err(ValidationError::PaymentMethodMissing.into());
        }
        if ledger.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        shipping.validate()?;

        let summary = project(ledger, method, &self.rules)?;
        if !summary.payable_amount.is_positive() {
            return Err(CheckoutError::InvalidAmount(summary.payable_amount));
        }
        Ok(summary)
    }

    fn transition(&mut self, to: CheckoutStep) {
        tracing::info!(checkout_id = %self.id, from = self.step.as_str(), to = to.as_str(), "checkout transition");
        self.step = to;
    }
}

impl Drop for CheckoutSession {
    fn drop(&mut self) {
        if let Some(ref payment) = self.in_flight {
            warn_in_flight(payment);
        }
    }
}

fn warn_in_flight(payment: &InFlightPayment) {
    tracing::warn!(
        checkout_id = %payment.checkout_id,
        order_id = %payment.order_id,
        method = payment.method.as_str(),
        amount = %payment.amount,
        payment_reference = payment.payment_reference.as_deref().unwrap_or(""),
        "checkout torn down with payment in flight; reconcile out of band"
    );
}

/// A captured payment may only be recorded online, for the amount charged.
fn check_captured(
    payment: &InFlightPayment,
    method: PaymentMethod,
    summary: &PricingSummary,
) -> Result<(), CheckoutError> {
    if method != PaymentMethod::OnlineGateway || summary.payable_amount != payment.amount {
        return Err(CheckoutError::CapturedPaymentPending {
            captured: payment.amount,
            payable: summary.payable_amount,
        });
    }
    Ok(())
}

fn signal(notifier: &dyn Notifier, notification: Notification) {
    if let Err(e) = notifier.notify(notification) {
        tracing::warn!(error = %e, "notification failed");
    }
}

fn customer_message(error: &CheckoutError) -> String {
    match error {
        CheckoutError::Validation(v) => v.to_string(),
        CheckoutError::InvalidAmount(_) => FailureReason::InvalidAmount.user_message().to_string(),
        CheckoutError::CapturedPaymentPending { captured, .. } => format!(
            "Your payment of {} was received. Keep the same cart and pay online to finish your order.",
            captured
        ),
        _ => "We could not price your order. Please review your cart.".to_string(),
    }
}
