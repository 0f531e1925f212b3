//! Contracts for the services checkout depends on but does not own.

use crate::checkout::{OrderConfirmation, OrderSubmission};
use crate::ids::{OrderId, OrderReference};
use crate::money::Money;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;

/// Boolean access signal from the authentication layer.
pub trait AuthGuard {
    fn is_authenticated(&self) -> bool;
}

impl AuthGuard for bool {
    fn is_authenticated(&self) -> bool {
        *self
    }
}

/// Failures reported by the payment gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("payment declined: {0}")]
    Declined(String),

    /// The customer closed or abandoned the gateway flow.
    #[error("payment cancelled by customer")]
    Cancelled,

    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("gateway payload failed verification: {0}")]
    InvalidSignature(String),
}

/// Failures reported by the order-placement service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderServiceError {
    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),
}

/// Payment request sent to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub amount: Money,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub order_id: OrderId,
}

/// Success payload from the gateway. Opaque apart from the ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    pub payment_id: String,
    pub order_id: OrderId,
    pub signature: String,
}

/// One-shot continuation handed to the gateway.
///
/// Both completion methods take `self`, so a gateway can report at most one
/// outcome. Dropping the callback unresolved is observed by the waiting
/// strategy as a failure.
#[derive(Debug)]
pub struct GatewayCallback {
    tx: oneshot::Sender<Result<SignedPayload, GatewayError>>,
}

/// Receiving half of a [`GatewayCallback`].
#[derive(Debug)]
pub struct GatewayOutcome {
    rx: oneshot::Receiver<Result<SignedPayload, GatewayError>>,
}

impl GatewayCallback {
    /// Create a callback and the outcome it resolves.
    pub fn channel() -> (GatewayCallback, GatewayOutcome) {
        let (tx, rx) = oneshot::channel();
        (GatewayCallback { tx }, GatewayOutcome { rx })
    }

    /// Report a captured payment.
    pub fn on_success(self, payload: SignedPayload) {
        // The strategy may have stopped waiting; nothing to report to.
        let _ = self.tx.send(Ok(payload));
    }

    /// Report a failed or cancelled payment.
    pub fn on_failure(self, error: GatewayError) {
        let _ = self.tx.send(Err(error));
    }
}

impl GatewayOutcome {
    /// Wait for the gateway. `None` if the callback was dropped unresolved.
    pub async fn wait(self) -> Option<Result<SignedPayload, GatewayError>> {
        self.rx.await.ok()
    }
}

/// The external payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start the gateway's challenge/redirect flow.
    ///
    /// Returning `Err` means the flow never started. On `Ok`, the gateway
    /// owns `callback` and resolves it whenever the customer finishes.
    async fn open(&self, request: GatewayRequest, callback: GatewayCallback) -> Result<(), GatewayError>;
}

/// The order-placement service.
#[async_trait]
pub trait OrderPlacement: Send + Sync {
    async fn place_order(&self, submission: &OrderSubmission) -> Result<OrderConfirmation, OrderServiceError>;
}

/// Signals sent to the notification collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    OrderPlaced { order_reference: OrderReference },
    CheckoutFailed { message: String },
}

/// Fire-and-forget notification sink.
///
/// Errors are logged by the caller and otherwise ignored.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Notifier that drops every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _notification: Notification) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}
