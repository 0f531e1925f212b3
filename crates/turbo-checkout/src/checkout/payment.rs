//! Payment methods and settlement strategies.

use crate::checkout::collaborators::{
    GatewayCallback, GatewayError, GatewayRequest, OrderPlacement, PaymentGateway,
};
use crate::checkout::{CustomerContact, OrderLine, OrderSubmission, ShippingDetails};
use crate::ids::{OrderId, OrderReference};
use crate::money::Money;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[default]
    Unselected,
    OnlineGateway,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Unselected => "unselected",
            PaymentMethod::OnlineGateway => "online_gateway",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    pub fn is_selected(&self) -> bool {
        *self != PaymentMethod::Unselected
    }
}

/// Why a settlement failed, with collaborator diagnostics stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Payable amount was zero or negative.
    InvalidAmount,
    /// Gateway declined, was unreachable, or returned an unverifiable payload.
    Gateway,
    /// Customer backed out of the gateway flow.
    Cancelled,
    /// Order-placement service rejected the order or could not be reached.
    OrderSubmission,
    /// Gateway captured the payment but the order could not be recorded.
    OrderRecordingFailed,
    /// Gateway released its callback without reporting an outcome.
    ResolverDropped,
}

impl FailureReason {
    /// Message safe to show the customer.
    pub fn user_message(&self) -> &'static str {
        match self {
            FailureReason::InvalidAmount => "We could not process this amount. Please review your cart.",
            FailureReason::Gateway | FailureReason::ResolverDropped => {
                "Payment could not be completed. Please try again."
            }
            FailureReason::Cancelled => "Payment was cancelled. You can try again when ready.",
            FailureReason::OrderSubmission => "We could not place your order. Please try again.",
            FailureReason::OrderRecordingFailed => {
                "Your payment was received but your order is not confirmed yet. Try again to finish; you will not be charged again."
            }
        }
    }
}

impl From<&GatewayError> for FailureReason {
    fn from(e: &GatewayError) -> Self {
        match e {
            GatewayError::Cancelled => FailureReason::Cancelled,
            GatewayError::Declined(_)
            | GatewayError::Unavailable(_)
            | GatewayError::InvalidSignature(_) => FailureReason::Gateway,
        }
    }
}

/// Outcome of one strategy invocation. Exactly one per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Settlement {
    Settled { order_reference: OrderReference },
    Failed { reason: FailureReason },
    /// Money was captured under `payment_reference` but no order exists.
    /// Recording must be retried with that reference, never recharged.
    Unrecorded { payment_reference: String },
}

impl Settlement {
    pub fn failed(reason: FailureReason) -> Self {
        Settlement::Failed { reason }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Settlement::Settled { .. })
    }

    /// The failure reason, if the attempt did not settle.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Settlement::Settled { .. } => None,
            Settlement::Failed { reason } => Some(*reason),
            Settlement::Unrecorded { .. } => Some(FailureReason::OrderRecordingFailed),
        }
    }
}

/// Everything a strategy needs to settle one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub order_id: OrderId,
    pub amount: Money,
    pub items: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub contact: CustomerContact,
    /// Gateway payment id already captured for `order_id` by an earlier
    /// attempt. When set, the online strategy records the order without
    /// opening the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured_payment: Option<String>,
}

impl SettlementRequest {
    fn submission(&self, method: PaymentMethod, payment_reference: Option<String>) -> OrderSubmission {
        OrderSubmission {
            order_id: self.order_id.clone(),
            items: self.items.clone(),
            shipping: self.shipping.clone(),
            payment_method: method,
            payable_amount: self.amount,
            payment_reference,
        }
    }
}

/// Settlement contract shared by every payment path.
///
/// Collaborator errors are normalized here; callers only ever see a
/// [`Settlement`].
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    fn method(&self) -> PaymentMethod;

    async fn execute(&self, request: &SettlementRequest) -> Settlement;
}

/// Prepaid checkout through the external gateway.
pub struct OnlineGatewayStrategy {
    gateway: Arc<dyn PaymentGateway>,
    orders: Arc<dyn OrderPlacement>,
}

impl OnlineGatewayStrategy {
    pub fn new(gateway: Arc<dyn PaymentGateway>, orders: Arc<dyn OrderPlacement>) -> Self {
        Self { gateway, orders }
    }
}

#[async_trait]
impl PaymentStrategy for OnlineGatewayStrategy {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::OnlineGateway
    }

    async fn execute(&self, request: &SettlementRequest) -> Settlement {
        if !request.amount.is_positive() {
            tracing::warn!(order_id = %request.order_id, amount = %request.amount, "refusing gateway payment for non-positive amount");
            return Settlement::failed(FailureReason::InvalidAmount);
        }

        if let Some(ref payment_id) = request.captured_payment {
            tracing::info!(order_id = %request.order_id, %payment_id, "recording previously captured payment");
            return self.record(request, payment_id.clone()).await;
        }

        let gateway_request = GatewayRequest {
            amount: request.amount,
            customer_name: request.contact.name.clone(),
            customer_email: request.contact.email.clone(),
            customer_phone: request.contact.phone.clone(),
            order_id: request.order_id.clone(),
        };
        let (callback, outcome) = GatewayCallback::channel();

        if let Err(e) = self.gateway.open(gateway_request, callback).await {
            tracing::warn!(order_id = %request.order_id, error = %e, "gateway failed to start");
            return Settlement::failed(FailureReason::from(&e));
        }

        let payload = match outcome.wait().await {
            Some(Ok(payload)) => payload,
            Some(Err(e)) => {
                tracing::warn!(order_id = %request.order_id, error = %e, "gateway reported failure");
                return Settlement::failed(FailureReason::from(&e));
            }
            None => {
                tracing::warn!(order_id = %request.order_id, "gateway dropped callback without an outcome");
                return Settlement::failed(FailureReason::ResolverDropped);
            }
        };

        if payload.order_id != request.order_id {
            tracing::warn!(
                order_id = %request.order_id,
                payload_order_id = %payload.order_id,
                "gateway payload does not match this attempt"
            );
            return Settlement::failed(FailureReason::Gateway);
        }

        tracing::info!(order_id = %request.order_id, payment_id = %payload.payment_id, "gateway payment captured");
        self.record(request, payload.payment_id).await
    }
}

impl OnlineGatewayStrategy {
    /// Record a captured payment as an order.
    async fn record(&self, request: &SettlementRequest, payment_id: String) -> Settlement {
        let submission = request.submission(PaymentMethod::OnlineGateway, Some(payment_id.clone()));
        match place(self.orders.as_ref(), &submission).await {
            Some(order_reference) => Settlement::Settled { order_reference },
            None => {
                tracing::warn!(
                    order_id = %request.order_id,
                    %payment_id,
                    amount = %request.amount,
                    "payment captured but order not recorded"
                );
                Settlement::Unrecorded {
                    payment_reference: payment_id,
                }
            }
        }
    }
}

/// Pay-on-delivery checkout: the order is placed directly.
pub struct CashOnDeliveryStrategy {
    orders: Arc<dyn OrderPlacement>,
}

impl CashOnDeliveryStrategy {
    pub fn new(orders: Arc<dyn OrderPlacement>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl PaymentStrategy for CashOnDeliveryStrategy {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::CashOnDelivery
    }

    async fn execute(&self, request: &SettlementRequest) -> Settlement {
        let submission = request.submission(PaymentMethod::CashOnDelivery, None);
        match place(self.orders.as_ref(), &submission).await {
            Some(order_reference) => Settlement::Settled { order_reference },
            None => Settlement::failed(FailureReason::OrderSubmission),
        }
    }
}

/// Submit to the order service. `None` on any failure, already logged.
async fn place(orders: &dyn OrderPlacement, submission: &OrderSubmission) -> Option<OrderReference> {
    tracing::debug!(
        order_id = %submission.order_id,
        items = submission.item_count(),
        ship_to = %submission.shipping.one_line(),
        "placing order"
    );
    match orders.place_order(submission).await {
        Ok(confirmation) => {
            if confirmation.reference().is_none() {
                tracing::warn!(
                    order_id = %submission.order_id,
                    detail = confirmation.message.as_deref().unwrap_or(""),
                    "order placement returned no reference"
                );
            }
            confirmation.reference().cloned()
        }
        Err(e) => {
            tracing::warn!(order_id = %submission.order_id, error = %e, "order placement failed");
            None
        }
    }
}

/// The strategies available to a checkout, keyed by payment method.
#[derive(Clone)]
pub struct PaymentStrategies {
    online: Arc<dyn PaymentStrategy>,
    cash_on_delivery: Arc<dyn PaymentStrategy>,
}

impl PaymentStrategies {
    pub fn new(online: Arc<dyn PaymentStrategy>, cash_on_delivery: Arc<dyn PaymentStrategy>) -> Self {
        Self {
            online,
            cash_on_delivery,
        }
    }

    /// Standard wiring over one gateway and one order service.
    pub fn standard(gateway: Arc<dyn PaymentGateway>, orders: Arc<dyn OrderPlacement>) -> Self {
        Self::new(
            Arc::new(OnlineGatewayStrategy::new(gateway, orders.clone())),
            Arc::new(CashOnDeliveryStrategy::new(orders)),
        )
    }

    pub fn for_method(&self, method: PaymentMethod) -> Option<&dyn PaymentStrategy> {
        match method {
            PaymentMethod::OnlineGateway => Some(self.online.as_ref()),
            PaymentMethod::CashOnDelivery => Some(self.cash_on_delivery.as_ref()),
            PaymentMethod::Unselected => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::checkout::collaborators::{OrderServiceError, SignedPayload};
    use crate::checkout::OrderConfirmation;
    use crate::money::Currency;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Gateway that resolves immediately with a scripted outcome.
    pub(crate) struct ScriptedGateway {
        pub(crate) outcome: Mutex<Option<Result<(), GatewayError>>>,
        pub(crate) opened: AtomicUsize,
    }

    impl ScriptedGateway {
        pub(crate) fn succeeding() -> Self {
            Self {
                outcome: Mutex::new(Some(Ok(()))),
                opened: AtomicUsize::new(0),
            }
        }

        pub(crate) fn failing(error: GatewayError) -> Self {
            Self {
                outcome: Mutex::new(Some(Err(error))),
                opened: AtomicUsize::new(0),
            }
        }

        /// Accepts the request, then drops the callback.
        pub(crate) fn silent() -> Self {
            Self {
                outcome: Mutex::new(None),
                opened: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for ScriptedGateway {
        async fn open(&self, request: GatewayRequest, callback: GatewayCallback) -> Result<(), GatewayError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            let outcome = self.outcome.lock().unwrap().take();
            match outcome {
                Some(Ok(())) => callback.on_success(SignedPayload {
                    payment_id: "pay_123".to_string(),
                    order_id: request.order_id,
                    signature: "sig".to_string(),
                }),
                Some(Err(e)) => callback.on_failure(e),
                None => drop(callback),
            }
            Ok(())
        }
    }

    /// Order service that records submissions, failing the first
    /// `failures` of them.
    pub(crate) struct RecordingOrders {
        pub(crate) failures: AtomicUsize,
        pub(crate) submissions: Mutex<Vec<OrderSubmission>>,
    }

    impl RecordingOrders {
        pub(crate) fn accepting() -> Self {
            Self::failing_times(0)
        }

        pub(crate) fn failing() -> Self {
            Self::failing_times(usize::MAX)
        }

        pub(crate) fn failing_times(failures: usize) -> Self {
            Self {
                failures: AtomicUsize::new(failures),
                submissions: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn count(&self) -> usize {
            self.submissions.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl OrderPlacement for RecordingOrders {
        async fn place_order(&self, submission: &OrderSubmission) -> Result<OrderConfirmation, OrderServiceError> {
            self.submissions.lock().unwrap().push(submission.clone());
            let failing = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failing {
                return Err(OrderServiceError::Transport("connection reset".to_string()));
            }
            Ok(OrderConfirmation::accepted(format!("ref-{}", submission.order_id)))
        }
    }

    pub(crate) fn request(amount_major: i64) -> SettlementRequest {
        let shipping = crate::checkout::shipping::tests::sample();
        SettlementRequest {
            order_id: OrderId::new("order_1"),
            amount: Money::from_major(amount_major, Currency::INR),
            items: Vec::new(),
            contact: shipping.contact(),
            shipping,
            captured_payment: None,
        }
    }

    #[tokio::test]
    async fn test_gateway_rejects_zero_amount_without_outbound_call() {
        let gateway = Arc::new(ScriptedGateway::succeeding());
        let orders = Arc::new(RecordingOrders::accepting());
        let strategy = OnlineGatewayStrategy::new(gateway.clone(), orders.clone());

        let settlement = strategy.execute(&request(0)).await;

        assert_eq!(settlement, Settlement::failed(FailureReason::InvalidAmount));
        assert_eq!(gateway.opened.load(Ordering::SeqCst), 0);
        assert_eq!(orders.count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_success_records_prepaid_order() {
        let gateway = Arc::new(ScriptedGateway::succeeding());
        let orders = Arc::new(RecordingOrders::accepting());
        let strategy = OnlineGatewayStrategy::new(gateway.clone(), orders.clone());

        let settlement = strategy.execute(&request(600)).await;

        assert_eq!(
            settlement,
            Settlement::Settled {
                order_reference: OrderReference::new("ref-order_1")
            }
        );
        let submissions = orders.submissions.lock().unwrap();
        assert_eq!(submissions[0].payment_method, PaymentMethod::OnlineGateway);
        assert_eq!(submissions[0].payment_reference.as_deref(), Some("pay_123"));
    }

    #[tokio::test]
    async fn test_capture_without_recorded_order_is_unrecorded() {
        let gateway = Arc::new(ScriptedGateway::succeeding());
        let strategy = OnlineGatewayStrategy::new(gateway.clone(), Arc::new(RecordingOrders::failing()));

        let settlement = strategy.execute(&request(600)).await;

        assert_eq!(
            settlement,
            Settlement::Unrecorded {
                payment_reference: "pay_123".to_string()
            }
        );
        assert_eq!(settlement.failure_reason(), Some(FailureReason::OrderRecordingFailed));
        assert_eq!(gateway.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_captured_payment_recorded_without_gateway() {
        let gateway = Arc::new(ScriptedGateway::succeeding());
        let orders = Arc::new(RecordingOrders::accepting());
        let strategy = OnlineGatewayStrategy::new(gateway.clone(), orders.clone());
        let mut request = request(600);
        request.captured_payment = Some("pay_earlier".to_string());

        assert!(strategy.execute(&request).await.is_settled());
        assert_eq!(gateway.opened.load(Ordering::SeqCst), 0);
        let submissions = orders.submissions.lock().unwrap();
        assert_eq!(submissions[0].payment_reference.as_deref(), Some("pay_earlier"));
        assert_eq!(submissions[0].order_id, OrderId::new("order_1"));
    }

    #[tokio::test]
    async fn test_gateway_cancel_maps_to_cancelled() {
        let strategy = OnlineGatewayStrategy::new(
            Arc::new(ScriptedGateway::failing(GatewayError::Cancelled)),
            Arc::new(RecordingOrders::accepting()),
        );
        assert_eq!(
            strategy.execute(&request(100)).await,
            Settlement::failed(FailureReason::Cancelled)
        );
    }

    #[tokio::test]
    async fn test_gateway_dropped_callback_fails() {
        let orders = Arc::new(RecordingOrders::accepting());
        let strategy = OnlineGatewayStrategy::new(Arc::new(ScriptedGateway::silent()), orders.clone());
        assert_eq!(
            strategy.execute(&request(100)).await,
            Settlement::failed(FailureReason::ResolverDropped)
        );
        assert_eq!(orders.count(), 0);
    }

    #[tokio::test]
    async fn test_cod_settles_on_service_success() {
        let orders = Arc::new(RecordingOrders::accepting());
        let strategy = CashOnDeliveryStrategy::new(orders.clone());

        assert!(strategy.execute(&request(310)).await.is_settled());
        let submissions = orders.submissions.lock().unwrap();
        assert_eq!(submissions[0].payment_method, PaymentMethod::CashOnDelivery);
        assert_eq!(submissions[0].payable_amount, Money::from_major(310, Currency::INR));
    }

    #[tokio::test]
    async fn test_cod_transport_failure_is_sanitized() {
        let strategy = CashOnDeliveryStrategy::new(Arc::new(RecordingOrders::failing()));
        let settlement = strategy.execute(&request(310)).await;

        assert_eq!(settlement, Settlement::failed(FailureReason::OrderSubmission));
        assert!(!FailureReason::OrderSubmission.user_message().contains("connection reset"));
    }

    #[test]
    fn test_strategy_lookup() {
        let orders: Arc<dyn OrderPlacement> = Arc::new(RecordingOrders::accepting());
        let strategies = PaymentStrategies::standard(Arc::new(ScriptedGateway::succeeding()), orders);

        assert!(strategies.for_method(PaymentMethod::Unselected).is_none());
        assert_eq!(
            strategies.for_method(PaymentMethod::CashOnDelivery).map(|s| s.method()),
            Some(PaymentMethod::CashOnDelivery)
        );
    }
}
