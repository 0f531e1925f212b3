//! End-to-end checkout scenarios against in-memory collaborators.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use turbo_checkout::cart::evaluate;
use turbo_checkout::prelude::*;

struct FakeGateway {
    opened: AtomicUsize,
    decline: bool,
}

impl FakeGateway {
    fn new(decline: bool) -> Self {
        Self {
            opened: AtomicUsize::new(0),
            decline,
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn open(&self, request: GatewayRequest, callback: GatewayCallback) -> Result<(), GatewayError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.decline {
            callback.on_failure(GatewayError::Declined("card_declined: insufficient funds".to_string()));
        } else {
            callback.on_success(SignedPayload {
                payment_id: "pay_abc".to_string(),
                order_id: request.order_id,
                signature: "deadbeef".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct FakeOrders {
    placed: Mutex<Vec<OrderSubmission>>,
    down: bool,
}

impl FakeOrders {
    fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    fn count(&self) -> usize {
        self.placed.lock().unwrap().len()
    }
}

#[async_trait]
impl OrderPlacement for FakeOrders {
    async fn place_order(&self, submission: &OrderSubmission) -> Result<OrderConfirmation, OrderServiceError> {
        let mut placed = self.placed.lock().unwrap();
        placed.push(submission.clone());
        if self.down {
            return Err(OrderServiceError::Transport("503 from orders-api".to_string()));
        }
        Ok(OrderConfirmation::accepted(format!("TC-{:04}", placed.len())))
    }
}

#[derive(Default)]
struct FakeNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl Notifier for FakeNotifier {
    fn notify(&self, notification: Notification) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.seen.lock().unwrap().push(notification);
        Ok(())
    }
}

fn inr(major: i64) -> Money {
    Money::from_major(major, Currency::INR)
}

fn shipping() -> ShippingDetails {
    ShippingDetails {
        full_name: "Ravi Kumar".to_string(),
        email: "ravi@example.in".to_string(),
        phone: "9876543210".to_string(),
        address_line1: "4 Park Street".to_string(),
        address_line2: Some("Flat 2B".to_string()),
        city: "Kolkata".to_string(),
        state: "West Bengal".to_string(),
        postal_code: "700016".to_string(),
        country: "India".to_string(),
    }
}

fn open(ledger: &CartLedger) -> CheckoutSession {
    match CheckoutSession::enter(&true, ledger, PricingRules::standard(Currency::INR)) {
        Entry::Ready(session) => session,
        Entry::Redirect(redirect) => panic!("unexpected redirect to {:?}", redirect),
    }
}

#[test]
fn scenario_a_cod_below_free_delivery_threshold() {
    let mut ledger = CartLedger::new(Currency::INR);
    ledger.add(&ProductSnapshot::new("tea", "Assam Tea", inr(120)), 2).unwrap();

    let mut session = open(&ledger);
    session.select_payment_method(PaymentMethod::CashOnDelivery);
    let summary = session.pricing(&ledger).unwrap();

    assert_eq!(ledger.total_price(), inr(240));
    assert_eq!(summary.delivery_charge, inr(50));
    assert_eq!(summary.payable_amount, inr(310));
}

#[test]
fn scenario_b_online_at_free_delivery_threshold() {
    let mut ledger = CartLedger::new(Currency::INR);
    ledger.add(&ProductSnapshot::new("kettle", "Kettle", inr(600)), 1).unwrap();

    let mut session = open(&ledger);
    session.select_payment_method(PaymentMethod::OnlineGateway);
    let summary = session.pricing(&ledger).unwrap();

    assert_eq!(summary.delivery_charge, inr(0));
    assert!(summary.has_free_delivery());
    assert_eq!(summary.payable_amount, inr(600));
}

#[test]
fn scenario_c_bulk_tier_applies() {
    let rule = BulkDiscountRule::new(5, 10.0).unwrap();
    let line = evaluate(inr(100), 10, Some(&rule)).unwrap();
    assert_eq!(line.discounted_total, inr(900));
    assert_eq!(line.savings, inr(100));

    let mut ledger = CartLedger::new(Currency::INR);
    ledger
        .add(&ProductSnapshot::new("mug", "Mug", inr(100)).with_bulk_discount(rule), 10)
        .unwrap();
    assert_eq!(ledger.total_price(), inr(900));
    assert_eq!(ledger.total_savings(), inr(100));
}

#[tokio::test]
async fn scenario_d_duplicate_submit_creates_one_order() {
    let mut ledger = CartLedger::new(Currency::INR);
    ledger.add(&ProductSnapshot::new("tea", "Assam Tea", inr(120)), 2).unwrap();
    let orders = Arc::new(FakeOrders::default());
    let strategies = PaymentStrategies::standard(Arc::new(FakeGateway::new(false)), orders.clone());
    let notifier = FakeNotifier::default();
    let mut session = open(&ledger);

    let attempt = session
        .begin_submit(&ledger, shipping(), PaymentMethod::CashOnDelivery)
        .unwrap()
        .expect("first submit starts an attempt");

    let duplicate = session
        .begin_submit(&ledger, shipping(), PaymentMethod::CashOnDelivery)
        .unwrap();
    assert!(duplicate.is_none());
    assert_eq!(session.step(), CheckoutStep::Processing);

    let settlement = strategies
        .for_method(attempt.method)
        .unwrap()
        .execute(&attempt.request)
        .await;
    let step = session.resolve(attempt, settlement, &mut ledger, &notifier);

    assert_eq!(step, CheckoutStep::Success);
    assert_eq!(orders.count(), 1);
    assert_eq!(notifier.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn scenario_e_zero_amount_makes_no_gateway_call() {
    let gateway = Arc::new(FakeGateway::new(false));
    let orders = Arc::new(FakeOrders::default());
    let strategies = PaymentStrategies::standard(gateway.clone(), orders.clone());

    let request = SettlementRequest {
        order_id: OrderId::new("order_zero"),
        amount: inr(0),
        items: Vec::new(),
        contact: shipping().contact(),
        shipping: shipping(),
        captured_payment: None,
    };
    let settlement = strategies
        .for_method(PaymentMethod::OnlineGateway)
        .unwrap()
        .execute(&request)
        .await;

    assert_eq!(settlement, Settlement::failed(FailureReason::InvalidAmount));
    assert_eq!(gateway.opened.load(Ordering::SeqCst), 0);
    assert_eq!(orders.count(), 0);
}

#[tokio::test]
async fn prepaid_checkout_records_order_and_clears_cart() {
    let mut ledger = CartLedger::new(Currency::INR);
    ledger.add(&ProductSnapshot::new("kettle", "Kettle", inr(600)), 1).unwrap();
    let orders = Arc::new(FakeOrders::default());
    let strategies = PaymentStrategies::standard(Arc::new(FakeGateway::new(false)), orders.clone());
    let notifier = FakeNotifier::default();
    let mut session = open(&ledger);

    let step = session
        .submit(&mut ledger, shipping(), PaymentMethod::OnlineGateway, &strategies, &notifier)
        .await
        .unwrap();

    assert_eq!(step, CheckoutStep::Success);
    assert!(ledger.is_empty());
    assert!(!session.should_redirect_on_empty_cart(&ledger));
    assert_eq!(session.order_reference().map(|r| r.as_str()), Some("TC-0001"));

    let placed = orders.placed.lock().unwrap();
    assert_eq!(placed[0].payable_amount, inr(600));
    assert_eq!(placed[0].payment_reference.as_deref(), Some("pay_abc"));
    assert_eq!(
        notifier.seen.lock().unwrap().as_slice(),
        &[Notification::OrderPlaced {
            order_reference: OrderReference::new("TC-0001")
        }]
    );
}

#[tokio::test]
async fn declined_payment_keeps_cart_and_hides_gateway_detail() {
    let mut ledger = CartLedger::new(Currency::INR);
    ledger.add(&ProductSnapshot::new("tea", "Assam Tea", inr(120)), 2).unwrap();
    let orders = Arc::new(FakeOrders::default());
    let strategies = PaymentStrategies::standard(Arc::new(FakeGateway::new(true)), orders.clone());
    let mut session = open(&ledger);

    let step = session
        .submit(&mut ledger, shipping(), PaymentMethod::OnlineGateway, &strategies, &SilentNotifier)
        .await
        .unwrap();

    assert_eq!(step, CheckoutStep::Error);
    assert_eq!(ledger.total_items(), 2);
    assert_eq!(orders.count(), 0);
    let message = session.status_message().unwrap();
    assert!(!message.contains("insufficient funds"));

    assert!(session.retry());
    assert_eq!(session.shipping(), Some(&shipping()));
    assert_eq!(session.payment_method(), PaymentMethod::OnlineGateway);
}

#[tokio::test]
async fn captured_payment_is_never_charged_twice() {
    let mut ledger = CartLedger::new(Currency::INR);
    ledger.add(&ProductSnapshot::new("kettle", "Kettle", inr(600)), 1).unwrap();
    let gateway = Arc::new(FakeGateway::new(false));
    let orders = Arc::new(FakeOrders::down());
    let strategies = PaymentStrategies::standard(gateway.clone(), orders.clone());
    let mut session = open(&ledger);

    let first = session
        .submit(&mut ledger, shipping(), PaymentMethod::OnlineGateway, &strategies, &SilentNotifier)
        .await
        .unwrap();
    assert_eq!(first, CheckoutStep::Error);

    assert!(session.retry());
    let second = session
        .submit(&mut ledger, shipping(), PaymentMethod::OnlineGateway, &strategies, &SilentNotifier)
        .await
        .unwrap();

    assert_eq!(second, CheckoutStep::Error);
    assert_eq!(gateway.opened.load(Ordering::SeqCst), 1);
    assert_eq!(orders.count(), 2);
    assert!(!session.status_message().unwrap().contains("503"));

    let pending = session.abandon().expect("captured payment reported");
    assert_eq!(pending.payment_reference.as_deref(), Some("pay_abc"));
    assert_eq!(pending.amount, inr(600));
}

#[test]
fn unauthenticated_and_empty_cart_redirect() {
    let ledger = CartLedger::new(Currency::INR);
    assert!(matches!(
        CheckoutSession::enter(&false, &ledger, PricingRules::default()),
        Entry::Redirect(Redirect::Login)
    ));
    assert!(matches!(
        CheckoutSession::enter(&true, &ledger, PricingRules::default()),
        Entry::Redirect(Redirect::Cart)
    ));
}

#[test]
fn config_drives_pricing_rules() {
    let config = CheckoutConfig::from_toml_str("[pricing]\nfree_delivery_threshold = 200.0").unwrap();
    let mut ledger = CartLedger::with_quantity_limit(config.currency, config.cart.max_quantity_per_item);
    ledger.add(&ProductSnapshot::new("tea", "Assam Tea", inr(120)), 2).unwrap();

    let Entry::Ready(mut session) = CheckoutSession::enter(&true, &ledger, config.pricing_rules().unwrap())
    else {
        panic!("expected checkout to open");
    };
    session.select_payment_method(PaymentMethod::OnlineGateway);
    assert_eq!(session.pricing(&ledger).unwrap().payable_amount, inr(240));
}
