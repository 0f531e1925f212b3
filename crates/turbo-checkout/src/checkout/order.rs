//! Order payloads exchanged with the order-placement service.

use crate::cart::LineItem;
use crate::checkout::{PaymentMethod, ShippingDetails};
use crate::ids::{OrderId, OrderReference, ProductId};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A line in an order submission, priced at the frozen cart price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
    /// Line total after any bulk tier.
    pub line_total: Money,
}

impl From<&LineItem> for OrderLine {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id.clone(),
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            line_total: item.pricing.discounted_total,
        }
    }
}

/// Request body for the order-placement service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSubmission {
    /// Client-side receipt id, stable across the attempt.
    pub order_id: OrderId,
    pub items: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub payment_method: PaymentMethod,
    pub payable_amount: Money,
    /// Gateway payment id for prepaid orders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
}

impl OrderSubmission {
    /// Total units across all lines.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|i| u64::from(i.quantity)).sum()
    }
}

/// Response from the order-placement service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub success: bool,
    #[serde(default)]
    pub order_reference: Option<OrderReference>,
    /// Service-provided detail. Logged, never shown to the customer.
    #[serde(default)]
    pub message: Option<String>,
}

impl OrderConfirmation {
    /// Successful response carrying `reference`.
    pub fn accepted(reference: impl Into<OrderReference>) -> Self {
        Self {
            success: true,
            order_reference: Some(reference.into()),
            message: None,
        }
    }

    /// Failed response with a service message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            order_reference: None,
            message: Some(message.into()),
        }
    }

    /// The reference, if the service both succeeded and issued one.
    pub fn reference(&self) -> Option<&OrderReference> {
        self.order_reference.as_ref().filter(|_| self.success)
    }
}
