//! Pricing summary projection.

use crate::cart::CartLedger;
use crate::checkout::PaymentMethod;
use crate::error::CheckoutError;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Delivery and surcharge rules applied on top of the ledger total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRules {
    /// Orders at or above this total ship free.
    pub free_delivery_threshold: Money,
    /// Delivery charge below the threshold.
    pub delivery_charge: Money,
    /// Extra charge for cash on delivery.
    pub cod_surcharge: Money,
}

impl PricingRules {
    /// The storefront defaults: free delivery from 500, otherwise 50, and
    /// a 20 cash-on-delivery surcharge.
    pub fn standard(currency: Currency) -> Self {
        Self {
            free_delivery_threshold: Money::from_major(500, currency),
            delivery_charge: Money::from_major(50, currency),
            cod_surcharge: Money::from_major(20, currency),
        }
    }

    /// Error unless every amount is in `currency`.
    pub fn ensure_currency(&self, currency: Currency) -> Result<(), CheckoutError> {
        let reference = Money::zero(currency);
        reference.ensure_same_currency(&self.free_delivery_threshold)?;
        reference.ensure_same_currency(&self.delivery_charge)?;
        reference.ensure_same_currency(&self.cod_surcharge)
    }
}

impl Default for PricingRules {
    fn default() -> Self {
        Self::standard(Currency::default())
    }
}

/// Complete pricing breakdown for a checkout.
///
/// Derived on demand from the ledger and payment method. Never store one
/// across a cart or payment-method change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSummary {
    /// Ledger total after bulk tiers.
    pub subtotal: Money,
    pub delivery_charge: Money,
    pub payment_surcharge: Money,
    /// Bulk-tier savings, passed through from the ledger.
    pub total_savings: Money,
    /// subtotal + delivery_charge + payment_surcharge.
    pub payable_amount: Money,
}

impl PricingSummary {
    pub fn has_free_delivery(&self) -> bool {
        self.delivery_charge.is_zero()
    }

    pub fn has_savings(&self) -> bool {
        self.total_savings.is_positive()
    }
}

/// Project the payable amount for `ledger` under `method`.
pub fn project(
    ledger: &CartLedger,
    method: PaymentMethod,
    rules: &PricingRules,
) -> Result<PricingSummary, CheckoutError> {
    let currency = ledger.currency();
    let subtotal = ledger.total_price();

    rules.ensure_currency(currency)?;

    let free_delivery = subtotal.checked_cmp(&rules.free_delivery_threshold)? != Ordering::Less;
    let delivery_charge = if free_delivery {
        Money::zero(currency)
    } else {
        rules.delivery_charge
    };

    let payment_surcharge = match method {
        PaymentMethod::CashOnDelivery => rules.cod_surcharge,
        PaymentMethod::OnlineGateway | PaymentMethod::Unselected => Money::zero(currency),
    };

    let payable_amount = subtotal
        .checked_add(&delivery_charge)?
        .checked_add(&payment_surcharge)?;

    Ok(PricingSummary {
        subtotal,
        delivery_charge,
        payment_surcharge,
        total_savings: ledger.total_savings(),
        payable_amount,
    })
}
