//! Bulk discount tiers.

use crate::error::CheckoutError;
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// A percentage discount granted once a line reaches `min_qty`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BulkDiscountRule {
    /// Minimum line quantity for the tier to apply.
    pub min_qty: u32,
    /// Percentage off (0.0 - 100.0).
    pub discount_percent: f64,
}

impl BulkDiscountRule {
    /// Create a validated rule.
    pub fn new(min_qty: u32, discount_percent: f64) -> Result<Self, CheckoutError> {
        if min_qty == 0 {
            return Err(CheckoutError::InvalidDiscountRule(
                "min_qty must be at least 1".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&discount_percent) {
            return Err(CheckoutError::InvalidDiscountRule(format!(
                "discount_percent {} outside 0..=100",
                discount_percent
            )));
        }
        Ok(Self {
            min_qty,
            discount_percent,
        })
    }

    /// Whether the tier applies at `quantity`.
    pub fn applies_to(&self, quantity: u32) -> bool {
        quantity >= self.min_qty.max(1)
    }

    /// Discount in parts per million (0.0001% resolution), clamped to
    /// `0..=FULL_PPM`.
    ///
    /// Rules that arrive through deserialization skip `new`, so NaN and
    /// out-of-range percentages are clamped here as well.
    fn parts_per_million(&self) -> u32 {
        if self.discount_percent.is_nan() {
            return 0;
        }
        (self.discount_percent.clamp(0.0, 100.0) * 10_000.0).round() as u32
    }
}

/// Result of pricing one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePricing {
    /// unit_price * quantity.
    pub original_total: Money,
    /// Line total after any bulk tier.
    pub discounted_total: Money,
    /// original_total - discounted_total.
    pub savings: Money,
    /// Whether a tier applied.
    pub tier_applied: bool,
}

/// Price a line under an optional bulk tier.
///
/// Pure and deterministic. Without a rule, or below `min_qty`, the line
/// is charged exactly `unit_price * quantity`.
pub fn evaluate(
    unit_price: Money,
    quantity: u32,
    rule: Option<&BulkDiscountRule>,
) -> Result<LinePricing, CheckoutError> {
    let original_total = unit_price.checked_mul(i64::from(quantity))?;

    let Some(rule) = rule.filter(|r| r.applies_to(quantity)) else {
        return Ok(LinePricing {
            original_total,
            discounted_total: original_total,
            savings: Money::zero(unit_price.currency),
            tier_applied: false,
        });
    };

    let discounted_total = original_total.reduce_by_ppm(rule.parts_per_million())?;
    let savings = original_total.checked_sub(&discounted_total)?;

    Ok(LinePricing {
        original_total,
        discounted_total,
        savings,
        tier_applied: true,
    })
}
