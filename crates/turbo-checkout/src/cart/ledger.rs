//! Cart ledger and line items.

use crate::cart::discount::{evaluate, BulkDiscountRule, LinePricing};
use crate::checkout::OrderLine;
use crate::error::CheckoutError;
use crate::ids::ProductId;
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default maximum quantity allowed per line item.
pub const DEFAULT_MAX_QUANTITY_PER_ITEM: u32 = 9999;

/// Catalog data captured when a product is added to the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    #[serde(default)]
    pub bulk_discount: Option<BulkDiscountRule>,
    #[serde(default)]
    pub image_ref: Option<String>,
}

impl ProductSnapshot {
    /// Snapshot without a bulk tier or image.
    pub fn new(product_id: impl Into<ProductId>, name: impl Into<String>, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            name: name.into(),
            unit_price,
            bulk_discount: None,
            image_ref: None,
        }
    }

    /// Attach a bulk tier.
    pub fn with_bulk_discount(mut self, rule: BulkDiscountRule) -> Self {
        self.bulk_discount = Some(rule);
        self
    }

    /// Attach an image reference.
    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// One product entry in the cart.
///
/// `unit_price` and `bulk_discount` are frozen from the snapshot at add
/// time and never refreshed from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    /// Product name (denormalized for display).
    pub name: String,
    pub image_ref: Option<String>,
    pub unit_price: Money,
    /// Always at least 1.
    pub quantity: u32,
    pub bulk_discount: Option<BulkDiscountRule>,
    /// Derived from the fields above by the bulk discount evaluator.
    pub pricing: LinePricing,
}

impl LineItem {
    fn from_snapshot(snapshot: &ProductSnapshot, quantity: u32) -> Result<Self, CheckoutError> {
        let pricing = evaluate(snapshot.unit_price, quantity, snapshot.bulk_discount.as_ref())?;
        Ok(Self {
            product_id: snapshot.product_id.clone(),
            name: snapshot.name.clone(),
            image_ref: snapshot.image_ref.clone(),
            unit_price: snapshot.unit_price,
            quantity,
            bulk_discount: snapshot.bulk_discount,
            pricing,
        })
    }

    fn reprice(&mut self) -> Result<(), CheckoutError> {
        self.pricing = evaluate(self.unit_price, self.quantity, self.bulk_discount.as_ref())?;
        Ok(())
    }
}

/// Aggregates over all lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    /// Sum of line quantities.
    pub total_items: u64,
    /// Sum of discounted line totals.
    pub total_price: Money,
    /// Sum of savings over lines where a tier applied.
    pub total_savings: Money,
}

impl LedgerTotals {
    fn empty(currency: Currency) -> Self {
        Self {
            total_items: 0,
            total_price: Money::zero(currency),
            total_savings: Money::zero(currency),
        }
    }
}

/// Sole owner of line-item state for one shopping session.
///
/// Every mutation prices the resulting line set and recomputes totals
/// before committing, so a rejected call leaves the ledger untouched and
/// totals are never observed stale. Deserialization re-checks every line
/// and re-derives the totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredLedger")]
pub struct CartLedger {
    currency: Currency,
    max_quantity_per_item: u32,
    items: BTreeMap<ProductId, LineItem>,
    totals: LedgerTotals,
}

/// Serialized form; `totals` is ignored and re-derived on load.
#[derive(Deserialize)]
struct StoredLedger {
    currency: Currency,
    max_quantity_per_item: u32,
    #[serde(default)]
    items: BTreeMap<ProductId, LineItem>,
}

impl TryFrom<StoredLedger> for CartLedger {
    type Error = CheckoutError;

    fn try_from(stored: StoredLedger) -> Result<Self, Self::Error> {
        if stored.max_quantity_per_item == 0 {
            return Err(CheckoutError::InvalidQuantity(0));
        }
        let mut ledger = CartLedger::with_quantity_limit(stored.currency, stored.max_quantity_per_item);
        ledger.items = stored.items;
        ledger.recompute_totals()?;
        Ok(ledger)
    }
}

impl CartLedger {
    /// Empty ledger with the default per-line quantity limit.
    pub fn new(currency: Currency) -> Self {
        Self::with_quantity_limit(currency, DEFAULT_MAX_QUANTITY_PER_ITEM)
    }

    /// Empty ledger capping each line at `max_quantity_per_item` (at least 1).
    pub fn with_quantity_limit(currency: Currency, max_quantity_per_item: u32) -> Self {
        Self {
            currency,
            max_quantity_per_item: max_quantity_per_item.max(1),
            items: BTreeMap::new(),
            totals: LedgerTotals::empty(currency),
        }
    }

    /// Add `quantity` of a product, merging into an existing line.
    ///
    /// Non-positive quantities are a no-op. A merge keeps the price frozen
    /// on the existing line.
    pub fn add(&mut self, snapshot: &ProductSnapshot, quantity: i64) -> Result<(), CheckoutError> {
        if quantity <= 0 {
            return Ok(());
        }
        if snapshot.unit_price.currency != self.currency {
            return Err(CheckoutError::CurrencyMismatch {
                expected: self.currency.code().to_string(),
                got: snapshot.unit_price.currency.code().to_string(),
            });
        }
        if snapshot.unit_price.is_negative() {
            return Err(CheckoutError::InvalidAmount(snapshot.unit_price));
        }

        let mut items = self.items.clone();
        match items.get_mut(&snapshot.product_id) {
            Some(existing) => {
                let merged = i64::from(existing.quantity)
                    .checked_add(quantity)
                    .ok_or(CheckoutError::Overflow)?;
                existing.quantity = self.check_limit(merged)?;
                existing.reprice()?;
            }
            None => {
                let line = LineItem::from_snapshot(snapshot, self.check_limit(quantity)?)?;
                items.insert(snapshot.product_id.clone(), line);
            }
        }
        self.commit(items)?;

        tracing::debug!(
            product_id = %snapshot.product_id,
            quantity,
            total_items = self.totals.total_items,
            "cart line added"
        );
        Ok(())
    }

    /// Set an absolute quantity. `quantity <= 0` removes the line.
    ///
    /// Returns whether a line for `product_id` exists.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<bool, CheckoutError> {
        if quantity <= 0 {
            return self.remove(product_id);
        }
        if !self.items.contains_key(product_id) {
            return Ok(false);
        }

        let quantity = self.check_limit(quantity)?;
        let mut items = self.items.clone();
        if let Some(line) = items.get_mut(product_id) {
            line.quantity = quantity;
            line.reprice()?;
        }
        self.commit(items)?;

        tracing::debug!(%product_id, quantity, "cart line quantity set");
        Ok(true)
    }

    /// Remove a line. Idempotent; returns whether anything was removed.
    pub fn remove(&mut self, product_id: &ProductId) -> Result<bool, CheckoutError> {
        if !self.items.contains_key(product_id) {
            return Ok(false);
        }
        let mut items = self.items.clone();
        items.remove(product_id);
        self.commit(items)?;

        tracing::debug!(%product_id, "cart line removed");
        Ok(true)
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.totals = LedgerTotals::empty(self.currency);
        tracing::debug!("cart cleared");
    }

    /// Re-check every line against the ledger boundary, then re-derive line
    /// prices and the aggregates from the frozen inputs.
    ///
    /// Mutating calls already do this. On error the ledger is unchanged.
    pub fn recompute_totals(&mut self) -> Result<&LedgerTotals, CheckoutError> {
        let mut items = self.items.clone();
        for (key, line) in items.iter_mut() {
            self.check_line(key, line)?;
            line.reprice()?;
        }
        self.commit(items)?;
        Ok(&self.totals)
    }

    /// Aggregates as of the last mutation.
    pub fn totals(&self) -> &LedgerTotals {
        &self.totals
    }

    /// Sum of line quantities.
    pub fn total_items(&self) -> u64 {
        self.totals.total_items
    }

    /// Sum of discounted line totals.
    pub fn total_price(&self) -> Money {
        self.totals.total_price
    }

    /// Sum of bulk-tier savings.
    pub fn total_savings(&self) -> Money {
        self.totals.total_savings
    }

    /// Currency every line must be priced in.
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Get the line for a product.
    pub fn get(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.items.get(product_id)
    }

    /// Lines in product-id order.
    pub fn items(&self) -> impl Iterator<Item = &LineItem> {
        self.items.values()
    }

    /// Number of distinct products.
    pub fn unique_items(&self) -> usize {
        self.items.len()
    }

    /// Check if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Item payload for the order-placement service.
    pub fn order_lines(&self) -> Vec<OrderLine> {
        self.items.values().map(OrderLine::from).collect()
    }

    fn check_limit(&self, quantity: i64) -> Result<u32, CheckoutError> {
        let max = i64::from(self.max_quantity_per_item);
        if quantity > max {
            return Err(CheckoutError::QuantityExceedsLimit(quantity, max));
        }
        u32::try_from(quantity).map_err(|_| CheckoutError::InvalidQuantity(quantity))
    }

    fn check_line(&self, key: &ProductId, line: &LineItem) -> Result<(), CheckoutError> {
        if *key != line.product_id {
            return Err(CheckoutError::Serialization(format!(
                "line keyed {} holds product {}",
                key, line.product_id
            )));
        }
        if line.quantity == 0 {
            return Err(CheckoutError::InvalidQuantity(0));
        }
        self.check_limit(i64::from(line.quantity))?;
        Money::zero(self.currency).ensure_same_currency(&line.unit_price)?;
        if line.unit_price.is_negative() {
            return Err(CheckoutError::InvalidAmount(line.unit_price));
        }
        Ok(())
    }

    fn commit(&mut self, items: BTreeMap<ProductId, LineItem>) -> Result<(), CheckoutError> {
        let totals = compute_totals(&items, self.currency)?;
        self.items = items;
        self.totals = totals;
        Ok(())
    }
}

impl Default for CartLedger {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}

fn compute_totals(
    items: &BTreeMap<ProductId, LineItem>,
    currency: Currency,
) -> Result<LedgerTotals, CheckoutError> {
    let total_items = items.values().map(|line| u64::from(line.quantity)).sum();
    let total_price = Money::try_sum(items.values().map(|l| &l.pricing.discounted_total), currency)?;
    let total_savings = Money::try_sum(
        items
            .values()
            .filter(|l| l.pricing.tier_applied)
            .map(|l| &l.pricing.savings),
        currency,
    )?;

    Ok(LedgerTotals {
        total_items,
        total_price,
        total_savings,
    })
}
