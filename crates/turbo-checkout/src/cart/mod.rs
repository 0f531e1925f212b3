//! Shopping cart module.
//!
//! Contains the cart ledger, bulk discount tiers, and pricing projection.

mod discount;
mod ledger;
mod pricing;

pub use discount::{evaluate, BulkDiscountRule, LinePricing};
pub use ledger::{CartLedger, LedgerTotals, LineItem, ProductSnapshot, DEFAULT_MAX_QUANTITY_PER_ITEM};
pub use pricing::{project, PricingRules, PricingSummary};
