//! Checkout configuration.

use crate::cart::{PricingRules, DEFAULT_MAX_QUANTITY_PER_ITEM};
use crate::error::{CheckoutError, Result};
use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Checkout configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckoutConfig {
    /// Store currency. Every price in the cart must use it.
    #[serde(default)]
    pub currency: Currency,

    /// Delivery and payment-method charges.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Cart limits.
    #[serde(default)]
    pub cart: CartConfig,

    /// Logging.
    #[serde(default)]
    pub log: LogConfig,
}

impl CheckoutConfig {
    /// Load config from a file. `.json` is parsed as JSON, anything else as TOML.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CheckoutError::Config(format!("Failed to read config file {}: {}", path, e)))?;

        let config: Self = if path.ends_with(".json") {
            serde_json::from_str(&content)
                .map_err(|e| CheckoutError::Config(format!("Failed to parse JSON config {}: {}", path, e)))?
        } else {
            toml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Pricing rules in the store currency.
    pub fn pricing_rules(&self) -> Result<PricingRules> {
        self.pricing.to_rules(self.currency)
    }

    fn validate(&self) -> Result<()> {
        if self.cart.max_quantity_per_item == 0 {
            return Err(CheckoutError::Config(
                "cart.max_quantity_per_item must be at least 1".to_string(),
            ));
        }
        self.pricing_rules().map(|_| ())
    }
}

/// Delivery and surcharge amounts, in major units of the store currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Subtotal at or above which delivery is free.
    #[serde(default = "default_free_delivery_threshold")]
    pub free_delivery_threshold: f64,

    /// Flat delivery charge below the threshold.
    #[serde(default = "default_delivery_charge")]
    pub delivery_charge: f64,

    /// Flat surcharge for cash on delivery.
    #[serde(default = "default_cod_surcharge")]
    pub cod_surcharge: f64,
}

fn default_free_delivery_threshold() -> f64 {
    500.0
}

fn default_delivery_charge() -> f64 {
    50.0
}

fn default_cod_surcharge() -> f64 {
    20.0
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            free_delivery_threshold: default_free_delivery_threshold(),
            delivery_charge: default_delivery_charge(),
            cod_surcharge: default_cod_surcharge(),
        }
    }
}

impl PricingConfig {
    pub fn to_rules(&self, currency: Currency) -> Result<PricingRules> {
        let amount = |name: &str, value: f64| -> Result<Money> {
            if !value.is_finite() || value < 0.0 {
                return Err(CheckoutError::Config(format!(
                    "pricing.{} must be a non-negative amount, got {}",
                    name, value
                )));
            }
            Ok(Money::from_decimal(value, currency))
        };

        Ok(PricingRules {
            free_delivery_threshold: amount("free_delivery_threshold", self.free_delivery_threshold)?,
            delivery_charge: amount("delivery_charge", self.delivery_charge)?,
            cod_surcharge: amount("cod_surcharge", self.cod_surcharge)?,
        })
    }
}

/// Cart limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartConfig {
    #[serde(default = "default_max_quantity")]
    pub max_quantity_per_item: u32,
}

fn default_max_quantity() -> u32 {
    DEFAULT_MAX_QUANTITY_PER_ITEM
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            max_quantity_per_item: default_max_quantity(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive. `RUST_LOG` takes precedence when set.
    #[serde(default = "default_filter")]
    pub filter: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::default(),
        }
    }
}
