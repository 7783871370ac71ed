use serde::{Deserialize, Serialize};

/// A priced add-on attached to a line entry.
///
/// Pure value: two add-ons are the same modifier iff both name and price
/// match. Duplicate names with differing prices are distinct modifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Addon {
    pub name: String,
    pub price: f64,
}

impl Addon {
    #[must_use]
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price: clamp_price(price),
        }
    }
}

/// One merged line in the cart.
///
/// `key` is the canonical identity derived from (`base_ref`, normalized heat
/// selection, add-on set) and is unique within a cart; `base_ref` alone is
/// not (the same catalog item with different add-ons yields separate lines).
///
/// Prices here are per-unit inputs only. `unit_price` and `line_total` are
/// computed on demand and never stored or persisted, so they cannot go stale
/// against `addons` or `quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineEntry {
    pub key: String,
    pub base_ref: String,
    pub display_name: String,
    pub unit_base_price: f64,
    pub heat: Option<String>,
    pub addons: Vec<Addon>,
    pub quantity: u32,
}

impl Default for LineEntry {
    fn default() -> Self {
        Self {
            key: String::new(),
            base_ref: String::new(),
            display_name: String::new(),
            unit_base_price: 0.0,
            heat: None,
            addons: Vec::new(),
            quantity: 1,
        }
    }
}

impl LineEntry {
    /// Per-unit price: base price plus the sum of all add-on prices.
    #[must_use]
    pub fn unit_price(&self) -> f64 {
        self.unit_base_price + self.addons.iter().map(|a| a.price).sum::<f64>()
    }

    /// Line total: `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> f64 {
        self.unit_price() * f64::from(self.quantity)
    }
}

/// Cart-level aggregates, computed at call time from the current entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

/// Clamp a price input to a finite non-negative value.
///
/// Negative, NaN, and infinite inputs all coerce to 0 rather than poisoning
/// downstream aggregation.
#[must_use]
pub(crate) fn clamp_price(raw: f64) -> f64 {
    if raw.is_finite() && raw >= 0.0 { raw } else { 0.0 }
}
