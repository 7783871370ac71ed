use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Single fixed-rate surcharge applied to the subtotal.
pub const DEFAULT_TAX_RATE: f64 = 0.07;

/// Engine configuration.
///
/// A missing config file is not an error; every field has a default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CartConfig {
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            tax_rate: default_tax_rate(),
        }
    }
}

/// Load configuration from a TOML file, defaulting when the file is absent.
///
/// # Errors
///
/// Returns an error when the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<CartConfig> {
    if !path.exists() {
        return Ok(CartConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<CartConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

const fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}
