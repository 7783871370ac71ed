//! Human-readable labels for presentation collaborators.
//!
//! The engine stores heat selections as raw tokens; presentation layers ask
//! here for a display label. A catalog of level definitions can prettify
//! known tokens, but an unavailable catalog or an unrecognized token must
//! never fail the caller: the fallback is a cosmetic transform of the raw
//! token (separators to spaces, words capitalized).

use serde::{Deserialize, Serialize};

/// One heat level definition from an external catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatLevel {
    pub id: String,
    pub name: String,
}

/// Catalog of heat level definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeatCatalog {
    #[serde(default)]
    pub levels: Vec<HeatLevel>,
}

impl HeatCatalog {
    /// Look a token up by id or display name, case-insensitively.
    #[must_use]
    pub fn label(&self, token: &str) -> Option<String> {
        let needle = token.trim().to_lowercase();
        self.levels
            .iter()
            .find(|level| {
                level.id.to_lowercase() == needle || level.name.to_lowercase() == needle
            })
            .map(|level| level.name.clone())
    }
}

/// Resolve the display label for a heat token.
///
/// Catalog hit wins; otherwise the cosmetic fallback applies.
#[must_use]
pub fn heat_label(catalog: Option<&HeatCatalog>, token: &str) -> String {
    if let Some(name) = catalog.and_then(|c| c.label(token)) {
        return name;
    }
    cosmetic_label(token)
}

/// Cosmetic transform of a raw token: `-` and `_` become spaces and each
/// word's first letter is capitalized.
fn cosmetic_label(token: &str) -> String {
    token
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
