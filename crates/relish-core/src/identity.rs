//! Canonical identity keys for cart line entries.
//!
//! Two configurations are the same logical item iff they derive the same
//! key. The derivation is deterministic and order-insensitive for add-ons,
//! so the key can be recomputed at any time (including during migration of
//! legacy payloads) without disturbing merge semantics.
//!
//! Rules:
//! - The trimmed base reference is the mandatory first segment.
//! - A non-blank heat selection contributes a `heat_<token>` segment, with
//!   the token lowercased, whitespace collapsed to `_`, and anything outside
//!   `[a-z0-9_]` stripped.
//! - A non-empty add-on set contributes one segment of `addon_<token>`
//!   pieces, sorted by add-on name (case-insensitive, tie-broken by the raw
//!   name) and joined with `_`.
//! - Segments are joined with `::`, which cannot appear in any token.
//! - An empty result means the input had no usable identity at all; the
//!   deriver fails closed with a unique fallback key and logs the anomaly.

use crate::error::ErrorCode;
use crate::model::Addon;
use std::cmp::Ordering;
use uuid::Uuid;

/// Separator between key segments. Token normalization strips `:` so no
/// token content can collide with it.
pub const KEY_SEPARATOR: &str = "::";

/// Prefix of fallback keys minted when derivation yields nothing.
pub const FALLBACK_KEY_PREFIX: &str = "item_";

/// Derive the canonical identity key for a configured selection.
///
/// Same (base reference, normalized heat, add-on set) always produces the
/// same key regardless of add-on input order; differing add-on name sets
/// always produce different keys.
#[must_use]
pub fn derive_key(base_ref: &str, heat: Option<&str>, addons: &[Addon]) -> String {
    let mut segments: Vec<String> = Vec::with_capacity(3);

    let base = base_ref.trim();
    if !base.is_empty() {
        segments.push(base.to_string());
    }

    if let Some(heat) = heat {
        if !heat.trim().is_empty() {
            segments.push(format!("heat_{}", normalize_heat(heat)));
        }
    }

    if !addons.is_empty() {
        let mut sorted: Vec<&Addon> = addons.iter().collect();
        sorted.sort_by(|a, b| compare_addon_names(&a.name, &b.name));
        let tokens: Vec<String> = sorted
            .iter()
            .map(|addon| format!("addon_{}", normalize_token(&addon.name)))
            .collect();
        segments.push(tokens.join("_"));
    }

    if segments.is_empty() {
        return fallback_key("derived key was empty");
    }

    segments.join(KEY_SEPARATOR)
}

/// Mint a unique fallback key after a derivation anomaly.
///
/// Never used on the happy path; every mint is logged as a data-integrity
/// anomaly rather than silently proceeding with an empty key.
#[must_use]
pub(crate) fn fallback_key(reason: &str) -> String {
    let key = format!("{FALLBACK_KEY_PREFIX}{}", Uuid::new_v4().simple());
    tracing::warn!(
        code = %ErrorCode::DerivationAnomaly,
        %key,
        reason,
        "key derivation fell back to a unique key"
    );
    key
}

/// Heat tokens are the strictest normalization: lowercase, whitespace runs
/// collapsed to `_`, everything outside `[a-z0-9_]` dropped.
fn normalize_heat(raw: &str) -> String {
    let mut token = String::with_capacity(raw.len());
    let mut in_whitespace = false;
    for ch in raw.trim().to_lowercase().chars() {
        if ch.is_whitespace() {
            in_whitespace = true;
            continue;
        }
        if in_whitespace {
            token.push('_');
            in_whitespace = false;
        }
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' {
            token.push(ch);
        }
    }
    token
}

/// Add-on tokens keep punctuation but lowercase and fold whitespace to `_`.
fn normalize_token(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut token = String::with_capacity(lowered.len());
    let mut in_whitespace = false;
    for ch in lowered.chars() {
        if ch.is_whitespace() {
            in_whitespace = true;
            continue;
        }
        if in_whitespace {
            token.push('_');
            in_whitespace = false;
        }
        if ch != ':' {
            token.push(ch);
        }
    }
    token
}

/// Canonical add-on collation: case-insensitive lexicographic on the name,
/// tie-broken by the raw name so the order is total and deterministic.
fn compare_addon_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
