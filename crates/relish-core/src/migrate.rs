//! Load-time migration and repair of persisted cart payloads.
//!
//! Runs once, at startup, over raw persisted data of unknown and possibly
//! legacy shape. Object entries are repaired field-by-field with defensive
//! defaults (legacy field aliases, missing keys re-derived, prices and
//! quantities coerced); entries that are not JSON objects carry nothing
//! recoverable and are dropped with a warning. A payload that fails to
//! parse, or is not an array, is discarded wholesale: the pipeline fails
//! safe to an empty cart rather than propagating corruption, and the caller
//! persists that empty cart to overwrite the bad data.
//!
//! Migration is idempotent: feeding its own output back through produces
//! the same entries with no keys derived and nothing dropped.

use serde_json::{Map, Value};

use crate::error::ErrorCode;
use crate::identity::derive_key;
use crate::model::{Addon, LineEntry, clamp_price};

/// Placeholder for add-ons persisted without a name.
const FALLBACK_ADDON_NAME: &str = "Add-on";

/// Outcome summary from one load-time migration pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MigrationReport {
    /// Entries that made it into the migrated cart.
    pub entries_kept: usize,
    /// Entries whose key was missing and had to be re-derived.
    pub keys_derived: usize,
    /// Raw entries with no recoverable shape, discarded.
    pub entries_dropped: usize,
    /// Duplicate-key entries folded into an earlier entry's quantity.
    pub entries_merged: usize,
    /// The whole payload was unusable and the cart was reset to empty.
    pub reset: bool,
}

/// Migrate a raw persisted payload into well-formed, key-unique entries.
///
/// `None` means no prior cart was persisted; that is a clean empty start,
/// not a reset.
#[must_use]
pub fn load_cart(raw: Option<&str>) -> (Vec<LineEntry>, MigrationReport) {
    let mut report = MigrationReport::default();

    let Some(raw) = raw else {
        return (Vec::new(), report);
    };

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(
                code = %ErrorCode::MalformedPayload,
                %err,
                "persisted cart is not valid JSON; resetting to empty"
            );
            report.reset = true;
            return (Vec::new(), report);
        }
    };

    let Value::Array(items) = parsed else {
        tracing::warn!(
            code = %ErrorCode::MalformedPayload,
            "persisted cart is not an array; resetting to empty"
        );
        report.reset = true;
        return (Vec::new(), report);
    };

    let mut entries: Vec<LineEntry> = Vec::with_capacity(items.len());
    for item in &items {
        let Some(entry) = migrate_entry(item, &mut report) else {
            report.entries_dropped += 1;
            tracing::warn!(
                code = %ErrorCode::MalformedPayload,
                "dropping unrecoverable cart entry during migration"
            );
            continue;
        };

        // Key uniqueness is a cart invariant; a legacy payload written
        // before merge-on-add can still violate it.
        if let Some(existing) = entries.iter_mut().find(|e| e.key == entry.key) {
            existing.quantity = existing.quantity.saturating_add(entry.quantity);
            report.entries_merged += 1;
        } else {
            entries.push(entry);
            report.entries_kept += 1;
        }
    }

    (entries, report)
}

/// Repair a single raw entry, or `None` when it is not an object.
fn migrate_entry(item: &Value, report: &mut MigrationReport) -> Option<LineEntry> {
    let Value::Object(obj) = item else {
        return None;
    };

    // Legacy payloads stored the composite key under `id` and the catalog
    // reference under `baseId`; the oldest shape had only `id`.
    let base_ref = string_field(obj, &["base_ref", "baseId", "id"]).unwrap_or_default();
    let heat = string_field(obj, &["heat", "heatLevel"]).filter(|h| !h.trim().is_empty());
    let addons = migrate_addons(obj.get("addons"));

    let key = match string_field(obj, &["key", "id"]) {
        Some(key) if !key.trim().is_empty() => key,
        _ => {
            report.keys_derived += 1;
            derive_key(&base_ref, heat.as_deref(), &addons)
        }
    };

    let unit_base_price = ["unit_base_price", "basePrice", "price"]
        .iter()
        .find_map(|field| obj.get(*field).and_then(coerce_price))
        .unwrap_or(0.0);

    let display_name = string_field(obj, &["display_name", "name"]).unwrap_or_default();

    Some(LineEntry {
        key,
        base_ref,
        display_name,
        unit_base_price,
        heat,
        addons,
        quantity: obj.get("quantity").map_or(1, coerce_quantity),
    })
}

/// Normalize a raw `addons` value to well-shaped pairs. Null slots and
/// non-object elements are skipped; missing names and prices get defaults.
fn migrate_addons(raw: Option<&Value>) -> Vec<Addon> {
    let Some(Value::Array(raw)) = raw else {
        return Vec::new();
    };

    raw.iter()
        .filter_map(|value| match value {
            Value::Object(obj) => Some(Addon {
                name: string_field(obj, &["name"])
                    .filter(|n| !n.is_empty())
                    .unwrap_or_else(|| FALLBACK_ADDON_NAME.to_string()),
                price: obj.get("price").and_then(coerce_price).unwrap_or(0.0),
            }),
            _ => None,
        })
        .collect()
}

fn string_field(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| obj.get(*name).and_then(Value::as_str))
        .map(ToString::to_string)
}

/// Prices may arrive as numbers or numeric strings (legacy payloads went
/// through `parseFloat`). Anything else is unusable.
fn coerce_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().map(clamp_price),
        Value::String(s) => s.trim().parse::<f64>().ok().map(clamp_price),
        _ => None,
    }
}

/// Quantities must come out as positive integers; anything unusable
/// defaults to 1.
fn coerce_quantity(value: &Value) -> u32 {
    let numeric = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match numeric {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Some(n) if n.is_finite() && n >= 1.0 => n.min(f64::from(u32::MAX)).floor() as u32,
        _ => 1,
    }
}
