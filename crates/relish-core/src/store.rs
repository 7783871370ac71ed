//! The cart state store: the single mutator of the resident cart model.
//!
//! Owns the ordered entry list (unique by identity key), the storage
//! capability, and the notifier. Every public mutation runs to completion
//! as derive → mutate → persist → notify before returning, so no two
//! mutations can interleave within a process.
//!
//! The in-memory model is the source of truth for the session. Persistence
//! is best-effort durability: a failed write is logged and the mutation
//! stands. Read failures at load time degrade to "no prior cart".

use crate::config::CartConfig;
use crate::error::{CartError, ErrorCode};
use crate::identity::derive_key;
use crate::migrate::{MigrationReport, load_cart};
use crate::model::{Addon, LineEntry, Totals, clamp_price};
use crate::notify::CountNotifier;
use crate::storage::CartStorage;

/// Attributes of one configured selection being added to the cart.
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub base_ref: String,
    pub display_name: String,
    pub unit_base_price: f64,
    pub heat: Option<String>,
    pub addons: Vec<Addon>,
}

/// The cart state store.
pub struct CartStore<S: CartStorage> {
    storage: S,
    entries: Vec<LineEntry>,
    notifier: CountNotifier,
    tax_rate: f64,
}

impl<S: CartStorage> CartStore<S> {
    /// Rehydrate a store from whatever the storage holds, running the
    /// migration/repair pipeline over the raw payload.
    ///
    /// The normalized result is persisted immediately, so migration is a
    /// one-time cost: corrupt payloads are overwritten with the empty cart
    /// they collapsed to, and legacy shapes are rewritten in the current
    /// shape.
    pub fn load(storage: S, config: &CartConfig) -> (Self, MigrationReport) {
        let mut store = Self {
            storage,
            entries: Vec::new(),
            notifier: CountNotifier::new(),
            tax_rate: config.tax_rate,
        };

        let raw = match store.storage.read() {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(
                    code = %ErrorCode::StorageReadFailed,
                    %err,
                    "could not read persisted cart; starting empty"
                );
                None
            }
        };

        let (entries, report) = load_cart(raw.as_deref());
        store.entries = entries;
        store.persist();

        if report.reset {
            tracing::info!("persisted cart was reset to empty after corruption");
        }

        (store, report)
    }

    /// Create an empty store without touching storage.
    pub fn new(storage: S, config: &CartConfig) -> Self {
        Self {
            storage,
            entries: Vec::new(),
            notifier: CountNotifier::new(),
            tax_rate: config.tax_rate,
        }
    }

    /// Register a count-change listener (invoked in registration order).
    pub fn on_count_change(&mut self, listener: impl Fn(usize) + 'static) {
        self.notifier.register(listener);
    }

    /// Add a configured selection, merging into an existing entry when the
    /// derived key matches.
    ///
    /// On a merge, only `quantity` accumulates; the existing entry's
    /// attributes win. Prices are clamped to finite non-negative values on
    /// the way in. Returns the entry's identity key.
    pub fn add_item(&mut self, item: NewItem) -> String {
        let addons: Vec<Addon> = item
            .addons
            .into_iter()
            .map(|addon| Addon {
                name: addon.name,
                price: clamp_price(addon.price),
            })
            .collect();

        let key = derive_key(&item.base_ref, item.heat.as_deref(), &addons);

        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == key) {
            existing.quantity = existing.quantity.saturating_add(1);
        } else {
            self.entries.push(LineEntry {
                key: key.clone(),
                base_ref: item.base_ref.trim().to_string(),
                display_name: item.display_name,
                unit_base_price: clamp_price(item.unit_base_price),
                heat: item.heat.filter(|h| !h.trim().is_empty()),
                addons,
                quantity: 1,
            });
        }

        self.commit();
        key
    }

    /// Remove an entry outright, or decrement its quantity by one.
    ///
    /// `remove_all`, or a current quantity of 1, deletes the entry; a
    /// quantity-0 entry is never left behind.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] when `key` is not in the cart;
    /// the cart is left untouched.
    pub fn remove_item(&mut self, key: &str, remove_all: bool) -> Result<(), CartError> {
        let index = self.index_of(key)?;

        if remove_all || self.entries[index].quantity <= 1 {
            self.entries.remove(index);
        } else {
            self.entries[index].quantity -= 1;
        }

        self.commit();
        Ok(())
    }

    /// Increment an entry's quantity by one.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ItemNotFound`] when `key` is not in the cart.
    pub fn increase_quantity(&mut self, key: &str) -> Result<(), CartError> {
        let index = self.index_of(key)?;
        self.entries[index].quantity = self.entries[index].quantity.saturating_add(1);
        self.commit();
        Ok(())
    }

    /// Empty the cart unconditionally, persist, and notify count 0.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.commit();
    }

    /// Defensive snapshot of the current entries, in cart order.
    #[must_use]
    pub fn items(&self) -> Vec<LineEntry> {
        self.entries.clone()
    }

    /// Number of distinct entries (unique keys), the count reported to
    /// listeners. Deliberately not the sum of quantities: it answers "kinds
    /// of item in the cart", not "total units".
    #[must_use]
    pub fn distinct_count(&self) -> usize {
        self.entries.len()
    }

    /// Cart-level totals, computed from the current entries at call time.
    #[must_use]
    pub fn totals(&self) -> Totals {
        let subtotal: f64 = self.entries.iter().map(LineEntry::line_total).sum();
        let tax = subtotal * self.tax_rate;
        Totals {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    fn index_of(&self, key: &str) -> Result<usize, CartError> {
        self.entries
            .iter()
            .position(|e| e.key == key)
            .ok_or_else(|| CartError::ItemNotFound {
                key: key.to_string(),
            })
    }

    /// Persist then notify. Runs after every mutation.
    fn commit(&mut self) {
        self.persist();
        self.notifier.notify(self.entries.len());
    }

    /// Best-effort write-back of the current entries.
    fn persist(&mut self) {
        let payload = match serde_json::to_string(&self.entries) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(
                    code = %ErrorCode::StorageWriteFailed,
                    %err,
                    "could not serialize cart; skipping write-back"
                );
                return;
            }
        };

        if let Err(err) = self.storage.write(&payload) {
            tracing::warn!(
                code = %ErrorCode::StorageWriteFailed,
                %err,
                "could not persist cart; session continues in memory"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CartStore, NewItem};
    use crate::config::CartConfig;
    use crate::error::CartError;
    use crate::model::Addon;
    use crate::storage::{CartStorage, MemoryStorage, StorageError};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Storage whose writes are observable from outside the store.
    #[derive(Debug, Clone, Default)]
    struct RecordingStorage {
        writes: Rc<RefCell<Vec<String>>>,
    }

    impl CartStorage for RecordingStorage {
        fn read(&self) -> Result<Option<String>, StorageError> {
            Ok(self.writes.borrow().last().cloned())
        }

        fn write(&mut self, payload: &str) -> Result<(), StorageError> {
            self.writes.borrow_mut().push(payload.to_string());
            Ok(())
        }
    }

    /// Storage that always fails, for best-effort semantics.
    struct BrokenStorage;

    impl CartStorage for BrokenStorage {
        fn read(&self) -> Result<Option<String>, StorageError> {
            Err(StorageError::Read(std::io::Error::other("read refused")))
        }

        fn write(&mut self, _payload: &str) -> Result<(), StorageError> {
            Err(StorageError::Write(std::io::Error::other("write refused")))
        }
    }

    fn store() -> CartStore<MemoryStorage> {
        CartStore::new(MemoryStorage::new(), &CartConfig::default())
    }

    fn wings(heat: Option<&str>, addon_names: &[&str]) -> NewItem {
        NewItem {
            base_ref: "wings-6".to_string(),
            display_name: "Wings (6pc)".to_string(),
            unit_base_price: 8.0,
            heat: heat.map(ToString::to_string),
            addons: addon_names
                .iter()
                .map(|name| Addon::new(*name, 0.75))
                .collect(),
        }
    }

    #[test]
    fn adding_same_configuration_merges_quantity() {
        let mut store = store();
        let first = store.add_item(wings(Some("Hot"), &["Ranch", "Celery"]));
        let second = store.add_item(wings(Some("Hot"), &["Celery", "Ranch"]));

        assert_eq!(first, second);
        let items = store.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn merge_keeps_first_written_attributes() {
        let mut store = store();
        store.add_item(wings(None, &[]));

        let mut renamed = wings(None, &[]);
        renamed.display_name = "WINGS!!".to_string();
        renamed.unit_base_price = 99.0;
        store.add_item(renamed);

        let items = store.items();
        assert_eq!(items[0].display_name, "Wings (6pc)");
        assert!((items[0].unit_base_price - 8.0).abs() < f64::EPSILON);
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn distinct_configurations_get_distinct_entries() {
        let mut store = store();
        store.add_item(wings(Some("Mild"), &[]));
        store.add_item(wings(Some("Hot"), &[]));
        store.add_item(wings(Some("Hot"), &["Ranch"]));

        assert_eq!(store.distinct_count(), 3);
    }

    #[test]
    fn count_notifications_track_distinct_entries_not_units() {
        let counts: Rc<RefCell<Vec<usize>>> = Rc::default();
        let mut store = store();
        {
            let counts = Rc::clone(&counts);
            store.on_count_change(move |count| counts.borrow_mut().push(count));
        }

        store.add_item(wings(None, &[]));
        store.add_item(wings(None, &[]));
        store.add_item(wings(Some("Hot"), &[]));
        store.clear();

        assert_eq!(*counts.borrow(), vec![1, 1, 2, 0]);
    }

    #[test]
    fn remove_last_unit_deletes_the_entry() {
        let mut store = store();
        let key = store.add_item(wings(None, &[]));

        store.remove_item(&key, false).expect("remove");
        assert!(store.items().is_empty());
    }

    #[test]
    fn remove_one_decrements_quantity() {
        let mut store = store();
        let key = store.add_item(wings(None, &[]));
        store.increase_quantity(&key).expect("increase");
        store.increase_quantity(&key).expect("increase");

        store.remove_item(&key, false).expect("remove");
        assert_eq!(store.items()[0].quantity, 2);
    }

    #[test]
    fn remove_all_deletes_regardless_of_quantity() {
        let mut store = store();
        let key = store.add_item(wings(None, &[]));
        store.increase_quantity(&key).expect("increase");

        store.remove_item(&key, true).expect("remove all");
        assert!(store.items().is_empty());
    }

    #[test]
    fn remove_missing_key_fails_and_leaves_cart_unchanged() {
        let mut store = store();
        store.add_item(wings(None, &[]));
        let before_items = store.items();
        let before_totals = store.totals();

        let err = store.remove_item("no-such-key", false).expect_err("absent");
        assert!(matches!(err, CartError::ItemNotFound { .. }));
        assert_eq!(store.items(), before_items);
        assert!((store.totals().total - before_totals.total).abs() < 1e-12);
    }

    #[test]
    fn increase_missing_key_fails() {
        let mut store = store();
        let err = store.increase_quantity("ghost").expect_err("absent");
        assert!(matches!(err, CartError::ItemNotFound { .. }));
    }

    #[test]
    fn totals_follow_the_addon_inclusive_formula() {
        let mut store = store();
        let key = store.add_item(NewItem {
            base_ref: "wings-6".to_string(),
            display_name: "Wings (6pc)".to_string(),
            unit_base_price: 8.0,
            heat: None,
            addons: vec![Addon::new("Ranch", 1.5)],
        });
        store.increase_quantity(&key).expect("increase");
        store.increase_quantity(&key).expect("increase");

        let totals = store.totals();
        assert!((totals.subtotal - 28.5).abs() < 1e-9);
        assert!((totals.tax - 1.995).abs() < 1e-9);
        assert!((totals.total - 30.495).abs() < 1e-9);
    }

    #[test]
    fn snapshot_is_defensive() {
        let mut store = store();
        store.add_item(wings(None, &[]));

        let mut snapshot = store.items();
        snapshot[0].quantity = 99;
        snapshot.clear();

        assert_eq!(store.items()[0].quantity, 1);
    }

    #[test]
    fn every_mutation_writes_back() {
        let storage = RecordingStorage::default();
        let writes = Rc::clone(&storage.writes);
        let mut store = CartStore::new(storage, &CartConfig::default());

        let key = store.add_item(wings(None, &[]));
        store.increase_quantity(&key).expect("increase");
        store.remove_item(&key, false).expect("remove");
        store.clear();

        assert_eq!(writes.borrow().len(), 4);
        assert_eq!(writes.borrow().last().map(String::as_str), Some("[]"));
    }

    #[test]
    fn prices_are_clamped_on_the_way_in() {
        let mut store = store();
        store.add_item(NewItem {
            base_ref: "mystery".to_string(),
            display_name: "Mystery".to_string(),
            unit_base_price: f64::NAN,
            heat: None,
            addons: vec![Addon {
                name: "Bad".to_string(),
                price: -5.0,
            }],
        });

        let items = store.items();
        assert!(items[0].unit_base_price.abs() < f64::EPSILON);
        assert!(items[0].addons[0].price.abs() < f64::EPSILON);
    }

    #[test]
    fn storage_failure_does_not_roll_back_the_mutation() {
        let mut store = CartStore::new(BrokenStorage, &CartConfig::default());
        store.add_item(wings(None, &[]));
        assert_eq!(store.distinct_count(), 1);
    }

    #[test]
    fn load_with_unreadable_storage_starts_empty() {
        let (store, report) = CartStore::load(BrokenStorage, &CartConfig::default());
        assert_eq!(store.distinct_count(), 0);
        assert!(!report.reset);
    }

    #[test]
    fn load_persists_the_normalized_payload() {
        let storage = RecordingStorage::default();
        storage
            .writes
            .borrow_mut()
            .push(r#"[{"baseId":"taco-2","name":"Tacos","price":6.0}]"#.to_string());
        let writes = Rc::clone(&storage.writes);

        let (store, report) = CartStore::load(storage, &CartConfig::default());
        assert_eq!(store.distinct_count(), 1);
        assert_eq!(report.keys_derived, 1);

        let last = writes.borrow().last().cloned().expect("write-back");
        assert!(last.contains("\"base_ref\":\"taco-2\""));
        assert!(last.contains("\"key\":\"taco-2\""));
    }

    #[test]
    fn load_overwrites_corrupt_payload_with_empty_cart() {
        let storage = RecordingStorage::default();
        storage.writes.borrow_mut().push("{corrupt".to_string());
        let writes = Rc::clone(&storage.writes);

        let (store, report) = CartStore::load(storage, &CartConfig::default());
        assert!(report.reset);
        assert_eq!(store.distinct_count(), 0);
        assert_eq!(writes.borrow().last().map(String::as_str), Some("[]"));
    }
}
