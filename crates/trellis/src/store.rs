//! The authoritative collection of dependency records.
//!
//! Records are kept in declaration order and keyed by `dependency_id`.
//! Re-declaring an id replaces the record in place; removing one leaves a
//! tombstone so slot positions (and therefore iteration order) never shift.
//! Every mutation bumps [`DependencyStore::version`], which the resolver uses
//! to key cached graphs.
//!
//! The store also tracks every item it has heard of, whether through
//! [`DependencyStore::register_item`] or as either end of a record. Items
//! stay known after their last record is tombstoned, which is what makes
//! them show up as orphaned nodes.

use crate::domain::{DependencyRecord, ItemId};
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};

/// A position in the store: either a live record or the tombstone left
/// behind when one was removed.
#[derive(Debug, Clone)]
enum Slot {
    Live {
        record: DependencyRecord,
        revision: u64,
    },
    Tombstone {
        retired_at: DateTime<Utc>,
        revision: u64,
    },
}

/// Mutation-ordered, versioned store of dependency records.
#[derive(Debug, Clone, Default)]
pub struct DependencyStore {
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
    items: BTreeSet<ItemId>,
    version: u64,
}

impl DependencyStore {
    /// Create an empty store at version 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Monotonic mutation counter.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Make an item known without declaring any relationship for it.
    ///
    /// Returns `true` if the item was new.
    pub fn register_item(&mut self, item: ItemId) -> bool {
        let added = self.items.insert(item);
        if added {
            self.version += 1;
        }
        added
    }

    /// Every item the store knows about.
    #[must_use]
    pub fn items(&self) -> &BTreeSet<ItemId> {
        &self.items
    }

    /// Insert or replace the record with this record's `dependency_id`.
    ///
    /// Returns the live record that was replaced, if any. A tombstoned id
    /// is revived in its original slot.
    pub fn upsert(&mut self, record: DependencyRecord) -> Option<DependencyRecord> {
        self.version += 1;
        self.items.insert(record.source_item_id.clone());
        self.items.insert(record.target_item_id().clone());

        let id = record.dependency_id().to_string();
        let new_slot = Slot::Live {
            record,
            revision: self.version,
        };

        if let Some(&pos) = self.index.get(&id) {
            match std::mem::replace(&mut self.slots[pos], new_slot) {
                Slot::Live { record, .. } => Some(record),
                Slot::Tombstone { .. } => None,
            }
        } else {
            self.index.insert(id, self.slots.len());
            self.slots.push(new_slot);
            None
        }
    }

    /// Replace the live record `dependency_id` with a tombstone.
    ///
    /// Returns the retired record, or `None` if no live record has that id.
    pub fn retire(&mut self, dependency_id: &str, at: DateTime<Utc>) -> Option<DependencyRecord> {
        let &pos = self.index.get(dependency_id)?;
        if !matches!(self.slots[pos], Slot::Live { .. }) {
            return None;
        }

        self.version += 1;
        let tombstone = Slot::Tombstone {
            retired_at: at,
            revision: self.version,
        };
        match std::mem::replace(&mut self.slots[pos], tombstone) {
            Slot::Live { record, .. } => Some(record),
            Slot::Tombstone { .. } => None,
        }
    }

    /// The live record with this id.
    #[must_use]
    pub fn get(&self, dependency_id: &str) -> Option<&DependencyRecord> {
        let &pos = self.index.get(dependency_id)?;
        match &self.slots[pos] {
            Slot::Live { record, .. } => Some(record),
            Slot::Tombstone { .. } => None,
        }
    }

    /// When `dependency_id` was tombstoned, if it currently is.
    #[must_use]
    pub fn retired_at(&self, dependency_id: &str) -> Option<DateTime<Utc>> {
        let &pos = self.index.get(dependency_id)?;
        match &self.slots[pos] {
            Slot::Tombstone { retired_at, .. } => Some(*retired_at),
            Slot::Live { .. } => None,
        }
    }

    /// Store version at which `dependency_id` was last written or retired.
    #[must_use]
    pub fn revision(&self, dependency_id: &str) -> Option<u64> {
        let &pos = self.index.get(dependency_id)?;
        match &self.slots[pos] {
            Slot::Live { revision, .. } | Slot::Tombstone { revision, .. } => Some(*revision),
        }
    }

    /// Live records in declaration order.
    pub fn records(&self) -> impl Iterator<Item = &DependencyRecord> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Live { record, .. } => Some(record),
            Slot::Tombstone { .. } => None,
        })
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records().count()
    }

    /// Returns `true` if there are no live records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().next().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DependencySpec;

    fn record(id: &str, source: &str, target: &str) -> DependencyRecord {
        DependencyRecord::new(ItemId::new(source), DependencySpec::new(id, target, "done")).unwrap()
    }

    #[test]
    fn upsert_registers_both_items_and_bumps_version() {
        let mut store = DependencyStore::new();
        assert!(store.upsert(record("d1", "A", "B")).is_none());

        assert_eq!(store.version(), 1);
        assert!(store.items().contains(&ItemId::new("A")));
        assert!(store.items().contains(&ItemId::new("B")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn same_id_replaces_in_place() {
        let mut store = DependencyStore::new();
        store.upsert(record("d1", "A", "B"));
        store.upsert(record("d2", "C", "B"));

        let replaced = store.upsert(record("d1", "A", "C")).unwrap();
        assert_eq!(replaced.target_item_id().as_str(), "B");

        let ids: Vec<&str> = store.records().map(DependencyRecord::dependency_id).collect();
        assert_eq!(ids, vec!["d1", "d2"]);
        assert_eq!(store.get("d1").unwrap().target_item_id().as_str(), "C");
        assert_eq!(store.revision("d1"), Some(3));
    }

    #[test]
    fn retire_leaves_tombstone_and_keeps_items() {
        let mut store = DependencyStore::new();
        store.upsert(record("d1", "A", "B"));
        let now = Utc::now();

        let retired = store.retire("d1", now).unwrap();
        assert_eq!(retired.dependency_id(), "d1");
        assert!(store.get("d1").is_none());
        assert_eq!(store.retired_at("d1"), Some(now));
        assert!(store.is_empty());
        assert_eq!(store.items().len(), 2);
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn retiring_twice_is_a_no_op() {
        let mut store = DependencyStore::new();
        store.upsert(record("d1", "A", "B"));
        store.retire("d1", Utc::now());

        assert!(store.retire("d1", Utc::now()).is_none());
        assert!(store.retire("unknown", Utc::now()).is_none());
        assert_eq!(store.version(), 2);
    }

    #[test]
    fn tombstoned_id_can_be_revived() {
        let mut store = DependencyStore::new();
        store.upsert(record("d1", "A", "B"));
        store.retire("d1", Utc::now());

        assert!(store.upsert(record("d1", "A", "B")).is_none());
        assert!(store.get("d1").is_some());
        assert!(store.retired_at("d1").is_none());
    }

    #[test]
    fn register_item_only_bumps_version_when_new() {
        let mut store = DependencyStore::new();
        assert!(store.register_item(ItemId::new("X")));
        assert!(!store.register_item(ItemId::new("X")));
        assert_eq!(store.version(), 1);
    }
}
