//! Snapshot-aware collections
//!
//! Coordinators never see domain objects. A [`PersistentCollection`] exposes
//! the rows a collection maps to, now and at the last flush, and answers
//! which of them changed.

use crate::value::JdbcValue;

/// One row of a collection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectionEntry {
    /// Map key; list and array positions come from iteration order instead
    pub index: Option<JdbcValue>,
    /// Synthetic row id of an identifier bag
    pub identifier: Option<JdbcValue>,
    /// Element column values (the element entity's id for entity elements)
    pub element: Vec<JdbcValue>,
    /// Subclass id of an entity element; 0 for values and hierarchy roots
    pub subclass_id: usize,
}

impl CollectionEntry {
    /// Entry holding `element`
    #[must_use]
    pub fn new(element: impl IntoIterator<Item = JdbcValue>) -> Self {
        Self {
            index: None,
            identifier: None,
            element: element.into_iter().collect(),
            subclass_id: 0,
        }
    }

    /// Single-column element
    #[must_use]
    pub fn of(value: impl Into<JdbcValue>) -> Self {
        Self::new([value.into()])
    }

    #[must_use]
    pub fn keyed(mut self, index: impl Into<JdbcValue>) -> Self {
        self.index = Some(index.into());
        self
    }

    #[must_use]
    pub fn identified(mut self, identifier: impl Into<JdbcValue>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    #[must_use]
    pub fn subclass(mut self, subclass_id: usize) -> Self {
        self.subclass_id = subclass_id;
        self
    }
}

/// Change-tracking view of a collection
pub trait PersistentCollection {
    /// Current entries in iteration order
    fn entries(&self) -> Vec<CollectionEntry>;

    /// Whether the entry at `position` has no row yet
    fn needs_inserting(&self, entry: &CollectionEntry, position: usize) -> bool;

    /// Whether the row at `position` exists but holds different state
    fn needs_updating(&self, entry: &CollectionEntry, position: usize) -> bool;

    /// Rows that no longer exist, with the position they occupied
    fn deletes(&self) -> Vec<(usize, CollectionEntry)>;

    /// State of the row at `position` as of the snapshot
    fn snapshot_element(&self, entry: &CollectionEntry, position: usize) -> Option<CollectionEntry>;

    /// Whether an element was removed since the snapshot
    fn is_element_removed(&self) -> bool;
}

/// How rows of a [`SnapshotCollection`] are matched against the snapshot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollectionSemantics {
    /// Multiset; rows have no identity beyond their value
    Bag,
    /// Rows matched by synthetic identifier
    IdentifierBag,
    /// Unique values
    Set,
    /// Rows matched by position
    List,
    /// Rows matched by key
    Map,
}

/// In-memory [`PersistentCollection`] holding a snapshot and the current rows
///
/// ```
/// use quarry_mutation::{CollectionEntry, CollectionSemantics, PersistentCollection, SnapshotCollection};
///
/// let mut list = SnapshotCollection::new(
///     CollectionSemantics::List,
///     ["A", "B", "C"].map(CollectionEntry::of),
/// );
/// list.remove(1);
/// assert!(list.is_element_removed());
/// assert_eq!(list.deletes().len(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotCollection {
    semantics: CollectionSemantics,
    snapshot: Vec<CollectionEntry>,
    current: Vec<CollectionEntry>,
    element_removed: bool,
}

impl SnapshotCollection {
    /// A collection whose current state equals `snapshot`
    #[must_use]
    pub fn new(semantics: CollectionSemantics, snapshot: impl IntoIterator<Item = CollectionEntry>) -> Self {
        let snapshot: Vec<CollectionEntry> = snapshot.into_iter().collect();
        Self {
            semantics,
            current: snapshot.clone(),
            snapshot,
            element_removed: false,
        }
    }

    /// A newly created collection with no persisted rows
    #[must_use]
    pub fn created(semantics: CollectionSemantics, entries: impl IntoIterator<Item = CollectionEntry>) -> Self {
        Self {
            semantics,
            snapshot: Vec::new(),
            current: entries.into_iter().collect(),
            element_removed: false,
        }
    }

    #[must_use]
    pub fn semantics(&self) -> CollectionSemantics {
        self.semantics
    }

    #[must_use]
    pub fn current(&self) -> &[CollectionEntry] {
        &self.current
    }

    #[must_use]
    pub fn snapshot(&self) -> &[CollectionEntry] {
        &self.snapshot
    }

    /// Append an entry; sets ignore duplicates, maps replace the same key
    pub fn push(&mut self, entry: CollectionEntry) {
        match self.semantics {
            CollectionSemantics::Set if self.current.contains(&entry) => {}
            CollectionSemantics::Map => {
                match self.current.iter_mut().find(|e| e.index == entry.index) {
                    Some(existing) => *existing = entry,
                    None => self.current.push(entry),
                }
            }
            _ => self.current.push(entry),
        }
    }

    /// Remove the entry at `position`
    pub fn remove(&mut self, position: usize) -> Option<CollectionEntry> {
        if position >= self.current.len() {
            return None;
        }
        self.element_removed = true;
        Some(self.current.remove(position))
    }

    /// Remove every entry matching `predicate`
    pub fn remove_where(&mut self, mut predicate: impl FnMut(&CollectionEntry) -> bool) {
        let before = self.current.len();
        self.current.retain(|entry| !predicate(entry));
        if self.current.len() != before {
            self.element_removed = true;
        }
    }

    /// Replace the entry at `position`
    pub fn set(&mut self, position: usize, entry: CollectionEntry) -> Option<CollectionEntry> {
        let slot = self.current.get_mut(position)?;
        Some(std::mem::replace(slot, entry))
    }

    pub fn clear(&mut self) {
        if !self.current.is_empty() {
            self.element_removed = true;
        }
        self.current.clear();
    }

    /// Take the current state as the new snapshot, as after a flush
    pub fn post_flush(&mut self) {
        self.snapshot = self.current.clone();
        self.element_removed = false;
    }

    fn snapshot_by_index(&self, index: &Option<JdbcValue>) -> Option<&CollectionEntry> {
        self.snapshot.iter().find(|e| &e.index == index)
    }

    fn snapshot_by_identifier(&self, identifier: &Option<JdbcValue>) -> Option<&CollectionEntry> {
        self.snapshot.iter().find(|e| &e.identifier == identifier)
    }

    fn count(entries: &[CollectionEntry], element: &CollectionEntry) -> usize {
        entries.iter().filter(|e| e.element == element.element).count()
    }
}

impl PersistentCollection for SnapshotCollection {
    fn entries(&self) -> Vec<CollectionEntry> {
        self.current.clone()
    }

    fn needs_inserting(&self, entry: &CollectionEntry, position: usize) -> bool {
        match self.semantics {
            CollectionSemantics::List => position >= self.snapshot.len(),
            CollectionSemantics::Map => self.snapshot_by_index(&entry.index).is_none(),
            CollectionSemantics::IdentifierBag => self.snapshot_by_identifier(&entry.identifier).is_none(),
            CollectionSemantics::Set => !self.snapshot.iter().any(|e| e.element == entry.element),
            CollectionSemantics::Bag => {
                // the n-th occurrence of a value is new when the snapshot has fewer than n
                let occurrence = self
                    .current
                    .iter()
                    .take(position + 1)
                    .filter(|e| e.element == entry.element)
                    .count();
                occurrence > Self::count(&self.snapshot, entry)
            }
        }
    }

    fn needs_updating(&self, entry: &CollectionEntry, position: usize) -> bool {
        match self.semantics {
            CollectionSemantics::List => self
                .snapshot
                .get(position)
                .is_some_and(|old| old.element != entry.element),
            CollectionSemantics::Map => self
                .snapshot_by_index(&entry.index)
                .is_some_and(|old| old.element != entry.element),
            CollectionSemantics::IdentifierBag => self
                .snapshot_by_identifier(&entry.identifier)
                .is_some_and(|old| old.element != entry.element),
            CollectionSemantics::Set | CollectionSemantics::Bag => false,
        }
    }

    fn deletes(&self) -> Vec<(usize, CollectionEntry)> {
        let removed = |position: usize, old: &CollectionEntry| -> bool {
            match self.semantics {
                CollectionSemantics::List => position >= self.current.len(),
                CollectionSemantics::Map => !self.current.iter().any(|e| e.index == old.index),
                CollectionSemantics::IdentifierBag => {
                    !self.current.iter().any(|e| e.identifier == old.identifier)
                }
                CollectionSemantics::Set => !self.current.iter().any(|e| e.element == old.element),
                CollectionSemantics::Bag => {
                    let occurrence = self
                        .snapshot
                        .iter()
                        .take(position + 1)
                        .filter(|e| e.element == old.element)
                        .count();
                    occurrence > Self::count(&self.current, old)
                }
            }
        };
        self.snapshot
            .iter()
            .enumerate()
            .filter(|(position, old)| removed(*position, old))
            .map(|(position, old)| (position, old.clone()))
            .collect()
    }

    fn snapshot_element(&self, entry: &CollectionEntry, position: usize) -> Option<CollectionEntry> {
        match self.semantics {
            CollectionSemantics::List => self.snapshot.get(position).cloned(),
            CollectionSemantics::Map => self.snapshot_by_index(&entry.index).cloned(),
            CollectionSemantics::IdentifierBag => self.snapshot_by_identifier(&entry.identifier).cloned(),
            CollectionSemantics::Set | CollectionSemantics::Bag => self
                .snapshot
                .iter()
                .find(|e| e.element == entry.element)
                .cloned(),
        }
    }

    fn is_element_removed(&self) -> bool {
        self.element_removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(values: &[&str]) -> Vec<CollectionEntry> {
        values.iter().map(|v| CollectionEntry::of(*v)).collect()
    }

    #[test]
    fn test_list_removal_shifts_trailing_rows() {
        let mut list = SnapshotCollection::new(CollectionSemantics::List, letters(&["A", "B", "C"]));
        list.remove(1);

        let entries = list.entries();
        assert!(!list.needs_updating(&entries[0], 0));
        assert!(list.needs_updating(&entries[1], 1));
        assert_eq!(list.deletes(), vec![(2, CollectionEntry::of("C"))]);
        assert_eq!(list.snapshot_element(&entries[1], 1), Some(CollectionEntry::of("B")));
    }

    #[test]
    fn test_list_append_needs_inserting() {
        let mut list = SnapshotCollection::new(CollectionSemantics::List, letters(&["A"]));
        list.push(CollectionEntry::of("B"));
        let entries = list.entries();
        assert!(!list.needs_inserting(&entries[0], 0));
        assert!(list.needs_inserting(&entries[1], 1));
        assert!(!list.is_element_removed());
    }

    #[test]
    fn test_set_semantics() {
        let mut set = SnapshotCollection::new(CollectionSemantics::Set, letters(&["red", "blue"]));
        set.remove_where(|e| e.element == vec![JdbcValue::from("red")]);
        set.push(CollectionEntry::of("green"));
        set.push(CollectionEntry::of("green"));

        let entries = set.entries();
        assert_eq!(entries.len(), 2);
        assert!(set.needs_inserting(&entries[1], 1));
        assert!(!set.needs_updating(&entries[1], 1));
        assert_eq!(set.deletes(), vec![(0, CollectionEntry::of("red"))]);
    }

    #[test]
    fn test_map_semantics() {
        let mut map = SnapshotCollection::new(
            CollectionSemantics::Map,
            [
                CollectionEntry::of("home").keyed("h"),
                CollectionEntry::of("work").keyed("w"),
            ],
        );
        map.push(CollectionEntry::of("office").keyed("w"));
        map.remove_where(|e| e.index == Some("h".into()));

        let entries = map.entries();
        assert!(map.needs_updating(&entries[0], 0));
        assert_eq!(map.deletes().len(), 1);
    }

    #[test]
    fn test_bag_counts_duplicates() {
        let mut bag = SnapshotCollection::new(CollectionSemantics::Bag, letters(&["x", "x"]));
        bag.push(CollectionEntry::of("x"));
        let entries = bag.entries();
        assert!(!bag.needs_inserting(&entries[1], 1));
        assert!(bag.needs_inserting(&entries[2], 2));

        bag.post_flush();
        bag.remove(0);
        assert_eq!(bag.deletes().len(), 1);
    }
}
