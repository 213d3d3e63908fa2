//! The ordered collection of live tasks.

use crate::common::TaskId;
use slotmap::SlotMap;

/// What a visitor wants done with the element it was just shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Keep,
    Remove,
}

/// An insertion-ordered registry with stable, never-reused keys.
///
/// Storage lives in a `SlotMap` so that handles stay valid while other entries
/// come and go; a separate key list records insertion order, which defines
/// both the tick evaluation order and the async tie-break order.
pub struct TaskRegistry<T> {
    entries: SlotMap<TaskId, T>,
    order: Vec<TaskId>,
}

impl<T> Default for TaskRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TaskRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            order: Vec::new(),
        }
    }

    /// Appends an entry to the end of the registry and returns its key.
    pub fn add(&mut self, entry: T) -> TaskId {
        let id = self.entries.insert(entry);
        self.order.push(id);
        id
    }

    /// Appends an entry and hands back a mutable reference to it.
    pub fn add_mut(&mut self, entry: T) -> (TaskId, &mut T) {
        let id = self.add(entry);
        (id, &mut self.entries[id])
    }

    /// Removes a single entry by key.
    pub fn remove(&mut self, id: TaskId) -> Option<T> {
        let entry = self.entries.remove(id)?;
        self.order.retain(|key| *key != id);
        Some(entry)
    }

    pub fn get(&self, id: TaskId) -> Option<&T> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut T> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Visits every entry in order, letting the visitor remove the current one.
    ///
    /// After a removal at position `i` the next entry visited is the one that
    /// slid into position `i`, so no neighbour is skipped or visited twice.
    /// Removed entries are dropped before the next visit.
    pub fn for_each_removable(&mut self, mut visit: impl FnMut(TaskId, &mut T) -> Visit) {
        let mut index = 0;
        while index < self.order.len() {
            let id = self.order[index];
            let Some(entry) = self.entries.get_mut(id) else {
                self.order.remove(index);
                continue;
            };
            match visit(id, entry) {
                Visit::Keep => index += 1,
                Visit::Remove => {
                    self.order.remove(index);
                    self.entries.remove(id);
                }
            }
        }
    }

    /// Removes and returns the first entry, in insertion order, that satisfies
    /// `predicate`. Later matches are left in place.
    pub fn remove_first_matching(
        &mut self,
        mut predicate: impl FnMut(&T) -> bool,
    ) -> Option<(TaskId, T)> {
        let position = self
            .order
            .iter()
            .position(|id| self.entries.get(*id).is_some_and(&mut predicate))?;
        let id = self.order.remove(position);
        self.entries.remove(id).map(|entry| (id, entry))
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &T)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(*id).map(|entry| (*id, entry)))
    }

    /// Empties the registry, handing back every entry in insertion order.
    pub fn drain(&mut self) -> Vec<(TaskId, T)> {
        let order = std::mem::take(&mut self.order);
        let drained = order
            .into_iter()
            .filter_map(|id| self.entries.remove(id).map(|entry| (id, entry)))
            .collect();
        self.entries.clear();
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_of(names: &[&'static str]) -> TaskRegistry<&'static str> {
        let mut registry = TaskRegistry::new();
        for name in names {
            registry.add(*name);
        }
        registry
    }

    #[test]
    fn removal_during_scan_neither_skips_nor_repeats() {
        let mut registry = registry_of(&["t1", "t2", "t3", "t4", "t5"]);
        let mut visited = Vec::new();

        registry.for_each_removable(|_, name| {
            visited.push(*name);
            if *name == "t2" || *name == "t4" {
                Visit::Remove
            } else {
                Visit::Keep
            }
        });

        assert_eq!(visited, vec!["t1", "t2", "t3", "t4", "t5"]);
        let remaining: Vec<_> = registry.iter().map(|(_, name)| *name).collect();
        assert_eq!(remaining, vec!["t1", "t3", "t5"]);
    }

    #[test]
    fn removing_consecutive_entries() {
        let mut registry = registry_of(&["a", "b", "c", "d"]);
        let mut visited = Vec::new();
        registry.for_each_removable(|_, name| {
            visited.push(*name);
            if *name == "d" {
                Visit::Keep
            } else {
                Visit::Remove
            }
        });
        assert_eq!(visited, vec!["a", "b", "c", "d"]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_first_matching_stops_at_first() {
        let mut registry = registry_of(&["x", "dup", "y", "dup"]);
        let (first_id, removed) = registry.remove_first_matching(|name| *name == "dup").unwrap();
        assert_eq!(removed, "dup");
        assert!(!registry.contains(first_id));

        let remaining: Vec<_> = registry.iter().map(|(_, name)| *name).collect();
        assert_eq!(remaining, vec!["x", "y", "dup"]);

        assert!(registry.remove_first_matching(|name| *name == "dup").is_some());
        assert!(registry.remove_first_matching(|name| *name == "dup").is_none());
    }

    #[test]
    fn duplicates_get_distinct_keys() {
        let mut registry = TaskRegistry::new();
        let a = registry.add(7);
        let b = registry.add(7);
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn remove_by_key_keeps_order_of_the_rest() {
        let mut registry = TaskRegistry::new();
        let a = registry.add("a");
        let b = registry.add("b");
        registry.add("c");
        assert_eq!(registry.remove(b), Some("b"));
        assert_eq!(registry.remove(b), None);
        let remaining: Vec<_> = registry.iter().map(|(_, name)| *name).collect();
        assert_eq!(remaining, vec!["a", "c"]);
        assert!(registry.contains(a));
    }

    #[test]
    fn drain_preserves_order_and_empties() {
        let mut registry = registry_of(&["one", "two", "three"]);
        let drained: Vec<_> = registry.drain().into_iter().map(|(_, name)| name).collect();
        assert_eq!(drained, vec!["one", "two", "three"]);
        assert!(registry.is_empty());
    }
}
