//! Ordered, id-unique record collection

use super::entity::SyncEntity;

/// Why a lifecycle event left the collection untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOp {
    /// Created for an id that is already present
    Duplicate,
    /// Updated or deleted for an id that is not present
    UnknownId,
}

/// Effect of applying one lifecycle event
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T> {
    Inserted,
    Replaced { previous: T },
    Removed { removed: T },
    Ignored(NoOp),
}

impl<T> Change<T> {
    /// Whether the collection changed
    pub fn is_effective(&self) -> bool {
        !matches!(self, Change::Ignored(_))
    }
}

/// Records ordered newest first, unique by id
#[derive(Debug, Clone)]
pub struct EntityCollection<T> {
    records: Vec<T>,
}

impl<T> Default for EntityCollection<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
        }
    }
}

impl<T: SyncEntity> EntityCollection<T> {
    /// Build from a snapshot, keeping its order and the first of any
    /// repeated ids
    pub fn from_snapshot(records: Vec<T>) -> Self {
        let mut collection = Self::default();
        collection.replace_all(records);
        collection
    }

    pub fn replace_all(&mut self, records: Vec<T>) {
        let mut seen = std::collections::HashSet::with_capacity(records.len());
        self.records = records
            .into_iter()
            .filter(|record| seen.insert(record.id().to_string()))
            .collect();
    }

    pub fn apply_created(&mut self, record: T) -> Change<T> {
        if self.position(record.id()).is_some() {
            return Change::Ignored(NoOp::Duplicate);
        }
        self.records.insert(0, record);
        Change::Inserted
    }

    /// Replace in place, keeping the record's position
    pub fn apply_updated(&mut self, record: T) -> Change<T> {
        match self.position(record.id()) {
            Some(index) => {
                let previous = std::mem::replace(&mut self.records[index], record);
                Change::Replaced { previous }
            }
            None => Change::Ignored(NoOp::UnknownId),
        }
    }

    pub fn apply_deleted(&mut self, id: &str) -> Change<T> {
        match self.position(id) {
            Some(index) => Change::Removed {
                removed: self.records.remove(index),
            },
            None => Change::Ignored(NoOp::UnknownId),
        }
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn records(&self) -> &[T] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|record| record.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Invoice, RecordStatus};
    use rust_decimal::Decimal;

    fn invoice(id: &str) -> Invoice {
        Invoice::new(id, format!("INV-{id}"), Decimal::new(100, 0))
    }

    fn ids(collection: &EntityCollection<Invoice>) -> Vec<&str> {
        collection.records().iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn test_created_prepends_and_rejects_duplicates() {
        let mut collection = EntityCollection::from_snapshot(vec![invoice("i1")]);
        assert_eq!(collection.apply_created(invoice("i2")), Change::Inserted);
        assert_eq!(
            collection.apply_created(invoice("i2")),
            Change::Ignored(NoOp::Duplicate)
        );
        assert_eq!(ids(&collection), vec!["i2", "i1"]);
    }

    #[test]
    fn test_updated_keeps_position() {
        let mut collection =
            EntityCollection::from_snapshot(vec![invoice("i3"), invoice("i2"), invoice("i1")]);
        let change = collection.apply_updated(invoice("i2").with_status(RecordStatus::Paid));

        assert!(matches!(change, Change::Replaced { ref previous } if previous.status == RecordStatus::Pending));
        assert_eq!(ids(&collection), vec!["i3", "i2", "i1"]);
        assert_eq!(collection.get("i2").unwrap().status, RecordStatus::Paid);
    }

    #[test]
    fn test_update_without_match_is_dropped() {
        let mut collection = EntityCollection::from_snapshot(vec![invoice("i1")]);
        assert_eq!(
            collection.apply_updated(invoice("zz")),
            Change::Ignored(NoOp::UnknownId)
        );
        assert_eq!(ids(&collection), vec!["i1"]);
    }

    #[test]
    fn test_delete_twice() {
        let mut collection = EntityCollection::from_snapshot(vec![invoice("i2"), invoice("i1")]);
        assert!(collection.apply_deleted("i2").is_effective());
        assert_eq!(
            collection.apply_deleted("i2"),
            Change::Ignored(NoOp::UnknownId)
        );
        assert_eq!(ids(&collection), vec!["i1"]);
    }

    #[test]
    fn test_snapshot_drops_repeated_ids() {
        let collection =
            EntityCollection::from_snapshot(vec![invoice("i1"), invoice("i2"), invoice("i1")]);
        assert_eq!(ids(&collection), vec!["i1", "i2"]);
    }
}
