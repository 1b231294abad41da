//! Resource storage abstraction.
//!
//! The pipeline's default actions are the only code that touches the
//! store. The contract is deliberately narrow: insertion-ordered listing,
//! lookup, append, remove. Implementations must allow concurrent reads
//! and serialize writes so that identifier assignment stays race-free.

use parking_lot::RwLock;

/// Storage for resource records.
pub trait ResourceStore<R>: Send + Sync {
    /// Returns all records in insertion order.
    fn list(&self) -> Vec<R>;

    /// Returns the record with the given store identifier, if present.
    fn find_by_id(&self, id: &str) -> Option<R>;

    /// Returns the first record matching the predicate, in insertion
    /// order.
    fn find(&self, predicate: &dyn Fn(&R) -> bool) -> Option<R>;

    /// Appends a record.
    fn add(&self, record: R);

    /// Removes the given record, returning whether it was present.
    fn remove(&self, record: &R) -> bool;
}

/// Trait for records addressable by a store identifier.
pub trait Identified {
    /// Returns the store identifier.
    fn id(&self) -> &str;
}

/// An in-memory store backed by a single `RwLock<Vec<_>>`.
///
/// The write lock is the transactional boundary: create/delete serialize
/// behind it, reads run concurrently. Throughput is not the point here;
/// this is the trivial implementation for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryStore<R> {
    records: RwLock<Vec<R>>,
}

impl<R> InMemoryStore<R> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }

    /// Returns the number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl<R> ResourceStore<R> for InMemoryStore<R>
where
    R: Clone + PartialEq + Identified + Send + Sync,
{
    fn list(&self) -> Vec<R> {
        self.records.read().clone()
    }

    fn find_by_id(&self, id: &str) -> Option<R> {
        self.records.read().iter().find(|r| r.id() == id).cloned()
    }

    fn find(&self, predicate: &dyn Fn(&R) -> bool) -> Option<R> {
        self.records.read().iter().find(|r| predicate(r)).cloned()
    }

    fn add(&self, record: R) {
        self.records.write().push(record);
    }

    fn remove(&self, record: &R) -> bool {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r != record);
        records.len() < before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Record {
        id: String,
        payload: String,
    }

    impl Identified for Record {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn record(id: &str, payload: &str) -> Record {
        Record {
            id: id.into(),
            payload: payload.into(),
        }
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = InMemoryStore::new();
        store.add(record("1", "a"));
        store.add(record("2", "b"));
        store.add(record("3", "c"));

        let ids: Vec<String> = store.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }

    #[test]
    fn find_by_id_hits_and_misses() {
        let store = InMemoryStore::new();
        store.add(record("1", "a"));

        assert!(store.find_by_id("1").is_some());
        assert!(store.find_by_id("2").is_none());
    }

    #[test]
    fn remove_takes_exactly_the_given_record() {
        let store = InMemoryStore::new();
        let first = record("1", "a");
        let second = record("2", "b");
        store.add(first.clone());
        store.add(second);

        assert!(store.remove(&first));
        assert!(!store.remove(&first));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn find_uses_insertion_order() {
        let store = InMemoryStore::new();
        store.add(record("1", "same"));
        store.add(record("2", "same"));

        let hit = store.find(&|r: &Record| r.payload == "same").unwrap();
        assert_eq!(hit.id, "1");
    }
}
