//! C1: Sequence Index.
//!
//! Maps `(topic, producer)` to the highest contiguously-delivered sequence
//! number. Owned by a single task; never accessed concurrently, so a plain
//! `HashMap` (not `DashMap`) is the right tool here.

use std::collections::HashMap;

use dafka_proto::SequenceKey;

use crate::error::SequenceIndexError;

/// The highest sequence number for which every sequence `1..=value` has been
/// delivered, per `(topic, producer)` pair. Entries are inserted on first
/// observation and never evicted.
#[derive(Debug, Default)]
pub struct SequenceIndex {
    highest_delivered: HashMap<SequenceKey, u64>,
}

impl SequenceIndex {
    pub fn new() -> Self {
        SequenceIndex::default()
    }

    /// The highest contiguously-delivered sequence for `key`, if known.
    pub fn lookup(&self, key: &SequenceKey) -> Option<u64> {
        self.highest_delivered.get(key).copied()
    }

    /// Insert a new key. Fails if the key is already present.
    pub fn insert(&mut self, key: SequenceKey, value: u64) -> Result<(), SequenceIndexError> {
        if self.highest_delivered.contains_key(&key) {
            return Err(SequenceIndexError::AlreadyPresent(key));
        }
        self.highest_delivered.insert(key, value);
        Ok(())
    }

    /// Advance an existing key to `value`. Fails if the key is absent or if
    /// `value` would regress the stored high-water mark.
    pub fn update(&mut self, key: SequenceKey, value: u64) -> Result<(), SequenceIndexError> {
        let current = self
            .highest_delivered
            .get(&key)
            .copied()
            .ok_or_else(|| SequenceIndexError::Absent(key.clone()))?;
        if value < current {
            return Err(SequenceIndexError::Regression {
                key,
                current,
                attempted: value,
            });
        }
        self.highest_delivered.insert(key, value);
        Ok(())
    }

    /// Record a successful delivery at `value`: inserts if `key` has never
    /// been seen, otherwise advances it like [`SequenceIndex::update`].
    ///
    /// This is the one upsert in an otherwise insert-xor-update API, needed
    /// because an earliest-mode stream's first delivered sequence reaches the
    /// index with no prior bootstrap entry to update.
    pub fn record_delivery(&mut self, key: SequenceKey, value: u64) -> Result<(), SequenceIndexError> {
        if self.highest_delivered.contains_key(&key) {
            self.update(key, value)
        } else {
            self.insert(key, value)
        }
    }

    /// Number of distinct `(topic, producer)` pairs observed so far.
    pub fn len(&self) -> usize {
        self.highest_delivered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highest_delivered.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(topic: &str, producer: &str) -> SequenceKey {
        SequenceKey::new(topic, producer)
    }

    #[test]
    fn lookup_is_none_for_unknown_key() {
        let idx = SequenceIndex::new();
        assert_eq!(idx.lookup(&key("t", "p")), None);
    }

    #[test]
    fn insert_then_lookup_round_trips() {
        let mut idx = SequenceIndex::new();
        idx.insert(key("t", "p"), 5).unwrap();
        assert_eq!(idx.lookup(&key("t", "p")), Some(5));
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn insert_twice_fails() {
        let mut idx = SequenceIndex::new();
        idx.insert(key("t", "p"), 5).unwrap();
        let err = idx.insert(key("t", "p"), 6).unwrap_err();
        assert_eq!(err, SequenceIndexError::AlreadyPresent(key("t", "p")));
        // first value is untouched
        assert_eq!(idx.lookup(&key("t", "p")), Some(5));
    }

    #[test]
    fn update_absent_key_fails() {
        let mut idx = SequenceIndex::new();
        let err = idx.update(key("t", "p"), 1).unwrap_err();
        assert_eq!(err, SequenceIndexError::Absent(key("t", "p")));
    }

    #[test]
    fn update_advances_monotonically() {
        let mut idx = SequenceIndex::new();
        idx.insert(key("t", "p"), 1).unwrap();
        idx.update(key("t", "p"), 2).unwrap();
        idx.update(key("t", "p"), 2).unwrap(); // equal is fine, not a regression
        assert_eq!(idx.lookup(&key("t", "p")), Some(2));
    }

    #[test]
    fn update_rejects_regression() {
        let mut idx = SequenceIndex::new();
        idx.insert(key("t", "p"), 5).unwrap();
        let err = idx.update(key("t", "p"), 4).unwrap_err();
        assert_eq!(
            err,
            SequenceIndexError::Regression {
                key: key("t", "p"),
                current: 5,
                attempted: 4,
            }
        );
    }

    #[test]
    fn record_delivery_inserts_when_absent_and_updates_when_present() {
        let mut idx = SequenceIndex::new();
        idx.record_delivery(key("t", "p"), 1).unwrap();
        assert_eq!(idx.lookup(&key("t", "p")), Some(1));
        idx.record_delivery(key("t", "p"), 2).unwrap();
        assert_eq!(idx.lookup(&key("t", "p")), Some(2));
    }

    #[test]
    fn distinct_producers_on_same_topic_are_independent_keys() {
        let mut idx = SequenceIndex::new();
        idx.insert(key("t", "p1"), 10).unwrap();
        idx.insert(key("t", "p2"), 20).unwrap();
        assert_eq!(idx.lookup(&key("t", "p1")), Some(10));
        assert_eq!(idx.lookup(&key("t", "p2")), Some(20));
    }
}
