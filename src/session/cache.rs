//! Bounded cache of fully decoded messages.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::model::mail::ParsedMessage;

/// Default number of decoded messages kept per session.
pub const DEFAULT_DETAIL_CACHE_SIZE: usize = 50;

/// Decoded messages keyed by ordinal, evicted in insertion order.
///
/// Backed by `LruCache`, whose linked list doubles as the eviction queue.
/// Lookups use `peek`, which never reorders, so the tail of the list is
/// always the oldest insertion.
pub struct DetailCache {
    entries: LruCache<usize, Arc<ParsedMessage>>,
}

impl DetailCache {
    /// Create a cache holding at most `capacity` messages (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Cached message for `ordinal`, without touching eviction order.
    pub fn get(&self, ordinal: usize) -> Option<Arc<ParsedMessage>> {
        self.entries.peek(&ordinal).cloned()
    }

    /// Insert a decoded message, returning the ordinal evicted to make room.
    ///
    /// Re-inserting a cached ordinal replaces its value and counts as a
    /// fresh insertion.
    pub fn insert(&mut self, ordinal: usize, message: Arc<ParsedMessage>) -> Option<usize> {
        match self.entries.push(ordinal, message) {
            Some((evicted, _)) if evicted != ordinal => Some(evicted),
            _ => None,
        }
    }

    pub fn contains(&self, ordinal: usize) -> bool {
        self.entries.contains(&ordinal)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(subject: &str) -> Arc<ParsedMessage> {
        Arc::new(ParsedMessage {
            subject: Some(subject.to_string()),
            ..ParsedMessage::default()
        })
    }

    #[test]
    fn test_evicts_oldest_insertion() {
        let mut cache = DetailCache::new(2);
        assert_eq!(cache.insert(1, msg("a")), None);
        assert_eq!(cache.insert(2, msg("b")), None);
        assert_eq!(cache.insert(3, msg("c")), Some(1));
        assert!(!cache.contains(1));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_lookup_does_not_refresh() {
        let mut cache = DetailCache::new(2);
        cache.insert(1, msg("a"));
        cache.insert(2, msg("b"));
        assert!(cache.get(1).is_some());
        assert_eq!(cache.insert(3, msg("c")), Some(1));
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn test_reinsert_replaces_value() {
        let mut cache = DetailCache::new(2);
        cache.insert(1, msg("old"));
        assert_eq!(cache.insert(1, msg("new")), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(1).unwrap().subject.as_deref(), Some("new"));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut cache = DetailCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert(1, msg("a"));
        assert_eq!(cache.insert(2, msg("b")), Some(1));
        assert!(!cache.is_empty());
    }
}
