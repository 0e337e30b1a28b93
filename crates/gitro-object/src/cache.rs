//! Process-lifetime cache for raw objects.

use std::collections::HashMap;

use gitro_hash::ObjectId;

use crate::RawObject;

/// Unbounded memoization of fingerprint → raw object.
///
/// Objects are content-addressed, so entries never change once inserted;
/// the cache grows for the life of the owning database and is never
/// evicted.
#[derive(Debug, Default)]
pub struct RawObjectCache {
    map: HashMap<ObjectId, RawObject>,
}

impl RawObjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a cached raw object.
    pub fn get(&self, oid: &ObjectId) -> Option<&RawObject> {
        self.map.get(oid)
    }

    /// Insert a raw object. An existing entry is left untouched.
    pub fn insert(&mut self, oid: ObjectId, raw: RawObject) {
        self.map.entry(oid).or_insert(raw);
    }

    /// Check if an OID is cached.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.map.contains_key(oid)
    }

    /// Current number of cached objects.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ObjectType;

    fn make_raw(n: u8) -> (ObjectId, RawObject) {
        let mut bytes = [0u8; 20];
        bytes[0] = n;
        let oid = ObjectId::from_bytes(&bytes).unwrap();
        (oid, RawObject::new(ObjectType::Blob, vec![n]))
    }

    #[test]
    fn insert_and_get() {
        let mut cache = RawObjectCache::new();
        let (oid, raw) = make_raw(1);
        cache.insert(oid, raw.clone());
        assert_eq!(cache.get(&oid), Some(&raw));
        assert!(cache.contains(&oid));
    }

    #[test]
    fn cache_miss() {
        let cache = RawObjectCache::new();
        let (oid, _) = make_raw(1);
        assert_eq!(cache.get(&oid), None);
    }

    #[test]
    fn entries_are_immutable_once_inserted() {
        let mut cache = RawObjectCache::new();
        let (oid, first) = make_raw(1);
        cache.insert(oid, first.clone());
        cache.insert(oid, RawObject::new(ObjectType::Blob, vec![99]));
        assert_eq!(cache.get(&oid), Some(&first));
    }

    #[test]
    fn no_eviction() {
        let mut cache = RawObjectCache::new();
        for n in 0..=255u8 {
            let (oid, raw) = make_raw(n);
            cache.insert(oid, raw);
        }
        assert_eq!(cache.len(), 256);
        assert!(!cache.is_empty());
        for n in 0..=255u8 {
            let (oid, _) = make_raw(n);
            assert!(cache.contains(&oid));
        }
    }
}
