//! Per-connection delta cache: the last full set of field values seen for
//! each `(packet_type, key tuple)`.

use crate::value::FieldValue;
use std::collections::HashMap;

/// A cache key: the packet type plus the ordered values of its key fields.
/// Two packets of the same type with different key values (e.g. different
/// unit IDs) are cached independently.
pub type CacheKey = (u16, Vec<FieldValue>);

/// Holds the last fully-assembled field map for every `(packet_type, keys)`
/// pair seen on a connection. A fresh cache is created per connection: the
/// server always resends full packets to a newly joined client, so there is
/// no cross-connection reuse.
#[derive(Debug, Default)]
pub struct DeltaCache {
    entries: HashMap<CacheKey, HashMap<String, FieldValue>>,
}

impl DeltaCache {
    /// An empty cache, as at the start of a connection.
    pub fn new() -> Self {
        DeltaCache { entries: HashMap::new() }
    }

    /// The cached field map for a key, if a baseline has been recorded.
    pub fn get(&self, packet_type: u16, keys: &[FieldValue]) -> Option<&HashMap<String, FieldValue>> {
        self.entries.get(&(packet_type, keys.to_vec()))
    }

    /// Record or replace the full field map for a key. Called after every
    /// successful delta decode, with the *assembled* (not just the
    /// transmitted) fields, so that later partial updates have a complete
    /// baseline to fall back on.
    pub fn update(&mut self, packet_type: u16, keys: Vec<FieldValue>, fields: HashMap<String, FieldValue>) {
        self.entries.insert((packet_type, keys), fields);
    }

    /// Drop every cached entry for one packet type, e.g. on a ruleset
    /// reload where the server is known to restart delta state.
    pub fn clear_packet_type(&mut self, packet_type: u16) {
        self.entries.retain(|(t, _), _| *t != packet_type);
    }

    /// Drop the entire cache, e.g. at the start of a new connection.
    pub fn clear_all(&mut self) {
        self.entries.clear();
    }

    /// Number of distinct `(packet_type, keys)` baselines currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no baselines at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, FieldValue)]) -> HashMap<String, FieldValue> {
        pairs.iter().cloned().map(|(k, v)| (k.to_string(), v)).collect()
    }

    #[test]
    fn distinct_keys_cache_independently() {
        let mut cache = DeltaCache::new();
        cache.update(148, vec![FieldValue::U16(1)], fields(&[("adjective", FieldValue::Str("Roman".into()))]));
        cache.update(148, vec![FieldValue::U16(2)], fields(&[("adjective", FieldValue::Str("Greek".into()))]));

        let roman = cache.get(148, &[FieldValue::U16(1)]).unwrap();
        assert_eq!(roman.get("adjective"), Some(&FieldValue::Str("Roman".into())));
        let greek = cache.get(148, &[FieldValue::U16(2)]).unwrap();
        assert_eq!(greek.get("adjective"), Some(&FieldValue::Str("Greek".into())));
    }

    #[test]
    fn update_replaces_baseline() {
        let mut cache = DeltaCache::new();
        cache.update(16, vec![], fields(&[("global_advance_count", FieldValue::U16(1))]));
        cache.update(16, vec![], fields(&[("global_advance_count", FieldValue::U16(2))]));
        let current = cache.get(16, &[]).unwrap();
        assert_eq!(current.get("global_advance_count"), Some(&FieldValue::U16(2)));
    }

    #[test]
    fn clear_packet_type_only_affects_that_type() {
        let mut cache = DeltaCache::new();
        cache.update(16, vec![], fields(&[]));
        cache.update(155, vec![], fields(&[]));
        cache.clear_packet_type(16);
        assert!(cache.get(16, &[]).is_none());
        assert!(cache.get(155, &[]).is_some());
    }

    #[test]
    fn clear_all_empties_cache() {
        let mut cache = DeltaCache::new();
        cache.update(16, vec![], fields(&[]));
        cache.clear_all();
        assert!(cache.is_empty());
    }
}
