//! A single shard of the store
//!
//! Each shard owns an independent `RwLock`-guarded map so operations on
//! distinct shards never contend.

use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::value::Value;

/// Outcome of attempting to tick a pending expiration record against
/// the shard's current contents.
pub enum TickOutcome {
    /// The value ticked but has not expired yet; keep the record pending.
    Pending,
    /// The value ticked down to zero and was removed.
    Removed,
    /// The key is gone or bound to a different value now; nothing to do.
    Stale,
}

/// One partition of the keyspace.
pub struct Shard {
    entries: RwLock<HashMap<String, Arc<Value>>>,
}

impl Shard {
    pub fn with_capacity_hint(hint: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::with_capacity(hint)),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        self.entries.read().get(key).cloned()
    }

    /// Installs `value` under `key`, overwriting any prior entry.
    /// Returns the value that is now live (so the caller can register
    /// an expiration record against the exact instance installed).
    pub fn put(&self, key: String, value: Arc<Value>) -> Arc<Value> {
        let mut entries = self.entries.write();
        entries.insert(key, Arc::clone(&value));
        value
    }

    /// Removes `key`, if present. Idempotent.
    pub fn remove(&self, key: &str) {
        self.entries.write().remove(key);
    }

    /// Copies every key for which `pred` holds. Not a point-in-time
    /// snapshot across the whole store, but each individual key test is
    /// atomic with respect to concurrent writers.
    pub fn scan_matching(&self, mut pred: impl FnMut(&str) -> bool) -> Vec<String> {
        self.entries
            .read()
            .keys()
            .filter(|k| pred(k))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Iterates over a consistent-at-a-moment copy of (key, value)
    /// pairs, used by the snapshot writer.
    pub fn snapshot_entries(&self) -> Vec<(String, Arc<Value>)> {
        self.entries
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    /// Called by the expiration engine for a pending record. Verifies
    /// that `key` is still bound to the exact `Value` instance the
    /// record was raised for (via pointer identity on the upgraded
    /// `Weak`), ticks it, and removes it from the map if it has expired.
    pub fn tick_if_matching(&self, key: &str, expected: &Weak<Value>) -> TickOutcome {
        let Some(expected) = expected.upgrade() else {
            return TickOutcome::Stale;
        };

        // Ticking the value itself needs no lock (remaining TTL is an
        // atomic field); only removal needs exclusive access.
        let current = self.entries.read().get(key).cloned();
        match current {
            Some(current) if Arc::ptr_eq(&current, &expected) => {
                if current.tick() {
                    let mut entries = self.entries.write();
                    // Re-check under the write lock: another writer may
                    // have overwritten the key between the read above
                    // and taking the write lock.
                    if let Some(still) = entries.get(key) {
                        if Arc::ptr_eq(still, &expected) {
                            entries.remove(key);
                            return TickOutcome::Removed;
                        }
                    }
                    TickOutcome::Stale
                } else {
                    TickOutcome::Pending
                }
            }
            _ => TickOutcome::Stale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_get_remove_roundtrip() {
        let shard = Shard::with_capacity_hint(8);
        let value = Arc::new(Value::new(json!("ok"), None).unwrap());
        shard.put("k".into(), value);
        assert!(shard.get("k").is_some());
        shard.remove("k");
        assert!(shard.get("k").is_none());
    }

    #[test]
    fn overwrite_replaces_prior_instance() {
        let shard = Shard::with_capacity_hint(8);
        let v1 = Arc::new(Value::new(json!("one"), Some(5)).unwrap());
        let weak1 = Arc::downgrade(&v1);
        shard.put("k".into(), v1);

        let v2 = Arc::new(Value::new(json!("two"), None).unwrap());
        shard.put("k".into(), v2);

        // A tick against the stale weak handle must not remove the key.
        matches!(shard.tick_if_matching("k", &weak1), TickOutcome::Stale);
        assert_eq!(shard.get("k").unwrap().payload(), &json!("two"));
    }

    #[test]
    fn tick_removes_on_expiry() {
        let shard = Shard::with_capacity_hint(8);
        let value = Arc::new(Value::new(json!("x"), Some(1)).unwrap());
        let weak = Arc::downgrade(&value);
        shard.put("k".into(), value);

        assert!(matches!(
            shard.tick_if_matching("k", &weak),
            TickOutcome::Removed
        ));
        assert!(shard.get("k").is_none());
    }

    #[test]
    fn scan_matching_filters_keys() {
        let shard = Shard::with_capacity_hint(8);
        for k in ["TestKeys", "other"] {
            shard.put(k.into(), Arc::new(Value::new(json!("v"), None).unwrap()));
        }
        let matched = shard.scan_matching(|k| k.starts_with("Test"));
        assert_eq!(matched, vec!["TestKeys".to_string()]);
    }
}
