//! Cache entry type
//!
//! A `Value` is a typed payload (string, sequence, or mapping) plus an
//! optional remaining TTL, counted in reaper ticks rather than
//! wall-clock time.

use std::sync::atomic::{AtomicI64, Ordering};

use serde::Serialize;
use serde_json::Value as Json;

use crate::error::{Result, StoreError};

/// The shape a stored payload was classified as at insert time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Sequence,
    Mapping,
}

impl ValueKind {
    /// Numeric tag used by the snapshot codec.
    pub fn tag(self) -> u8 {
        match self {
            ValueKind::String => 0,
            ValueKind::Sequence => 1,
            ValueKind::Mapping => 2,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(ValueKind::String),
            1 => Some(ValueKind::Sequence),
            2 => Some(ValueKind::Mapping),
            _ => None,
        }
    }
}

/// No-expiration sentinel, distinguished from `Some(0)`.
const NO_EXPIRY: i64 = -1;

/// A single cache entry.
///
/// Remaining TTL is stored as an atomic so the reaper can decrement it
/// without taking the owning shard's write lock.
#[derive(Debug)]
pub struct Value {
    kind: ValueKind,
    payload: Json,
    remaining_ttl: AtomicI64,
}

impl Value {
    /// Builds a new entry, classifying `payload` into a `ValueKind`.
    ///
    /// Fails with `UnknownDataType` if `payload` is not a JSON string,
    /// array, or object, and with `NegativeTtl` if `ttl` is negative.
    pub fn new(payload: Json, ttl: Option<i64>) -> Result<Self> {
        let kind = match &payload {
            Json::String(_) => ValueKind::String,
            Json::Array(_) => ValueKind::Sequence,
            Json::Object(_) => ValueKind::Mapping,
            _ => return Err(StoreError::UnknownDataType),
        };

        let remaining_ttl = match ttl {
            Some(t) if t < 0 => return Err(StoreError::NegativeTtl),
            Some(t) => t,
            None => NO_EXPIRY,
        };

        Ok(Self {
            kind,
            payload,
            remaining_ttl: AtomicI64::new(remaining_ttl),
        })
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn payload(&self) -> &Json {
        &self.payload
    }

    /// Remaining TTL as seen right now, or `None` for no expiration.
    pub fn remaining_ttl(&self) -> Option<i64> {
        let raw = self.remaining_ttl.load(Ordering::Acquire);
        if raw == NO_EXPIRY {
            None
        } else {
            Some(raw)
        }
    }

    /// Decrements the remaining TTL by one tick. Returns `true` if the
    /// value has now reached zero and should be reaped. A no-expiration
    /// value is never ticked.
    pub(crate) fn tick(&self) -> bool {
        let raw = self.remaining_ttl.load(Ordering::Acquire);
        if raw == NO_EXPIRY {
            return false;
        }
        let next = raw.saturating_sub(1).max(0);
        self.remaining_ttl.store(next, Ordering::Release);
        next <= 0
    }

    /// Looks up `selector` inside this value's payload, per the
    /// kind-first dispatch rule: sequences require an integer selector,
    /// mappings use the selector verbatim as a string key, and scalars
    /// have no substructure to select into.
    pub fn get_by(&self, selector: &str) -> Result<Json> {
        match self.kind {
            ValueKind::Sequence => {
                let arr = self.payload.as_array().expect("sequence payload");
                let idx: usize = selector.parse().map_err(|_| StoreError::SubSeqType)?;
                arr.get(idx).cloned().ok_or(StoreError::NotFound)
            }
            ValueKind::Mapping => {
                let obj = self.payload.as_object().expect("mapping payload");
                obj.get(selector).cloned().ok_or(StoreError::NotFound)
            }
            ValueKind::String => Err(StoreError::NotSequence),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classifies_string_sequence_mapping() {
        assert_eq!(Value::new(json!("hi"), None).unwrap().kind(), ValueKind::String);
        assert_eq!(Value::new(json!([1, 2]), None).unwrap().kind(), ValueKind::Sequence);
        assert_eq!(Value::new(json!({"a": 1}), None).unwrap().kind(), ValueKind::Mapping);
    }

    #[test]
    fn rejects_unsupported_payloads() {
        assert!(matches!(
            Value::new(json!(42), None),
            Err(StoreError::UnknownDataType)
        ));
        assert!(matches!(
            Value::new(json!(true), None),
            Err(StoreError::UnknownDataType)
        ));
    }

    #[test]
    fn rejects_negative_ttl() {
        assert!(matches!(
            Value::new(json!("x"), Some(-1)),
            Err(StoreError::NegativeTtl)
        ));
    }

    #[test]
    fn tick_decrements_and_reports_expiry() {
        let v = Value::new(json!("x"), Some(2)).unwrap();
        assert!(!v.tick());
        assert_eq!(v.remaining_ttl(), Some(1));
        assert!(v.tick());
        assert_eq!(v.remaining_ttl(), Some(0));
    }

    #[test]
    fn tick_on_no_expiration_is_noop() {
        let v = Value::new(json!("x"), None).unwrap();
        assert!(!v.tick());
        assert_eq!(v.remaining_ttl(), None);
    }

    #[test]
    fn get_by_sequence_requires_integer_selector() {
        let v = Value::new(json!([["ok"]]), None).unwrap();
        assert_eq!(v.get_by("0").unwrap(), json!(["ok"]));
        assert!(matches!(v.get_by("-1"), Err(StoreError::SubSeqType)));
        assert!(matches!(v.get_by("nope"), Err(StoreError::SubSeqType)));
        assert!(matches!(v.get_by("99"), Err(StoreError::NotFound)));
    }

    #[test]
    fn get_by_mapping_uses_selector_literally() {
        let v = Value::new(json!({"3": "ok", "key": {"innerKey": "ok"}}), None).unwrap();
        assert_eq!(v.get_by("3").unwrap(), json!("ok"));
        assert_eq!(v.get_by("key").unwrap(), json!({"innerKey": "ok"}));
        assert!(matches!(v.get_by("missing"), Err(StoreError::NotFound)));
    }

    #[test]
    fn get_by_string_is_not_a_sequence() {
        let v = Value::new(json!("scalar"), None).unwrap();
        assert!(matches!(v.get_by("0"), Err(StoreError::NotSequence)));
    }
}
