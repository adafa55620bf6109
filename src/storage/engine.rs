//! Thread-Safe Key-Value Store
//!
//! A single `HashMap` from key to typed [`Value`] behind one reader/writer
//! lock. Every operation takes the lock once, so each call is atomic with
//! respect to every other call on the same store; read-modify-write
//! operations (`incr_by`, `append`, `take`) never interleave.
//!
//! ## Kind Pinning
//!
//! The first successful write fixes the [`ValueKind`] of a key. Later writes
//! must supply the same kind or fail with [`StoreError::KindMismatch`],
//! leaving the old value in place. Deleting the key releases the pin.
//!
//! ```text
//! SET k :1      -> ok        (k pinned to int)
//! SET k :2      -> ok
//! SET k "two"   -> rejected  (string != int)
//! DEL k
//! SET k "two"   -> ok        (k pinned to string)
//! ```

use crate::storage::value::{Value, ValueKind};
use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

/// Errors returned by store operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("value kind of key={key:?} mismatched. expected={expected}. got={got}")]
    KindMismatch {
        key: String,
        expected: ValueKind,
        got: ValueKind,
    },

    #[error("key={0:?} not found")]
    NotFound(String),

    #[error("value of key={key:?} is not an integer. got={kind}")]
    NotNumeric { key: String, kind: ValueKind },

    #[error("value of key={key:?} is not a string. got={kind}")]
    NotString { key: String, kind: ValueKind },

    #[error("increment or decrement would overflow")]
    Overflow,

    /// `Nil` marks a miss and is never stored
    #[error("value provided not supported")]
    Unsupported,
}

/// Write precondition for [`Store::set_if`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetCondition {
    Always,
    /// NX
    IfAbsent,
    /// XX
    IfPresent,
}

/// The in-memory key space.
#[derive(Debug, Default)]
pub struct Store {
    data: RwLock<HashMap<String, Value>>,
}

/// Fails unless `value` may replace `current` under kind pinning.
fn check_kind(key: &str, current: Option<&Value>, value: &Value) -> Result<(), StoreError> {
    if value.is_nil() {
        return Err(StoreError::Unsupported);
    }

    match current {
        Some(existing) if existing.kind() != value.kind() => Err(StoreError::KindMismatch {
            key: key.to_string(),
            expected: existing.kind(),
            got: value.kind(),
        }),
        _ => Ok(()),
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, creating the key if needed.
    pub fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.set_if(key, value, SetCondition::Always).map(|_| ())
    }

    /// Stores `value` only when `condition` holds.
    ///
    /// Returns `Ok(false)` when the condition failed and nothing was
    /// written. The existence check and the write happen under one lock.
    pub fn set_if(
        &self,
        key: &str,
        value: Value,
        condition: SetCondition,
    ) -> Result<bool, StoreError> {
        let mut data = self.data.write();
        let current = data.get(key);

        let allowed = match condition {
            SetCondition::Always => true,
            SetCondition::IfAbsent => current.is_none(),
            SetCondition::IfPresent => current.is_some(),
        };
        if !allowed {
            return Ok(false);
        }

        check_kind(key, current, &value)?;
        data.insert(key.to_string(), value);
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    pub fn exists(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Removes a key. Returns whether it was present; a missing key is a no-op.
    pub fn delete(&self, key: &str) -> bool {
        self.data.write().remove(key).is_some()
    }

    /// Removes a key and returns its value.
    pub fn take(&self, key: &str) -> Option<Value> {
        self.data.write().remove(key)
    }

    /// Adds `delta` to an integer value and returns the new value.
    ///
    /// `Int` values use machine-size arithmetic and `Int64` values 64-bit
    /// arithmetic; both fail on overflow instead of wrapping.
    pub fn incr_by(&self, key: &str, delta: i64) -> Result<Value, StoreError> {
        let mut data = self.data.write();
        let entry = data
            .get_mut(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;

        match &mut *entry {
            Value::Int(n) => {
                let delta = isize::try_from(delta).map_err(|_| StoreError::Overflow)?;
                *n = n.checked_add(delta).ok_or(StoreError::Overflow)?;
            }
            Value::Int64(n) => {
                *n = n.checked_add(delta).ok_or(StoreError::Overflow)?;
            }
            other => {
                return Err(StoreError::NotNumeric {
                    key: key.to_string(),
                    kind: other.kind(),
                })
            }
        }

        Ok(entry.clone())
    }

    /// Appends to a string value, creating it when absent. Returns the new
    /// length in bytes.
    pub fn append(&self, key: &str, suffix: &str) -> Result<usize, StoreError> {
        let mut data = self.data.write();

        match data.get_mut(key) {
            Some(Value::String(s)) => {
                s.push_str(suffix);
                Ok(s.len())
            }
            Some(other) => Err(StoreError::NotString {
                key: key.to_string(),
                kind: other.kind(),
            }),
            None => {
                data.insert(key.to_string(), Value::String(suffix.to_string()));
                Ok(suffix.len())
            }
        }
    }

    /// Length in bytes of a string value, 0 for a missing key.
    pub fn strlen(&self, key: &str) -> Result<usize, StoreError> {
        match self.data.read().get(key) {
            Some(Value::String(s)) => Ok(s.len()),
            Some(other) => Err(StoreError::NotString {
                key: key.to_string(),
                kind: other.kind(),
            }),
            None => Ok(0),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let store = Store::new();
        store.set("name", Value::String("Ariz".into())).unwrap();
        assert_eq!(store.get("name"), Some(Value::String("Ariz".into())));
        assert_eq!(store.get("missing"), None);
    }

    #[test]
    fn test_kind_pinning() {
        let samples = [
            Value::Int(1),
            Value::Int64(1),
            Value::Bool(true),
            Value::String("1".into()),
            Value::Float(1.0),
        ];

        for first in &samples {
            for second in &samples {
                let store = Store::new();
                store.set("k", first.clone()).unwrap();

                let result = store.set("k", second.clone());
                if first.kind() == second.kind() {
                    assert!(result.is_ok());
                } else {
                    assert_eq!(
                        result,
                        Err(StoreError::KindMismatch {
                            key: "k".into(),
                            expected: first.kind(),
                            got: second.kind(),
                        })
                    );
                    assert_eq!(store.get("k").as_ref(), Some(first));
                }
            }
        }
    }

    #[test]
    fn test_delete_releases_pin() {
        let store = Store::new();
        store.set("k", Value::Int(1)).unwrap();
        assert!(store.delete("k"));
        assert!(!store.delete("k"));
        store.set("k", Value::Bool(false)).unwrap();
        assert_eq!(store.get("k"), Some(Value::Bool(false)));
    }

    #[test]
    fn test_nil_is_never_stored() {
        let store = Store::new();
        assert_eq!(store.set("k", Value::Nil), Err(StoreError::Unsupported));
        assert!(store.is_empty());
    }

    #[test]
    fn test_set_if() {
        let store = Store::new();
        assert_eq!(store.set_if("k", Value::Int(1), SetCondition::IfPresent), Ok(false));
        assert!(!store.exists("k"));

        assert_eq!(store.set_if("k", Value::Int(1), SetCondition::IfAbsent), Ok(true));
        assert_eq!(store.set_if("k", Value::Int(2), SetCondition::IfAbsent), Ok(false));
        assert_eq!(store.get("k"), Some(Value::Int(1)));

        assert_eq!(store.set_if("k", Value::Int(3), SetCondition::IfPresent), Ok(true));
        assert_eq!(store.get("k"), Some(Value::Int(3)));
    }

    #[test]
    fn test_take() {
        let store = Store::new();
        store.set("k", Value::String("value deleted".into())).unwrap();
        assert_eq!(store.take("k"), Some(Value::String("value deleted".into())));
        assert_eq!(store.take("k"), None);
        assert!(!store.exists("k"));
    }

    #[test]
    fn test_incr() {
        let store = Store::new();
        store.set("a", Value::Int(1)).unwrap();
        store.set("b", Value::Int64(1)).unwrap();

        assert_eq!(store.incr_by("a", 9), Ok(Value::Int(10)));
        assert_eq!(store.incr_by("b", 9), Ok(Value::Int64(10)));
        assert_eq!(store.incr_by("b", -20), Ok(Value::Int64(-10)));
    }

    #[test]
    fn test_incr_errors() {
        let store = Store::new();
        assert_eq!(
            store.incr_by("missing", 1),
            Err(StoreError::NotFound("missing".into()))
        );

        store.set("s", Value::String("1".into())).unwrap();
        assert_eq!(
            store.incr_by("s", 1),
            Err(StoreError::NotNumeric {
                key: "s".into(),
                kind: ValueKind::String
            })
        );

        store.set("max", Value::Int64(i64::MAX)).unwrap();
        assert_eq!(store.incr_by("max", 1), Err(StoreError::Overflow));
        assert_eq!(store.get("max"), Some(Value::Int64(i64::MAX)));
    }

    #[test]
    fn test_append_and_strlen() {
        let store = Store::new();
        assert_eq!(store.strlen("greeting"), Ok(0));
        assert_eq!(store.append("greeting", "Hello"), Ok(5));
        assert_eq!(store.append("greeting", " World"), Ok(11));
        assert_eq!(store.strlen("greeting"), Ok(11));

        store.set("n", Value::Int(1)).unwrap();
        assert!(matches!(
            store.append("n", "x"),
            Err(StoreError::NotString { .. })
        ));
        assert!(matches!(store.strlen("n"), Err(StoreError::NotString { .. })));
    }

    #[test]
    fn test_concurrent_access() {
        let store = Arc::new(Store::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    store.set(&key, Value::Int(j)).unwrap();
                    store.get(&key);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 1000);
    }

    #[test]
    fn test_concurrent_incr_is_atomic() {
        let store = Arc::new(Store::new());
        store.set("counter", Value::Int64(0)).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        store.incr_by("counter", 1).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("counter"), Some(Value::Int64(4000)));
    }
}
