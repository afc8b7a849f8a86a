// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::UnknownKeyError;
use crate::value::Value;

/// Key-value coding: how the engine reads properties of host objects.
///
/// Implementors answer single keys; dotted paths are walked by
/// [`value_for_key_path`](KeyValueCoding::value_for_key_path), which stops
/// at the first `Null` segment.
pub trait KeyValueCoding {
    fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError>;

    fn value_for_key_path(&self, path: &str) -> Result<Value, UnknownKeyError> {
        let mut segments = path.split('.');
        let mut current = match segments.next() {
            Some(first) => self.value_for_key(first)?,
            None => return Ok(Value::Null),
        };
        for segment in segments {
            if current.is_null() {
                break;
            }
            current = current.value_for_key(segment)?;
        }
        Ok(current)
    }
}

impl KeyValueCoding for Value {
    fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError> {
        Value::value_for_key(self, key)
    }
}

impl KeyValueCoding for BTreeMap<String, Value> {
    fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError> {
        match key {
            "self" => Ok(Value::from(self.clone())),
            _ => Ok(self.get(key).cloned().unwrap_or_default()),
        }
    }
}

impl KeyValueCoding for HashMap<String, Value> {
    fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError> {
        match key {
            "self" => Ok(Value::from(self.clone())),
            _ => Ok(self.get(key).cloned().unwrap_or_default()),
        }
    }
}

impl KeyValueCoding for serde_json::Value {
    fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError> {
        match (self, key) {
            (_, "self") => Ok(Value::from(self)),
            (serde_json::Value::Object(o), _) => Ok(o.get(key).map(Value::from).unwrap_or_default()),
            _ => Value::from(self).value_for_key(key),
        }
    }
}

impl<T: KeyValueCoding + ?Sized> KeyValueCoding for &T {
    fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError> {
        (**self).value_for_key(key)
    }

    fn value_for_key_path(&self, path: &str) -> Result<Value, UnknownKeyError> {
        (**self).value_for_key_path(path)
    }
}

impl<T: KeyValueCoding + ?Sized> KeyValueCoding for Arc<T> {
    fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError> {
        (**self).value_for_key(key)
    }

    fn value_for_key_path(&self, path: &str) -> Result<Value, UnknownKeyError> {
        (**self).value_for_key_path(path)
    }
}

impl<T: KeyValueCoding + ?Sized> KeyValueCoding for Box<T> {
    fn value_for_key(&self, key: &str) -> Result<Value, UnknownKeyError> {
        (**self).value_for_key(key)
    }

    fn value_for_key_path(&self, path: &str) -> Result<Value, UnknownKeyError> {
        (**self).value_for_key_path(path)
    }
}

/// Bindings source with no values. Every lookup answers `Null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBindings;

impl KeyValueCoding for NoBindings {
    fn value_for_key(&self, _key: &str) -> Result<Value, UnknownKeyError> {
        Ok(Value::Null)
    }
}
