// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use dashmap::DashMap;

use crate::error::UnsupportedOperatorError;
use crate::value::{types, Value};

/// Predicate implementing a named operator: `receiver operator argument`.
pub type ExtendedOperatorFn = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct OperatorKey {
    receiver: Arc<str>,
    operator: Arc<str>,
    argument: Option<Arc<str>>,
}

impl OperatorKey {
    fn new(receiver: &str, operator: &str, argument: Option<&str>) -> Self {
        Self {
            receiver: receiver.into(),
            operator: normalize(operator).into(),
            argument: argument.map(Into::into),
        }
    }
}

/// `hasPrefix:` and `hasPrefix` name the same operator.
fn normalize(operator: &str) -> &str {
    operator.strip_suffix(':').unwrap_or(operator)
}

/// Named operators keyed by receiver type, operator name and, optionally,
/// argument type.
///
/// Lookup tries each type in the receiver's hierarchy with no argument type
/// first, then each receiver type against each type in the argument's
/// hierarchy.
pub struct ExtendedOperatorRegistry {
    inner: DashMap<OperatorKey, ExtendedOperatorFn>,
}

impl ExtendedOperatorRegistry {
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register_builtins();
        registry
    }

    pub fn empty() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    pub fn register<F>(&self, receiver: &str, operator: &str, f: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.inner
            .insert(OperatorKey::new(receiver, operator, None), Arc::new(f));
    }

    /// Like [`register`](Self::register), but only for arguments of type
    /// `argument`.
    pub fn register_typed<F>(&self, receiver: &str, operator: &str, argument: &str, f: F)
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        self.inner
            .insert(OperatorKey::new(receiver, operator, Some(argument)), Arc::new(f));
    }

    pub fn contains(&self, receiver: &str, operator: &str) -> bool {
        self.inner
            .contains_key(&OperatorKey::new(receiver, operator, None))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn lookup(&self, operator: &str, lhs: &Value, rhs: &Value) -> Option<ExtendedOperatorFn> {
        let get = |receiver: &str, argument: Option<&str>| {
            self.inner
                .get(&OperatorKey::new(receiver, operator, argument))
                .map(|entry| Arc::clone(entry.value()))
        };
        let receivers = lhs.type_names();
        receivers
            .iter()
            .find_map(|receiver| get(*receiver, None))
            .or_else(|| {
                receivers.iter().find_map(|receiver| {
                    rhs.type_names()
                        .iter()
                        .find_map(|argument| get(*receiver, Some(*argument)))
                })
            })
    }

    /// A `Null` receiver is never matched.
    pub fn evaluate(&self, operator: &str, lhs: &Value, rhs: &Value) -> Result<bool, UnsupportedOperatorError> {
        if lhs.is_null() {
            return Ok(false);
        }
        match self.lookup(operator, lhs, rhs) {
            Some(f) => Ok(f(lhs, rhs)),
            None => Err(UnsupportedOperatorError {
                operator: operator.to_string(),
                receiver: lhs.type_name().to_string(),
            }),
        }
    }

    fn register_builtins(&self) {
        let text = |v: &Value| match v {
            Value::Null => None,
            v => Some(v.to_text()),
        };

        self.register(types::STRING, "hasPrefix", move |l, r| {
            matches!((text(l), text(r)), (Some(l), Some(r)) if l.starts_with(&r))
        });
        self.register(types::STRING, "startsWith", move |l, r| {
            matches!((text(l), text(r)), (Some(l), Some(r)) if l.starts_with(&r))
        });
        self.register(types::STRING, "hasSuffix", move |l, r| {
            matches!((text(l), text(r)), (Some(l), Some(r)) if l.ends_with(&r))
        });
        self.register(types::STRING, "endsWith", move |l, r| {
            matches!((text(l), text(r)), (Some(l), Some(r)) if l.ends_with(&r))
        });
        self.register(types::STRING, "contains", move |l, r| {
            matches!((text(l), text(r)), (Some(l), Some(r)) if l.contains(&r))
        });
        self.register(types::STRING, "isEqualToIgnoringCase", move |l, r| {
            matches!((text(l), text(r)), (Some(l), Some(r)) if l.to_lowercase() == r.to_lowercase())
        });

        let member = |l: &Value, r: &Value| l.as_array().is_some_and(|items| items.contains(r));
        self.register(types::COLLECTION, "contains", member);
        self.register(types::COLLECTION, "doesContain", member);
    }
}

impl Default for ExtendedOperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
