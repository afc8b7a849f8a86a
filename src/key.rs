// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::{ComparisonOperator, Operand, Qualifier};
use crate::error::UnknownKeyError;
use crate::kvc::KeyValueCoding;
use crate::sort::{SortOrdering, SortSelector};
use crate::value::Value;

/// Dotted key path, e.g. `owner.address.city`.
///
/// Equality and hashing are by path. The builder methods produce
/// qualifiers and sort orderings reading this key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key {
    path: Arc<str>,
}

impl Key {
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }

    /// `name.append("street")` is `name.street`.
    pub fn append(&self, key: &str) -> Key {
        match (self.path.is_empty(), key.is_empty()) {
            (true, _) => Key::new(key),
            (_, true) => self.clone(),
            _ => Key::new(format!("{}.{}", self.path, key)),
        }
    }

    pub fn dot(&self, key: &Key) -> Key {
        self.append(key.path())
    }

    pub fn value_in(&self, object: &dyn KeyValueCoding) -> Result<Value, UnknownKeyError> {
        object.value_for_key_path(&self.path)
    }

    fn compare(&self, operator: ComparisonOperator, value: impl Into<Value>) -> Qualifier {
        Qualifier::key_value(self.clone(), operator, Operand::Value(value.into()))
    }

    pub fn eq(&self, value: impl Into<Value>) -> Qualifier {
        self.compare(ComparisonOperator::EqualTo, value)
    }

    pub fn ne(&self, value: impl Into<Value>) -> Qualifier {
        self.compare(ComparisonOperator::NotEqualTo, value)
    }

    pub fn gt(&self, value: impl Into<Value>) -> Qualifier {
        self.compare(ComparisonOperator::GreaterThan, value)
    }

    pub fn gte(&self, value: impl Into<Value>) -> Qualifier {
        self.compare(ComparisonOperator::GreaterThanOrEqual, value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> Qualifier {
        self.compare(ComparisonOperator::LessThan, value)
    }

    pub fn lte(&self, value: impl Into<Value>) -> Qualifier {
        self.compare(ComparisonOperator::LessThanOrEqual, value)
    }

    pub fn like(&self, pattern: impl Into<Value>) -> Qualifier {
        self.compare(ComparisonOperator::Like, pattern)
    }

    pub fn like_insensitive(&self, pattern: impl Into<Value>) -> Qualifier {
        self.compare(ComparisonOperator::CaseInsensitiveLike, pattern)
    }

    /// Case-insensitive substring match, `key LIKE '*text*'` ignoring case.
    pub fn contains_text(&self, text: &str) -> Qualifier {
        self.like_insensitive(format!("*{text}*"))
    }

    /// The key's value is one of `values`.
    pub fn contained_in<I, V>(&self, values: I) -> Qualifier
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.compare(ComparisonOperator::Contains, values)
    }

    pub fn not_in<I, V>(&self, values: I) -> Qualifier
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Qualifier::not(self.contained_in(values))
    }

    pub fn is_null(&self) -> Qualifier {
        self.eq(Value::Null)
    }

    pub fn is_not_null(&self) -> Qualifier {
        self.ne(Value::Null)
    }

    pub fn is_true(&self) -> Qualifier {
        self.eq(true)
    }

    pub fn is_false(&self) -> Qualifier {
        self.eq(false)
    }

    pub fn is_true_or_null(&self) -> Qualifier {
        Qualifier::or([self.is_true(), self.is_null()])
    }

    pub fn is_false_or_null(&self) -> Qualifier {
        Qualifier::or([self.is_false(), self.is_null()])
    }

    /// `start < key < end`. Missing bounds are left open; with both missing
    /// the result matches everything.
    pub fn between(&self, start: Option<Value>, end: Option<Value>) -> Qualifier {
        match (start, end) {
            (None, None) => Qualifier::Boolean(true),
            (Some(s), None) => self.gt(s),
            (None, Some(e)) => self.lt(e),
            (Some(s), Some(e)) => Qualifier::and([self.gt(s), self.lt(e)]),
        }
    }

    /// `start <= key <= end`.
    pub fn between_inclusive(&self, start: Option<Value>, end: Option<Value>) -> Qualifier {
        match (start, end) {
            (None, None) => Qualifier::Boolean(true),
            (Some(s), None) => self.gte(s),
            (None, Some(e)) => self.lte(e),
            (Some(s), Some(e)) => Qualifier::and([self.gte(s), self.lte(e)]),
        }
    }

    pub fn asc(&self) -> SortOrdering {
        SortOrdering::new(self.clone(), SortSelector::Ascending)
    }

    pub fn desc(&self) -> SortOrdering {
        SortOrdering::new(self.clone(), SortSelector::Descending)
    }

    pub fn asc_insensitive(&self) -> SortOrdering {
        SortOrdering::new(self.clone(), SortSelector::CaseInsensitiveAscending)
    }

    pub fn desc_insensitive(&self) -> SortOrdering {
        SortOrdering::new(self.clone(), SortSelector::CaseInsensitiveDescending)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", &*self.path)
    }
}

impl From<&str> for Key {
    fn from(path: &str) -> Self {
        Key::new(path)
    }
}

impl From<String> for Key {
    fn from(path: String) -> Self {
        Key::new(path)
    }
}

/// Named placeholder (`$name`) resolved by binding.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variable {
    name: Arc<str>,
}

impl Variable {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.name)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Variable({:?})", &*self.name)
    }
}
