// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Type-directed comparison strategies.
//!
//! A [`ComparisonRegistry`] maps runtime type names (see
//! [`crate::value::types`]) to [`ComparisonSupport`] strategies. The left
//! operand's type hierarchy is walked, most specific first, and the default
//! strategy answers when nothing is registered.

use chrono::{DateTime, Utc};
use core::cmp::Ordering;
use std::sync::Arc;

use crate::ast::ComparisonOperator;
use crate::operators::ExtendedOperatorRegistry;
use crate::registry::{Registry, RegistryError};
use crate::value::{types, Value};

/// Equality, ordering and pattern matching for one family of values.
///
/// `lhs` is always a value of the type the strategy is registered for, or
/// `Null` for the default strategy. The provided methods implement the
/// default behavior.
pub trait ComparisonSupport: Send + Sync {
    fn is_equal_to(&self, lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (l, r) => l == r,
        }
    }

    fn is_not_equal_to(&self, lhs: &Value, rhs: &Value) -> bool {
        !self.is_equal_to(lhs, rhs)
    }

    /// `Null` sorts below everything.
    fn is_greater_than(&self, lhs: &Value, rhs: &Value) -> bool {
        if self.is_equal_to(lhs, rhs) {
            return false;
        }
        match (lhs, rhs) {
            (_, Value::Null) => true,
            (Value::Null, _) => false,
            (l, r) => l.compare(r) == Some(Ordering::Greater),
        }
    }

    fn is_greater_or_equal(&self, lhs: &Value, rhs: &Value) -> bool {
        self.is_equal_to(lhs, rhs) || self.is_greater_than(lhs, rhs)
    }

    fn is_less_than(&self, lhs: &Value, rhs: &Value) -> bool {
        if self.is_equal_to(lhs, rhs) {
            return false;
        }
        match (lhs, rhs) {
            (_, Value::Null) => false,
            (Value::Null, _) => true,
            (l, r) => l.compare(r) == Some(Ordering::Less),
        }
    }

    fn is_less_or_equal(&self, lhs: &Value, rhs: &Value) -> bool {
        self.is_equal_to(lhs, rhs) || self.is_less_than(lhs, rhs)
    }

    /// `lhs IN rhs`: membership of `lhs` in the collection `rhs`.
    fn does_contain(&self, lhs: &Value, rhs: &Value) -> bool {
        match rhs {
            Value::Array(items) => items.iter().any(|item| self.is_equal_to(lhs, item)),
            _ => false,
        }
    }

    fn does_like(&self, lhs: &Value, rhs: &Value) -> bool {
        if lhs.is_null() || rhs.is_null() {
            return false;
        }
        like_match(&lhs.to_text(), &rhs.to_text())
    }

    fn does_case_insensitive_like(&self, _lhs: &Value, _rhs: &Value) -> bool {
        false
    }

    fn compare_operation(&self, operator: &ComparisonOperator, lhs: &Value, rhs: &Value) -> bool {
        match operator {
            ComparisonOperator::EqualTo => self.is_equal_to(lhs, rhs),
            ComparisonOperator::NotEqualTo => self.is_not_equal_to(lhs, rhs),
            ComparisonOperator::GreaterThan => self.is_greater_than(lhs, rhs),
            ComparisonOperator::GreaterThanOrEqual => self.is_greater_or_equal(lhs, rhs),
            ComparisonOperator::LessThan => self.is_less_than(lhs, rhs),
            ComparisonOperator::LessThanOrEqual => self.is_less_or_equal(lhs, rhs),
            ComparisonOperator::Contains => self.does_contain(lhs, rhs),
            ComparisonOperator::Like => self.does_like(lhs, rhs),
            ComparisonOperator::CaseInsensitiveLike => self.does_case_insensitive_like(lhs, rhs),
            ComparisonOperator::Extended(_) => false,
        }
    }
}

/// `*` wildcard matching, with a wildcard allowed only at either end.
///
/// `*` alone matches everything. Interior wildcards are matched literally
/// and logged.
pub fn like_match(text: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    let (leading, core) = match pattern.strip_prefix('*') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };
    let (trailing, core) = match core.strip_suffix('*') {
        Some(rest) => (true, rest),
        None => (false, core),
    };
    if core.contains('*') {
        log::warn!("LIKE pattern `{pattern}` has an interior wildcard, which is not supported");
    }
    match (leading, trailing) {
        (true, true) => text.contains(core),
        (true, false) => text.ends_with(core),
        (false, true) => text.starts_with(core),
        (false, false) => text == core,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultComparison;

impl ComparisonSupport for DefaultComparison {}

/// Strings add substring `IN` and a case-folded `LIKE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringComparison;

impl ComparisonSupport for StringComparison {
    /// Collection membership, or `lhs` as a substring of a string `rhs`.
    fn does_contain(&self, lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (_, Value::Array(items)) => items.iter().any(|item| self.is_equal_to(lhs, item)),
            (Value::String(needle), Value::String(haystack)) => haystack.contains(needle.as_ref()),
            _ => false,
        }
    }

    fn does_case_insensitive_like(&self, lhs: &Value, rhs: &Value) -> bool {
        if lhs.is_null() || rhs.is_null() {
            return false;
        }
        like_match(&lhs.to_text().to_lowercase(), &rhs.to_text().to_lowercase())
    }
}

/// Dates and calendars compare as UTC instants, so offsets alone never
/// make two values differ. RFC 3339 strings, the textual form of dates,
/// count as instants too.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateComparison;

fn instant(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|d| d.with_timezone(&Utc)),
        v => v.as_utc(),
    }
}

impl ComparisonSupport for DateComparison {
    fn is_equal_to(&self, lhs: &Value, rhs: &Value) -> bool {
        match (instant(lhs), instant(rhs)) {
            (Some(l), Some(r)) => l == r,
            _ => DefaultComparison.is_equal_to(lhs, rhs),
        }
    }

    fn is_greater_than(&self, lhs: &Value, rhs: &Value) -> bool {
        match (instant(lhs), instant(rhs)) {
            (Some(l), Some(r)) => l > r,
            _ => DefaultComparison.is_greater_than(lhs, rhs),
        }
    }

    fn is_less_than(&self, lhs: &Value, rhs: &Value) -> bool {
        match (instant(lhs), instant(rhs)) {
            (Some(l), Some(r)) => l < r,
            _ => DefaultComparison.is_less_than(lhs, rhs),
        }
    }
}

/// A non-boolean right-hand side is compared by truthiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanComparison;

impl ComparisonSupport for BooleanComparison {
    fn is_equal_to(&self, lhs: &Value, rhs: &Value) -> bool {
        match (lhs.as_bool(), rhs) {
            (_, Value::Null) => lhs.is_null(),
            (Some(l), Value::Bool(r)) => l == *r,
            (Some(l), r) => l == r.is_truthy(),
            (None, r) => DefaultComparison.is_equal_to(lhs, r),
        }
    }
}

/// Collections test membership in either direction.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionComparison;

impl ComparisonSupport for CollectionComparison {
    fn does_contain(&self, lhs: &Value, rhs: &Value) -> bool {
        match (lhs, rhs) {
            (_, Value::Array(items)) => items.contains(lhs),
            (Value::Array(items), item) => items.contains(item),
            _ => false,
        }
    }
}

/// Comparison strategies plus extended operators, passed to the evaluator
/// and sorter.
///
/// A shared default lives in
/// [`instances::DEFAULT_COMPARISON_REGISTRY`](crate::registry::instances).
pub struct ComparisonRegistry {
    supports: Registry<dyn ComparisonSupport>,
    default_support: Arc<dyn ComparisonSupport>,
    operators: ExtendedOperatorRegistry,
}

impl ComparisonRegistry {
    /// Registry with the built-in strategies and operators.
    pub fn new() -> Self {
        let registry = Self {
            supports: Registry::new("COMPARISON_REGISTRY"),
            default_support: Arc::new(DefaultComparison),
            operators: ExtendedOperatorRegistry::new(),
        };
        let builtins: [(&str, Arc<dyn ComparisonSupport>); 5] = [
            (types::STRING, Arc::new(StringComparison)),
            (types::DATE, Arc::new(DateComparison)),
            (types::CALENDAR, Arc::new(DateComparison)),
            (types::BOOL, Arc::new(BooleanComparison)),
            (types::COLLECTION, Arc::new(CollectionComparison)),
        ];
        for (name, support) in builtins {
            // Names are fixed and non-empty.
            let _ = registry.supports.insert(name, support);
        }
        registry
    }

    /// Registry with only the default strategy and no extended operators.
    pub fn empty() -> Self {
        Self {
            supports: Registry::new("COMPARISON_REGISTRY"),
            default_support: Arc::new(DefaultComparison),
            operators: ExtendedOperatorRegistry::empty(),
        }
    }

    /// Registers a strategy for a type name. Fails if one is registered.
    pub fn register_support(
        &self,
        type_name: &str,
        support: Arc<dyn ComparisonSupport>,
    ) -> Result<(), RegistryError> {
        self.supports.register(type_name, support)
    }

    /// Registers or replaces the strategy for a type name.
    pub fn set_support_for_type(
        &self,
        type_name: &str,
        support: Arc<dyn ComparisonSupport>,
    ) -> Result<(), RegistryError> {
        self.supports.insert(type_name, support).map(|_| ())
    }

    pub fn support_for_type(&self, type_name: &str) -> Option<Arc<dyn ComparisonSupport>> {
        self.supports.get(type_name)
    }

    /// Strategy for `value`, walking its type hierarchy.
    pub fn support_for_value(&self, value: &Value) -> Arc<dyn ComparisonSupport> {
        self.supports
            .first_of(value.type_names().iter().copied())
            .unwrap_or_else(|| Arc::clone(&self.default_support))
    }

    pub fn operators(&self) -> &ExtendedOperatorRegistry {
        &self.operators
    }

    /// `lhs operator rhs`. Extended operators dispatch through
    /// [`operators`](ComparisonRegistry::operators); when that fails the
    /// failure is logged and the comparison is false.
    pub fn compare(&self, operator: &ComparisonOperator, lhs: &Value, rhs: &Value) -> bool {
        match operator {
            ComparisonOperator::Extended(name) => match self.operators.evaluate(name, lhs, rhs) {
                Ok(result) => result,
                Err(e) => {
                    log::error!("{e}");
                    false
                }
            },
            op => self.support_for_value(lhs).compare_operation(op, lhs, rhs),
        }
    }
}

impl Default for ComparisonRegistry {
    fn default() -> Self {
        Self::new()
    }
}
