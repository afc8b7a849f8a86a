// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Sort orderings and the multi-key comparator.

use core::cmp::Ordering;
use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::comparison::ComparisonRegistry;
use crate::error::SortSelectorError;
use crate::key::Key;
use crate::kvc::KeyValueCoding;
use crate::registry::instances::DEFAULT_COMPARISON_REGISTRY;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortSelector {
    #[default]
    #[serde(rename = "ASC")]
    Ascending,
    #[serde(rename = "DESC")]
    Descending,
    #[serde(rename = "IASC")]
    CaseInsensitiveAscending,
    #[serde(rename = "IDESC")]
    CaseInsensitiveDescending,
}

impl SortSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
            Self::CaseInsensitiveAscending => "IASC",
            Self::CaseInsensitiveDescending => "IDESC",
        }
    }

    pub fn is_ascending(&self) -> bool {
        matches!(self, Self::Ascending | Self::CaseInsensitiveAscending)
    }

    pub fn is_case_insensitive(&self) -> bool {
        matches!(
            self,
            Self::CaseInsensitiveAscending | Self::CaseInsensitiveDescending
        )
    }
}

impl FromStr for SortSelector {
    type Err = SortSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" | "EOCOMPAREASCENDING" => Ok(Self::Ascending),
            "DESC" | "EOCOMPAREDESCENDING" => Ok(Self::Descending),
            "IASC" | "EOCOMPARECASEINSENSITIVEASCENDING" => Ok(Self::CaseInsensitiveAscending),
            "IDESC" | "EOCOMPARECASEINSENSITIVEDESCENDING" => Ok(Self::CaseInsensitiveDescending),
            _ => Err(SortSelectorError(s.to_string())),
        }
    }
}

impl fmt::Display for SortSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortOrdering {
    pub key: Key,
    #[serde(default)]
    pub selector: SortSelector,
}

impl SortOrdering {
    pub fn new(key: impl Into<Key>, selector: SortSelector) -> Self {
        Self {
            key: key.into(),
            selector,
        }
    }

    /// Ordering with a selector given by name (`ASC`, `DESC`, `IASC`,
    /// `IDESC`).
    pub fn with_selector_name(key: impl Into<Key>, selector: &str) -> Result<Self, SortSelectorError> {
        Ok(Self::new(key, selector.parse()?))
    }

    /// Parses `name,-balance,+age`: a `-` prefix sorts descending, `+` or
    /// no prefix ascending. Empty items are skipped.
    pub fn parse(text: &str) -> Vec<SortOrdering> {
        text.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| match item.strip_prefix('-') {
                Some(key) => SortOrdering::new(key, SortSelector::Descending),
                None => SortOrdering::new(
                    item.strip_prefix('+').unwrap_or(item),
                    SortSelector::Ascending,
                ),
            })
            .collect()
    }

    pub fn first_sort_ordering_with_key<'a>(
        orderings: &'a [SortOrdering],
        key: &str,
    ) -> Option<&'a SortOrdering> {
        orderings.iter().find(|so| so.key.path() == key)
    }
}

impl fmt::Display for SortOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.key, self.selector)
    }
}

/// Compares objects by a list of sort orderings, first difference wins.
///
/// `Null` sorts first under ascending selectors and last under descending
/// ones. When one side is a number and the other a string, both compare as
/// strings. Values the registry cannot order fall back to a fixed type
/// rank and then to their text.
#[derive(Clone, Copy)]
pub struct SortOrderingComparator<'a> {
    orderings: &'a [SortOrdering],
    registry: &'a ComparisonRegistry,
}

impl<'a> SortOrderingComparator<'a> {
    pub fn new(orderings: &'a [SortOrdering]) -> Self {
        Self::with_registry(orderings, &*DEFAULT_COMPARISON_REGISTRY)
    }

    pub fn with_registry(orderings: &'a [SortOrdering], registry: &'a ComparisonRegistry) -> Self {
        Self {
            orderings,
            registry,
        }
    }

    pub fn compare(&self, a: &dyn KeyValueCoding, b: &dyn KeyValueCoding) -> Ordering {
        for ordering in self.orderings {
            let v1 = resolve(&ordering.key, a);
            let v2 = resolve(&ordering.key, b);
            let result = self.compare_values(ordering.selector, v1, v2);
            if result != Ordering::Equal {
                return result;
            }
        }
        Ordering::Equal
    }

    fn compare_values(&self, selector: SortSelector, v1: Value, v2: Value) -> Ordering {
        let ascending = selector.is_ascending();
        if v1 == v2 {
            return Ordering::Equal;
        }
        match (&v1, &v2) {
            (Value::Null, _) if ascending => return Ordering::Less,
            (Value::Null, _) => return Ordering::Greater,
            (_, Value::Null) if ascending => return Ordering::Greater,
            (_, Value::Null) => return Ordering::Less,
            _ => (),
        }

        let fold = |v: Value| match v {
            Value::String(s) if selector.is_case_insensitive() => Value::from(s.to_lowercase()),
            v => v,
        };
        let (v1, v2) = match (fold(v1), fold(v2)) {
            (n @ Value::Number(_), s @ Value::String(_)) => (Value::from(n.to_text()), s),
            (s @ Value::String(_), n @ Value::Number(_)) => (s, Value::from(n.to_text())),
            pair => pair,
        };

        let support = self.registry.support_for_value(&v1);
        let result = if support.is_equal_to(&v1, &v2) {
            Ordering::Equal
        } else if support.is_less_than(&v1, &v2) {
            Ordering::Less
        } else if support.is_greater_than(&v1, &v2) {
            Ordering::Greater
        } else {
            type_rank(&v1)
                .cmp(&type_rank(&v2))
                .then_with(|| v1.to_text().cmp(&v2.to_text()))
        };
        match ascending {
            true => result,
            false => result.reverse(),
        }
    }

    /// Stable in-place sort.
    pub fn sort<T: KeyValueCoding + Clone>(&self, items: &mut [T]) {
        merge_sort_by(items, &mut |a: &T, b: &T| self.compare(a, b));
    }
}

fn resolve(key: &Key, object: &dyn KeyValueCoding) -> Value {
    key.value_in(object).unwrap_or_else(|e| {
        log::debug!("{e}; sorting as null");
        Value::Null
    })
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Date(_) | Value::Calendar(_) => 4,
        Value::Range(_) => 5,
        Value::Array(_) => 6,
        Value::Object(_) => 7,
        Value::Custom(_) => 8,
    }
}

// The string coercion above is not transitive, so the sort must tolerate
// inconsistent comparisons.
fn merge_sort_by<T: Clone>(items: &mut [T], cmp: &mut dyn FnMut(&T, &T) -> Ordering) {
    let len = items.len();
    if len <= 16 {
        for i in 1..len {
            let mut j = i;
            while j > 0 && cmp(&items[j - 1], &items[j]) == Ordering::Greater {
                items.swap(j - 1, j);
                j -= 1;
            }
        }
        return;
    }
    let mid = len / 2;
    merge_sort_by(&mut items[..mid], cmp);
    merge_sort_by(&mut items[mid..], cmp);

    let mut merged = Vec::with_capacity(len);
    {
        let (left, right) = items.split_at(mid);
        let (mut i, mut j) = (0, 0);
        while i < left.len() && j < right.len() {
            if cmp(&right[j], &left[i]) == Ordering::Less {
                merged.push(right[j].clone());
                j += 1;
            } else {
                merged.push(left[i].clone());
                i += 1;
            }
        }
        merged.extend_from_slice(&left[i..]);
        merged.extend_from_slice(&right[j..]);
    }
    items.clone_from_slice(&merged);
}

/// Sorts `items` in place by `orderings` with the default registry.
pub fn sort_slice<T: KeyValueCoding + Clone>(items: &mut [T], orderings: &[SortOrdering]) {
    SortOrderingComparator::new(orderings).sort(items);
}

/// Sorted copy of `items`.
pub fn sorted<T: KeyValueCoding + Clone>(items: &[T], orderings: &[SortOrdering]) -> Vec<T> {
    let mut copy = items.to_vec();
    sort_slice(&mut copy, orderings);
    copy
}
