// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Qualifier syntax tree.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::key::{Key, Variable};
use crate::timerange::TimeRange;
use crate::value::Value;

mod display;


#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    EqualTo,
    NotEqualTo,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    Like,
    CaseInsensitiveLike,
    /// Named operator such as `hasPrefix:`, dispatched on the left value.
    Extended(Arc<str>),
}

impl ComparisonOperator {
    /// Maps operator text to an operator. Unknown text is an extended
    /// operator.
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol {
            "=" | "==" => Self::EqualTo,
            "!=" | "<>" => Self::NotEqualTo,
            ">" => Self::GreaterThan,
            ">=" | "=>" => Self::GreaterThanOrEqual,
            "<" => Self::LessThan,
            "<=" | "=<" => Self::LessThanOrEqual,
            "IN" => Self::Contains,
            "ilike" | "caseInsensitiveLike" | "caseInsensitiveLike:" => Self::CaseInsensitiveLike,
            s if s.eq_ignore_ascii_case("like") => Self::Like,
            s => Self::Extended(s.into()),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Self::EqualTo => "=",
            Self::NotEqualTo => "!=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::Contains => "IN",
            Self::Like => "LIKE",
            Self::CaseInsensitiveLike => "caseInsensitiveLike:",
            Self::Extended(name) => name,
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }
}

/// Right-hand side of a key/value comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Value(Value),
    Variable(Variable),
}

impl Operand {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Variable(_) => None,
        }
    }

    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Operand::Variable(v) => Some(v),
            Operand::Value(_) => None,
        }
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl From<Variable> for Operand {
    fn from(v: Variable) -> Self {
        Operand::Variable(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyValueQualifier {
    pub key: Key,
    pub operator: ComparisonOperator,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyComparisonQualifier {
    pub left: Key,
    pub operator: ComparisonOperator,
    pub right: Key,
}

/// Full-string regular expression match on a key's text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RegexRepr", into = "RegexRepr")]
pub struct RegexQualifier {
    key: Key,
    pattern: String,
    matcher: Regex,
}

#[derive(Serialize, Deserialize)]
struct RegexRepr {
    key: Key,
    pattern: String,
}

impl RegexQualifier {
    pub fn new(key: impl Into<Key>, pattern: &str) -> Result<Self, regex::Error> {
        let matcher = Regex::new(&format!("^(?:{pattern})$")).inspect_err(|e| {
            log::error!("could not compile regex `{pattern}`: {e}");
        })?;
        Ok(Self {
            key: key.into(),
            pattern: pattern.to_string(),
            matcher,
        })
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_full_match(&self, text: &str) -> bool {
        self.matcher.is_match(text)
    }
}

impl PartialEq for RegexQualifier {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.pattern == other.pattern
    }
}

impl TryFrom<RegexRepr> for RegexQualifier {
    type Error = regex::Error;

    fn try_from(repr: RegexRepr) -> Result<Self, Self::Error> {
        RegexQualifier::new(repr.key, &repr.pattern)
    }
}

impl From<RegexQualifier> for RegexRepr {
    fn from(q: RegexQualifier) -> Self {
        RegexRepr {
            key: q.key,
            pattern: q.pattern,
        }
    }
}

/// Membership test against a separator-joined text column.
///
/// Values cannot contain the separator; there is no escaping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvQualifier {
    pub key: Key,
    pub values: Vec<String>,
    pub separator: String,
    pub match_any: bool,
}

impl CsvQualifier {
    pub const DEFAULT_SEPARATOR: &'static str = ",";

    /// All of `values` must be present, separated by `,`.
    pub fn new<I, S>(key: impl Into<Key>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
            separator: Self::DEFAULT_SEPARATOR.to_string(),
            match_any: false,
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn matching_any(mut self, match_any: bool) -> Self {
        self.match_any = match_any;
        self
    }

    /// Equivalent qualifier built from `=` and `LIKE` clauses.
    ///
    /// Each value matches when it is the whole column, the first, the last
    /// or an inner element. Per-value terms are joined with `OR` when any
    /// value may match and with `AND` otherwise.
    pub fn rewrite_as_plain_qualifier(&self) -> Qualifier {
        let sep = &self.separator;
        let terms = self.values.iter().map(|v| {
            Some(Qualifier::or([
                self.clause(ComparisonOperator::EqualTo, v.clone()),
                self.clause(ComparisonOperator::Like, format!("{v}{sep}*")),
                self.clause(ComparisonOperator::Like, format!("*{sep}{v}")),
                self.clause(ComparisonOperator::Like, format!("*{sep}{v}{sep}*")),
            ]))
        });
        let plain = match self.match_any {
            true => Qualifier::disjoin(terms),
            false => Qualifier::conjoin(terms),
        };
        // No values: nothing intersects, everything is a superset.
        plain.unwrap_or(Qualifier::Boolean(!self.match_any))
    }

    fn clause(&self, operator: ComparisonOperator, pattern: String) -> Qualifier {
        Qualifier::key_value(self.key.clone(), operator, Value::from(pattern))
    }
}

/// Interval overlap against a fixed range.
///
/// The candidate interval comes either from a start/end key pair or from a
/// single key holding a [`TimeRange`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapsQualifier {
    pub start_key: Option<Key>,
    pub end_key: Option<Key>,
    pub range_key: Option<Key>,
    pub range: TimeRange,
}

impl OverlapsQualifier {
    pub fn new(start_key: Option<Key>, end_key: Option<Key>, range: TimeRange) -> Self {
        Self {
            start_key,
            end_key,
            range_key: None,
            range,
        }
    }

    pub fn with_range_key(range_key: impl Into<Key>, range: TimeRange) -> Self {
        Self {
            start_key: None,
            end_key: None,
            range_key: Some(range_key.into()),
            range,
        }
    }

    /// `start < range.end AND end >= range.start`. A range-valued key has
    /// no plain equivalent.
    pub fn rewrite_as_plain_qualifier(&self) -> Option<Qualifier> {
        if self.range_key.is_some() {
            log::debug!("overlaps on range key cannot be rewritten as plain qualifier");
            return None;
        }
        // Open bounds constrain nothing.
        let bound = |ms: i64| match ms {
            i64::MIN | i64::MAX => None,
            ms => chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ms).map(Value::Date),
        };
        let starts_before = self.start_key.as_ref().and_then(|k| {
            let end = bound(self.range.end())?;
            Some(Qualifier::key_value(k.clone(), ComparisonOperator::LessThan, end))
        });
        let ends_after = self.end_key.as_ref().and_then(|k| {
            let start = bound(self.range.start())?;
            Some(Qualifier::key_value(k.clone(), ComparisonOperator::GreaterThanOrEqual, start))
        });
        Qualifier::conjoin([starts_before, ends_after])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlPart {
    Text(String),
    Variable(Variable),
    /// A variable after binding.
    Value(Value),
}

/// Opaque SQL text with interpolated variables. Only serializable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlQualifier {
    pub parts: Vec<SqlPart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Qualifier {
    Boolean(bool),
    KeyValue(KeyValueQualifier),
    KeyComparison(KeyComparisonQualifier),
    And(Vec<Qualifier>),
    Or(Vec<Qualifier>),
    Not(Box<Qualifier>),
    RegexMatch(RegexQualifier),
    CsvContains(CsvQualifier),
    Overlaps(OverlapsQualifier),
    RawSql(SqlQualifier),
}

impl Qualifier {
    pub fn key_value(key: impl Into<Key>, operator: ComparisonOperator, operand: impl Into<Operand>) -> Self {
        Qualifier::KeyValue(KeyValueQualifier {
            key: key.into(),
            operator,
            operand: operand.into(),
        })
    }

    pub fn key_comparison(left: impl Into<Key>, operator: ComparisonOperator, right: impl Into<Key>) -> Self {
        Qualifier::KeyComparison(KeyComparisonQualifier {
            left: left.into(),
            operator,
            right: right.into(),
        })
    }

    /// Children that are `And` nodes themselves are merged in.
    pub fn and<I: IntoIterator<Item = Qualifier>>(children: I) -> Self {
        let mut flat = vec![];
        for child in children {
            match child {
                Qualifier::And(grandchildren) => flat.extend(grandchildren),
                q => flat.push(q),
            }
        }
        Qualifier::And(flat)
    }

    /// Children that are `Or` nodes themselves are merged in.
    pub fn or<I: IntoIterator<Item = Qualifier>>(children: I) -> Self {
        let mut flat = vec![];
        for child in children {
            match child {
                Qualifier::Or(grandchildren) => flat.extend(grandchildren),
                q => flat.push(q),
            }
        }
        Qualifier::Or(flat)
    }

    /// Negation; `not(Not(q))` is `q`.
    pub fn not(qualifier: Qualifier) -> Self {
        match qualifier {
            Qualifier::Not(inner) => *inner,
            q => Qualifier::Not(Box::new(q)),
        }
    }

    pub fn regex(key: impl Into<Key>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Qualifier::RegexMatch(RegexQualifier::new(key, pattern)?))
    }

    /// `And` of the present qualifiers. A single survivor is returned
    /// as-is; none at all is absence.
    pub fn conjoin<I: IntoIterator<Item = Option<Qualifier>>>(qualifiers: I) -> Option<Self> {
        let mut present: Vec<Qualifier> = qualifiers.into_iter().flatten().collect();
        match present.len() {
            0 => None,
            1 => present.pop(),
            _ => Some(Qualifier::and(present)),
        }
    }

    /// `Or` counterpart of [`conjoin`](Qualifier::conjoin).
    pub fn disjoin<I: IntoIterator<Item = Option<Qualifier>>>(qualifiers: I) -> Option<Self> {
        let mut present: Vec<Qualifier> = qualifiers.into_iter().flatten().collect();
        match present.len() {
            0 => None,
            1 => present.pop(),
            _ => Some(Qualifier::or(present)),
        }
    }

    /// `k1 = v1 AND k2 = v2 ...`
    pub fn qualifier_to_match_all_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        Qualifier::and(
            values
                .into_iter()
                .map(|(k, v)| Qualifier::key_value(k, ComparisonOperator::EqualTo, Operand::Value(v.into()))),
        )
    }

    /// `k1 = v1 OR k2 = v2 ...`
    pub fn qualifier_to_match_any_value<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Key>,
        V: Into<Value>,
    {
        Qualifier::or(
            values
                .into_iter()
                .map(|(k, v)| Qualifier::key_value(k, ComparisonOperator::EqualTo, Operand::Value(v.into()))),
        )
    }

    /// `key = v1 OR key = v2 ...`
    pub fn match_any_value<I, V>(key: impl Into<Key>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let key = key.into();
        Qualifier::or(
            values
                .into_iter()
                .map(|v| Qualifier::key_value(key.clone(), ComparisonOperator::EqualTo, Operand::Value(v.into()))),
        )
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, Qualifier::And(_) | Qualifier::Or(_))
    }

    /// Direct children of compound and negation nodes.
    pub fn children(&self) -> &[Qualifier] {
        match self {
            Qualifier::And(children) | Qualifier::Or(children) => children,
            Qualifier::Not(inner) => core::slice::from_ref(inner.as_ref()),
            _ => &[],
        }
    }

    /// Names of all unresolved variables, in order of first appearance.
    pub fn binding_keys(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut names = vec![];
        self.visit(&mut |q| {
            let vars: Vec<&Variable> = match q {
                Qualifier::KeyValue(kv) => kv.operand.as_variable().into_iter().collect(),
                Qualifier::RawSql(sql) => sql
                    .parts
                    .iter()
                    .filter_map(|p| match p {
                        SqlPart::Variable(v) => Some(v),
                        _ => None,
                    })
                    .collect(),
                _ => vec![],
            };
            for v in vars {
                if seen.insert(v.name().to_string()) {
                    names.push(v.name().to_string());
                }
            }
        });
        names
    }

    pub fn has_unresolved_bindings(&self) -> bool {
        !self.binding_keys().is_empty()
    }

    /// Key compared against the variable named `name`, if any.
    pub fn key_path_for_binding_key(&self, name: &str) -> Option<Key> {
        let mut found = None;
        self.visit(&mut |q| {
            if found.is_some() {
                return;
            }
            if let Qualifier::KeyValue(kv) = q {
                if kv.operand.as_variable().is_some_and(|v| v.name() == name) {
                    found = Some(kv.key.clone());
                }
            }
        });
        found
    }

    /// Every key path the qualifier reads.
    pub fn all_qualifier_keys(&self) -> BTreeSet<String> {
        let mut keys = BTreeSet::new();
        self.visit(&mut |q| {
            let mut add = |k: &Key| {
                keys.insert(k.path().to_string());
            };
            match q {
                Qualifier::KeyValue(kv) => add(&kv.key),
                Qualifier::KeyComparison(kc) => {
                    add(&kc.left);
                    add(&kc.right);
                }
                Qualifier::RegexMatch(r) => add(r.key()),
                Qualifier::CsvContains(csv) => add(&csv.key),
                Qualifier::Overlaps(o) => {
                    for k in [&o.start_key, &o.end_key, &o.range_key].into_iter().flatten() {
                        add(k);
                    }
                }
                _ => (),
            }
        });
        keys
    }

    fn visit(&self, f: &mut dyn FnMut(&Qualifier)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }
}

impl From<bool> for Qualifier {
    fn from(b: bool) -> Self {
        Qualifier::Boolean(b)
    }
}

impl From<BTreeMap<String, Value>> for Qualifier {
    /// All entries must match.
    fn from(values: BTreeMap<String, Value>) -> Self {
        Qualifier::qualifier_to_match_all_values(values)
    }
}
