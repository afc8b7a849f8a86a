// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::ast::Qualifier;
use crate::error::{ParseError, UnknownBindingError};
use crate::formatter::format_with_bindings;
use crate::kvc::KeyValueCoding;
use crate::sort::SortOrdering;
use crate::value::Value;

/// Hints whose name ends with this suffix are formatted against bindings.
pub const BIND_PATTERN_SUFFIX: &str = "BindPattern";

/// Hint replacing the generated query with custom SQL.
pub const CUSTOM_QUERY_EXPRESSION_HINT_KEY: &str = "EOCustomQueryExpressionHintKey";

/// Custom query used by [`FetchSpecification::fetch_specification_for_count`].
pub const COUNT_PATTERN: &str = "%(select)s COUNT(*) FROM %(tables)s %(where)s LIMIT 1";

/// Everything needed to run one query: the entity, a qualifier, sort
/// orderings, pagination and store hints.
///
/// A `fetch_limit` of 0 means no limit. Serialized specifications carry the
/// qualifier in its textual form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FetchSpecification {
    pub entity_name: Option<String>,
    pub fetch_attribute_names: Vec<String>,
    #[serde(with = "qualifier_text")]
    pub qualifier: Option<Qualifier>,
    pub sort_orderings: Vec<SortOrdering>,
    pub fetch_limit: usize,
    pub fetch_offset: usize,
    pub hints: BTreeMap<String, Value>,
    pub uses_distinct: bool,
    pub deep: bool,
    pub fetches_raw_rows: bool,
    pub fetches_read_only: bool,
    pub locks_objects: bool,
    pub requires_all_qualifier_binding_variables: bool,
    pub prefetching_relationship_key_paths: Vec<String>,
}

impl FetchSpecification {
    pub fn new(
        entity_name: impl Into<String>,
        qualifier: Option<Qualifier>,
        sort_orderings: Vec<SortOrdering>,
    ) -> Self {
        Self {
            entity_name: Some(entity_name.into()),
            qualifier,
            sort_orderings,
            ..Self::default()
        }
    }

    /// Specification for `entity_name` with a qualifier parsed from
    /// `format`.
    pub fn with_qualifier_format(
        entity_name: impl Into<String>,
        format: &str,
        args: &[Value],
    ) -> Result<Self, ParseError> {
        Ok(Self::new(entity_name, Some(Qualifier::parse(format, args)?), vec![]))
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.fetch_offset = offset;
        self
    }

    pub fn with_sort_orderings(mut self, orderings: Vec<SortOrdering>) -> Self {
        self.sort_orderings = orderings;
        self
    }

    pub fn with_hint(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_hint(name, value);
        self
    }

    pub fn set_hint(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.hints.insert(name.into(), value.into());
    }

    pub fn hint(&self, name: &str) -> Option<&Value> {
        self.hints.get(name)
    }

    /// Ands `qualifier` with the current one; without one it is used as-is.
    pub fn conjoin_qualifier(&mut self, qualifier: Qualifier) {
        self.qualifier = Qualifier::conjoin([self.qualifier.take(), Some(qualifier)]);
    }

    /// Ors `qualifier` with the current one; without one it is used as-is.
    pub fn disjoin_qualifier(&mut self, qualifier: Qualifier) {
        self.qualifier = Qualifier::disjoin([self.qualifier.take(), Some(qualifier)]);
    }

    pub fn conjoin_qualifier_format(&mut self, format: &str, args: &[Value]) -> Result<(), ParseError> {
        self.conjoin_qualifier(Qualifier::parse(format, args)?);
        Ok(())
    }

    pub fn disjoin_qualifier_format(&mut self, format: &str, args: &[Value]) -> Result<(), ParseError> {
        self.disjoin_qualifier(Qualifier::parse(format, args)?);
        Ok(())
    }

    /// Variables of the qualifier that still need values.
    pub fn binding_keys(&self) -> Vec<String> {
        self.qualifier
            .as_ref()
            .map(Qualifier::binding_keys)
            .unwrap_or_default()
    }

    /// Copy of the hints where every `<name>BindPattern` hint is replaced
    /// by `<name>`, holding the pattern formatted against `bindings`.
    ///
    /// A pattern that cannot be formatted yields a `Null` hint.
    pub fn resolve_hint_bind_patterns(&self, bindings: &dyn KeyValueCoding) -> BTreeMap<String, Value> {
        let mut resolved = self.hints.clone();
        for (name, pattern) in &self.hints {
            let Some(base) = name.strip_suffix(BIND_PATTERN_SUFFIX) else {
                continue;
            };
            resolved.remove(name);
            let value = match format_with_bindings(&pattern.to_text(), bindings) {
                Some(text) => Value::from(text),
                None => Value::Null,
            };
            resolved.insert(base.to_string(), value);
        }
        resolved
    }

    /// Copy with qualifier variables and bind pattern hints resolved.
    ///
    /// Uses [`requires_all_qualifier_binding_variables`] for the binding
    /// mode. `Ok(None)` means the qualifier bound to nothing.
    ///
    /// [`requires_all_qualifier_binding_variables`]: FetchSpecification::requires_all_qualifier_binding_variables
    pub fn fetch_specification_with_qualifier_bindings(
        &self,
        bindings: &dyn KeyValueCoding,
    ) -> Result<Option<Self>, UnknownBindingError> {
        let hints = self.resolve_hint_bind_patterns(bindings);
        let qualifier = match &self.qualifier {
            None => None,
            Some(q) => match q.qualifier_with_bindings(bindings, self.requires_all_qualifier_binding_variables)? {
                None => return Ok(None),
                bound => bound,
            },
        };
        Ok(Some(Self {
            qualifier,
            hints,
            ..self.clone()
        }))
    }

    /// Copy that counts rows instead of fetching them.
    ///
    /// `None` when a custom query hint is already set.
    pub fn fetch_specification_for_count(&self) -> Option<Self> {
        let custom_pattern = format!("{CUSTOM_QUERY_EXPRESSION_HINT_KEY}{BIND_PATTERN_SUFFIX}");
        if self.hints.contains_key(CUSTOM_QUERY_EXPRESSION_HINT_KEY) || self.hints.contains_key(&custom_pattern) {
            log::error!("fetch specification already has a custom query hint, cannot apply a count hint");
            return None;
        }
        let mut count = self.clone();
        count.set_hint(CUSTOM_QUERY_EXPRESSION_HINT_KEY, COUNT_PATTERN);
        count.fetches_raw_rows = true;
        count.sort_orderings.clear();
        Some(count)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }
}

mod qualifier_text {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::ast::Qualifier;

    pub fn serialize<S: Serializer>(qualifier: &Option<Qualifier>, serializer: S) -> Result<S::Ok, S::Error> {
        match qualifier {
            Some(q) => serializer.serialize_some(&q.string_representation()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Qualifier>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|text| Qualifier::parse(&text, &[]).map_err(de::Error::custom))
            .transpose()
    }
}
