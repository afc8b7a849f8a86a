// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::Qualifier;
use crate::comparison::ComparisonRegistry;
use crate::error::EvalError;
use crate::fetch::FetchSpecification;
use crate::interpreter::Evaluator;
use crate::kvc::KeyValueCoding;
use crate::registry::instances::DEFAULT_COMPARISON_REGISTRY;
use crate::sort::SortOrderingComparator;

/// Data source over an in-memory list of objects.
///
/// Fetches filter by the specification's qualifier and the auxiliary
/// qualifier, sort, then apply offset and limit.
pub struct ArrayDataSource<'r, T> {
    objects: Vec<T>,
    fetch_specification: Option<FetchSpecification>,
    auxiliary_qualifier: Option<Qualifier>,
    registry: &'r ComparisonRegistry,
}

impl<T: KeyValueCoding + Clone> ArrayDataSource<'static, T> {
    pub fn new(objects: Vec<T>) -> Self {
        Self::with_registry(objects, &*DEFAULT_COMPARISON_REGISTRY)
    }
}

impl<'r, T: KeyValueCoding + Clone> ArrayDataSource<'r, T> {
    pub fn with_registry(objects: Vec<T>, registry: &'r ComparisonRegistry) -> Self {
        Self {
            objects,
            fetch_specification: None,
            auxiliary_qualifier: None,
            registry,
        }
    }

    pub fn objects(&self) -> &[T] {
        &self.objects
    }

    pub fn set_objects(&mut self, objects: Vec<T>) {
        self.objects = objects;
    }

    pub fn fetch_specification(&self) -> Option<&FetchSpecification> {
        self.fetch_specification.as_ref()
    }

    pub fn set_fetch_specification(&mut self, fetch_specification: Option<FetchSpecification>) {
        self.fetch_specification = fetch_specification;
    }

    pub fn auxiliary_qualifier(&self) -> Option<&Qualifier> {
        self.auxiliary_qualifier.as_ref()
    }

    pub fn set_auxiliary_qualifier(&mut self, qualifier: Option<Qualifier>) {
        self.auxiliary_qualifier = qualifier;
    }

    /// Objects selected by the current fetch specification. Without one,
    /// all objects are returned.
    pub fn fetch_objects(&self) -> Result<Vec<T>, EvalError> {
        let evaluator = Evaluator::new(self.registry);
        let fs = self.fetch_specification.as_ref();

        let mut result = self.objects.clone();
        let qualifiers = [fs.and_then(|fs| fs.qualifier.as_ref()), self.auxiliary_qualifier.as_ref()];
        for qualifier in qualifiers.into_iter().flatten() {
            result = evaluator.filter(qualifier, &result)?;
        }

        let Some(fs) = fs else {
            return Ok(result);
        };
        if !fs.sort_orderings.is_empty() {
            SortOrderingComparator::with_registry(&fs.sort_orderings, self.registry).sort(&mut result);
        }

        let offset = fs.fetch_offset.min(result.len());
        let end = match fs.fetch_limit {
            0 => result.len(),
            limit => offset.saturating_add(limit).min(result.len()),
        };
        Ok(result.drain(offset..end).collect())
    }
}
