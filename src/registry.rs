// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(missing_debug_implementations)] // registry internals are not debug logged
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;


/// Errors that can occur when interacting with a Registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{registry} registration failed: an item with the name '{name}' is already registered")]
    AlreadyExists { name: Arc<str>, registry: Arc<str> },
    #[error("{registry} registration failed: the name '{name}' is invalid (empty or whitespace-only names are not allowed)")]
    InvalidName { name: Arc<str>, registry: Arc<str> },
}

/// Validates that a name is not empty or whitespace-only.
pub fn validate_name(name: &str, registry_name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        Err(RegistryError::InvalidName {
            name: Arc::from(name),
            registry: Arc::from(registry_name),
        })
    } else {
        Ok(())
    }
}

/// Thread-safe, name-keyed registry of shared items.
///
/// Lookups happen on evaluation hot paths; registration is expected at
/// startup. `T` may be unsized, so trait objects can be stored directly.
pub struct Registry<T: ?Sized> {
    inner: DashMap<Arc<str>, Arc<T>>,
    name: Arc<str>,
}

impl<T: ?Sized> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: self.name.clone(),
        }
    }
}

impl<T: ?Sized> Registry<T> {
    /// Create a new, empty registry with a given name.
    pub fn new(registry_name: impl Into<Arc<str>>) -> Self {
        Self {
            inner: DashMap::new(),
            name: registry_name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register an item with a given name. Returns Err if name already exists.
    pub fn register(&self, name: impl Into<Arc<str>>, item: Arc<T>) -> Result<(), RegistryError> {
        let name = name.into();
        validate_name(&name, &self.name)?;

        use dashmap::mapref::entry::Entry;
        match self.inner.entry(name) {
            Entry::Occupied(e) => Err(RegistryError::AlreadyExists {
                name: e.key().clone(),
                registry: self.name.clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(item);
                Ok(())
            }
        }
    }

    /// Register or replace. Returns the previous item, if any.
    pub fn insert(
        &self,
        name: impl Into<Arc<str>>,
        item: Arc<T>,
    ) -> Result<Option<Arc<T>>, RegistryError> {
        let name = name.into();
        validate_name(&name, &self.name)?;
        Ok(self.inner.insert(name, item))
    }

    /// Register unless the name is taken. Returns whether it was registered.
    pub fn try_register(&self, name: impl Into<Arc<str>>, item: Arc<T>) -> Result<bool, RegistryError> {
        match self.register(name, item) {
            Ok(()) => Ok(true),
            Err(RegistryError::AlreadyExists { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<T>> {
        self.inner.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// First registered item along `names`, in order.
    pub fn first_of<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> Option<Arc<T>> {
        names.into_iter().find_map(|name| self.get(name))
    }

    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        self.inner.remove(name).map(|(_, v)| v)
    }

    pub fn list_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<Arc<str>> = self.inner.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}

/// Global registry instances
pub mod instances {
    use crate::comparison::ComparisonRegistry;

    lazy_static::lazy_static! {
        /// Process-wide comparison registry with the built-in strategies and
        /// extended operators. Hosts may register more at startup.
        pub static ref DEFAULT_COMPARISON_REGISTRY: ComparisonRegistry = ComparisonRegistry::new();
    }
}
