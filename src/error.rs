// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error taxonomy of the qualifier engine.

use thiserror::Error;

use crate::registry::RegistryError;

/// Malformed qualifier text.
///
/// `offset` is the character index where parsing stopped; `line` and `col`
/// are 1-based. `context` holds a caret snippet pointing at that location.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}{context}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
    pub line: usize,
    pub col: usize,
    pub context: String,
}

/// A variable could not be resolved while all bindings were required.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing binding for qualifier variable `${name}`")]
pub struct UnknownBindingError {
    pub name: String,
}

/// An extended operator has no registered implementation for the operands.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported operator `{operator}` for receiver of type `{receiver}`")]
pub struct UnsupportedOperatorError {
    pub operator: String,
    pub receiver: String,
}

/// Raised by key-value coding when an object has no such key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown key `{key}` on value of type `{type_name}`")]
pub struct UnknownKeyError {
    pub key: String,
    pub type_name: String,
}

impl UnknownKeyError {
    pub fn new(key: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            type_name: type_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("raw SQL qualifier `{0}` cannot be evaluated in memory")]
    NotEvaluable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid sort selector `{0}` (expected ASC, DESC, IASC or IDESC)")]
pub struct SortSelectorError(pub String);

/// Umbrella error for callers that mix parsing, binding and evaluation.
#[derive(Debug, Error)]
pub enum QualifierError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    UnknownBinding(#[from] UnknownBindingError),
    #[error(transparent)]
    UnsupportedOperator(#[from] UnsupportedOperatorError),
    #[error(transparent)]
    UnknownKey(#[from] UnknownKeyError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    SortSelector(#[from] SortSelectorError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
}
