// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod bindings;
mod comparison;
mod datasource;
mod error;
mod fetch;
mod formatter;
mod interpreter;
mod key;
mod kvc;
mod lexer;
mod number;
mod operators;
mod parser;
mod registry;
mod sort;
mod timerange;
mod value;

pub use ast::{
    ComparisonOperator, CsvQualifier, KeyComparisonQualifier, KeyValueQualifier, Operand,
    OverlapsQualifier, Qualifier, RegexQualifier, SqlPart, SqlQualifier,
};
pub use comparison::{
    like_match, BooleanComparison, CollectionComparison, ComparisonRegistry, ComparisonSupport,
    DateComparison, DefaultComparison, StringComparison,
};
pub use datasource::ArrayDataSource;
pub use error::{
    EvalError, ParseError, QualifierError, SortSelectorError, UnknownBindingError,
    UnknownKeyError, UnsupportedOperatorError,
};
pub use fetch::{
    FetchSpecification, BIND_PATTERN_SUFFIX, COUNT_PATTERN, CUSTOM_QUERY_EXPRESSION_HINT_KEY,
};
pub use formatter::format_with_bindings;
pub use interpreter::Evaluator;
pub use key::{Key, Variable};
pub use kvc::{KeyValueCoding, NoBindings};
pub use number::Number;
pub use operators::{ExtendedOperatorFn, ExtendedOperatorRegistry};
pub use parser::{parse_qualifier, QualifierParser};
pub use registry::{instances, Registry, RegistryError};
pub use sort::{sort_slice, sorted, SortOrdering, SortOrderingComparator, SortSelector};
pub use timerange::TimeRange;
pub use value::{types, CustomValue, Value};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::lexer::*;
}

#[cfg(test)]
mod tests;
