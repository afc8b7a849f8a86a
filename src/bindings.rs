// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Substitution of qualifier variables from a bindings source.

use crate::ast::*;
use crate::error::UnknownBindingError;
use crate::key::Variable;
use crate::kvc::KeyValueCoding;
use crate::value::Value;

/// `Null` and unknown keys both count as "not found".
fn lookup(bindings: &dyn KeyValueCoding, var: &Variable) -> Option<Value> {
    match bindings.value_for_key_path(var.name()) {
        Ok(Value::Null) => None,
        Ok(v) => Some(v),
        Err(e) => {
            log::debug!("binding `{}` not resolvable: {e}", var.name());
            None
        }
    }
}

fn missing(var: &Variable, requires_all: bool) -> Result<Option<Qualifier>, UnknownBindingError> {
    match requires_all {
        true => Err(UnknownBindingError {
            name: var.name().to_string(),
        }),
        false => Ok(None),
    }
}

impl Qualifier {
    /// Copy of the qualifier with variables replaced by values from
    /// `bindings`.
    ///
    /// When a variable has no value and `requires_all` is set, binding
    /// fails. Otherwise the clause holding it is dropped. A compound left
    /// with one child collapses to it; with none it is absent (`Ok(None)`).
    /// Absence passes through `Not` unchanged.
    pub fn qualifier_with_bindings(
        &self,
        bindings: &dyn KeyValueCoding,
        requires_all: bool,
    ) -> Result<Option<Qualifier>, UnknownBindingError> {
        match self {
            Qualifier::KeyValue(kv) => {
                let Operand::Variable(var) = &kv.operand else {
                    return Ok(Some(self.clone()));
                };
                match lookup(bindings, var) {
                    Some(value) => Ok(Some(Qualifier::KeyValue(KeyValueQualifier {
                        key: kv.key.clone(),
                        operator: kv.operator.clone(),
                        operand: Operand::Value(value),
                    }))),
                    None => missing(var, requires_all),
                }
            }
            Qualifier::And(children) | Qualifier::Or(children) => match children.as_slice() {
                [] => Ok(Some(self.clone())),
                [only] => only.qualifier_with_bindings(bindings, requires_all),
                _ => {
                    let mut bound = Vec::with_capacity(children.len());
                    for child in children {
                        if let Some(q) = child.qualifier_with_bindings(bindings, requires_all)? {
                            bound.push(q);
                        }
                    }
                    if bound.len() < 2 {
                        return Ok(bound.pop());
                    }
                    if bound == *children {
                        return Ok(Some(self.clone()));
                    }
                    Ok(Some(match self {
                        Qualifier::And(_) => Qualifier::and(bound),
                        _ => Qualifier::or(bound),
                    }))
                }
            },
            Qualifier::Not(inner) => Ok(inner
                .qualifier_with_bindings(bindings, requires_all)?
                .map(|q| Qualifier::Not(Box::new(q)))),
            Qualifier::RawSql(sql) => {
                let mut parts = Vec::with_capacity(sql.parts.len());
                for part in &sql.parts {
                    match part {
                        SqlPart::Variable(var) => match lookup(bindings, var) {
                            Some(value) => parts.push(SqlPart::Value(value)),
                            None => return missing(var, requires_all),
                        },
                        p => parts.push(p.clone()),
                    }
                }
                Ok(Some(Qualifier::RawSql(SqlQualifier { parts })))
            }
            _ => Ok(Some(self.clone())),
        }
    }
}
