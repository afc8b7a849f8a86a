// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::comparison::ComparisonRegistry;
use crate::error::EvalError;
use crate::key::Key;
use crate::kvc::KeyValueCoding;
use crate::registry::instances::DEFAULT_COMPARISON_REGISTRY;
use crate::timerange::TimeRange;
use crate::value::Value;

use log::{debug, warn};

/// Evaluates qualifiers against candidate objects.
///
/// Data-shape mismatches (missing keys, wrong types) never fail; they
/// simply do not match. The only error is asking to evaluate raw SQL.
#[derive(Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r ComparisonRegistry,
}

impl Default for Evaluator<'static> {
    fn default() -> Self {
        Self {
            registry: &*DEFAULT_COMPARISON_REGISTRY,
        }
    }
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r ComparisonRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'r ComparisonRegistry {
        self.registry
    }

    pub fn evaluate(&self, qualifier: &Qualifier, object: &dyn KeyValueCoding) -> Result<bool, EvalError> {
        match qualifier {
            Qualifier::Boolean(b) => Ok(*b),
            Qualifier::And(children) => {
                for child in children {
                    if !self.evaluate(child, object)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Qualifier::Or(children) => {
                for child in children {
                    if self.evaluate(child, object)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Qualifier::Not(inner) => Ok(!self.evaluate(inner, object)?),
            Qualifier::KeyValue(kv) => Ok(self.eval_key_value(kv, object)),
            Qualifier::KeyComparison(kc) => {
                let left = resolve(&kc.left, object);
                let right = resolve(&kc.right, object);
                Ok(self.registry.compare(&kc.operator, &left, &right))
            }
            Qualifier::RegexMatch(rq) => Ok(match resolve(rq.key(), object) {
                Value::Null => false,
                v => rq.is_full_match(&v.to_text()),
            }),
            Qualifier::CsvContains(csv) => Ok(eval_csv(csv, object)),
            Qualifier::Overlaps(oq) => Ok(eval_overlaps(oq, object)),
            Qualifier::RawSql(_) => Err(EvalError::NotEvaluable(qualifier.string_representation())),
        }
    }

    /// Items of `items` for which `qualifier` holds, in order.
    pub fn filter<T>(&self, qualifier: &Qualifier, items: &[T]) -> Result<Vec<T>, EvalError>
    where
        T: KeyValueCoding + Clone,
    {
        let mut matched = vec![];
        for item in items {
            if self.evaluate(qualifier, item)? {
                matched.push(item.clone());
            }
        }
        Ok(matched)
    }

    fn eval_key_value(&self, kv: &KeyValueQualifier, object: &dyn KeyValueCoding) -> bool {
        let rhs = match &kv.operand {
            Operand::Value(v) => v,
            Operand::Variable(var) => {
                warn!("qualifier `{}` has unbound variable {var}; treating as no match", kv.key);
                return false;
            }
        };
        let lhs = resolve(&kv.key, object);
        self.registry.compare(&kv.operator, &lhs, rhs)
    }
}

/// Unknown keys read as `Null`.
fn resolve(key: &Key, object: &dyn KeyValueCoding) -> Value {
    match key.value_in(object) {
        Ok(v) => v,
        Err(e) => {
            debug!("{e}; using null");
            Value::Null
        }
    }
}

fn eval_csv(csv: &CsvQualifier, object: &dyn KeyValueCoding) -> bool {
    let text = match resolve(&csv.key, object) {
        Value::Null => return csv.values.is_empty(),
        v => v.to_text(),
    };
    let columns: Vec<&str> = match csv.separator.is_empty() {
        true => vec![text.as_str()],
        false => text.split(csv.separator.as_str()).collect(),
    };
    let present = |v: &String| columns.contains(&v.as_str());
    match csv.match_any {
        true => csv.values.iter().any(present),
        false => csv.values.iter().all(present),
    }
}

fn eval_overlaps(oq: &OverlapsQualifier, object: &dyn KeyValueCoding) -> bool {
    if let Some(range_key) = &oq.range_key {
        return match resolve(range_key, object) {
            Value::Range(r) => r.overlaps(&oq.range),
            v => {
                debug!("`{range_key}` is not a time range ({})", v.type_name());
                false
            }
        };
    }
    let instant = |key: &Option<Key>| {
        key.as_ref()
            .and_then(|k| resolve(k, object).timestamp_millis())
    };
    match (instant(&oq.start_key), instant(&oq.end_key)) {
        (None, None) => false,
        (start, end) => TimeRange::new(start.unwrap_or(i64::MIN), end.unwrap_or(i64::MAX)).overlaps(&oq.range),
    }
}

impl Qualifier {
    /// Evaluates against `object` with the shared default registry.
    pub fn evaluate_with_object(&self, object: &dyn KeyValueCoding) -> Result<bool, EvalError> {
        Evaluator::default().evaluate(self, object)
    }

    pub fn filter_collection<T>(&self, items: &[T]) -> Result<Vec<T>, EvalError>
    where
        T: KeyValueCoding + Clone,
    {
        Evaluator::default().filter(self, items)
    }
}
