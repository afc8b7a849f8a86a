// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{anyhow, bail, Result};
use qualifier_engine::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    qualifier: String,
    #[serde(default)]
    args: Vec<Value>,
    objects: Vec<Value>,
    #[serde(default)]
    expected: Vec<bool>,
    error: Option<String>,
    #[serde(default = "default_true")]
    round_trip: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn evaluate_all(q: &Qualifier, objects: &[Value]) -> Result<Vec<bool>, EvalError> {
    objects.iter().map(|o| q.evaluate_with_object(o)).collect()
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("\ncase {} ", case.note);
        let q = Qualifier::parse(&case.qualifier, &case.args)?;
        match evaluate_all(&q, &case.objects) {
            Ok(results) => {
                if let Some(e) = &case.error {
                    bail!("error `{}` not raised by evaluation.", e);
                }
                if results != case.expected {
                    bail!(
                        "mismatch for `{}`:\nactual   = {:?}\nexpected = {:?}",
                        case.qualifier,
                        results,
                        case.expected
                    );
                }
                if case.round_trip {
                    let repr = q.string_representation();
                    let again = Qualifier::parse(&repr, &[])
                        .map_err(|e| anyhow!("`{repr}` does not parse back: {e}"))?;
                    let again_results = evaluate_all(&again, &case.objects)?;
                    if again_results != results {
                        bail!("`{repr}` evaluates differently from `{}`", case.qualifier);
                    }
                }
            }
            Err(actual) => match &case.error {
                Some(expected) => {
                    let actual = actual.to_string();
                    if !actual.contains(expected) {
                        bail!(
                            "Error message\n`{}\n`\ndoes not contain `{}`",
                            actual,
                            expected
                        );
                    }
                    println!("{actual}");
                }
                _ => return Err(actual.into()),
            },
        }

        println!("passed");
    }

    println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/evaluation/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

fn object(json: serde_json::Value) -> Value {
    Value::from(json)
}

#[test]
fn duck_scenario() -> Result<()> {
    let q = Qualifier::parse("lastname = 'Duck' AND firstname like 'D*'", &[])?;
    let donald = object(serde_json::json!({"lastname": "Duck", "firstname": "Donald"}));
    let huey = object(serde_json::json!({"lastname": "Duck", "firstname": "Huey"}));
    assert!(q.evaluate_with_object(&donald)?);
    assert!(!q.evaluate_with_object(&huey)?);
    Ok(())
}

#[test]
fn flattening_on_construction() {
    let a = Key::new("a").eq(1);
    let b = Key::new("b").eq(2);
    let c = Key::new("c").eq(3);
    assert_eq!(
        Qualifier::and([Qualifier::and([a.clone(), b.clone()]), c.clone()]),
        Qualifier::And(vec![a, b, c])
    );
}

#[test]
fn bind_then_evaluate() -> Result<()> {
    let template = Qualifier::parse("lastname = $lastname AND firstname = $firstname OR salary > $salary", &[])?;
    assert_eq!(template.binding_keys(), ["lastname", "firstname", "salary"]);

    let bindings = object(serde_json::json!({"lastname": "Duck", "salary": 1000}));
    let bound = template
        .qualifier_with_bindings(&bindings, false)?
        .ok_or_else(|| anyhow!("binding dropped everything"))?;
    assert_eq!(bound.to_string(), "lastname = 'Duck' OR salary > 1000");

    let rich = object(serde_json::json!({"lastname": "McDuck", "salary": 1_000_000}));
    assert!(bound.evaluate_with_object(&rich)?);
    assert!(template.qualifier_with_bindings(&bindings, true).is_err());
    Ok(())
}

#[test]
fn filter_with_builders() -> Result<()> {
    let people: Vec<Value> = [("Donald", 40), ("Huey", 8), ("Daisy", 38), ("Scrooge", 75)]
        .into_iter()
        .map(|(name, age)| object(serde_json::json!({"name": name, "age": age})))
        .collect();
    let q = Qualifier::and([
        Key::new("name").like("D*"),
        Key::new("age").between(Some(Value::from(30)), Some(Value::from(39))),
    ]);
    let found = q.filter_collection(&people)?;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].value_for_key("name")?, Value::from("Daisy"));
    Ok(())
}

#[test]
fn shared_evaluator_across_threads() -> Result<()> {
    let q = std::sync::Arc::new(Qualifier::parse("n > 10", &[])?);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let q = std::sync::Arc::clone(&q);
            std::thread::spawn(move || {
                let obj = object(serde_json::json!({ "n": i * 10 }));
                Evaluator::default().evaluate(&q, &obj)
            })
        })
        .collect();
    let results = handles
        .into_iter()
        .map(|h| -> Result<bool> { Ok(h.join().map_err(|_| anyhow!("thread panicked"))??) })
        .collect::<Result<Vec<bool>>>()?;
    assert_eq!(results, [false, false, true, true]);
    Ok(())
}
