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
    fetch: FetchSpecification,
    #[serde(default)]
    bindings: Option<Value>,
    #[serde(default)]
    auxiliary: Option<String>,
    objects: Vec<Value>,
    #[serde(default)]
    expected: Vec<String>,
    error: Option<String>,
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn names(objects: &[Value]) -> Result<Vec<String>> {
    objects
        .iter()
        .map(|o| -> Result<String> { Ok(o.value_for_key("name")?.to_text()) })
        .collect()
}

fn run_case(case: &TestCase) -> Result<Vec<String>> {
    let fetch = match &case.bindings {
        Some(bindings) => case
            .fetch
            .fetch_specification_with_qualifier_bindings(bindings)?
            .ok_or_else(|| anyhow!("bindings removed the whole qualifier"))?,
        None => case.fetch.clone(),
    };
    let mut source = ArrayDataSource::new(case.objects.clone());
    source.set_fetch_specification(Some(fetch));
    if let Some(text) = &case.auxiliary {
        source.set_auxiliary_qualifier(Some(Qualifier::parse(text, &[])?));
    }
    names(&source.fetch_objects()?)
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("\ncase {} ", case.note);
        match run_case(case) {
            Ok(actual) => {
                if let Some(e) = &case.error {
                    bail!("error `{}` not raised.", e);
                }
                if actual != case.expected {
                    bail!(
                        "mismatch:\nactual   = {:?}\nexpected = {:?}",
                        actual,
                        case.expected
                    );
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
                _ => return Err(actual),
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

#[test_resources("tests/fetch/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

#[test]
fn count_specification_of_loaded_json() -> Result<()> {
    let fs = FetchSpecification::from_json_str(
        r#"{"entity_name": "Person", "qualifier": "age > 18", "sort_orderings": [{"key": "name"}]}"#,
    )?;
    let count = fs
        .fetch_specification_for_count()
        .ok_or_else(|| anyhow!("count specification refused"))?;
    assert_eq!(count.hint(CUSTOM_QUERY_EXPRESSION_HINT_KEY), Some(&Value::from(COUNT_PATTERN)));
    assert!(count.sort_orderings.is_empty());
    assert!(count.fetch_specification_for_count().is_none());
    Ok(())
}

#[cfg(feature = "yaml")]
#[test]
fn yaml_round_trip() -> Result<()> {
    let fs = FetchSpecification::with_qualifier_format("Person", "name like %@ AND age >= %d", &[
        Value::from("D*"),
        Value::from(21),
    ])?
    .with_sort_orderings(SortOrdering::parse("-age"))
    .with_limit(5);
    let yaml = serde_yaml::to_string(&fs)?;
    let back = FetchSpecification::from_yaml_str(&yaml)?;
    assert_eq!(back, fs);
    Ok(())
}
