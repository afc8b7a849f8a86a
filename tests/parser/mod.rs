// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{anyhow, bail, Result};
use qualifier_engine::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

macro_rules! my_assert_eq {
    ($left:expr, $right:expr, $($arg:tt)+) => {
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    return Err(anyhow!("mismatch:\nleft  = {}\nright = {}\n{}",
                                       &$left, &$right, format_args!($($arg)+)));
                }
            }
        }
    }
}

#[derive(Serialize, Deserialize, PartialEq, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    text: String,
    #[serde(default)]
    args: Vec<Value>,
    repr: Option<String>,
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

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("\ncase {} ", case.note);
        match Qualifier::parse(&case.text, &case.args) {
            Ok(qualifier) => {
                if let Some(e) = &case.error {
                    bail!("error `{}` not raised by parser.", e);
                }
                let repr = qualifier.string_representation();
                if let Some(expected) = &case.repr {
                    my_assert_eq!(repr, *expected, "representation of `{}`", case.text);
                }
                if case.round_trip {
                    let again = Qualifier::parse(&repr, &[])
                        .map_err(|e| anyhow!("`{repr}` does not parse back: {e}"))?;
                    my_assert_eq!(
                        again.string_representation(),
                        repr,
                        "re-parsing `{}`",
                        case.text
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

#[test_resources("tests/parser/cases/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}

fn kv(key: &str, op: ComparisonOperator, value: impl Into<Value>) -> Qualifier {
    Qualifier::key_value(key, op, Operand::Value(value.into()))
}

#[test]
fn mixed_operators_fold_left() -> Result<()> {
    let q = Qualifier::parse("a = 1 AND b = 2 OR c = 3 AND d = 4", &[])?;
    let eq = |k: &str, v: i64| kv(k, ComparisonOperator::EqualTo, v);
    let expected = Qualifier::And(vec![
        Qualifier::Or(vec![Qualifier::And(vec![eq("a", 1), eq("b", 2)]), eq("c", 3)]),
        eq("d", 4),
    ]);
    assert_eq!(q, expected);
    Ok(())
}

#[test]
fn pattern_tokens_in_operator_position() -> Result<()> {
    let args = [Value::from("lastname"), Value::from("5000"), Value::from("<")];
    let q = Qualifier::parse("name = %K AND salary > %d AND startDate %@ endDate", &args)?;
    let Qualifier::And(children) = &q else {
        bail!("expected And, got {q:?}");
    };
    assert_eq!(children.len(), 3);
    assert_eq!(children[0], Qualifier::key_comparison("name", ComparisonOperator::EqualTo, "lastname"));
    assert_eq!(children[1], kv("salary", ComparisonOperator::GreaterThan, 5000));
    assert_eq!(children[2], Qualifier::key_comparison("startDate", ComparisonOperator::LessThan, "endDate"));
    Ok(())
}

#[test]
fn raw_sql_parts() -> Result<()> {
    let q = Qualifier::parse("SQL[name = $name AND age > $age]", &[])?;
    let Qualifier::RawSql(sql) = &q else {
        bail!("expected raw SQL, got {q:?}");
    };
    assert_eq!(sql.parts.len(), 4);
    assert_eq!(sql.parts[0], SqlPart::Text("name = ".to_string()));
    assert_eq!(sql.parts[1], SqlPart::Variable(Variable::new("name")));
    assert_eq!(q.binding_keys(), ["name", "age"]);
    Ok(())
}

#[test]
fn extended_and_aliased_operators() -> Result<()> {
    let q = Qualifier::parse("name hasPrefix: 'Do'", &[])?;
    assert_eq!(q, kv("name", ComparisonOperator::from_symbol("hasPrefix:"), "Do"));

    for text in ["a <> 1", "a >< 1", "a != 1"] {
        assert_eq!(Qualifier::parse(text, &[])?, kv("a", ComparisonOperator::NotEqualTo, 1), "{text}");
    }
    Ok(())
}

#[test]
fn yes_is_a_boolean_constant() -> Result<()> {
    let q = Qualifier::parse("isDuck = 'YES'", &[])?;
    assert_eq!(q, kv("isDuck", ComparisonOperator::EqualTo, "YES"));
    let q = Qualifier::parse("isDuck = YES", &[])?;
    assert_eq!(q, kv("isDuck", ComparisonOperator::EqualTo, true));
    Ok(())
}

#[test]
fn array_arguments_bind_whole() -> Result<()> {
    let statuses = Value::from(vec![Value::from("open"), Value::from("new")]);
    let q = Qualifier::parse("status IN %@", &[statuses.clone()])?;
    assert_eq!(q, kv("status", ComparisonOperator::Contains, statuses));
    Ok(())
}

#[test]
fn error_location() {
    let err = Qualifier::parse("a = 1 AND\nb = 'open", &[]).unwrap_err();
    assert_eq!((err.line, err.col), (2, 5));
    assert!(err.context.contains("--> qualifier:2:5"), "{}", err.context);
    assert!(err.to_string().starts_with("unterminated quoted string"));
}

#[test]
fn from_str_parses_without_arguments() -> Result<()> {
    let q: Qualifier = "a = 1 OR b = 2".parse()?;
    assert_eq!(q.children().len(), 2);
    assert!("a = %@".parse::<Qualifier>().is_err());
    Ok(())
}
