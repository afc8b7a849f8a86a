// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)] // tests unwrap to assert outcomes

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{FixedOffset, TimeZone, Utc};
use serde_json::json;

use crate::*;

fn eval(text: &str, object: serde_json::Value) -> bool {
    let q = Qualifier::parse(text, &[]).unwrap();
    q.evaluate_with_object(&object).unwrap()
}

#[test]
fn constants_and_empty_compounds() {
    let obj = json!({});
    assert!(!Qualifier::not(Qualifier::Boolean(true)).evaluate_with_object(&obj).unwrap());
    assert!(Qualifier::And(vec![]).evaluate_with_object(&obj).unwrap());
    assert!(!Qualifier::Or(vec![]).evaluate_with_object(&obj).unwrap());
    assert!(eval("*true*", json!({})));
    assert!(!eval("*false*", json!({})));
}

#[test]
fn duck_scenario() {
    let text = "lastname = 'Duck' AND firstname like 'D*'";
    assert!(eval(text, json!({"lastname": "Duck", "firstname": "Donald"})));
    assert!(!eval(text, json!({"lastname": "Duck", "firstname": "Huey"})));
}

#[test]
fn missing_keys_read_as_null() {
    assert!(!eval("age > 3", json!({})));
    assert!(eval("age IS NULL", json!({})));
    assert!(!eval("age IS NOT NULL", json!({})));
    assert!(eval("age IS NOT NULL", json!({"age": 1})));
    // Scalars have no properties.
    assert!(!eval("name.first = 'x'", json!({"name": "Donald"})));
}

#[test]
fn numbers_compare_across_representations() {
    assert!(eval("age = 5.0", json!({"age": 5})));
    assert!(eval("age >= 5 AND age < 5.5", json!({"age": 5})));
    assert!(eval("balance < -1", json!({"balance": -3})));
    assert!(eval("age != 6", json!({"age": 5})));
}

#[test]
fn bare_key_is_a_boolean_test() {
    assert!(eval("isActive", json!({"isActive": true})));
    assert!(!eval("isActive", json!({"isActive": false})));
    assert!(eval("isDuck = 'YES'", json!({"isDuck": true})));
    assert!(eval("NOT isDuck", json!({"isDuck": false})));
}

#[test]
fn key_comparison_reads_both_sides() {
    assert!(eval("min < max", json!({"min": 1, "max": 2})));
    assert!(!eval("min = max", json!({"min": 1, "max": 2})));
    assert!(eval("a.b = c", json!({"a": {"b": "x"}, "c": "x"})));
}

#[test]
fn like_dialects() {
    let obj = json!({"name": "Donald"});
    assert!(eval("name like '*ald'", obj.clone()));
    assert!(eval("name like '*na*'", obj.clone()));
    assert!(eval("name like '*'", obj.clone()));
    assert!(!eval("name like 'd*'", obj.clone()));
    assert!(eval("name caseInsensitiveLike: 'd*'", obj.clone()));
    assert!(eval("name ilike 'DON*'", obj));
}

#[test]
fn contains_against_argument_collections() {
    let statuses = Value::from(vec![Value::from("open"), Value::from("new")]);
    let q = Qualifier::parse("status IN %@", &[statuses]).unwrap();
    assert!(q.evaluate_with_object(&json!({"status": "open"})).unwrap());
    assert!(!q.evaluate_with_object(&json!({"status": "closed"})).unwrap());

    let tags = json!({"tags": ["a", "b"]});
    assert!(eval("tags IN 'a'", tags.clone()));
    assert!(eval("tags doesContain: 'b'", tags));
}

#[test]
fn extended_operators() {
    let obj = json!({"name": "Donald", "tags": ["x"]});
    assert!(eval("name hasPrefix: 'Don'", obj.clone()));
    assert!(!eval("name hasSuffix: 'Don'", obj.clone()));
    assert!(eval("name isEqualToIgnoringCase: 'DONALD'", obj.clone()));
    assert!(eval("tags contains: 'x'", obj.clone()));
    assert!(!eval("name isPalindrome: 'x'", obj.clone()));
    assert!(!eval("missing hasPrefix: 'x'", obj));
}

#[test]
fn custom_extended_operator_on_injected_registry() {
    let registry = ComparisonRegistry::new();
    registry
        .operators()
        .register(types::NUMBER, "isMultipleOf", |l, r| match (l.as_i64(), r.as_i64()) {
            (Some(l), Some(r)) if r != 0 => l % r == 0,
            _ => false,
        });
    let q = Qualifier::parse("count isMultipleOf: 3", &[]).unwrap();
    let evaluator = Evaluator::new(&registry);
    assert!(evaluator.evaluate(&q, &json!({"count": 9})).unwrap());
    assert!(!evaluator.evaluate(&q, &json!({"count": 10})).unwrap());
    // The shared registry does not know the operator.
    assert!(!q.evaluate_with_object(&json!({"count": 9})).unwrap());
}

#[test]
fn injected_comparison_strategy() {
    struct IgnoreCase;
    impl ComparisonSupport for IgnoreCase {
        fn is_equal_to(&self, lhs: &Value, rhs: &Value) -> bool {
            match (lhs.as_str(), rhs.as_str()) {
                (Some(l), Some(r)) => l.eq_ignore_ascii_case(r),
                _ => DefaultComparison.is_equal_to(lhs, rhs),
            }
        }
    }
    let registry = ComparisonRegistry::new();
    registry
        .set_support_for_type(types::STRING, Arc::new(IgnoreCase))
        .unwrap();
    let q = Qualifier::parse("name = 'DONALD'", &[]).unwrap();
    let obj = json!({"name": "Donald"});
    assert!(Evaluator::new(&registry).evaluate(&q, &obj).unwrap());
    assert!(!Evaluator::default().evaluate(&q, &obj).unwrap());
}

#[test]
fn csv_membership() {
    let q = Qualifier::CsvContains(CsvQualifier::new("tags", ["a", "b"]));
    assert!(q.evaluate_with_object(&json!({"tags": "a,b,c"})).unwrap());
    assert!(!q.evaluate_with_object(&json!({"tags": "a,c"})).unwrap());
    assert!(!q.evaluate_with_object(&json!({})).unwrap());

    let any = Qualifier::CsvContains(CsvQualifier::new("tags", ["x", "c"]).matching_any(true));
    assert!(any.evaluate_with_object(&json!({"tags": "a,c"})).unwrap());

    let none = Qualifier::CsvContains(CsvQualifier::new("tags", Vec::<String>::new()));
    assert!(none.evaluate_with_object(&json!({})).unwrap());

    let semis = Qualifier::CsvContains(CsvQualifier::new("tags", ["b"]).with_separator(";"));
    assert!(semis.evaluate_with_object(&json!({"tags": "a;b"})).unwrap());
}

#[test]
fn csv_rewrite_agrees_with_evaluation() {
    let csv = CsvQualifier::new("tags", ["b"]);
    let plain = csv.rewrite_as_plain_qualifier();
    for tags in ["b", "b,c", "a,b", "a,b,c"] {
        let obj = json!({ "tags": tags });
        assert!(plain.evaluate_with_object(&obj).unwrap(), "{tags}");
        assert!(Qualifier::CsvContains(csv.clone()).evaluate_with_object(&obj).unwrap(), "{tags}");
    }
}

fn assert_text_form_agrees(q: &Qualifier, objects: &[Value]) {
    let text = q.to_string();
    let reparsed = Qualifier::parse(&text, &[]).unwrap_or_else(|e| panic!("`{text}` does not parse: {e}"));
    for o in objects {
        assert_eq!(
            q.evaluate_with_object(o).unwrap(),
            reparsed.evaluate_with_object(o).unwrap(),
            "`{text}` on {o}"
        );
    }
}

#[test]
fn text_form_evaluates_like_the_tree() {
    let named = |name: &str| Value::from_map([("name", Value::from(name))]);
    for name in ["O'Brien", r#"say "hi""#, r"C:\dir", r"a\'b"] {
        let q = Key::new("name").eq(name);
        assert_text_form_agrees(&q, &[named(name), named("O"), named("")]);
        assert!(q.evaluate_with_object(&named(name)).unwrap(), "{q}");
    }

    let big = Key::new("big").eq(1e20);
    assert_eq!(big.to_string(), "big = 1e20");
    let sized = |n: Value| Value::from_map([("big", n)]);
    assert_text_form_agrees(&big, &[sized(Value::from(1e20)), sized(Value::from(5))]);

    let day = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
    let on = |d: u32| Value::from_map([("when", Value::from(day(d)))]);
    let calendar = Value::from_map([(
        "when",
        Value::from(FixedOffset::east_opt(3600).unwrap().with_ymd_and_hms(2024, 1, 2, 1, 0, 0).unwrap()),
    )]);
    for q in [Key::new("when").eq(day(2)), Key::new("when").lt(day(2))] {
        assert_text_form_agrees(&q, &[on(1), on(2), on(3), calendar.clone()]);
    }

    let tags = |t: &str| Value::from_map([("tags", Value::from(t))]);
    let csv = Qualifier::not(Qualifier::CsvContains(CsvQualifier::new("tags", ["a", "b"]).matching_any(true)));
    assert!(csv.to_string().starts_with("NOT ("));
    assert_text_form_agrees(&csv, &[tags("b"), tags("c"), tags("x,a"), tags("a,x,b")]);

    let all = Qualifier::not(Qualifier::CsvContains(CsvQualifier::new("tags", ["a"])));
    assert_text_form_agrees(&all, &[tags("a"), tags("b"), tags("b,a")]);

    let event = |start: u32, end: u32| {
        Value::from_map([("start", Value::from(day(start))), ("end", Value::from(day(end)))])
    };
    let overlaps = Qualifier::not(Qualifier::Overlaps(OverlapsQualifier::new(
        Some(Key::new("start")),
        Some(Key::new("end")),
        TimeRange::between(&day(10), &day(20)),
    )));
    assert_text_form_agrees(&overlaps, &[event(5, 12), event(21, 25), event(1, 5)]);
}

#[test]
fn unquotable_strings_do_not_read_back() {
    for text in [r"C:\", r#"it's "x""#] {
        let q = Key::new("path").eq(text);
        let repr = q.to_string();
        assert!(repr.contains("<unquotable"), "{repr}");
        assert!(Qualifier::parse(&repr, &[]).is_err(), "{repr}");
    }
}

#[test]
fn regex_match() {
    let q = Qualifier::regex("code", "[A-Z]{3}-\\d+").unwrap();
    assert!(q.evaluate_with_object(&json!({"code": "ABC-12"})).unwrap());
    assert!(!q.evaluate_with_object(&json!({"code": "xABC-12"})).unwrap());
    assert!(!q.evaluate_with_object(&json!({})).unwrap());
}

#[test]
fn overlaps_with_start_and_end_keys() {
    let day = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
    let range = TimeRange::between(&day(10), &day(20));
    let q = Qualifier::Overlaps(OverlapsQualifier::new(
        Some(Key::new("start")),
        Some(Key::new("end")),
        range,
    ));

    let event = |start: u32, end: u32| {
        BTreeMap::from([
            ("start".to_string(), Value::from(day(start))),
            ("end".to_string(), Value::from(day(end))),
        ])
    };
    assert!(q.evaluate_with_object(&event(5, 12)).unwrap());
    assert!(q.evaluate_with_object(&event(15, 25)).unwrap());
    assert!(!q.evaluate_with_object(&event(1, 10)).unwrap());
    assert!(!q.evaluate_with_object(&event(20, 25)).unwrap());

    let open_ended = BTreeMap::from([("start".to_string(), Value::from(day(19)))]);
    assert!(q.evaluate_with_object(&open_ended).unwrap());
    assert!(!q.evaluate_with_object(&BTreeMap::<String, Value>::new()).unwrap());
}

#[test]
fn overlaps_with_range_key() {
    let range = TimeRange::new(100, 200);
    let q = Qualifier::Overlaps(OverlapsQualifier::with_range_key("period", range));
    let obj = |r: TimeRange| BTreeMap::from([("period".to_string(), Value::from(r))]);
    assert!(q.evaluate_with_object(&obj(TimeRange::new(150, 300))).unwrap());
    assert!(!q.evaluate_with_object(&obj(TimeRange::new(200, 300))).unwrap());
    assert!(!q.evaluate_with_object(&json!({"period": "soon"})).unwrap());
}

#[test]
fn dates_compare_as_instants() {
    let utc = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let cet = FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 3, 1, 13, 0, 0)
        .unwrap();
    let q = Qualifier::key_value("when", ComparisonOperator::EqualTo, Operand::Value(Value::from(utc)));
    let obj = BTreeMap::from([("when".to_string(), Value::from(cet))]);
    assert!(q.evaluate_with_object(&obj).unwrap());

    let later = Key::new("when").lt(Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap());
    assert!(later.evaluate_with_object(&obj).unwrap());
}

#[test]
fn unbound_variables_do_not_match() {
    let q = Qualifier::parse("name = $name", &[]).unwrap();
    assert!(!q.evaluate_with_object(&json!({"name": "x"})).unwrap());
}

#[test]
fn raw_sql_is_not_evaluable() {
    let q = Qualifier::parse("SQL[a = 1]", &[]).unwrap();
    let err = q.evaluate_with_object(&json!({})).unwrap_err();
    assert_eq!(err, EvalError::NotEvaluable("SQL[a = 1]".to_string()));

    // Short-circuiting never reaches it.
    let guarded = Qualifier::parse("*false* AND SQL[a = 1]", &[]).unwrap();
    assert!(!guarded.evaluate_with_object(&json!({})).unwrap());
}

#[test]
fn filter_collection_keeps_order() {
    let people = vec![
        json!({"name": "Donald", "age": 40}),
        json!({"name": "Huey", "age": 8}),
        json!({"name": "Daisy", "age": 38}),
    ];
    let q = Key::new("age").gt(18);
    let adults = q.filter_collection(&people).unwrap();
    let names: Vec<&str> = adults.iter().filter_map(|p| p["name"].as_str()).collect();
    assert_eq!(names, ["Donald", "Daisy"]);
}

#[test]
fn round_trip_preserves_evaluation() {
    let objects = [
        json!({"a": 1, "b": "x", "c": true, "d": 2.5}),
        json!({"a": 2, "b": "y's", "c": false}),
        json!({"b": "x"}),
    ];
    for text in [
        "a = 1 AND b = 'x'",
        "a > 1 OR b like 'x*' AND c = true",
        "NOT (a = 1 OR d IS NULL)",
        "(a != 2 AND c) OR d >= 2.5",
        "b caseInsensitiveLike: 'Y*'",
    ] {
        let q = Qualifier::parse(text, &[]).unwrap();
        let again = Qualifier::parse(&q.to_string(), &[])
            .unwrap_or_else(|e| panic!("`{q}` did not parse: {e}"));
        for obj in &objects {
            assert_eq!(
                q.evaluate_with_object(obj).unwrap(),
                again.evaluate_with_object(obj).unwrap(),
                "{text} / {q} on {obj}"
            );
        }
    }
}
