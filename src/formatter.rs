// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! `%(name)s` style formatting against a key-value coding object.

use crate::kvc::KeyValueCoding;
use crate::number::Number;
use crate::value::Value;

/// Replaces `%(key)X` directives in `pattern` with values of `values`.
///
/// Conversions: `s` and `@` render the value (`<null>` when absent), `i`
/// and `d` render it as an integer (`0` when absent), `I` renders it as an
/// HTML id with `.`, `+`, space, `@` and quotes replaced by `_`. `%%` is a
/// literal `%`. An unclosed `%(` or an unknown conversion yields `None`.
pub fn format_with_bindings(pattern: &str, values: &dyn KeyValueCoding) -> Option<String> {
    if !pattern.contains('%') {
        return Some(pattern.to_string());
    }
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c != '%' {
            out.push(c);
            i += 1;
            continue;
        }
        let mut pos = i + 1;
        match chars.get(pos) {
            None => {
                out.push('%');
                break;
            }
            Some('%') => {
                out.push('%');
                i += 2;
                continue;
            }
            _ => (),
        }

        let mut key = None;
        if chars[pos] == '(' {
            let close = chars[pos..].iter().position(|c| *c == ')')? + pos;
            if close > pos + 1 {
                key = Some(chars[pos + 1..close].iter().collect::<String>());
            }
            pos = close + 1;
        }

        let value = match &key {
            Some(key) => values.value_for_key_path(key).unwrap_or_else(|e| {
                log::debug!("{e}");
                Value::Null
            }),
            None => {
                log::error!("missing key path for %(key)s style format in `{pattern}`");
                Value::Null
            }
        };

        let Some(conversion) = chars.get(pos) else {
            log::info!("missing format character in `{pattern}`");
            return None;
        };
        match conversion {
            's' | '@' => match &value {
                Value::Null => out.push_str("<null>"),
                v => out.push_str(&v.to_text()),
            },
            'i' | 'd' => out.push_str(&integer_value(&value).to_string()),
            'I' => out.push_str(&value_as_id(&value)),
            c => {
                log::error!("unknown format specifier: {c}");
                return None;
            }
        }
        i = pos + 1;
    }
    Some(out)
}

fn integer_value(value: &Value) -> i64 {
    match value {
        Value::Number(Number::Int(i)) => *i,
        Value::Number(n) => n.as_i64().unwrap_or(0),
        Value::Bool(b) => i64::from(*b),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn value_as_id(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        v => v
            .to_text()
            .chars()
            .map(|c| match c {
                '.' | '+' | ' ' | '@' | '"' | '\'' => '_',
                c => c,
            })
            .collect(),
    }
}
