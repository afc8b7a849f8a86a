// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::fmt::{self, Write};

use super::*;

impl Qualifier {
    /// Textual form in the qualifier format.
    ///
    /// Constant-only qualifiers read back into equivalent trees. Regular
    /// expressions have no textual form and are rendered as a marker that
    /// does not parse. So are strings that neither quote character can
    /// hold, since the parser keeps backslash escapes verbatim. Dates print
    /// as RFC 3339 text.
    pub fn string_representation(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.append_representation(&mut out);
        out
    }

    fn append_representation(&self, out: &mut String) -> fmt::Result {
        match self {
            Qualifier::Boolean(true) => out.write_str("*true*"),
            Qualifier::Boolean(false) => out.write_str("*false*"),
            Qualifier::KeyValue(kv) => kv.append_representation(out),
            Qualifier::KeyComparison(kc) => {
                write!(out, "{} {} {}", kc.left, kc.operator.symbol(), kc.right)
            }
            Qualifier::And(children) => append_compound(out, children, " AND "),
            Qualifier::Or(children) => append_compound(out, children, " OR "),
            Qualifier::Not(inner) => {
                out.write_str("NOT ")?;
                match prints_as_compound(inner) {
                    true => {
                        out.write_char('(')?;
                        inner.append_representation(out)?;
                        out.write_char(')')
                    }
                    false => inner.append_representation(out),
                }
            }
            Qualifier::RegexMatch(r) => write!(out, "<{} ~ /{}/>", r.key(), r.pattern()),
            Qualifier::CsvContains(csv) => csv.rewrite_as_plain_qualifier().append_representation(out),
            Qualifier::Overlaps(o) => match o.rewrite_as_plain_qualifier() {
                Some(plain) => plain.append_representation(out),
                None => write!(out, "<{} overlaps {}>", o.range_key.as_ref().map_or("?", Key::path), o.range),
            },
            Qualifier::RawSql(sql) => {
                out.write_str("SQL[")?;
                for part in &sql.parts {
                    match part {
                        SqlPart::Text(text) => out.write_str(text)?,
                        SqlPart::Variable(v) => write!(out, "{v}")?,
                        SqlPart::Value(v) => append_constant(out, v)?,
                    }
                }
                out.write_char(']')
            }
        }
    }
}

impl KeyValueQualifier {
    fn append_representation(&self, out: &mut String) -> fmt::Result {
        match (&self.operator, &self.operand) {
            (ComparisonOperator::EqualTo, Operand::Value(Value::Null)) => {
                write!(out, "{} IS NULL", self.key)
            }
            (op, Operand::Value(v)) => {
                write!(out, "{} {} ", self.key, op.symbol())?;
                append_constant(out, v)
            }
            (op, Operand::Variable(v)) => write!(out, "{} {} {v}", self.key, op.symbol()),
        }
    }
}

fn append_compound(out: &mut String, children: &[Qualifier], separator: &str) -> fmt::Result {
    for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
            out.write_str(separator)?;
        }
        if prints_as_compound(child) {
            out.write_char('(')?;
            child.append_representation(out)?;
            out.write_char(')')?;
        } else {
            child.append_representation(out)?;
        }
    }
    Ok(())
}

/// Rewritten leaves may expand into compounds too.
fn prints_as_compound(q: &Qualifier) -> bool {
    match q {
        Qualifier::CsvContains(csv) => csv.rewrite_as_plain_qualifier().is_compound(),
        Qualifier::Overlaps(o) => o.rewrite_as_plain_qualifier().is_some_and(|p| p.is_compound()),
        q => q.is_compound(),
    }
}

/// Whether the parser reads `text` back unchanged between `quote`s: a
/// backslash carries the next character along, a bare quote ends the
/// string.
fn fits_in_quotes(text: &str, quote: char) -> bool {
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if chars.next().is_none() {
                return false;
            }
        } else if c == quote {
            return false;
        }
    }
    true
}

fn append_quoted(out: &mut String, text: &str) -> fmt::Result {
    match ['\'', '"'].into_iter().find(|q| fits_in_quotes(text, *q)) {
        Some(quote) => {
            out.write_char(quote)?;
            out.write_str(text)?;
            out.write_char(quote)
        }
        None => write!(out, "<unquotable {text:?}>"),
    }
}

fn append_constant(out: &mut String, value: &Value) -> fmt::Result {
    match value {
        Value::Null => out.write_str("NULL"),
        Value::Bool(b) => write!(out, "{b}"),
        Value::Number(n) => write!(out, "{n}"),
        Value::String(s) => append_quoted(out, s),
        v => append_quoted(out, &v.to_text()),
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string_representation())
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
