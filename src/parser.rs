// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::mem;

use crate::ast::{ComparisonOperator, Qualifier, SqlPart, SqlQualifier};
use crate::error::ParseError;
use crate::key::Variable;
use crate::lexer::{is_id_break, Scanner};
use crate::number::Number;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompoundOperator {
    And,
    Or,
}

impl CompoundOperator {
    fn build(self, operands: Vec<Qualifier>) -> Qualifier {
        match self {
            CompoundOperator::And => Qualifier::and(operands),
            CompoundOperator::Or => Qualifier::or(operands),
        }
    }
}

/// Recursive-descent parser for the qualifier format.
///
/// `%` directives consume `args` left to right.
pub struct QualifierParser<'source, 'args> {
    scanner: Scanner<'source>,
    args: &'args [Value],
    next_arg: usize,
}

impl<'source, 'args> QualifierParser<'source, 'args> {
    pub fn new(format: &'source str, args: &'args [Value]) -> Self {
        Self {
            scanner: Scanner::new(format),
            args,
            next_arg: 0,
        }
    }

    pub fn parse(mut self) -> Result<Qualifier, ParseError> {
        if !self.scanner.skip_spaces() {
            return Err(self.scanner.error("empty qualifier format"));
        }
        let qualifier = self.parse_compound()?;
        if self.scanner.skip_spaces() {
            return Err(self.scanner.error("unexpected input after qualifier"));
        }
        Ok(qualifier)
    }

    /// Runs of the same operator form one compound. When the operator
    /// changes, the run so far is folded and becomes the first operand of
    /// the next run: `a AND b OR c` is `(a AND b) OR c`.
    fn parse_compound(&mut self) -> Result<Qualifier, ParseError> {
        let mut operands = vec![];
        let mut last_op: Option<CompoundOperator> = None;
        loop {
            operands.push(self.parse_one()?);

            if !self.scanner.skip_spaces() || self.scanner.peek() == Some(')') {
                break;
            }

            let op = self.parse_compound_operator()?;
            if !self.scanner.skip_spaces() {
                return Err(self.scanner.error("expected qualifier after compound operator"));
            }
            if let Some(prev) = last_op {
                if prev != op {
                    let run = mem::take(&mut operands);
                    operands.push(prev.build(run));
                }
            }
            last_op = Some(op);
        }

        match (last_op, operands.len()) {
            (Some(op), n) if n > 1 => Ok(op.build(operands)),
            _ => operands
                .pop()
                .ok_or_else(|| self.scanner.error("expected qualifier")),
        }
    }

    fn parse_compound_operator(&mut self) -> Result<CompoundOperator, ParseError> {
        let start = self.scanner.pos();
        let token = self
            .scanner
            .identifier(false)
            .ok_or_else(|| self.scanner.error("expected compound operator AND or OR"))?;
        let token = self.resolve_pattern_token(token)?;
        match token.as_str() {
            "AND" => Ok(CompoundOperator::And),
            "OR" => Ok(CompoundOperator::Or),
            other => Err(self
                .scanner
                .error_at(start, format!("unknown compound operator `{other}`"))),
        }
    }

    fn parse_one(&mut self) -> Result<Qualifier, ParseError> {
        if !self.scanner.skip_spaces() {
            return Err(self.scanner.error("expected qualifier"));
        }

        if self.scanner.consume('(') {
            let start = self.scanner.pos() - 1;
            let qualifier = self.parse_compound()?;
            if !self.scanner.skip_spaces() || !self.scanner.consume(')') {
                return Err(self.scanner.error_at(start, "missing closing parenthesis"));
            }
            return Ok(qualifier);
        }

        if self.scanner.consume_keyword("NOT", false) {
            return Ok(Qualifier::Not(Box::new(self.parse_one()?)));
        }

        if self.scanner.consume_str("SQL[") {
            return self.parse_raw_sql();
        }

        if self.scanner.consume_str("*true*") {
            return Ok(Qualifier::Boolean(true));
        }
        if self.scanner.consume_str("*false*") {
            return Ok(Qualifier::Boolean(false));
        }

        self.parse_key_based_qualifier()
    }

    fn parse_raw_sql(&mut self) -> Result<Qualifier, ParseError> {
        let start = self.scanner.pos();
        let mut parts = vec![];
        let mut text = String::new();
        loop {
            match self.scanner.peek() {
                None => return Err(self.scanner.error_at(start, "unterminated SQL[ section")),
                Some(']') => {
                    self.scanner.bump();
                    break;
                }
                Some('$') => {
                    self.scanner.bump();
                    let name = self
                        .scanner
                        .identifier(false)
                        .ok_or_else(|| self.scanner.error("expected variable name after `$`"))?;
                    if !text.is_empty() {
                        parts.push(SqlPart::Text(mem::take(&mut text)));
                    }
                    parts.push(SqlPart::Variable(Variable::new(name)));
                }
                Some(c) => {
                    text.push(c);
                    self.scanner.bump();
                }
            }
        }
        if !text.is_empty() {
            parts.push(SqlPart::Text(text));
        }
        Ok(Qualifier::RawSql(SqlQualifier { parts }))
    }

    fn parse_key_based_qualifier(&mut self) -> Result<Qualifier, ParseError> {
        let key = self
            .scanner
            .identifier(false)
            .ok_or_else(|| self.scanner.error("expected key"))?;
        let key = self.resolve_pattern_token(key)?;

        // A bare key is a boolean test.
        let bare = |key: String| Qualifier::key_value(key, ComparisonOperator::EqualTo, Value::Bool(true));
        if !self.scanner.skip_spaces()
            || self.scanner.peek() == Some(')')
            || self.scanner.looks_at_keyword("AND", false)
            || self.scanner.looks_at_keyword("OR", false)
        {
            return Ok(bare(key));
        }

        let op = match self.parse_operation() {
            Some(op) => self.resolve_pattern_token(op)?,
            None => return Ok(bare(key)),
        };

        if op == "IS" {
            if let Some(q) = self.parse_is_null(&key) {
                return Ok(q);
            }
        }
        let operator = ComparisonOperator::from_symbol(&op);

        if !self.scanner.skip_spaces() {
            return Err(self
                .scanner
                .error(format!("expected value after `{key} {op}`")));
        }

        match self.scanner.peek() {
            Some('$') => {
                self.scanner.bump();
                let name = self
                    .scanner
                    .identifier(false)
                    .ok_or_else(|| self.scanner.error("expected variable name after `$`"))?;
                Ok(Qualifier::key_value(key, operator, Variable::new(name)))
            }
            Some('%') => self.parse_value_directive(key, operator),
            _ => match self.parse_constant()? {
                Some(value) => Ok(Qualifier::key_value(key, operator, value)),
                None => {
                    let right = self
                        .scanner
                        .identifier(false)
                        .ok_or_else(|| self.scanner.error("expected value or key"))?;
                    Ok(Qualifier::key_comparison(key, operator, right))
                }
            },
        }
    }

    /// `IS NULL` and `IS NOT NULL` following a key. Restores the position
    /// when neither follows.
    fn parse_is_null(&mut self, key: &str) -> Option<Qualifier> {
        let saved = self.scanner.pos();
        self.scanner.skip_spaces();
        let negated = self.scanner.consume_keyword("NOT", false);
        if negated {
            self.scanner.skip_spaces();
        }
        if self.scanner.consume_keyword("NULL", true) {
            let is_null = Qualifier::key_value(key, ComparisonOperator::EqualTo, Value::Null);
            return Some(match negated {
                true => Qualifier::Not(Box::new(is_null)),
                false => is_null,
            });
        }
        self.scanner.reset(saved);
        None
    }

    fn parse_operation(&mut self) -> Option<String> {
        let first = self.scanner.peek()?;
        let second = self.scanner.peek_at(1);
        let (symbol, len) = match (first, second) {
            ('=', Some('>')) => ("=>", 2),
            ('=', Some('<')) => ("=<", 2),
            ('=', Some('=')) => ("==", 2),
            ('=', _) => ("=", 1),
            ('!', Some('=')) => ("!=", 2),
            ('<', Some('=')) => ("<=", 2),
            ('<', Some('>')) | ('>', Some('<')) => ("<>", 2),
            ('<', _) => ("<", 1),
            ('>', Some('=')) => (">=", 2),
            ('>', _) => (">", 1),
            _ => return self.scanner.identifier(true),
        };
        self.scanner.reset(self.scanner.pos() + len);
        Some(symbol.to_string())
    }

    fn parse_value_directive(
        &mut self,
        key: String,
        operator: ComparisonOperator,
    ) -> Result<Qualifier, ParseError> {
        let start = self.scanner.pos();
        self.scanner.bump();
        let spec = self
            .scanner
            .bump()
            .ok_or_else(|| self.scanner.error("missing format specifier after `%`"))?;
        if spec == '%' {
            return Err(self.scanner.error_at(start, "`%%` is not supported in qualifiers"));
        }
        if !matches!(spec, '@' | 's' | 'd' | 'i' | 'f' | 'K') {
            return Err(self
                .scanner
                .error_at(start, format!("unknown format specifier `%{spec}`")));
        }
        let arg = self.next_argument(start)?;
        let value = match spec {
            's' => match arg {
                Value::Null => Value::Null,
                v => Value::from(v.to_text()),
            },
            'd' | 'i' => self.integer_argument(start, arg)?,
            'f' => self.float_argument(start, arg)?,
            'K' => return Ok(Qualifier::key_comparison(key, operator, arg.to_text())),
            _ => arg,
        };
        Ok(Qualifier::key_value(key, operator, value))
    }

    /// A token beginning with `%` in key or operator position is replaced by
    /// the text of the next argument.
    fn resolve_pattern_token(&mut self, token: String) -> Result<String, ParseError> {
        let mut chars = token.chars();
        if chars.next() != Some('%') {
            return Ok(token);
        }
        let start = self.scanner.pos().saturating_sub(token.chars().count());
        match chars.next() {
            None => Ok(token),
            Some('%') => Err(self.scanner.error_at(start, "`%%` is not supported in qualifiers")),
            Some('@' | 's' | 'd' | 'i' | 'f' | 'K') => match self.next_argument(start)? {
                Value::Null => Err(self
                    .scanner
                    .error_at(start, format!("null argument for pattern `{token}`"))),
                arg => Ok(arg.to_text()),
            },
            Some(spec) => Err(self
                .scanner
                .error_at(start, format!("unknown format specifier `%{spec}`"))),
        }
    }

    fn next_argument(&mut self, pos: usize) -> Result<Value, ParseError> {
        let arg = self.args.get(self.next_arg).cloned().ok_or_else(|| {
            self.scanner
                .error_at(pos, "more format patterns than arguments")
        })?;
        self.next_arg += 1;
        Ok(arg)
    }

    fn integer_argument(&self, pos: usize, arg: Value) -> Result<Value, ParseError> {
        let converted = match &arg {
            Value::Null => return Ok(Value::Null),
            Value::Number(n) => n.as_i64(),
            Value::Bool(b) => Some(i64::from(*b)),
            v => v.to_text().trim().parse::<i64>().ok(),
        };
        converted
            .map(Value::from)
            .ok_or_else(|| self.scanner.error_at(pos, format!("cannot convert `{arg}` to an integer")))
    }

    fn float_argument(&self, pos: usize, arg: Value) -> Result<Value, ParseError> {
        let converted = match &arg {
            Value::Null => return Ok(Value::Null),
            Value::Number(n) => Some(n.as_f64()),
            v => v.to_text().trim().parse::<f64>().ok(),
        };
        converted
            .map(Value::from)
            .ok_or_else(|| self.scanner.error_at(pos, format!("cannot convert `{arg}` to a double")))
    }

    /// Constant on the right-hand side, if one starts here.
    ///
    /// A leading `(Type)` cast hint is accepted and ignored.
    fn parse_constant(&mut self) -> Result<Option<Value>, ParseError> {
        if self.scanner.peek() != Some('(') {
            return self.parse_plain_constant();
        }
        let start = self.scanner.pos();
        self.scanner.bump();
        self.scanner.skip_spaces();
        let cast = self
            .scanner
            .identifier(false)
            .ok_or_else(|| self.scanner.error("expected type name in cast"))?;
        self.scanner.skip_spaces();
        if !self.scanner.consume(')') {
            return Err(self.scanner.error("expected `)` after cast type"));
        }
        self.scanner.skip_spaces();
        let value = self
            .parse_plain_constant()?
            .ok_or_else(|| self.scanner.error_at(start, "expected constant after cast"))?;
        log::debug!("not applying cast `{cast}` to constant {value}");
        Ok(Some(value))
    }

    fn parse_plain_constant(&mut self) -> Result<Option<Value>, ParseError> {
        let Some(c) = self.scanner.peek() else {
            return Ok(None);
        };
        if c == '\'' || c == '"' {
            return self.parse_quoted_string(c).map(Some);
        }
        let negative_number = c == '-' && self.scanner.peek_at(1).is_some_and(|d| d.is_ascii_digit());
        if c.is_ascii_digit() || negative_number {
            return self.parse_number().map(Some);
        }
        for (keyword, value) in [
            ("true", Value::Bool(true)),
            ("YES", Value::Bool(true)),
            ("false", Value::Bool(false)),
            ("NO", Value::Bool(false)),
            ("NULL", Value::Null),
        ] {
            if self.scanner.consume_keyword(keyword, true) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// Backslash escapes are skipped over but kept in the result.
    fn parse_quoted_string(&mut self, quote: char) -> Result<Value, ParseError> {
        let start = self.scanner.pos();
        self.scanner.bump();
        let mut text = String::new();
        loop {
            match self.scanner.bump() {
                None => return Err(self.scanner.error_at(start, "unterminated quoted string")),
                Some('\\') => {
                    text.push('\\');
                    if let Some(escaped) = self.scanner.bump() {
                        text.push(escaped);
                    }
                }
                Some(c) if c == quote => break,
                Some(c) => text.push(c),
            }
        }
        Ok(Value::from(text))
    }

    fn parse_number(&mut self) -> Result<Value, ParseError> {
        let start = self.scanner.pos();
        let mut text = String::new();
        if self.scanner.consume('-') {
            text.push('-');
        }
        text.push_str(&self.scanner.take_until(is_id_break));
        let parsed = match text.contains(['.', 'e', 'E']) {
            true => text.parse::<f64>().ok().map(Number::Float),
            false => text.parse::<i64>().ok().map(Number::Int),
        };
        parsed
            .map(Value::Number)
            .ok_or_else(|| self.scanner.error_at(start, format!("failed to parse number `{text}`")))
    }
}

/// Parses `format`, substituting `args` for `%` directives.
pub fn parse_qualifier(format: &str, args: &[Value]) -> Result<Qualifier, ParseError> {
    QualifierParser::new(format, args).parse()
}

impl Qualifier {
    pub fn parse(format: &str, args: &[Value]) -> Result<Qualifier, ParseError> {
        parse_qualifier(format, args)
    }
}

impl core::str::FromStr for Qualifier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_qualifier(s, &[])
    }
}
