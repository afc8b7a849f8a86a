// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Character scanner underlying the qualifier parser.

use crate::error::ParseError;

/// Characters ending an identifier.
pub fn is_id_break(c: char) -> bool {
    c.is_whitespace()
        || matches!(
            c,
            '<' | '>' | '=' | '*' | '/' | '+' | '-' | '(' | ')' | ']' | '!'
        )
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Clone)]
pub struct Scanner<'source> {
    source: &'source str,
    chars: Vec<char>,
    pos: usize,
}

impl<'source> Scanner<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn reset(&mut self, pos: usize) {
        self.pos = pos.min(self.chars.len());
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    /// Skips whitespace. Returns false at end of input.
    pub fn skip_spaces(&mut self) -> bool {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        !self.at_end()
    }

    pub fn consume(&mut self, c: char) -> bool {
        match self.peek() == Some(c) {
            true => {
                self.pos += 1;
                true
            }
            false => false,
        }
    }

    pub fn looks_at(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    pub fn consume_str(&mut self, text: &str) -> bool {
        match self.looks_at(text) {
            true => {
                self.pos += text.chars().count();
                true
            }
            false => false,
        }
    }

    /// `keyword` followed by a non-word character or end of input.
    pub fn looks_at_keyword(&self, keyword: &str, ignore_case: bool) -> bool {
        let len = keyword.chars().count();
        let matches = keyword.chars().enumerate().all(|(i, k)| match self.peek_at(i) {
            Some(c) if ignore_case => c.to_lowercase().eq(k.to_lowercase()),
            Some(c) => c == k,
            None => false,
        });
        matches && !self.peek_at(len).is_some_and(is_word_char)
    }

    pub fn consume_keyword(&mut self, keyword: &str, ignore_case: bool) -> bool {
        match self.looks_at_keyword(keyword, ignore_case) {
            true => {
                self.pos += keyword.chars().count();
                true
            }
            false => false,
        }
    }

    /// Reads an identifier. Identifiers never start with a digit or a
    /// space; they end at the next break character, or at the next space
    /// when `only_break_on_space` is set.
    pub fn identifier(&mut self, only_break_on_space: bool) -> Option<String> {
        let first = self.peek()?;
        if first.is_ascii_digit() || first.is_whitespace() {
            return None;
        }
        if !only_break_on_space && is_id_break(first) {
            return None;
        }
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek() {
            let stop = match only_break_on_space {
                true => c.is_whitespace(),
                false => is_id_break(c),
            };
            if stop {
                break;
            }
            self.pos += 1;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    /// Characters from `pos` up to, excluding, the next char matching `stop`.
    pub fn take_until(&mut self, stop: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| !stop(c)) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// 1-based line and column of `pos`.
    pub fn location(&self, pos: usize) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for c in self.chars.iter().take(pos) {
            match c {
                '\n' => {
                    line += 1;
                    col = 1;
                }
                _ => col += 1,
            }
        }
        (line, col)
    }

    /// Parse error at the current position.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        self.error_at(self.pos, message)
    }

    pub fn error_at(&self, pos: usize, message: impl Into<String>) -> ParseError {
        let message = message.into();
        let (line, col) = self.location(pos);
        let line_text = self.source.lines().nth(line - 1).unwrap_or("");
        let line_str = format!("{line}");
        let width = line_str.len() + 1;
        let context = format!(
            "\n--> qualifier:{line}:{col}\n{:<width$}|\n{:<width$}| {}\n{:<width$}| {:<spaces$}^",
            "",
            line_str,
            line_text,
            "",
            "",
            spaces = col - 1,
        );
        ParseError {
            message,
            offset: pos,
            line,
            col,
            context,
        }
    }
}
