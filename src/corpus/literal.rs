//! Reader for the Python literal syntax found in the raw metadata cells.
//!
//! Cells such as `genres` or `crew` hold `repr()` output of lists of dicts:
//! single- or double-quoted strings, `None`/`True`/`False`, integers and
//! floats, and nested lists, tuples and dicts. Anything outside that subset
//! is rejected as a whole.

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
    Dict(Vec<(Literal, Literal)>),
}

impl Literal {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up a string key in a dict literal
    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Dict(entries) => entries
                .iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Parses a complete literal; trailing garbage makes the whole input invalid
pub fn parse_literal(input: &str) -> Option<Literal> {
    let mut parser = Parser {
        chars: input.chars().peekable(),
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.chars.peek().is_some() {
        return None;
    }
    Some(value)
}

const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    depth: usize,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn value(&mut self) -> Option<Literal> {
        self.skip_whitespace();
        match *self.chars.peek()? {
            '[' => self.sequence('[', ']').map(Literal::List),
            '(' => self.sequence('(', ')').map(Literal::List),
            '{' => self.dict(),
            '\'' | '"' => self.string().map(Literal::Str),
            c if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() => self.keyword(),
            _ => None,
        }
    }

    fn enter(&mut self) -> Option<()> {
        self.depth += 1;
        (self.depth <= MAX_DEPTH).then_some(())
    }

    fn sequence(&mut self, open: char, close: char) -> Option<Vec<Literal>> {
        self.enter()?;
        self.expect(open)?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.chars.peek() == Some(&close) {
                self.chars.next();
                break;
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.chars.next()? {
                ',' => continue,
                c if c == close => break,
                _ => return None,
            }
        }
        self.depth -= 1;
        Some(items)
    }

    fn dict(&mut self) -> Option<Literal> {
        self.enter()?;
        self.expect('{')?;
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            if self.chars.peek() == Some(&'}') {
                self.chars.next();
                break;
            }
            let key = self.value()?;
            self.skip_whitespace();
            self.expect(':')?;
            let value = self.value()?;
            entries.push((key, value));
            self.skip_whitespace();
            match self.chars.next()? {
                ',' => continue,
                '}' => break,
                _ => return None,
            }
        }
        self.depth -= 1;
        Some(Literal::Dict(entries))
    }

    fn expect(&mut self, expected: char) -> Option<()> {
        (self.chars.next()? == expected).then_some(())
    }

    fn string(&mut self) -> Option<String> {
        let quote = self.chars.next()?;
        let mut out = String::new();
        loop {
            match self.chars.next()? {
                c if c == quote => return Some(out),
                '\\' => self.escape(&mut out)?,
                c => out.push(c),
            }
        }
    }

    fn escape(&mut self, out: &mut String) -> Option<()> {
        let c = self.chars.next()?;
        let decoded = match c {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' | '\'' | '"' => c,
            'x' => self.hex_char(2)?,
            'u' => self.hex_char(4)?,
            'U' => self.hex_char(8)?,
            // Unknown escapes are kept verbatim, as Python does
            other => {
                out.push('\\');
                other
            }
        };
        out.push(decoded);
        Some(())
    }

    fn hex_char(&mut self, digits: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            code = code * 16 + self.chars.next()?.to_digit(16)?;
        }
        char::from_u32(code)
    }

    fn number(&mut self) -> Option<Literal> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E' | '_') {
                if c != '_' {
                    text.push(c);
                }
                self.chars.next();
            } else {
                break;
            }
        }

        if let Ok(int) = text.parse::<i64>() {
            return Some(Literal::Int(int));
        }
        text.parse::<f64>().ok().map(Literal::Float)
    }

    fn keyword(&mut self) -> Option<Literal> {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }

        match word.as_str() {
            "None" => Some(Literal::None),
            "True" => Some(Literal::Bool(true)),
            "False" => Some(Literal::Bool(false)),
            "nan" => Some(Literal::Float(f64::NAN)),
            _ => None,
        }
    }
}
