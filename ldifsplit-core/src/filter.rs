//! LDAP search filters.
//!
//! Covers the filter shapes the splitter needs: AND/OR/NOT, equality,
//! presence, substrings, and ordered (`>=`/`<=`) assertions, with `\XX`
//! hex escapes. Evaluation consults the schema for the attribute's
//! equality rule and degrades to case-insensitive matching when no schema
//! is available.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::dn::{normalize_value, Dn};
use crate::entry::Entry;
use crate::schema::{EqualityRule, Schema};

pub type Result<T> = std::result::Result<T, FilterError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("filter '{0}' is not enclosed in parentheses")]
    MissingParentheses(String),

    #[error("unexpected end of filter '{0}'")]
    UnexpectedEnd(String),

    #[error("empty attribute description in filter '{0}'")]
    EmptyAttribute(String),

    #[error("invalid hex escape in filter '{0}'")]
    InvalidEscape(String),

    #[error("trailing data after filter '{0}'")]
    TrailingData(String),

    #[error("filter component '{0}' has no comparison operator")]
    MissingOperator(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equality {
        attr: String,
        value: String,
    },
    Presence {
        attr: String,
    },
    Substring {
        attr: String,
        initial: Option<String>,
        any: Vec<String>,
        final_: Option<String>,
    },
    GreaterOrEqual {
        attr: String,
        value: String,
    },
    LessOrEqual {
        attr: String,
        value: String,
    },
}

impl Filter {
    pub fn parse(text: &str) -> Result<Filter> {
        let trimmed = text.trim();
        let mut parser = Parser {
            text: trimmed,
            bytes: trimmed.as_bytes(),
            pos: 0,
        };
        let filter = parser.parse_filter()?;
        if parser.pos != parser.bytes.len() {
            return Err(FilterError::TrailingData(text.to_string()));
        }
        Ok(filter)
    }

    /// True when the entry matches, per the schema's equality rules.
    pub fn matches(&self, entry: &Entry, schema: Option<&Schema>) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(entry, schema)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(entry, schema)),
            Filter::Not(inner) => !inner.matches(entry, schema),
            Filter::Presence { attr } => entry.has_attribute(attr),
            Filter::Equality { attr, value } => {
                let rule = rule_for(schema, attr);
                entry
                    .values(attr)
                    .iter()
                    .any(|v| values_equal(v, value, rule))
            }
            Filter::Substring {
                attr,
                initial,
                any,
                final_,
            } => {
                let rule = rule_for(schema, attr);
                entry
                    .values(attr)
                    .iter()
                    .any(|v| substring_match(v, initial, any, final_, rule))
            }
            Filter::GreaterOrEqual { attr, value } => {
                let rule = rule_for(schema, attr);
                entry
                    .values(attr)
                    .iter()
                    .any(|v| ordered_cmp(v, value, rule).map(|o| o.is_ge()).unwrap_or(false))
            }
            Filter::LessOrEqual { attr, value } => {
                let rule = rule_for(schema, attr);
                entry
                    .values(attr)
                    .iter()
                    .any(|v| ordered_cmp(v, value, rule).map(|o| o.is_le()).unwrap_or(false))
            }
        }
    }
}

/// The canonical string form (lowercased attribute names) doubles as the
/// duplicate-detection key for the filter strategy's configuration check.
impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(parts) => {
                f.write_str("(&")?;
                for part in parts {
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
            Filter::Or(parts) => {
                f.write_str("(|")?;
                for part in parts {
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
            Filter::Not(inner) => write!(f, "(!{inner})"),
            Filter::Equality { attr, value } => write!(f, "({attr}={})", escape(value)),
            Filter::Presence { attr } => write!(f, "({attr}=*)"),
            Filter::Substring {
                attr,
                initial,
                any,
                final_,
            } => {
                write!(f, "({attr}=")?;
                if let Some(initial) = initial {
                    write!(f, "{}", escape(initial))?;
                }
                for part in any {
                    write!(f, "*{}", escape(part))?;
                }
                write!(f, "*")?;
                if let Some(final_) = final_ {
                    write!(f, "{}", escape(final_))?;
                }
                f.write_str(")")
            }
            Filter::GreaterOrEqual { attr, value } => write!(f, "({attr}>={})", escape(value)),
            Filter::LessOrEqual { attr, value } => write!(f, "({attr}<={})", escape(value)),
        }
    }
}

impl FromStr for Filter {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Filter> {
        Filter::parse(s)
    }
}

fn rule_for(schema: Option<&Schema>, attr: &str) -> EqualityRule {
    schema.map(|s| s.equality_rule(attr)).unwrap_or_default()
}

fn values_equal(entry_value: &[u8], assertion: &str, rule: EqualityRule) -> bool {
    let entry_value = String::from_utf8_lossy(entry_value);
    match rule {
        EqualityRule::CaseIgnore => normalize_value(&entry_value) == normalize_value(assertion),
        EqualityRule::CaseExact => collapse_exact(&entry_value) == collapse_exact(assertion),
        EqualityRule::DistinguishedName => {
            match (Dn::parse(&entry_value), Dn::parse(assertion)) {
                (Ok(a), Ok(b)) => a == b,
                _ => normalize_value(&entry_value) == normalize_value(assertion),
            }
        }
    }
}

fn substring_match(
    entry_value: &[u8],
    initial: &Option<String>,
    any: &[String],
    final_: &Option<String>,
    rule: EqualityRule,
) -> bool {
    let norm = |s: &str| match rule {
        EqualityRule::CaseExact => collapse_exact(s),
        _ => normalize_value(s),
    };
    let value = norm(&String::from_utf8_lossy(entry_value));
    let mut remaining = value.as_str();

    if let Some(initial) = initial {
        let initial = norm(initial);
        match remaining.strip_prefix(initial.as_str()) {
            Some(rest) => remaining = rest,
            None => return false,
        }
    }
    for part in any {
        let part = norm(part);
        match remaining.find(part.as_str()) {
            Some(idx) => remaining = &remaining[idx + part.len()..],
            None => return false,
        }
    }
    if let Some(final_) = final_ {
        let final_ = norm(final_);
        return remaining.ends_with(final_.as_str());
    }
    true
}

/// Ordered comparison on the normalized string forms. Values that are both
/// integers compare numerically.
fn ordered_cmp(
    entry_value: &[u8],
    assertion: &str,
    rule: EqualityRule,
) -> Option<std::cmp::Ordering> {
    let entry_value = String::from_utf8_lossy(entry_value);
    let (a, b) = match rule {
        EqualityRule::CaseExact => (collapse_exact(&entry_value), collapse_exact(assertion)),
        _ => (normalize_value(&entry_value), normalize_value(assertion)),
    };
    if let (Ok(a), Ok(b)) = (a.parse::<i64>(), b.parse::<i64>()) {
        return Some(a.cmp(&b));
    }
    Some(a.cmp(&b))
}

fn collapse_exact(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_space = false;
    for c in value.trim().chars() {
        if c.is_ascii_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => out.push_str("\\2a"),
            '(' => out.push_str("\\28"),
            ')' => out.push_str("\\29"),
            '\\' => out.push_str("\\5c"),
            '\0' => out.push_str("\\00"),
            _ => out.push(c),
        }
    }
    out
}

struct Parser<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_filter(&mut self) -> Result<Filter> {
        self.expect(b'(')?;
        let filter = match self.peek()? {
            b'&' => {
                self.pos += 1;
                Filter::And(self.parse_set()?)
            }
            b'|' => {
                self.pos += 1;
                Filter::Or(self.parse_set()?)
            }
            b'!' => {
                self.pos += 1;
                Filter::Not(Box::new(self.parse_filter()?))
            }
            _ => self.parse_comparison()?,
        };
        self.expect(b')')?;
        Ok(filter)
    }

    fn parse_set(&mut self) -> Result<Vec<Filter>> {
        let mut parts = Vec::new();
        while self.peek()? == b'(' {
            parts.push(self.parse_filter()?);
        }
        Ok(parts)
    }

    fn parse_comparison(&mut self) -> Result<Filter> {
        let start = self.pos;
        while self.pos < self.bytes.len() && !matches!(self.bytes[self.pos], b'=' | b'>' | b'<') {
            if self.bytes[self.pos] == b')' {
                return Err(FilterError::MissingOperator(self.text.to_string()));
            }
            self.pos += 1;
        }
        if self.pos >= self.bytes.len() {
            return Err(FilterError::UnexpectedEnd(self.text.to_string()));
        }

        let op = self.bytes[self.pos];
        let attr_end = self.pos;
        let attr = self.text[start..attr_end].trim().to_ascii_lowercase();
        if attr.is_empty() {
            return Err(FilterError::EmptyAttribute(self.text.to_string()));
        }

        if op == b'>' || op == b'<' {
            self.pos += 1;
            self.expect(b'=')?;
            let value = self.parse_value_text()?;
            return Ok(if op == b'>' {
                Filter::GreaterOrEqual { attr, value: unescape(&value, self.text)? }
            } else {
                Filter::LessOrEqual { attr, value: unescape(&value, self.text)? }
            });
        }

        self.pos += 1;
        let raw = self.parse_value_text()?;
        if raw == "*" {
            return Ok(Filter::Presence { attr });
        }
        if raw.contains('*') {
            let segments: Vec<&str> = raw.split('*').collect();
            let initial = match segments[0] {
                "" => None,
                s => Some(unescape(s, self.text)?),
            };
            let final_ = match segments[segments.len() - 1] {
                "" => None,
                s => Some(unescape(s, self.text)?),
            };
            let mut any = Vec::new();
            for segment in &segments[1..segments.len() - 1] {
                if !segment.is_empty() {
                    any.push(unescape(segment, self.text)?);
                }
            }
            return Ok(Filter::Substring {
                attr,
                initial,
                any,
                final_,
            });
        }
        Ok(Filter::Equality {
            attr,
            value: unescape(&raw, self.text)?,
        })
    }

    /// Reads the raw assertion text up to the closing parenthesis, escapes
    /// intact (substring splitting must see unescaped `*` only).
    fn parse_value_text(&mut self) -> Result<String> {
        let start = self.pos;
        while self.pos < self.bytes.len() && self.bytes[self.pos] != b')' {
            if self.bytes[self.pos] == b'\\' {
                self.pos += 1;
            }
            self.pos += 1;
        }
        if self.pos > self.bytes.len() {
            return Err(FilterError::UnexpectedEnd(self.text.to_string()));
        }
        Ok(self.text[start..self.pos.min(self.bytes.len())].to_string())
    }

    fn peek(&self) -> Result<u8> {
        self.bytes
            .get(self.pos)
            .copied()
            .ok_or_else(|| FilterError::UnexpectedEnd(self.text.to_string()))
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        if self.peek()? != expected {
            return Err(if expected == b'(' {
                FilterError::MissingParentheses(self.text.to_string())
            } else {
                FilterError::UnexpectedEnd(self.text.to_string())
            });
        }
        self.pos += 1;
        Ok(())
    }
}

fn unescape(value: &str, whole: &str) -> Result<String> {
    let mut out = Vec::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        let h1 = chars
            .next()
            .filter(|c| c.is_ascii_hexdigit())
            .ok_or_else(|| FilterError::InvalidEscape(whole.to_string()))?;
        let h2 = chars
            .next()
            .filter(|c| c.is_ascii_hexdigit())
            .ok_or_else(|| FilterError::InvalidEscape(whole.to_string()))?;
        out.push((h1.to_digit(16).unwrap() * 16 + h2.to_digit(16).unwrap()) as u8);
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
#[path = "filter_test.rs"]
mod tests;
