//! Distinguished names and their canonical form.
//!
//! DNs are parsed into a leaf-first sequence of RDN components. All
//! comparisons, ancestry checks and map keys go through the canonical form:
//! attribute names lowercased, values trimmed with internal whitespace runs
//! collapsed and ASCII-lowercased, multi-valued RDNs sorted by attribute
//! name. The canonical string is stable across process runs; two invocations
//! over the same data must produce identical shard assignments.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DnError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DnError {
    #[error("empty RDN component in '{0}'")]
    EmptyComponent(String),

    #[error("RDN component '{0}' has no '=' separator")]
    MissingSeparator(String),

    #[error("dangling escape at end of '{0}'")]
    DanglingEscape(String),

    #[error("invalid hex escape in '{0}'")]
    InvalidHexEscape(String),
}

/// One attribute-value assertion inside an RDN, stored in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ava {
    attr: String,
    value: String,
}

impl Ava {
    pub fn attribute(&self) -> &str {
        &self.attr
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Ava {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attr, escape_value(&self.value))
    }
}

/// One relative DN component. Multi-valued RDNs keep their AVAs sorted so
/// that `a+b` and `b+a` canonicalize identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rdn {
    avas: Vec<Ava>,
}

impl Rdn {
    pub fn avas(&self) -> &[Ava] {
        &self.avas
    }

    /// Canonical string form, used as hash input and parent-map key.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ava) in self.avas.iter().enumerate() {
            if i > 0 {
                f.write_str("+")?;
            }
            write!(f, "{}", ava)?;
        }
        Ok(())
    }
}

/// A distinguished name: RDN components ordered leaf-first, as written in
/// LDIF. The zero-component DN is valid and names the root DSE.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Dn {
    rdns: Vec<Rdn>,
}

impl Dn {
    /// Parses a DN from its string representation, honoring RFC 4514-style
    /// escapes (`\,`, `\+`, `\\`, `\3d` hex pairs) and optional whitespace
    /// around separators.
    pub fn parse(text: &str) -> Result<Dn> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(Dn::default());
        }

        let mut rdns = Vec::new();
        for component in split_unescaped(trimmed, ',')? {
            let component = component.trim();
            if component.is_empty() {
                return Err(DnError::EmptyComponent(text.to_string()));
            }
            rdns.push(parse_rdn(component, text)?);
        }
        Ok(Dn { rdns })
    }

    pub fn components(&self) -> &[Rdn] {
        &self.rdns
    }

    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// The DN one level up, or `None` for the root DSE.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Dn {
            rdns: self.rdns[1..].to_vec(),
        })
    }

    /// Strict descendant test: `self` is below `ancestor` iff `ancestor` is
    /// a proper suffix of `self`'s component sequence.
    pub fn is_below(&self, ancestor: &Dn) -> bool {
        if self.rdns.len() <= ancestor.rdns.len() {
            return false;
        }
        let offset = self.rdns.len() - ancestor.rdns.len();
        self.rdns[offset..] == ancestor.rdns[..]
    }

    /// The number of levels `self` sits below `base`, or `None` when it is
    /// not strictly below.
    pub fn depth_below(&self, base: &Dn) -> Option<usize> {
        if self.is_below(base) {
            Some(self.rdns.len() - base.rdns.len())
        } else {
            None
        }
    }

    /// The RDN immediately below `base`, or `None` if `self` is not strictly
    /// below `base`.
    pub fn relative_component(&self, base: &Dn) -> Option<&Rdn> {
        let depth = self.depth_below(base)?;
        Some(&self.rdns[depth - 1])
    }

    /// The ancestor of `self` exactly one level below `base` (which is
    /// `self` itself for one-level entries), or `None` if `self` is not
    /// strictly below `base`.
    pub fn ancestor_one_below(&self, base: &Dn) -> Option<Dn> {
        let depth = self.depth_below(base)?;
        Some(Dn {
            rdns: self.rdns[depth - 1..].to_vec(),
        })
    }

    /// Canonical string form, stable across runs.
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", rdn)?;
        }
        Ok(())
    }
}

impl FromStr for Dn {
    type Err = DnError;

    fn from_str(s: &str) -> Result<Dn> {
        Dn::parse(s)
    }
}

fn parse_rdn(component: &str, whole: &str) -> Result<Rdn> {
    let mut avas = Vec::new();
    for ava_text in split_unescaped(component, '+')? {
        let ava_text = ava_text.trim();
        let eq = find_unescaped(ava_text, '=')
            .ok_or_else(|| DnError::MissingSeparator(component.to_string()))?;
        let attr = ava_text[..eq].trim();
        let value = ava_text[eq + 1..].trim();
        if attr.is_empty() {
            return Err(DnError::EmptyComponent(whole.to_string()));
        }
        avas.push(Ava {
            attr: attr.to_ascii_lowercase(),
            value: normalize_value(&unescape(value, whole)?),
        });
    }
    // Order-independent canonical form for multi-valued RDNs.
    avas.sort();
    Ok(Rdn { avas })
}

/// Splits on unescaped occurrences of `sep`, leaving escapes intact for the
/// later unescape pass.
fn split_unescaped(text: &str, sep: char) -> Result<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(&text[start..i]);
            start = i + c.len_utf8();
        }
    }
    if escaped {
        return Err(DnError::DanglingEscape(text.to_string()));
    }
    parts.push(&text[start..]);
    Ok(parts)
}

fn find_unescaped(text: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == needle {
            return Some(i);
        }
    }
    None
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
        match chars.next() {
            None => return Err(DnError::DanglingEscape(whole.to_string())),
            Some(h1) if h1.is_ascii_hexdigit() => {
                let h2 = chars
                    .next()
                    .filter(|c| c.is_ascii_hexdigit())
                    .ok_or_else(|| DnError::InvalidHexEscape(whole.to_string()))?;
                let byte = (h1.to_digit(16).unwrap() * 16 + h2.to_digit(16).unwrap()) as u8;
                out.push(byte);
            }
            Some(special) => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(special.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Default equality-rule normalization: surrounding whitespace trimmed,
/// internal ASCII whitespace runs collapsed to one space, ASCII lowercased.
pub fn normalize_value(value: &str) -> String {
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
            out.push(c.to_ascii_lowercase());
        }
    }
    out
}

fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' | ',' | '+' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "dn_test.rs"]
mod tests;
