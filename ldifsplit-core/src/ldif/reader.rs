//! LDIF record scanning and parsing.
//!
//! The scanner frames raw records (maximal runs of non-blank lines) out of
//! any `BufRead` source, dropping comment lines and an optional leading
//! `version: 1` line. Parsing a raw record into an [`Entry`] is a separate
//! step so that it can run on worker threads while the scanner stays on the
//! reader thread.
//!
//! Malformed records are reported with the raw source lines attached; the
//! scanner itself resumes at the next blank-line boundary, so record-local
//! failures are recoverable. Failures of the underlying stream (I/O errors,
//! invalid UTF-8) lose framing and are not.

use std::io::{self, BufRead};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

use crate::dn::Dn;
use crate::entry::Entry;

/// A record-local parse failure. The run can continue past it; the raw
/// lines are kept so the record can be preserved in the errors shard.
#[derive(Debug, Error, Clone)]
#[error("{message}")]
pub struct MalformedRecord {
    /// 1-based line number of the first line of the record.
    pub line: u64,
    pub message: String,
    pub lines: Vec<String>,
}

/// One framed record: the raw source lines (comments removed), before any
/// unfolding or value decoding.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub line: u64,
    pub lines: Vec<String>,
}

/// Frames records out of an LDIF stream.
pub struct RecordScanner<R: BufRead> {
    reader: R,
    line: u64,
    seen_content: bool,
}

impl<R: BufRead> RecordScanner<R> {
    pub fn new(reader: R) -> Self {
        RecordScanner {
            reader,
            line: 0,
            seen_content: false,
        }
    }

    /// The next record, `Ok(None)` at end of stream. I/O errors (including
    /// invalid UTF-8 surfaced as `InvalidData`) abort the scan.
    pub fn next_record(&mut self) -> io::Result<Option<RawRecord>> {
        let mut lines: Vec<String> = Vec::new();
        let mut first_line = 0;
        let mut in_comment = false;

        loop {
            let mut buf = String::new();
            let n = self.reader.read_line(&mut buf)?;
            if n == 0 {
                if lines.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(RawRecord {
                    line: first_line,
                    lines,
                }));
            }
            self.line += 1;

            let line = buf.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                in_comment = false;
                if lines.is_empty() {
                    continue;
                }
                return Ok(Some(RawRecord {
                    line: first_line,
                    lines,
                }));
            }

            // Comment lines are dropped together with their continuations.
            if line.starts_with('#') {
                in_comment = true;
                continue;
            }
            if in_comment && line.starts_with(' ') {
                continue;
            }
            in_comment = false;

            // An optional version line may precede the first record.
            if !self.seen_content && lines.is_empty() && is_version_line(line) {
                self.seen_content = true;
                continue;
            }
            self.seen_content = true;

            if lines.is_empty() {
                first_line = self.line;
            }
            lines.push(line.to_string());
        }
    }
}

fn is_version_line(line: &str) -> bool {
    line.strip_prefix("version:")
        .map(|rest| rest.trim().chars().all(|c| c.is_ascii_digit()) && !rest.trim().is_empty())
        .unwrap_or(false)
}

/// Parses a framed record into an entry: unfolds continuation lines, splits
/// `name: value` / `name:: base64` forms, decodes values, parses the DN.
pub fn parse_record(record: &RawRecord) -> Result<Entry, MalformedRecord> {
    let logical = unfold(&record.lines);
    if logical.is_empty() {
        return Err(malformed(record, "record contains no attribute lines"));
    }

    let (dn_name, dn_value) = split_line(&logical[0])
        .ok_or_else(|| malformed(record, "the first line of the record has no colon"))?;
    if !dn_name.eq_ignore_ascii_case("dn") {
        return Err(malformed(
            record,
            "the record does not begin with a 'dn:' line",
        ));
    }
    let dn_bytes = decode_value(dn_value)
        .map_err(|message| malformed(record, &format!("unable to decode the DN: {message}")))?;
    let dn_text = String::from_utf8(dn_bytes)
        .map_err(|_| malformed(record, "the DN is not valid UTF-8"))?;
    let dn = Dn::parse(&dn_text)
        .map_err(|e| malformed(record, &format!("unable to parse DN '{dn_text}': {e}")))?;

    let mut entry = Entry::new(dn, dn_text);
    for line in &logical[1..] {
        let (name, value) = split_line(line).ok_or_else(|| {
            malformed(record, &format!("attribute line '{line}' has no colon"))
        })?;
        if name.is_empty() {
            return Err(malformed(
                record,
                &format!("attribute line '{line}' has an empty attribute name"),
            ));
        }
        let value = decode_value(value).map_err(|message| {
            malformed(
                record,
                &format!("unable to decode value of attribute '{name}': {message}"),
            )
        })?;
        entry.add_value(name, value);
    }
    Ok(entry)
}

fn malformed(record: &RawRecord, message: &str) -> MalformedRecord {
    MalformedRecord {
        line: record.line,
        message: message.to_string(),
        lines: record.lines.clone(),
    }
}

/// Joins continuation lines (leading single space) onto their parent line.
fn unfold(lines: &[String]) -> Vec<String> {
    let mut logical: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some(last) = logical.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        logical.push(line.clone());
    }
    logical
}

/// Splits a logical line into attribute description and raw value text
/// (still carrying the `:`/`<` marker for the decode step).
fn split_line(line: &str) -> Option<(&str, &str)> {
    let colon = line.find(':')?;
    Some((line[..colon].trim_end(), &line[colon + 1..]))
}

/// Decodes the value part after the first colon: `: value`, `:: base64`, or
/// `:< url` (rejected).
fn decode_value(raw: &str) -> Result<Vec<u8>, String> {
    if let Some(b64) = raw.strip_prefix(':') {
        return BASE64
            .decode(b64.trim())
            .map_err(|e| format!("invalid base64 value: {e}"));
    }
    if raw.strip_prefix('<').is_some() {
        return Err("value references an external source, which is not supported".to_string());
    }
    Ok(raw.strip_prefix(' ').unwrap_or(raw).as_bytes().to_vec())
}

#[cfg(test)]
#[path = "reader_test.rs"]
mod tests;
