//! LDIF serialization.
//!
//! Output is byte-exact and stable: the same entry always serializes to the
//! same bytes, each record ends with exactly one blank line, and long lines
//! fold at the standard 76-column boundary with a single-space continuation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::entry::Entry;

const WRAP_COLUMN: usize = 76;

/// Serializes an entry to LDIF, terminated by one blank line.
pub fn serialize_entry(entry: &Entry) -> Vec<u8> {
    let mut out = Vec::with_capacity(256);
    write_value_line(&mut out, "dn", entry.dn_text.as_bytes());
    for attr in entry.attributes() {
        for value in &attr.values {
            write_value_line(&mut out, &attr.name, value);
        }
    }
    out.push(b'\n');
    out
}

fn write_value_line(out: &mut Vec<u8>, name: &str, value: &[u8]) {
    let line = if needs_base64(value) {
        format!("{}:: {}", name, BASE64.encode(value))
    } else {
        // Safe values are ASCII; the lossless round-trip is checked above.
        format!("{}: {}", name, std::str::from_utf8(value).unwrap())
    };
    fold_line(out, &line);
}

/// LDIF safe-string check: plain `name: value` form is only used when the
/// value survives it unchanged.
fn needs_base64(value: &[u8]) -> bool {
    if value.is_empty() {
        return false;
    }
    match value[0] {
        b' ' | b':' | b'<' => return true,
        _ => {}
    }
    if value[value.len() - 1] == b' ' {
        return true;
    }
    value
        .iter()
        .any(|&b| b >= 0x80 || b == b'\0' || b == b'\n' || b == b'\r')
}

fn fold_line(out: &mut Vec<u8>, line: &str) {
    let bytes = line.as_bytes();
    if bytes.len() <= WRAP_COLUMN {
        out.extend_from_slice(bytes);
        out.push(b'\n');
        return;
    }
    out.extend_from_slice(&bytes[..WRAP_COLUMN]);
    out.push(b'\n');
    // Continuation lines carry one leading space that the reader strips.
    for chunk in bytes[WRAP_COLUMN..].chunks(WRAP_COLUMN - 1) {
        out.push(b' ');
        out.extend_from_slice(chunk);
        out.push(b'\n');
    }
}
