//! The translation pipeline.
//!
//! Worker threads hand every parsed entry through [`Translator::translate`],
//! which attaches the routing decision and the serialized LDIF bytes. The
//! translator never performs I/O; shard files belong to the dispatcher.

use ldifsplit_core::{serialize_entry, Entry};

use crate::strategy::{RouteDecision, SplitStrategy};

/// An entry with its routing decision and serialized bytes, tagged with the
/// reader-assigned sequence number so the sink can restore source order.
#[derive(Debug)]
pub struct TranslatedEntry {
    pub seq: u64,
    pub entry: Entry,
    pub decision: RouteDecision,
    pub bytes: Vec<u8>,
}

#[derive(Debug)]
pub struct Translator {
    strategy: SplitStrategy,
}

impl Translator {
    pub fn new(strategy: SplitStrategy) -> Self {
        Translator { strategy }
    }

    pub fn strategy(&self) -> &SplitStrategy {
        &self.strategy
    }

    pub fn translate(&self, seq: u64, entry: Entry) -> TranslatedEntry {
        let decision = self.strategy.route(&entry);
        let bytes = serialize_entry(&entry);
        TranslatedEntry {
            seq,
            entry,
            decision,
            bytes,
        }
    }

    /// Second-chance routing, invoked by the dispatcher for entries that
    /// were deferred at translation time.
    pub fn reroute(&self, entry: &Entry) -> RouteDecision {
        self.strategy.route(entry)
    }
}

/// Builds the error-shard record for a failed entry or malformed record: a
/// comment line with the diagnostic, the offending lines, a blank line.
pub fn error_record(message: &str, lines: &[String]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 64);
    out.extend_from_slice(b"# ");
    out.extend_from_slice(message.as_bytes());
    out.push(b'\n');
    for line in lines {
        out.extend_from_slice(line.as_bytes());
        out.push(b'\n');
    }
    out.push(b'\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{OutsideHandling, SplitStrategy};
    use ldifsplit_core::Dn;

    fn entry(dn: &str) -> Entry {
        let mut e = Entry::new(Dn::parse(dn).unwrap(), dn);
        e.add_value("objectClass", b"top".to_vec());
        e
    }

    #[test]
    fn translation_attaches_decision_and_bytes() {
        let base = Dn::parse("ou=People,dc=example,dc=com").unwrap();
        let strategy =
            SplitStrategy::hash_on_rdn(base, 4, OutsideHandling::Omit).unwrap();
        let translator = Translator::new(strategy);

        let translated =
            translator.translate(7, entry("uid=alice,ou=People,dc=example,dc=com"));
        assert_eq!(translated.seq, 7);
        assert!(matches!(translated.decision, RouteDecision::Route(_)));
        assert!(translated.bytes.ends_with(b"\n\n"));
    }

    #[test]
    fn error_records_carry_the_diagnostic_and_raw_lines() {
        let bytes = error_record(
            "unable to parse the record",
            &["dn: broken".to_string(), "uid alice".to_string()],
        );
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "# unable to parse the record\ndn: broken\nuid alice\n\n"
        );
    }
}
