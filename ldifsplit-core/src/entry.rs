//! Parsed directory entries.

use crate::dn::Dn;

/// One attribute description with its values in source order. Values are
/// raw bytes; LDIF base64 decoding happens in the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<Vec<u8>>,
}

/// A directory entry: the parsed DN, the DN exactly as written in the
/// source, and the attributes in first-occurrence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub dn: Dn,
    pub dn_text: String,
    attributes: Vec<Attribute>,
}

impl Entry {
    pub fn new(dn: Dn, dn_text: impl Into<String>) -> Self {
        Entry {
            dn,
            dn_text: dn_text.into(),
            attributes: Vec::new(),
        }
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Appends a value, merging into an existing attribute of the same name
    /// (attribute names are case-insensitive).
    pub fn add_value(&mut self, name: &str, value: Vec<u8>) {
        if let Some(attr) = self
            .attributes
            .iter_mut()
            .find(|a| a.name.eq_ignore_ascii_case(name))
        {
            attr.values.push(value);
        } else {
            self.attributes.push(Attribute {
                name: name.to_string(),
                values: vec![value],
            });
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes
            .iter()
            .any(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// All values of the named attribute, empty when absent.
    pub fn values(&self, name: &str) -> &[Vec<u8>] {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
            .map(|a| a.values.as_slice())
            .unwrap_or(&[])
    }

    /// The first value of the named attribute in entry order.
    pub fn first_value(&self, name: &str) -> Option<&[u8]> {
        self.values(name).first().map(|v| v.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;

    #[test]
    fn value_lookup_is_case_insensitive() {
        let mut entry = Entry::new(
            Dn::parse("uid=alice,dc=example,dc=com").unwrap(),
            "uid=alice,dc=example,dc=com",
        );
        entry.add_value("objectClass", b"person".to_vec());
        entry.add_value("OBJECTCLASS", b"inetOrgPerson".to_vec());
        entry.add_value("uid", b"alice".to_vec());

        assert_eq!(entry.attributes().len(), 2);
        assert_eq!(entry.values("objectclass").len(), 2);
        assert_eq!(entry.first_value("UID"), Some(&b"alice"[..]));
        assert!(entry.has_attribute("ObjectClass"));
        assert!(!entry.has_attribute("cn"));
    }
}
