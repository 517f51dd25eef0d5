//! Hash-on-attribute strategy.
//!
//! One-level entries hash the canonical value(s) of a configured attribute;
//! entries missing the attribute fall back to the RDN hash. Deeper entries
//! inherit through the parent map, unless the DIT is asserted flat, in
//! which case placement is recomputed against the one-level-below-base
//! ancestor and no cache is kept.

use ldifsplit_core::dn::normalize_value;
use ldifsplit_core::{Dn, Entry};

use crate::errors::{Result, RouterError};
use crate::shard::{single, Shard};
use crate::strategy::{
    hash_to_set, inherit_from_parent, outside_set, position, OutsideHandling, Position,
    RouteDecision,
};
use crate::ParentMap;

/// Separator between concatenated attribute values in the hash input. A
/// byte that cannot appear inside a canonical value, so value boundaries
/// stay unambiguous.
const VALUE_SEPARATOR: u8 = 0x00;

#[derive(Debug)]
pub struct AttributeHashSplitter {
    base: Dn,
    num_sets: u32,
    attribute: String,
    use_all_values: bool,
    assume_flat_dit: bool,
    outside: OutsideHandling,
    parents: ParentMap,
}

impl AttributeHashSplitter {
    pub fn new(
        base: Dn,
        num_sets: u32,
        attribute: String,
        use_all_values: bool,
        assume_flat_dit: bool,
        outside: OutsideHandling,
    ) -> Result<Self> {
        if num_sets < 2 {
            return Err(RouterError::TooFewSets(num_sets));
        }
        Ok(AttributeHashSplitter {
            base,
            num_sets,
            attribute,
            use_all_values,
            assume_flat_dit,
            outside,
            parents: ParentMap::new(),
        })
    }

    pub fn num_sets(&self) -> u32 {
        self.num_sets
    }

    pub fn route(&self, entry: &Entry) -> RouteDecision {
        match position(&entry.dn, &self.base) {
            Position::Outside => outside_set(self.outside, self.num_sets),
            Position::OneLevel => {
                let shard = self.hash_entry(entry);
                if !self.assume_flat_dit {
                    let set = single(shard);
                    self.parents.record(&entry.dn, &set);
                    return RouteDecision::Route(set);
                }
                RouteDecision::Route(single(shard))
            }
            Position::Deeper => {
                if self.assume_flat_dit {
                    RouteDecision::Route(single(self.hash_entry(entry)))
                } else {
                    inherit_from_parent(&self.parents, entry)
                }
            }
        }
    }

    /// Hashes the entry's attribute values, or its RDN below the base when
    /// the attribute is absent.
    fn hash_entry(&self, entry: &Entry) -> Shard {
        let values = entry.values(&self.attribute);
        if values.is_empty() {
            let rdn = entry.dn.relative_component(&self.base).unwrap();
            return hash_to_set(rdn.canonical().as_bytes(), self.num_sets);
        }

        let mut data = Vec::new();
        if self.use_all_values {
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    data.push(VALUE_SEPARATOR);
                }
                data.extend_from_slice(canonical_value(value).as_bytes());
            }
        } else {
            data.extend_from_slice(canonical_value(&values[0]).as_bytes());
        }
        hash_to_set(&data, self.num_sets)
    }
}

fn canonical_value(value: &[u8]) -> String {
    normalize_value(&String::from_utf8_lossy(value))
}
