//! Hash-on-RDN strategy.
//!
//! The set is chosen by hashing the canonical form of the RDN immediately
//! below the split base DN. Every descendant carries that RDN inside its
//! own DN, so placement is recomputed rather than cached: the strategy is
//! stateless and safe under any entry arrival order.

use ldifsplit_core::{Dn, Entry};

use crate::errors::{Result, RouterError};
use crate::shard::single;
use crate::strategy::{hash_to_set, outside_set, position, OutsideHandling, Position, RouteDecision};

#[derive(Debug)]
pub struct RdnHashSplitter {
    base: Dn,
    num_sets: u32,
    outside: OutsideHandling,
}

impl RdnHashSplitter {
    pub fn new(base: Dn, num_sets: u32, outside: OutsideHandling) -> Result<Self> {
        if num_sets < 2 {
            return Err(RouterError::TooFewSets(num_sets));
        }
        Ok(RdnHashSplitter {
            base,
            num_sets,
            outside,
        })
    }

    pub fn num_sets(&self) -> u32 {
        self.num_sets
    }

    pub fn route(&self, entry: &Entry) -> RouteDecision {
        match position(&entry.dn, &self.base) {
            Position::Outside => outside_set(self.outside, self.num_sets),
            Position::OneLevel | Position::Deeper => {
                // relative_component is Some for anything strictly below.
                let rdn = entry.dn.relative_component(&self.base).unwrap();
                RouteDecision::Route(single(hash_to_set(
                    rdn.canonical().as_bytes(),
                    self.num_sets,
                )))
            }
        }
    }
}
