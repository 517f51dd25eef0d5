//! Fewest-entries strategy.
//!
//! One-level entries go to the set with the smallest running count, ties to
//! the lowest set index. Descendants inherit their ancestor's set and count
//! toward it, so branches of different sizes still even out. The pick and
//! its increment happen under one lock: two racing workers can never both
//! observe the same minimum.
//!
//! Unlike the hash and filter strategies, a fewest-entries placement is a
//! stateful draw, not a function of the entry: it cannot be recomputed
//! later. With the flat-DIT assumption no placement is cached, so entries
//! deeper than one level fail routing rather than drawing again and
//! corrupting both subtree cohesion and the balance counters.

use std::sync::Mutex;

use ldifsplit_core::{Dn, Entry};

use crate::errors::{Result, RouterError};
use crate::shard::{single, Shard};
use crate::strategy::{
    inherit_from_parent, outside_set, position, OutsideHandling, Position, RouteDecision,
};
use crate::ParentMap;

#[derive(Debug)]
pub struct FewestEntriesSplitter {
    base: Dn,
    num_sets: u32,
    assume_flat_dit: bool,
    outside: OutsideHandling,
    parents: ParentMap,
    counts: Mutex<Vec<u64>>,
}

impl FewestEntriesSplitter {
    pub fn new(
        base: Dn,
        num_sets: u32,
        assume_flat_dit: bool,
        outside: OutsideHandling,
    ) -> Result<Self> {
        if num_sets < 2 {
            return Err(RouterError::TooFewSets(num_sets));
        }
        Ok(FewestEntriesSplitter {
            base,
            num_sets,
            assume_flat_dit,
            outside,
            parents: ParentMap::new(),
            counts: Mutex::new(vec![0; num_sets as usize]),
        })
    }

    pub fn num_sets(&self) -> u32 {
        self.num_sets
    }

    pub fn route(&self, entry: &Entry) -> RouteDecision {
        match position(&entry.dn, &self.base) {
            Position::Outside => outside_set(self.outside, self.num_sets),
            Position::OneLevel => {
                let shard = self.pick_fewest();
                if !self.assume_flat_dit {
                    let set = single(shard);
                    self.parents.record(&entry.dn, &set);
                    return RouteDecision::Route(set);
                }
                RouteDecision::Route(single(shard))
            }
            Position::Deeper => {
                if self.assume_flat_dit {
                    // No placement was cached and a draw cannot be
                    // reproduced from the DN. Deferral fails the entry into
                    // the errors set with the no-parent diagnostic, leaving
                    // the counters untouched.
                    return RouteDecision::Deferred;
                }
                let decision = inherit_from_parent(&self.parents, entry);
                if let RouteDecision::Route(set) = &decision {
                    self.count_inherited(set);
                }
                decision
            }
        }
    }

    fn pick_fewest(&self) -> Shard {
        let mut counts = self.counts.lock().unwrap();
        let mut winner = 0;
        for (i, count) in counts.iter().enumerate() {
            if *count < counts[winner] {
                winner = i;
            }
        }
        counts[winner] += 1;
        Shard::Set(winner as u32)
    }

    /// Inherited descendants weigh into the balance too.
    fn count_inherited(&self, set: &[Shard]) {
        let mut counts = self.counts.lock().unwrap();
        for shard in set {
            if let Shard::Set(i) = shard {
                counts[*i as usize] += 1;
            }
        }
    }
}
