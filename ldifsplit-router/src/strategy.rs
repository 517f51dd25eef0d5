//! Routing strategies.
//!
//! The four split algorithms share one outer decision: entries at or above
//! the split base DN (or in an unrelated tree) are "outside" and handled per
//! configuration; entries exactly one level below the base are assigned a
//! set by the strategy-specific rule; deeper entries inherit their
//! ancestor's placement, either by recomputation (hash-on-rdn, or any
//! strategy with the flat-DIT assumption) or through the parent map.
//!
//! Strategy selection happens once at stream start; routing dispatches over
//! a tagged enum rather than a trait object.

use ldifsplit_core::{Dn, Entry, Filter, Schema};

use crate::errors::Result;
use crate::shard::{all_sets, empty, single, Shard, ShardSet};
use crate::ParentMap;

mod fewest_entries;
mod filter_match;
mod hash_attribute;
mod hash_rdn;

pub use fewest_entries::FewestEntriesSplitter;
pub use filter_match::FilterSplitter;
pub use hash_attribute::AttributeHashSplitter;
pub use hash_rdn::RdnHashSplitter;

/// What to do with entries at or above the split base DN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutsideHandling {
    /// Replicate into every numbered set.
    AllSets,
    /// Write to the dedicated outside shard.
    DedicatedSet,
    /// Drop (counted as excluded).
    #[default]
    Omit,
}

impl OutsideHandling {
    /// Builds from the two CLI flags; their mutual exclusion is enforced by
    /// the argument parser.
    pub fn from_flags(to_all_sets: bool, to_dedicated_set: bool) -> Self {
        if to_all_sets {
            OutsideHandling::AllSets
        } else if to_dedicated_set {
            OutsideHandling::DedicatedSet
        } else {
            OutsideHandling::Omit
        }
    }

    fn shard_set(&self, num_sets: u32) -> ShardSet {
        match self {
            OutsideHandling::AllSets => all_sets(num_sets),
            OutsideHandling::DedicatedSet => single(Shard::Outside),
            OutsideHandling::Omit => empty(),
        }
    }
}

/// Outcome of routing one entry. `Deferred` means the entry needs its
/// parent's decision and the parent has not been translated yet; the
/// dispatcher retries once at drain time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Route(ShardSet),
    Deferred,
}

/// The selected split algorithm with its per-variant state.
#[derive(Debug)]
pub enum SplitStrategy {
    HashOnRdn(RdnHashSplitter),
    HashOnAttribute(AttributeHashSplitter),
    FewestEntries(FewestEntriesSplitter),
    Filter(FilterSplitter),
}

impl SplitStrategy {
    pub fn hash_on_rdn(base: Dn, num_sets: u32, outside: OutsideHandling) -> Result<Self> {
        Ok(SplitStrategy::HashOnRdn(RdnHashSplitter::new(
            base, num_sets, outside,
        )?))
    }

    pub fn hash_on_attribute(
        base: Dn,
        num_sets: u32,
        attribute: String,
        use_all_values: bool,
        assume_flat_dit: bool,
        outside: OutsideHandling,
    ) -> Result<Self> {
        Ok(SplitStrategy::HashOnAttribute(AttributeHashSplitter::new(
            base,
            num_sets,
            attribute,
            use_all_values,
            assume_flat_dit,
            outside,
        )?))
    }

    pub fn fewest_entries(
        base: Dn,
        num_sets: u32,
        assume_flat_dit: bool,
        outside: OutsideHandling,
    ) -> Result<Self> {
        Ok(SplitStrategy::FewestEntries(FewestEntriesSplitter::new(
            base,
            num_sets,
            assume_flat_dit,
            outside,
        )?))
    }

    pub fn filter(
        base: Dn,
        filters: Vec<Filter>,
        schema: Option<Schema>,
        assume_flat_dit: bool,
        outside: OutsideHandling,
    ) -> Result<Self> {
        Ok(SplitStrategy::Filter(FilterSplitter::new(
            base,
            filters,
            schema,
            assume_flat_dit,
            outside,
        )?))
    }

    /// Routes one entry to its shard set. Safe to call from any number of
    /// worker threads.
    pub fn route(&self, entry: &Entry) -> RouteDecision {
        match self {
            SplitStrategy::HashOnRdn(s) => s.route(entry),
            SplitStrategy::HashOnAttribute(s) => s.route(entry),
            SplitStrategy::FewestEntries(s) => s.route(entry),
            SplitStrategy::Filter(s) => s.route(entry),
        }
    }

    /// The number of numbered sets this strategy partitions into.
    pub fn num_sets(&self) -> u32 {
        match self {
            SplitStrategy::HashOnRdn(s) => s.num_sets(),
            SplitStrategy::HashOnAttribute(s) => s.num_sets(),
            SplitStrategy::FewestEntries(s) => s.num_sets(),
            SplitStrategy::Filter(s) => s.num_sets(),
        }
    }
}

/// Where an entry's DN sits relative to the split base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    Outside,
    OneLevel,
    Deeper,
}

pub(crate) fn position(dn: &Dn, base: &Dn) -> Position {
    match dn.depth_below(base) {
        None => Position::Outside,
        Some(1) => Position::OneLevel,
        Some(_) => Position::Deeper,
    }
}

pub(crate) fn outside_set(outside: OutsideHandling, num_sets: u32) -> RouteDecision {
    RouteDecision::Route(outside.shard_set(num_sets))
}

/// Inherits a deeper entry's placement from its parent, writing the
/// inheritance through so grandchildren resolve against this entry in turn.
pub(crate) fn inherit_from_parent(parents: &ParentMap, entry: &Entry) -> RouteDecision {
    match entry.dn.parent().and_then(|p| parents.lookup(&p)) {
        Some(set) => {
            parents.record(&entry.dn, &set);
            RouteDecision::Route(set)
        }
        None => RouteDecision::Deferred,
    }
}

/// FNV-1a/32. The algorithm is pinned: shard assignment must be identical
/// across runs, platforms, and thread counts.
pub(crate) fn fnv1a32(data: &[u8]) -> u32 {
    const FNV_OFFSET: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 16_777_619;
    let mut hash = FNV_OFFSET;
    for byte in data {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

pub(crate) fn hash_to_set(data: &[u8], num_sets: u32) -> Shard {
    Shard::Set(fnv1a32(data) % num_sets)
}

#[cfg(test)]
#[path = "strategy_test.rs"]
mod tests;
