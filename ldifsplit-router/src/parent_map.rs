//! Concurrent DN-to-shard-set cache.
//!
//! Strategies that cannot recompute a descendant's shard from its DN alone
//! record the decision made for each entry below the split base DN here, so
//! that deeper entries inherit their ancestor's placement. Entries are never
//! evicted during a run; memory growth is proportional to the number of
//! entries below the base.

use dashmap::DashMap;

use ldifsplit_core::Dn;

use crate::shard::ShardSet;

#[derive(Debug, Default)]
pub struct ParentMap {
    map: DashMap<String, ShardSet>,
}

impl ParentMap {
    pub fn new() -> Self {
        ParentMap::default()
    }

    /// Records the shard set decided for `dn`. Idempotent: the first write
    /// wins, so racing workers can never flip a decision that a child may
    /// already have inherited.
    pub fn record(&self, dn: &Dn, set: &ShardSet) {
        self.map
            .entry(dn.canonical())
            .or_insert_with(|| set.clone());
    }

    pub fn lookup(&self, dn: &Dn) -> Option<ShardSet> {
        self.map.get(&dn.canonical()).map(|v| v.value().clone())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
