//! Filter strategy.
//!
//! Each configured filter selects one set: the first filter matching a
//! one-level entry wins. Entries matching none fall back to the RDN hash
//! over the same number of sets, so the partition stays total. Filters must
//! be pairwise distinct by canonical form.

use ldifsplit_core::{Dn, Entry, Filter, Schema};

use crate::errors::{Result, RouterError};
use crate::shard::{single, Shard};
use crate::strategy::{
    hash_to_set, inherit_from_parent, outside_set, position, OutsideHandling, Position,
    RouteDecision,
};
use crate::ParentMap;

#[derive(Debug)]
pub struct FilterSplitter {
    base: Dn,
    filters: Vec<Filter>,
    schema: Option<Schema>,
    assume_flat_dit: bool,
    outside: OutsideHandling,
    parents: ParentMap,
}

impl FilterSplitter {
    pub fn new(
        base: Dn,
        filters: Vec<Filter>,
        schema: Option<Schema>,
        assume_flat_dit: bool,
        outside: OutsideHandling,
    ) -> Result<Self> {
        if filters.len() < 2 {
            return Err(RouterError::NotEnoughFilters(filters.len()));
        }
        let mut seen = std::collections::HashSet::new();
        for filter in &filters {
            let canonical = filter.to_string();
            if !seen.insert(canonical.clone()) {
                return Err(RouterError::DuplicateFilter(canonical));
            }
        }
        Ok(FilterSplitter {
            base,
            filters,
            schema,
            assume_flat_dit,
            outside,
            parents: ParentMap::new(),
        })
    }

    pub fn num_sets(&self) -> u32 {
        self.filters.len() as u32
    }

    pub fn route(&self, entry: &Entry) -> RouteDecision {
        match position(&entry.dn, &self.base) {
            Position::Outside => outside_set(self.outside, self.num_sets()),
            Position::OneLevel => {
                let shard = self.select(entry);
                if !self.assume_flat_dit {
                    let set = single(shard);
                    self.parents.record(&entry.dn, &set);
                    return RouteDecision::Route(set);
                }
                RouteDecision::Route(single(shard))
            }
            Position::Deeper => {
                if self.assume_flat_dit {
                    RouteDecision::Route(single(self.select(entry)))
                } else {
                    inherit_from_parent(&self.parents, entry)
                }
            }
        }
    }

    /// First matching filter wins; no match falls back to the RDN hash.
    fn select(&self, entry: &Entry) -> Shard {
        for (i, filter) in self.filters.iter().enumerate() {
            if filter.matches(entry, self.schema.as_ref()) {
                return Shard::Set(i as u32);
            }
        }
        let rdn = entry.dn.relative_component(&self.base).unwrap();
        hash_to_set(rdn.canonical().as_bytes(), self.num_sets())
    }
}
