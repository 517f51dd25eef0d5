//! Shard identifiers and shard sets.

use std::fmt;
use std::sync::Arc;

/// File suffix of the dedicated shard for entries outside the split base DN.
pub const OUTSIDE_SUFFIX: &str = ".outside-split-base-dn";

/// File suffix of the shard holding malformed records and routing failures.
pub const ERRORS_SUFFIX: &str = ".errors";

/// One target shard. Numbered sets are 0-based internally and rendered
/// 1-based in file names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Shard {
    Set(u32),
    Outside,
    Errors,
}

impl Shard {
    /// The on-disk suffix appended to the target base path.
    pub fn file_suffix(&self) -> String {
        match self {
            Shard::Set(i) => format!(".set{}", i + 1),
            Shard::Outside => OUTSIDE_SUFFIX.to_string(),
            Shard::Errors => ERRORS_SUFFIX.to_string(),
        }
    }

    pub fn is_errors(&self) -> bool {
        matches!(self, Shard::Errors)
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_suffix())
    }
}

/// An ordered, duplicate-free set of target shards. Shared rather than
/// copied: the parent map and every descendant entry hold the same
/// allocation. The empty set means "exclude this entry".
pub type ShardSet = Arc<[Shard]>;

pub fn empty() -> ShardSet {
    Arc::from([])
}

pub fn single(shard: Shard) -> ShardSet {
    Arc::from([shard])
}

/// All numbered shards `0..n`, for outside-to-all-sets handling.
pub fn all_sets(n: u32) -> ShardSet {
    (0..n).map(Shard::Set).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_suffixes_are_one_based() {
        assert_eq!(Shard::Set(0).file_suffix(), ".set1");
        assert_eq!(Shard::Set(3).file_suffix(), ".set4");
        assert_eq!(Shard::Outside.file_suffix(), ".outside-split-base-dn");
        assert_eq!(Shard::Errors.file_suffix(), ".errors");
    }

    #[test]
    fn all_sets_is_ordered() {
        let set = all_sets(3);
        assert_eq!(&set[..], &[Shard::Set(0), Shard::Set(1), Shard::Set(2)]);
    }
}
