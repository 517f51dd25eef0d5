//! Entry routing for ldifsplit.
//!
//! Given a parsed entry and the split base DN, the router deterministically
//! selects the shard set the entry belongs to, using one of four strategies.
//! All strategies preserve subtree cohesion: every descendant lands in the
//! same shard as its ancestor immediately below the split base DN.

mod errors;
pub mod parent_map;
pub mod shard;
pub mod strategy;
pub mod translator;

pub use errors::RouterError;
pub use parent_map::ParentMap;
pub use shard::{Shard, ShardSet};
pub use strategy::{OutsideHandling, RouteDecision, SplitStrategy};
pub use translator::{error_record, TranslatedEntry, Translator};
