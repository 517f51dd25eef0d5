//! Core data model for the ldifsplit tool.
//!
//! This crate owns everything below the routing layer: the DN model and
//! canonicalizer, parsed entries, the LDIF record reader and writer, the
//! schema loader, and the search-filter parser/evaluator.

pub mod dn;
pub mod entry;
pub mod filter;
pub mod ldif;
pub mod schema;

pub use dn::{Dn, DnError, Rdn};
pub use entry::{Attribute, Entry};
pub use filter::{Filter, FilterError};
pub use ldif::reader::{MalformedRecord, RawRecord, RecordScanner};
pub use ldif::writer::serialize_entry;
pub use schema::{EqualityRule, Schema, SchemaError};
