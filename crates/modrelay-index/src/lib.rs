//! Reference indices for mapping and documentation lookups.
//!
//! [`ReferenceIndex`] is built once from a mapping resource, a list of static
//! method names and a documentation tree, then queried with the approximate
//! matchers in [`fuzzy`].

pub mod docs;
pub mod error;
pub mod fuzzy;
pub mod index;
pub mod mapping;

pub use docs::{ClassKind, DEFAULT_DOCS_BASE_URL, DocEntity, DocTree};
pub use error::{IndexError, RecordKind, Result};
pub use fuzzy::{Scored, reorder_by_affinity, top_matches, top_matches_scored};
pub use index::{DEFAULT_LIMIT, IndexSources, ReferenceIndex, is_obfuscated};
pub use mapping::{MappingClass, MappingField, MappingMethod};
