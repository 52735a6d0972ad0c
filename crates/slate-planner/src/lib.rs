//! Index selection for slate queries.
//!
//! Given a parsed predicate tree and the index catalog of a collection,
//! [`IndexSelector`] decides which indexes may answer each predicate.

mod collation;
mod config;
mod error;
mod hint;
mod index;
pub mod ixselect;

pub use collation::{CollationSpec, Collator, LocaleCollator, collators_match};
pub use config::SelectionConfig;
pub use error::PlannerError;
pub use hint::find_indexes_by_hint;
pub use index::{
    Flat2dParams, IndexEntry, IndexIdentifier, IndexKind, KeyField, KeyPattern, KeyType,
    SphereVersion, TEXT_WEIGHTS_PATH, TextInfo, WILDCARD_SUFFIX, WildcardProjection,
};
pub use ixselect::{IndexSelector, Selection, find_relevant_indexes};
pub use slate_query::{MatchTree, NodeId, parse_filter};
