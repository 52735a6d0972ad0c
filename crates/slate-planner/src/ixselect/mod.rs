//! Index selection: which indexes can answer which parts of a predicate.
//!
//! The pipeline collects the indexable paths of a predicate tree, narrows the
//! catalog to the indexes led by one of those paths, tags every predicate
//! with the indexes compatible with it, then strips tags that would be
//! incorrect or pointless.

mod fields;
mod implies;
mod indexability;
mod rate;
mod strip;
mod tag;
mod wildcard;

use std::collections::BTreeSet;
use std::sync::Arc;

use bson::Document;
use slate_query::{MatchTree, NodeId};
use tracing::debug;

use crate::collation::Collator;
use crate::config::SelectionConfig;
use crate::error::PlannerError;
use crate::hint::find_indexes_by_hint;
use crate::index::IndexEntry;

pub use fields::{collect_fields, collect_fields_with_prefix};
pub use implies::is_subset_of;
pub use indexability::{
    is_bounds_generating, is_bounds_generating_not, logical_node_may_be_supported_by_an_index,
    node_can_use_index_on_own_field,
};
pub use rate::{
    ElemMatchContext, compares_collatable_values, compatible, node_is_supported_by_sparse_index,
    node_is_supported_by_wildcard_index, not_equals_null_can_use_index, rate_indices,
};
pub use strip::{strip_invalid_assignments, strip_unneeded_assignments};
pub use tag::{NotFirst, RelevanceTags, RelevantTag};
pub use wildcard::expand_indexes;

/// Keep the indexes whose leading key field is one of `fields`.
pub fn find_relevant_indexes(fields: &BTreeSet<String>, all: &[IndexEntry]) -> Vec<IndexEntry> {
    all.iter()
        .filter(|idx| idx.leading_path().is_some_and(|p| fields.contains(p)))
        .cloned()
        .collect()
}

/// Outcome of [`IndexSelector::select`].
#[derive(Debug, Clone)]
pub struct Selection {
    /// Indexable paths of the predicate.
    pub fields: BTreeSet<String>,
    /// Candidate indexes. Tags refer to positions in this list.
    pub indexes: Vec<IndexEntry>,
    pub tags: RelevanceTags,
}

impl Selection {
    pub fn tag(&self, id: NodeId) -> Option<&RelevantTag> {
        self.tags.get(id)
    }

    /// Identifiers of the indexes assigned to `id`, leading positions first.
    pub fn assigned(&self, id: NodeId) -> Vec<String> {
        self.tag(id)
            .map(|tag| {
                tag.indexes()
                    .map(|i| self.indexes[i].identifier.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any predicate kept an assignment.
    pub fn has_assignments(&self) -> bool {
        self.tags.iter().any(|(_, tag)| !tag.is_empty())
    }
}

/// Runs index selection for one query.
#[derive(Debug, Clone, Default)]
pub struct IndexSelector {
    config: SelectionConfig,
    collator: Option<Arc<dyn Collator>>,
    hint: Option<Document>,
}

impl IndexSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self {
            config,
            collator: None,
            hint: None,
        }
    }

    /// Collation the query runs under.
    pub fn with_collator(mut self, collator: Arc<dyn Collator>) -> Self {
        self.collator = Some(collator);
        self
    }

    /// Restrict selection to the indexes matching `hint`.
    pub fn with_hint(mut self, hint: Document) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn select(
        &self,
        tree: &MatchTree,
        indexes: &[IndexEntry],
    ) -> Result<Selection, PlannerError> {
        let fields = collect_fields(tree);
        debug!(fields = ?fields, "collected indexable fields");

        let hinted;
        let universe = match &self.hint {
            Some(hint) => {
                hinted = find_indexes_by_hint(hint, indexes)?;
                debug!(%hint, matched = hinted.len(), "applied hint");
                hinted.as_slice()
            }
            None => indexes,
        };

        let expanded = expand_indexes(&fields, universe);
        let relevant = find_relevant_indexes(&fields, &expanded);
        debug!(
            catalog = indexes.len(),
            expanded = expanded.len(),
            relevant = relevant.len(),
            "reduced index universe"
        );

        let collator = self.collator.as_deref();
        let mut tags = rate_indices(tree, "", &relevant, collator);
        strip_invalid_assignments(tree, &mut tags, &relevant, collator);
        if self.config.prefer_unique_lookups {
            strip_unneeded_assignments(tree, &mut tags, &relevant);
        }

        Ok(Selection {
            fields,
            indexes: relevant,
            tags,
        })
    }
}
