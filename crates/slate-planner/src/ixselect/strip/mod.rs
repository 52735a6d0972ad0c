//! Passes that remove index assignments the rater was too optimistic about.
//!
//! Strippers only ever remove entries from existing tags.

mod partial;
mod sphere;
mod text;
mod unneeded;
mod wildcard;

use slate_query::{MatchTree, NodeId};
use tracing::debug;

use super::tag::RelevanceTags;
use crate::collation::Collator;
use crate::index::IndexEntry;

pub use unneeded::strip_unneeded_assignments;

/// Remove assignments that would produce wrong results or that an index
/// cannot actually serve: text prefixes, 2dsphere v2 geo requirements,
/// wildcard entries for `_fts`, and partial filters the query does not
/// imply.
pub fn strip_invalid_assignments(
    tree: &MatchTree,
    tags: &mut RelevanceTags,
    indexes: &[IndexEntry],
    collator: Option<&dyn Collator>,
) {
    let mut pass = Strip {
        tree,
        tags,
        indexes,
    };
    pass.text_prefixes();
    pass.sphere_v2();
    pass.wildcard_fts();
    pass.partial_filters(collator);
}

/// Shared state of the stripping passes.
pub(super) struct Strip<'a> {
    tree: &'a MatchTree,
    tags: &'a mut RelevanceTags,
    indexes: &'a [IndexEntry],
}

impl Strip<'_> {
    /// Drop `index` from the tag of `id`, if it is there.
    fn remove(&mut self, id: NodeId, index: usize, reason: &str) {
        if let Some(tag) = self.tags.get_mut(id)
            && tag.remove(index)
        {
            debug!(
                index = %self.indexes[index].identifier,
                path = %tag.path,
                reason,
                "stripped index assignment"
            );
        }
    }

    /// Drop `index` from every tag in the subtree at `id`.
    fn remove_in_subtree(&mut self, id: NodeId, index: usize, reason: &str) {
        for node in self.tree.descendants(id) {
            self.remove(node, index, reason);
        }
    }
}
