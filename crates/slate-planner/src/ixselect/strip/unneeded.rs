use slate_query::{Condition, MatchTree, Node, NodeId};
use tracing::debug;

use crate::index::IndexEntry;
use crate::ixselect::tag::RelevanceTags;

/// Where an AND pins a unique single-field index with an equality, that
/// lookup returns at most one document, so every other assignment in the
/// AND is dropped. Assignments to the unique index itself are kept.
///
/// Must run after [`super::strip_invalid_assignments`].
pub fn strip_unneeded_assignments(
    tree: &MatchTree,
    tags: &mut RelevanceTags,
    indexes: &[IndexEntry],
) {
    strip_node(tree, tree.root(), tags, indexes);
}

fn strip_node(tree: &MatchTree, id: NodeId, tags: &mut RelevanceTags, indexes: &[IndexEntry]) {
    if let Node::And(_) = tree.node(id)
        && let Some(unique) = unique_equality(tree, id, tags, indexes)
    {
        debug!(
            index = %indexes[unique].identifier,
            "unique equality lookup makes other assignments unneeded"
        );
        for node in tree.descendants(id) {
            if let Some(tag) = tags.get_mut(node) {
                tag.first.retain(|&i| i == unique);
                tag.not_first.retain(|nf| nf.index == unique);
            }
        }
        return;
    }

    for child in tree.children(id) {
        strip_node(tree, *child, tags, indexes);
    }
}

/// A unique, single-field, non-partial index leading the tag of an
/// equality directly under the AND at `id`.
fn unique_equality(
    tree: &MatchTree,
    id: NodeId,
    tags: &RelevanceTags,
    indexes: &[IndexEntry],
) -> Option<usize> {
    let mut conjuncts = Vec::new();
    flatten_and(tree, id, &mut conjuncts);
    conjuncts.into_iter().find_map(|child| {
        let Node::Leaf {
            condition: Condition::Eq(_),
            ..
        } = tree.node(child)
        else {
            return None;
        };
        tags.get(child)?.first.iter().copied().find(|&i| {
            let index = &indexes[i];
            index.unique && index.is_single_field() && index.partial_filter.is_none()
        })
    })
}

/// Direct children of an AND, looking through nested ANDs.
fn flatten_and(tree: &MatchTree, id: NodeId, out: &mut Vec<NodeId>) {
    for child in tree.children(id) {
        match tree.node(*child) {
            Node::And(_) => flatten_and(tree, *child, out),
            _ => out.push(*child),
        }
    }
}
