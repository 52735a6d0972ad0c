use std::collections::BTreeSet;

use slate_query::{MatchTree, Node, NodeId};

use super::indexability::{
    array_uses_index_on_children, bounds_path, is_bounds_generating_not,
    node_can_use_index_on_own_field,
};

/// Every path an index could be used for anywhere in `tree`.
pub fn collect_fields(tree: &MatchTree) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_fields_with_prefix(tree, tree.root(), "", &mut out);
    out
}

/// Add the indexable paths of the subtree at `id` to `out`, each prefixed
/// with `prefix`. The prefix is the enclosing `$elemMatch` path plus a dot.
pub fn collect_fields_with_prefix(
    tree: &MatchTree,
    id: NodeId,
    prefix: &str,
    out: &mut BTreeSet<String>,
) {
    if is_bounds_generating_not(tree, id) || node_can_use_index_on_own_field(tree, id) {
        if let Some(path) = bounds_path(tree, id) {
            out.insert(format!("{prefix}{path}"));
        }
        return;
    }

    match tree.node(id) {
        Node::ElemMatchObject { path, child } if array_uses_index_on_children(tree, id) => {
            let prefix = format!("{prefix}{path}.");
            collect_fields_with_prefix(tree, *child, &prefix, out);
        }
        Node::And(children) | Node::Or(children) | Node::Nor(children) => {
            for child in children {
                collect_fields_with_prefix(tree, *child, prefix, out);
            }
        }
        Node::Not(child) => collect_fields_with_prefix(tree, *child, prefix, out),
        _ => {}
    }
}
