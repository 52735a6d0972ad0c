//! Which predicate nodes can produce index bounds.

use slate_query::{Condition, MatchTree, Node, NodeId};

/// Leaf operators an index on the leaf's own path can answer.
fn condition_uses_own_field(condition: &Condition) -> bool {
    match condition {
        Condition::Eq(_)
        | Condition::Lt(_)
        | Condition::Lte(_)
        | Condition::Gt(_)
        | Condition::Gte(_)
        | Condition::In(_)
        | Condition::Regex(_)
        | Condition::Exists
        | Condition::Mod { .. }
        | Condition::Type(_)
        | Condition::Geo(_)
        | Condition::GeoNear(_) => true,
        Condition::Size(_) => false,
    }
}

/// Whether an index on the node's own path can answer the node: indexable
/// leaves, `$text`, and an `$elemMatch` over values whose conditions are all
/// indexable.
pub fn node_can_use_index_on_own_field(tree: &MatchTree, id: NodeId) -> bool {
    match tree.node(id) {
        Node::Leaf { condition, .. } => condition_uses_own_field(condition),
        Node::Text(_) => true,
        Node::ElemMatchValue { children, .. } => {
            !children.is_empty()
                && children
                    .iter()
                    .all(|c| node_can_use_index_on_own_field(tree, *c))
        }
        _ => false,
    }
}

/// A negation of a node that can use an index on its own field.
pub fn is_bounds_generating_not(tree: &MatchTree, id: NodeId) -> bool {
    match tree.node(id) {
        Node::Not(child) => node_can_use_index_on_own_field(tree, *child),
        _ => false,
    }
}

pub fn is_bounds_generating(tree: &MatchTree, id: NodeId) -> bool {
    is_bounds_generating_not(tree, id) || node_can_use_index_on_own_field(tree, id)
}

/// An `$elemMatch` object whose sub-predicates are indexed under its path.
pub fn array_uses_index_on_children(tree: &MatchTree, id: NodeId) -> bool {
    matches!(tree.node(id), Node::ElemMatchObject { path, .. } if !path.is_empty())
}

/// Whether children of a logical node can still be answered by indexes.
/// Negated subtrees and NORs are opaque.
pub fn logical_node_may_be_supported_by_an_index(tree: &MatchTree, id: NodeId) -> bool {
    match tree.node(id) {
        Node::And(_) | Node::Or(_) => true,
        Node::Not(_) => is_bounds_generating_not(tree, id),
        _ => false,
    }
}

/// The path a bounds-generating node constrains. Negations report their
/// child's path.
pub fn bounds_path(tree: &MatchTree, id: NodeId) -> Option<&str> {
    match tree.node(id) {
        Node::Not(child) => tree.path(*child),
        node => node.path(),
    }
}
