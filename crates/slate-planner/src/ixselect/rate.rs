//! Compatibility rating: which index can answer which predicate.

use bson::Bson;
use slate_query::geo::{Crs, GeoPredicate, Point, Shape};
use slate_query::value::is_collatable;
use slate_query::{Condition, MatchTree, Node, NodeId};
use tracing::trace;

use super::indexability::{
    array_uses_index_on_children, bounds_path, is_bounds_generating,
    logical_node_may_be_supported_by_an_index,
};
use super::tag::{NotFirst, RelevanceTags, RelevantTag};
use crate::collation::{Collator, collators_match};
use crate::index::{Flat2dParams, IndexEntry, IndexKind, KeyField, KeyType};

/// The innermost `$elemMatch` object enclosing a predicate.
#[derive(Debug, Clone, Copy)]
pub struct ElemMatchContext<'a> {
    pub innermost: NodeId,
    /// Full path of the array the `$elemMatch` applies to.
    pub full_path: &'a str,
}

/// Tag every bounds-generating node of `tree` with the indexes that can
/// answer it. `prefix` is prepended to every node path.
pub fn rate_indices(
    tree: &MatchTree,
    prefix: &str,
    indexes: &[IndexEntry],
    collator: Option<&dyn Collator>,
) -> RelevanceTags {
    let mut tags = RelevanceTags::default();
    let rater = Rater {
        tree,
        indexes,
        collator,
    };
    rater.rate(tree.root(), prefix, None, &mut tags);
    tags
}

struct Rater<'a> {
    tree: &'a MatchTree,
    indexes: &'a [IndexEntry],
    collator: Option<&'a dyn Collator>,
}

impl Rater<'_> {
    fn rate(
        &self,
        id: NodeId,
        prefix: &str,
        ctx: Option<ElemMatchContext<'_>>,
        tags: &mut RelevanceTags,
    ) {
        let tree = self.tree;

        if is_bounds_generating(tree, id) {
            let full_path = format!("{prefix}{}", bounds_path(tree, id).unwrap_or_default());
            let mut tag = RelevantTag::new(full_path.as_str());
            for (i, index) in self.indexes.iter().enumerate() {
                for (position, key_field) in index.key_pattern.fields.iter().enumerate() {
                    if key_field.path != full_path {
                        continue;
                    }
                    if !compatible(key_field, index, tree, id, &full_path, self.collator, ctx) {
                        continue;
                    }
                    if position == 0 {
                        tag.first.push(i);
                    } else {
                        tag.not_first.push(NotFirst { index: i, position });
                    }
                }
            }
            trace!(node = %id, %tag, "rated predicate");
            tags.insert(id, tag);
            return;
        }

        match tree.node(id) {
            Node::ElemMatchObject { path, child } if array_uses_index_on_children(tree, id) => {
                let full_path = format!("{prefix}{path}");
                let child_prefix = format!("{full_path}.");
                let ctx = ElemMatchContext {
                    innermost: id,
                    full_path: &full_path,
                };
                self.rate(*child, &child_prefix, Some(ctx), tags);
            }
            Node::And(children) | Node::Or(children)
                if logical_node_may_be_supported_by_an_index(tree, id) =>
            {
                for child in children {
                    self.rate(*child, prefix, ctx, tags);
                }
            }
            _ => {}
        }
    }
}

// ── Compatibility ───────────────────────────────────────────────

/// Whether `key_field` of `index` can answer the node `id`, whose full path
/// equals the key field's path.
pub fn compatible(
    key_field: &KeyField,
    index: &IndexEntry,
    tree: &MatchTree,
    id: NodeId,
    full_path: &str,
    collator: Option<&dyn Collator>,
    ctx: Option<ElemMatchContext<'_>>,
) -> bool {
    if compares_collatable_values(tree, id)
        && !collators_match(collator, index.collator.as_deref())
    {
        return false;
    }

    if index.kind == IndexKind::Wildcard && !node_is_supported_by_wildcard_index(tree, id) {
        return false;
    }

    // Sparse indexes of every kind lack keys for missing fields.
    if index.sparse && !node_is_supported_by_sparse_index(tree, id, ctx.is_some()) {
        return false;
    }

    let node = tree.node(id);
    match key_field.key_type {
        KeyType::Ascending | KeyType::Descending => {
            compatible_with_ordinary_field(key_field, index, tree, id, full_path, ctx)
        }
        KeyType::Hashed => match node.condition() {
            Some(Condition::Eq(_)) => true,
            Some(Condition::In(list)) => list.regexes.is_empty(),
            _ => false,
        },
        KeyType::Flat2d => match node.condition() {
            Some(Condition::GeoNear(near)) => near.crs == Crs::Flat,
            Some(Condition::Geo(geo)) if geo.predicate == GeoPredicate::Within => {
                match &geo.shape {
                    Shape::CenterSphere { center, radius } => {
                        two_d_wont_wrap(*center, *radius, &index.flat_2d)
                    }
                    shape => shape.has_flat_region(),
                }
            }
            _ => false,
        },
        KeyType::Sphere2d(_) => match node.condition() {
            Some(Condition::Geo(geo)) => geo.shape.has_spherical_region(),
            Some(Condition::GeoNear(near)) => near.crs == Crs::Sphere,
            _ => false,
        },
        KeyType::Text => node.is_text(),
        // Wildcard key fields are expanded away before rating.
        KeyType::Wildcard => false,
    }
}

fn compatible_with_ordinary_field(
    key_field: &KeyField,
    index: &IndexEntry,
    tree: &MatchTree,
    id: NodeId,
    full_path: &str,
    ctx: Option<ElemMatchContext<'_>>,
) -> bool {
    let node = tree.node(id);
    if node.is_geo() {
        return false;
    }

    match node {
        Node::Not(child) => {
            if index.kind != IndexKind::Btree {
                return false;
            }
            let child = *child;
            match tree.node(child) {
                Node::ElemMatchValue { .. } => return false,
                Node::Leaf { condition, .. } => match condition {
                    Condition::Regex(_)
                    | Condition::Mod { .. }
                    | Condition::Type(_)
                    | Condition::Geo(_)
                    | Condition::GeoNear(_) => return false,
                    Condition::In(list) if !list.regexes.is_empty() || list.has_array() => {
                        return false;
                    }
                    Condition::Eq(Bson::Array(_)) => return false,
                    _ => {}
                },
                _ => {}
            }
            if is_ne_null(tree, id) {
                return not_equals_null_can_use_index(index, key_field, ctx);
            }
            !index.path_has_multikey_component(&key_field.path)
        }
        Node::ElemMatchValue { children, .. } => {
            // The conditions apply to the array's elements.
            let ctx = Some(ElemMatchContext {
                innermost: id,
                full_path,
            });
            children.iter().all(|child| {
                compatible_with_ordinary_field(key_field, index, tree, *child, full_path, ctx)
            })
        }
        // Text indexes only take equalities on their ordinary fields.
        _ if index.kind == IndexKind::Text => matches!(node.condition(), Some(Condition::Eq(_))),
        _ => true,
    }
}

// ── Node classification ─────────────────────────────────────────

/// Whether the node compares against a string, document or array, looking
/// through negations and `$elemMatch` value conditions.
pub fn compares_collatable_values(tree: &MatchTree, id: NodeId) -> bool {
    match tree.node(id) {
        Node::Leaf { condition, .. } => match condition {
            Condition::Eq(v)
            | Condition::Lt(v)
            | Condition::Lte(v)
            | Condition::Gt(v)
            | Condition::Gte(v) => is_collatable(v),
            Condition::In(list) => list.equalities.iter().any(is_collatable),
            _ => false,
        },
        Node::Not(child) => compares_collatable_values(tree, *child),
        Node::ElemMatchValue { children, .. } => children
            .iter()
            .any(|c| compares_collatable_values(tree, *c)),
        _ => false,
    }
}

fn is_null_document_or_array(value: &Bson) -> bool {
    matches!(value, Bson::Null | Bson::Document(_) | Bson::Array(_))
}

/// Wildcard indexes hold no keys for missing fields, and do not index whole
/// objects or arrays, so they cannot answer comparisons against them.
pub fn node_is_supported_by_wildcard_index(tree: &MatchTree, id: NodeId) -> bool {
    match tree.node(id) {
        Node::Not(_) => false,
        Node::ElemMatchValue { children, .. } => children
            .iter()
            .all(|c| node_is_supported_by_wildcard_index(tree, *c)),
        Node::Leaf { condition, .. } => match condition {
            Condition::Eq(v)
            | Condition::Lt(v)
            | Condition::Lte(v)
            | Condition::Gt(v)
            | Condition::Gte(v) => !is_null_document_or_array(v),
            Condition::In(list) => !list.equalities.iter().any(is_null_document_or_array),
            _ => true,
        },
        _ => true,
    }
}

fn is_null_equality(condition: &Condition) -> bool {
    match condition {
        Condition::Eq(Bson::Null) => true,
        Condition::In(list) => list.has_null(),
        _ => false,
    }
}

/// `{$ne: null}` or `{$nin: [null]}`.
pub fn is_ne_null(tree: &MatchTree, id: NodeId) -> bool {
    let Node::Not(child) = tree.node(id) else {
        return false;
    };
    match tree.node(*child).condition() {
        Some(Condition::Eq(Bson::Null)) => true,
        Some(Condition::In(list)) => list.is_only_null(),
        _ => false,
    }
}

/// Sparse indexes hold no keys for documents missing the field, so they
/// cannot answer predicates that match missing fields.
pub fn node_is_supported_by_sparse_index(tree: &MatchTree, id: NodeId, in_elem_match: bool) -> bool {
    match tree.node(id) {
        Node::Not(_) => is_ne_null(tree, id),
        Node::Leaf { condition, .. } if is_null_equality(condition) => in_elem_match,
        _ => true,
    }
}

/// Whether a `{$ne: null}` on `key_field` can be answered by `index`.
///
/// On a multikey path, `{a: {$ne: null}}` also matches documents whose array
/// holds a null, which the index cannot tell apart. Inside an `$elemMatch`
/// only the paths below the array matter.
pub fn not_equals_null_can_use_index(
    index: &IndexEntry,
    key_field: &KeyField,
    ctx: Option<ElemMatchContext<'_>>,
) -> bool {
    if !index.multikey {
        return true;
    }
    let Some(multikey_paths) = &index.multikey_paths else {
        return false;
    };
    let components: Vec<&str> = key_field.path.split('.').collect();
    let skip = match ctx {
        None => 0,
        Some(ctx) => ctx.full_path.split('.').count(),
    };
    (skip..components.len()).all(|last| !multikey_paths.contains(&components[..=last].join(".")))
}

/// Whether a `$centerSphere` query stays within a 2d index's bounds once
/// the index's cell error is added.
fn two_d_wont_wrap(center: Point, radius: f64, params: &Flat2dParams) -> bool {
    let cell = (params.max - params.min) / f64::from(1_u32 << params.bits.min(31));
    let error = cell * std::f64::consts::SQRT_2;
    let y_scan = radius.to_degrees() + error;
    let x_scan = compute_x_scan_distance(center.y, y_scan);
    center.x + x_scan < 180.0
        && center.x - x_scan > -180.0
        && center.y + y_scan < 90.0
        && center.y - y_scan > -90.0
}

fn compute_x_scan_distance(y: f64, max_dist_degrees: f64) -> f64 {
    let north = (y + max_dist_degrees).min(89.0).to_radians().cos();
    let south = (y - max_dist_degrees).max(-89.0).to_radians().cos();
    max_dist_degrees / north.min(south)
}
