//! Predicate implication, used to decide whether a query can only match
//! documents a partial index contains.

use std::cmp::Ordering;

use bson::Bson;
use slate_query::value::{canonical_type, compare_values, is_collatable, is_nan};
use slate_query::{CompareOp, Condition, InList, MatchTree, Node, NodeId};

/// A node of one of the two trees being compared.
#[derive(Clone, Copy)]
struct At<'a> {
    tree: &'a MatchTree,
    id: NodeId,
}

impl<'a> At<'a> {
    fn node(&self) -> &'a Node {
        self.tree.node(self.id)
    }

    fn child(&self, id: NodeId) -> At<'a> {
        At {
            tree: self.tree,
            id,
        }
    }

    fn children(&self) -> impl Iterator<Item = At<'a>> + '_ {
        self.tree.children(self.id).iter().map(move |c| self.child(*c))
    }
}

/// Whether every document matching `lhs` also matches `rhs`.
///
/// `collations_match` says whether `lhs` and `rhs` run under the same
/// collation; when they do not, string comparisons are never trusted.
/// A `false` answer means "not provable", not "disjoint".
pub fn is_subset_of(
    lhs: &MatchTree,
    lhs_id: NodeId,
    rhs: &MatchTree,
    rhs_id: NodeId,
    collations_match: bool,
) -> bool {
    let check = Implication { collations_match };
    check.subset(
        At {
            tree: lhs,
            id: lhs_id,
        },
        At {
            tree: rhs,
            id: rhs_id,
        },
    )
}

struct Implication {
    collations_match: bool,
}

impl Implication {
    fn subset(&self, lhs: At<'_>, rhs: At<'_>) -> bool {
        if self.equivalent(lhs, rhs) {
            return true;
        }

        if matches!(rhs.node(), Node::And(_)) {
            return rhs.children().all(|r| self.subset(lhs, r));
        }
        if matches!(lhs.node(), Node::And(_)) {
            return lhs.children().any(|l| self.subset(l, rhs));
        }
        if matches!(lhs.node(), Node::Or(_)) {
            return lhs.children().all(|l| self.subset(l, rhs));
        }
        if matches!(rhs.node(), Node::Or(_)) {
            return rhs.children().any(|r| self.subset(lhs, r));
        }

        let Node::Leaf {
            path: rhs_path,
            condition: rhs_cond,
        } = rhs.node()
        else {
            return false;
        };

        if let Some((rhs_op, rhs_value)) = rhs_cond.comparison() {
            return match lhs.node() {
                Node::Leaf { path, condition } if path == rhs_path => {
                    match condition {
                        Condition::In(list) => {
                            list.regexes.is_empty()
                                && list.equalities.iter().all(|v| {
                                    self.comparison_implies(CompareOp::Eq, v, rhs_op, rhs_value)
                                })
                        }
                        other => other.comparison().is_some_and(|(lhs_op, lhs_value)| {
                            self.comparison_implies(lhs_op, lhs_value, rhs_op, rhs_value)
                        }),
                    }
                }
                _ => false,
            };
        }

        match rhs_cond {
            Condition::Exists => self.implies_exists(lhs, rhs_path),
            Condition::In(rhs_list) if rhs_list.regexes.is_empty() => match lhs.node() {
                Node::Leaf { path, condition } if path == rhs_path => match condition {
                    Condition::Eq(v) => self.in_list_contains(rhs_list, v),
                    Condition::In(lhs_list) => {
                        lhs_list.regexes.is_empty()
                            && lhs_list
                                .equalities
                                .iter()
                                .all(|v| self.in_list_contains(rhs_list, v))
                    }
                    _ => false,
                },
                _ => false,
            },
            _ => false,
        }
    }

    /// `lhs_op lhs_value` ⊆ `rhs_op rhs_value` on the same path.
    fn comparison_implies(
        &self,
        lhs_op: CompareOp,
        lhs_value: &Bson,
        rhs_op: CompareOp,
        rhs_value: &Bson,
    ) -> bool {
        if canonical_type(lhs_value) != canonical_type(rhs_value) {
            return false;
        }

        // NaN only equals NaN.
        if is_nan(lhs_value) || is_nan(rhs_value) {
            let supports_equality =
                |op: CompareOp| matches!(op, CompareOp::Eq | CompareOp::Lte | CompareOp::Gte);
            return supports_equality(lhs_op)
                && supports_equality(rhs_op)
                && is_nan(lhs_value)
                && is_nan(rhs_value);
        }

        if is_collatable(lhs_value) && !self.collations_match {
            return false;
        }

        let Some(cmp) = compare_values(lhs_value, rhs_value) else {
            return false;
        };

        if lhs_op == rhs_op && cmp == Ordering::Equal {
            return true;
        }

        match (rhs_op, lhs_op) {
            (CompareOp::Lte, CompareOp::Lt | CompareOp::Lte | CompareOp::Eq) => {
                cmp != Ordering::Greater
            }
            (CompareOp::Lt, CompareOp::Lt | CompareOp::Lte | CompareOp::Eq) => {
                cmp == Ordering::Less || (cmp == Ordering::Equal && lhs_op == CompareOp::Lt)
            }
            (CompareOp::Gte, CompareOp::Gt | CompareOp::Gte | CompareOp::Eq) => {
                cmp != Ordering::Less
            }
            (CompareOp::Gt, CompareOp::Gt | CompareOp::Gte | CompareOp::Eq) => {
                cmp == Ordering::Greater || (cmp == Ordering::Equal && lhs_op == CompareOp::Gt)
            }
            _ => false,
        }
    }

    fn in_list_contains(&self, list: &InList, value: &Bson) -> bool {
        if is_collatable(value) && !self.collations_match {
            return false;
        }
        list.equalities.iter().any(|candidate| {
            canonical_type(candidate) == canonical_type(value)
                && compare_values(candidate, value) == Some(Ordering::Equal)
        })
    }

    /// Whether `lhs` only matches documents where `path` exists.
    fn implies_exists(&self, lhs: At<'_>, path: &str) -> bool {
        match lhs.node() {
            Node::Leaf {
                path: lhs_path,
                condition,
            } if lhs_path == path => match condition {
                Condition::Eq(v)
                | Condition::Lt(v)
                | Condition::Lte(v)
                | Condition::Gt(v)
                | Condition::Gte(v) => !matches!(v, Bson::Null),
                Condition::In(list) => !list.has_null(),
                Condition::Exists
                | Condition::Geo(_)
                | Condition::GeoNear(_)
                | Condition::Mod { .. }
                | Condition::Regex(_)
                | Condition::Size(_)
                | Condition::Type(_) => true,
            },
            Node::ElemMatchObject { path: lhs_path, .. }
            | Node::ElemMatchValue { path: lhs_path, .. } => lhs_path == path,
            // `{$ne: null}` and `{$nin: [null, ...]}`
            Node::Not(child) => match lhs.tree.node(*child) {
                Node::Leaf {
                    path: lhs_path,
                    condition,
                } if lhs_path == path => match condition {
                    Condition::Eq(Bson::Null) => true,
                    Condition::In(list) => list.has_null(),
                    _ => false,
                },
                _ => false,
            },
            _ => false,
        }
    }

    // ── Equivalence ─────────────────────────────────────────────

    fn equivalent(&self, lhs: At<'_>, rhs: At<'_>) -> bool {
        let children_equivalent = || {
            let (l, r) = (lhs.tree.children(lhs.id), rhs.tree.children(rhs.id));
            l.len() == r.len()
                && l.iter()
                    .zip(r)
                    .all(|(a, b)| self.equivalent(lhs.child(*a), rhs.child(*b)))
        };

        match (lhs.node(), rhs.node()) {
            (Node::And(_), Node::And(_))
            | (Node::Or(_), Node::Or(_))
            | (Node::Nor(_), Node::Nor(_))
            | (Node::Not(_), Node::Not(_)) => children_equivalent(),
            (
                Node::ElemMatchObject { path: lp, .. },
                Node::ElemMatchObject { path: rp, .. },
            )
            | (
                Node::ElemMatchValue { path: lp, .. },
                Node::ElemMatchValue { path: rp, .. },
            ) => lp == rp && children_equivalent(),
            (
                Node::Leaf {
                    path: lp,
                    condition: lc,
                },
                Node::Leaf {
                    path: rp,
                    condition: rc,
                },
            ) => lp == rp && self.conditions_equivalent(lc, rc),
            (Node::Text(l), Node::Text(r)) => l == r,
            (Node::Where(l), Node::Where(r)) => l == r,
            (Node::AlwaysTrue, Node::AlwaysTrue) | (Node::AlwaysFalse, Node::AlwaysFalse) => true,
            _ => false,
        }
    }

    fn conditions_equivalent(&self, lhs: &Condition, rhs: &Condition) -> bool {
        let values_equal = |a: &Bson, b: &Bson| {
            a == b && (!is_collatable(a) || self.collations_match)
        };
        match (lhs, rhs) {
            (Condition::Eq(a), Condition::Eq(b))
            | (Condition::Lt(a), Condition::Lt(b))
            | (Condition::Lte(a), Condition::Lte(b))
            | (Condition::Gt(a), Condition::Gt(b))
            | (Condition::Gte(a), Condition::Gte(b)) => values_equal(a, b),
            (Condition::In(a), Condition::In(b)) => {
                a.equalities.len() == b.equalities.len()
                    && a.equalities
                        .iter()
                        .zip(&b.equalities)
                        .all(|(x, y)| values_equal(x, y))
                    && a.regexes.len() == b.regexes.len()
                    && a.regexes
                        .iter()
                        .zip(&b.regexes)
                        .all(|(x, y)| x.as_str() == y.as_str())
            }
            (Condition::Regex(a), Condition::Regex(b)) => a.as_str() == b.as_str(),
            (Condition::Exists, Condition::Exists) => true,
            (
                Condition::Mod {
                    divisor: d1,
                    remainder: r1,
                },
                Condition::Mod {
                    divisor: d2,
                    remainder: r2,
                },
            ) => d1 == d2 && r1 == r2,
            (Condition::Type(a), Condition::Type(b)) => a == b,
            (Condition::Size(a), Condition::Size(b)) => a == b,
            (Condition::Geo(a), Condition::Geo(b)) => a == b,
            (Condition::GeoNear(a), Condition::GeoNear(b)) => a == b,
            _ => false,
        }
    }
}
