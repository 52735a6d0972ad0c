use slate_query::{MatchTree, Node, NodeId};

use super::Strip;
use crate::collation::{Collator, collators_match};
use crate::ixselect::implies::is_subset_of;

const REASON: &str = "query does not imply the partial filter";

impl Strip<'_> {
    /// A partial index only holds documents matching its filter. A predicate
    /// may use it only where the query around it implies that filter.
    pub(super) fn partial_filters(&mut self, collator: Option<&dyn Collator>) {
        let indexes = self.indexes;
        for (index, entry) in indexes.iter().enumerate() {
            let Some(filter) = &entry.partial_filter else {
                continue;
            };
            let check = PartialCheck {
                filter,
                collations_match: collators_match(collator, entry.collator.as_deref()),
            };
            let root = self.tree.root();
            self.strip_partial(root, index, &check);
        }
    }

    fn strip_partial(&mut self, id: NodeId, index: usize, check: &PartialCheck<'_>) {
        let tree = self.tree;
        if check.implied_by(tree, id) {
            return;
        }
        match tree.node(id) {
            // Each branch of an OR under the AND may imply the filter on its
            // own; the other conjuncts do not.
            Node::And(children) => {
                for child in children {
                    if matches!(tree.node(*child), Node::Or(_)) {
                        self.strip_partial(*child, index, check);
                    } else {
                        self.remove_in_subtree(*child, index, REASON);
                    }
                }
            }
            Node::Or(children) => {
                for child in children {
                    self.strip_partial(*child, index, check);
                }
            }
            _ => self.remove_in_subtree(id, index, REASON),
        }
    }
}

struct PartialCheck<'a> {
    filter: &'a MatchTree,
    collations_match: bool,
}

impl PartialCheck<'_> {
    fn implied_by(&self, tree: &MatchTree, id: NodeId) -> bool {
        is_subset_of(
            tree,
            id,
            self.filter,
            self.filter.root(),
            self.collations_match,
        )
    }
}
