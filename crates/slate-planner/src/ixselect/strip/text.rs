use std::collections::BTreeSet;

use slate_query::{Condition, Node, NodeId};

use super::Strip;

impl Strip<'_> {
    /// A text index with prefix fields can only be used when an AND pins
    /// every prefix field with an equality next to the `$text` predicate.
    pub(super) fn text_prefixes(&mut self) {
        let indexes = self.indexes;
        for (index, entry) in indexes.iter().enumerate() {
            let Some(text) = &entry.text else {
                continue;
            };
            if text.prefix_paths.is_empty() {
                continue;
            }
            let prefixes: BTreeSet<String> = text.prefix_paths.iter().cloned().collect();
            let root = self.tree.root();
            self.strip_text(root, index, &prefixes);
        }
    }

    fn strip_text(&mut self, id: NodeId, index: usize, prefixes: &BTreeSet<String>) {
        let tree = self.tree;
        let node = tree.node(id);

        // The `$text` predicate itself always keeps its text index.
        if node.is_text() {
            return;
        }
        if self.tags.contains(id) {
            self.remove(id, index, "text index prefix not pinned by sibling equalities");
            return;
        }

        let children = match node {
            Node::Not(_) | Node::Nor(_) => return,
            Node::And(children) => children,
            _ => {
                for child in node.children() {
                    self.strip_text(*child, index, prefixes);
                }
                return;
            }
        };

        let mut has_text = false;
        let mut unpinned = prefixes.clone();
        for child in children {
            let child_node = tree.node(*child);
            if child_node.is_text() {
                has_text |= self.tags.references(*child, index);
                continue;
            }
            if let Node::Leaf {
                condition: Condition::Eq(_),
                ..
            } = child_node
                && let Some(tag) = self.tags.get(*child)
                && tag.references(index)
            {
                unpinned.remove(&tag.path);
                continue;
            }
            self.strip_text(*child, index, prefixes);
        }

        if !has_text || !unpinned.is_empty() {
            for child in children {
                if !tree.node(*child).is_text() {
                    self.remove(*child, index, "text index prefix not pinned by sibling equalities");
                }
            }
        }
    }
}
