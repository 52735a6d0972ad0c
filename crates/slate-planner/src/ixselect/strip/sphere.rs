use std::collections::BTreeSet;

use slate_query::{Node, NodeId};

use super::Strip;
use crate::index::SphereVersion;

const REASON: &str = "2dsphere index needs a geo predicate on every geo field";

impl Strip<'_> {
    /// Version 2 2dsphere indexes hold no keys for documents without geo
    /// data, so non-geo predicates may only use them alongside geo
    /// predicates covering every geo field of the index.
    pub(super) fn sphere_v2(&mut self) {
        let tree = self.tree;
        if tree.node(tree.root()).is_geo() {
            return;
        }
        let indexes = self.indexes;
        for (index, entry) in indexes.iter().enumerate() {
            if entry.sphere_version() != Some(SphereVersion::V2) {
                continue;
            }
            let geo_paths: BTreeSet<&str> = entry.geo_paths().collect();
            self.strip_sphere(tree.root(), index, &geo_paths);
        }
    }

    fn strip_sphere(&mut self, id: NodeId, index: usize, geo_paths: &BTreeSet<&str>) {
        let tree = self.tree;
        let node = tree.node(id);

        if node.is_geo() {
            return;
        }
        if self.tags.contains(id) {
            self.remove(id, index, REASON);
            return;
        }

        let children = match node {
            Node::Not(_) | Node::Nor(_) => return,
            Node::And(children) => children,
            _ => {
                for child in node.children() {
                    self.strip_sphere(*child, index, geo_paths);
                }
                return;
            }
        };

        let mut covered: BTreeSet<&str> = BTreeSet::new();
        for child in children {
            if !self.tags.contains(*child) {
                self.strip_sphere(*child, index, geo_paths);
                continue;
            }
            if tree.node(*child).is_geo()
                && let Some(tag) = self.tags.get(*child)
                && tag.references(index)
                && let Some(path) = geo_paths.get(tag.path.as_str())
            {
                covered.insert(*path);
            }
        }

        if covered.len() != geo_paths.len() {
            for child in children {
                if !tree.node(*child).is_geo() {
                    self.remove(*child, index, REASON);
                }
            }
        }
    }
}
