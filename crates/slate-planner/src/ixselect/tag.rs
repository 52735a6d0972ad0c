use std::collections::BTreeMap;
use std::fmt;

use slate_query::NodeId;

/// An index whose key pattern holds the tagged path after its first field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotFirst {
    /// Position in the candidate index list.
    pub index: usize,
    /// Offset of the key field within the index's key pattern.
    pub position: usize,
}

/// Which candidate indexes can answer one predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevantTag {
    /// Full path of the predicate, including any `$elemMatch` prefix.
    pub path: String,
    /// Indexes led by `path`.
    pub first: Vec<usize>,
    /// Indexes that hold `path` after their leading field.
    pub not_first: Vec<NotFirst>,
}

impl RelevantTag {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_empty() && self.not_first.is_empty()
    }

    pub fn references(&self, index: usize) -> bool {
        self.first.contains(&index) || self.not_first.iter().any(|nf| nf.index == index)
    }

    /// Every index referenced, first-position entries before the rest.
    pub fn indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.first
            .iter()
            .copied()
            .chain(self.not_first.iter().map(|nf| nf.index))
    }

    /// Drop every entry for `index`. Returns whether anything was removed.
    pub fn remove(&mut self, index: usize) -> bool {
        let before = self.first.len() + self.not_first.len();
        self.first.retain(|&i| i != index);
        self.not_first.retain(|nf| nf.index != index);
        before != self.first.len() + self.not_first.len()
    }
}

impl fmt::Display for RelevantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} first={:?} not_first=[", self.path, self.first)?;
        for (i, nf) in self.not_first.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}@{}", nf.index, nf.position)?;
        }
        write!(f, "]")
    }
}

/// Relevance tags keyed by the node they annotate.
///
/// Only nodes the rater visited carry a tag; a visited node no index can
/// answer carries an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelevanceTags {
    tags: BTreeMap<NodeId, RelevantTag>,
}

impl RelevanceTags {
    pub fn get(&self, id: NodeId) -> Option<&RelevantTag> {
        self.tags.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut RelevantTag> {
        self.tags.get_mut(&id)
    }

    pub(crate) fn insert(&mut self, id: NodeId, tag: RelevantTag) {
        self.tags.insert(id, tag);
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tags.contains_key(&id)
    }

    /// Whether `id` is tagged with `index`.
    pub fn references(&self, id: NodeId, index: usize) -> bool {
        self.get(id).is_some_and(|t| t.references(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &RelevantTag)> {
        self.tags.iter().map(|(id, tag)| (*id, tag))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
