use slate_query::TEXT_PATH;

use super::Strip;
use crate::index::IndexKind;

impl Strip<'_> {
    /// A `$text` query puts `_fts` into the field set, so a `$**` index gets
    /// expanded for it and the rater pairs the expansion with the `$text`
    /// predicate. Those pairings are meaningless.
    pub(super) fn wildcard_fts(&mut self) {
        if !self.tree.has_text() {
            return;
        }
        let fts_nodes: Vec<_> = self
            .tags
            .iter()
            .filter(|(_, tag)| tag.path == TEXT_PATH)
            .map(|(id, _)| id)
            .collect();
        let indexes = self.indexes;
        for id in fts_nodes {
            for (index, entry) in indexes.iter().enumerate() {
                if entry.kind == IndexKind::Wildcard {
                    self.remove(id, index, "wildcard index cannot answer $text");
                }
            }
        }
    }
}
