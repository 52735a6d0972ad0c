use serde::{Deserialize, Serialize};

/// Tuning knobs for [`crate::IndexSelector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// When an AND pins a unique single-field index with an equality, drop
    /// every other assignment in that AND's subtree.
    pub prefer_unique_lookups: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            prefer_unique_lookups: true,
        }
    }
}
