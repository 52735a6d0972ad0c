//! Expansion of wildcard indexes into per-field entries.

use std::collections::BTreeSet;

use crate::index::{
    IndexEntry, IndexIdentifier, IndexKind, KeyPattern, WILDCARD_SUFFIX, WildcardProjection,
    path_prefixes,
};

/// Replace every wildcard index by one single-field entry per query field it
/// covers. Other indexes pass through unchanged and keep their order.
pub fn expand_indexes(fields: &BTreeSet<String>, indexes: &[IndexEntry]) -> Vec<IndexEntry> {
    let mut out = Vec::with_capacity(indexes.len());
    for index in indexes {
        if index.kind == IndexKind::Wildcard {
            expand_wildcard(fields, index, &mut out);
        } else {
            out.push(index.clone());
        }
    }
    out
}

fn expand_wildcard(fields: &BTreeSet<String>, wildcard: &IndexEntry, out: &mut Vec<IndexEntry>) {
    for field in fields {
        if !is_expandable(field) || !covers(wildcard, field) {
            continue;
        }
        let identifier = IndexIdentifier {
            catalog_name: wildcard.identifier.catalog_name.clone(),
            disambiguator: Some(field.clone()),
        };
        let mut entry = IndexEntry::from_pattern(identifier, KeyPattern::single(field.as_str()));
        entry.kind = IndexKind::Wildcard;
        entry.partial_filter = wildcard.partial_filter.clone();
        entry.collator = wildcard.collator.clone();
        if wildcard.multikey {
            entry = match &wildcard.multikey_paths {
                Some(paths) => entry.with_multikey_paths(
                    path_prefixes(field).filter(|p| paths.contains(*p)),
                ),
                None => entry.with_multikey(),
            };
        }
        out.push(entry);
    }
}

/// Meta fields (`$`-prefixed components) and positional paths (`a.0.b`) are
/// never answered by a wildcard index.
fn is_expandable(field: &str) -> bool {
    field.split('.').all(|component| {
        !component.starts_with('$')
            && !(!component.is_empty() && component.bytes().all(|b| b.is_ascii_digit()))
    })
}

fn is_within(field: &str, root: &str) -> bool {
    field == root
        || field
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('.'))
}

fn covers(wildcard: &IndexEntry, field: &str) -> bool {
    let Some(pattern_path) = wildcard.leading_path() else {
        return false;
    };

    // `a.b.$**` covers `a.b` and everything below it.
    if let Some(root) = pattern_path.strip_suffix(".$**") {
        return is_within(field, root);
    }
    debug_assert_eq!(pattern_path, WILDCARD_SUFFIX);

    let is_id = is_within(field, "_id");
    match &wildcard.wildcard_projection {
        None => !is_id,
        Some(WildcardProjection::Include(paths)) => paths.iter().any(|p| is_within(field, p)),
        Some(WildcardProjection::Exclude { paths, include_id }) => {
            if is_id {
                return *include_id && !paths.iter().any(|p| is_within(field, p));
            }
            !paths.iter().any(|p| is_within(field, p))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn field_set(fields: &[&str]) -> BTreeSet<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    fn expanded_paths(entries: &[IndexEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.leading_path().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn root_wildcard_skips_id_meta_and_positional() {
        let wildcard = IndexEntry::new("$**_1", &doc! { "$**": 1 }).unwrap();
        let fields = field_set(&["_id", "a", "a.0.b", "b.c", "$where.x"]);
        let out = expand_indexes(&fields, &[wildcard]);
        assert_eq!(expanded_paths(&out), vec!["a", "b.c"]);
        assert!(out.iter().all(|e| e.kind == IndexKind::Wildcard));
        assert_eq!(out[1].identifier.to_string(), "$**_1[b.c]");
    }

    #[test]
    fn subtree_wildcard_covers_root_and_children() {
        let wildcard = IndexEntry::new("a.$**_1", &doc! { "a.$**": 1 }).unwrap();
        let fields = field_set(&["a", "a.b", "ab", "c"]);
        let out = expand_indexes(&fields, &[wildcard]);
        assert_eq!(expanded_paths(&out), vec!["a", "a.b"]);
    }

    #[test]
    fn projections_limit_coverage() {
        let include = IndexEntry::new("w", &doc! { "$**": 1 })
            .unwrap()
            .with_wildcard_projection(&doc! { "a": 1, "_id": 1 })
            .unwrap();
        let fields = field_set(&["_id", "a.x", "b"]);
        assert_eq!(
            expanded_paths(&expand_indexes(&fields, &[include])),
            vec!["_id", "a.x"]
        );

        let exclude = IndexEntry::new("w", &doc! { "$**": 1 })
            .unwrap()
            .with_wildcard_projection(&doc! { "a": 0 })
            .unwrap();
        assert_eq!(expanded_paths(&expand_indexes(&fields, &[exclude])), vec!["b"]);
    }

    #[test]
    fn id_only_projection_covers_only_id() {
        let wildcard = IndexEntry::new("w", &doc! { "$**": 1 })
            .unwrap()
            .with_wildcard_projection(&doc! { "_id": 1 })
            .unwrap();
        let fields = field_set(&["_id", "a", "b.c"]);
        assert_eq!(expanded_paths(&expand_indexes(&fields, &[wildcard])), vec!["_id"]);
    }

    #[test]
    fn expanded_entries_inherit_filter_and_multikey() {
        let wildcard = IndexEntry::new("w", &doc! { "$**": 1 })
            .unwrap()
            .with_unique(true)
            .with_sparse(true)
            .with_multikey_paths(["a"])
            .with_partial_filter(&doc! { "z": { "$exists": true } })
            .unwrap();
        let out = expand_indexes(&field_set(&["a.b", "c"]), &[wildcard]);
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|e| !e.unique && !e.sparse));
        assert!(out.iter().all(|e| e.partial_filter.is_some()));
        assert!(out[0].multikey);
        assert!(out[0].path_has_multikey_component("a.b"));
        assert!(!out[1].multikey);
    }

    #[test]
    fn uncovered_wildcard_vanishes_and_others_pass_through() {
        let wildcard = IndexEntry::new("w", &doc! { "x.$**": 1 }).unwrap();
        let plain = IndexEntry::new("a_1", &doc! { "a": 1 }).unwrap();
        let out = expand_indexes(&field_set(&["a"]), &[wildcard, plain]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].name(), "a_1");
    }
}
