#![allow(dead_code)]

use bson::{Document, doc};
use slate_planner::{IndexEntry, IndexSelector, MatchTree, Selection, parse_filter};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn tree(filter: Document) -> MatchTree {
    MatchTree::new(parse_filter(&filter).unwrap())
}

pub fn index(name: &str, key: Document) -> IndexEntry {
    IndexEntry::new(name, &key).unwrap()
}

pub fn asc(path: &str) -> IndexEntry {
    let mut key = Document::new();
    key.insert(path, 1);
    index(&format!("{path}_1"), key)
}

pub fn select(filter: Document, indexes: &[IndexEntry]) -> Selection {
    select_with(IndexSelector::default(), filter, indexes)
}

pub fn select_with(selector: IndexSelector, filter: Document, indexes: &[IndexEntry]) -> Selection {
    init_tracing();
    selector.select(&tree(filter), indexes).unwrap()
}

/// Assigned index identifiers of every tagged node on `path`, in node order.
pub fn assigned_on(selection: &Selection, path: &str) -> Vec<Vec<String>> {
    selection
        .tags
        .iter()
        .filter(|(_, tag)| tag.path == path)
        .map(|(id, _)| selection.assigned(id))
        .collect()
}

/// Assignments of the single tagged node on `path`.
pub fn assigned(selection: &Selection, path: &str) -> Vec<String> {
    let mut all = assigned_on(selection, path);
    assert_eq!(all.len(), 1, "expected one tagged node on {path}, got {all:?}");
    all.remove(0)
}

pub fn relevant_names(selection: &Selection) -> Vec<String> {
    selection
        .indexes
        .iter()
        .map(|i| i.identifier.to_string())
        .collect()
}

pub fn geo_point() -> Document {
    doc! { "$geoIntersects": { "$geometry": { "type": "Point", "coordinates": [1.0, 2.0] } } }
}
