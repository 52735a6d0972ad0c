mod common;
use common::*;

use std::sync::Arc;

use bson::doc;
use slate_planner::{
    CollationSpec, IndexSelector, LocaleCollator, PlannerError, SelectionConfig, parse_filter,
};

// ── Universe reduction ──────────────────────────────────────────

#[test]
fn indexes_not_led_by_a_query_field_are_dropped() {
    let indexes = vec![asc("a"), index("b_1_a_1", doc! { "b": 1, "a": 1 })];
    let selection = select(doc! { "a": 5 }, &indexes);
    assert_eq!(relevant_names(&selection), vec!["a_1"]);
    assert_eq!(assigned(&selection, "a"), vec!["a_1"]);
}

#[test]
fn compound_index_tags_trailing_fields_as_not_first() {
    let indexes = vec![index("a_1_b_1", doc! { "a": 1, "b": 1 })];
    let selection = select(doc! { "a": 1, "b": { "$gt": 2 } }, &indexes);

    let b = selection
        .tags
        .iter()
        .find(|(_, tag)| tag.path == "b")
        .map(|(_, tag)| tag.clone())
        .unwrap();
    assert!(b.first.is_empty());
    assert_eq!(b.not_first.len(), 1);
    assert_eq!(b.not_first[0].position, 1);
}

#[test]
fn query_without_indexable_fields_selects_nothing() {
    let selection = select(doc! { "$where": "this.a > 1" }, &[asc("a")]);
    assert!(selection.fields.is_empty());
    assert!(selection.indexes.is_empty());
    assert!(!selection.has_assignments());
}

#[test]
fn elem_match_fields_are_prefixed() {
    let indexes = vec![asc("a.b"), asc("c.d"), asc("a")];
    let selection = select(
        doc! { "a.b": 1, "c": { "$elemMatch": { "d": { "$lt": 4 } } } },
        &indexes,
    );
    assert_eq!(
        selection.fields.iter().cloned().collect::<Vec<_>>(),
        vec!["a.b", "c.d"]
    );
    assert_eq!(assigned(&selection, "c.d"), vec!["c.d_1"]);
}

// ── Sparse indexes ──────────────────────────────────────────────

#[test]
fn sparse_index_cannot_answer_null_equality() {
    let indexes = vec![asc("a").with_sparse(true)];
    let selection = select(doc! { "a": { "$eq": null } }, &indexes);
    assert!(assigned(&selection, "a").is_empty());
}

#[test]
fn sparse_hashed_index_cannot_answer_null() {
    let indexes = vec![index("a_hashed", doc! { "a": "hashed" }).with_sparse(true)];

    let selection = select(doc! { "a": null }, &indexes);
    assert!(assigned(&selection, "a").is_empty());

    let selection = select(doc! { "a": { "$in": [1, null] } }, &indexes);
    assert!(assigned(&selection, "a").is_empty());

    let selection = select(doc! { "a": 7 }, &indexes);
    assert_eq!(assigned(&selection, "a"), vec!["a_hashed"]);
}

#[test]
fn sparse_index_cannot_answer_exists_false() {
    let indexes = vec![asc("a").with_sparse(true)];
    let selection = select(doc! { "a": { "$exists": false } }, &indexes);
    assert!(assigned(&selection, "a").is_empty());

    let selection = select(doc! { "a": { "$exists": false } }, &[asc("a")]);
    assert_eq!(assigned(&selection, "a"), vec!["a_1"]);
}

#[test]
fn sparse_index_answers_null_inside_elem_match() {
    let indexes = vec![asc("a.b").with_sparse(true)];
    let selection = select(doc! { "a": { "$elemMatch": { "b": null } } }, &indexes);
    assert_eq!(assigned(&selection, "a.b"), vec!["a.b_1"]);
}

#[test]
fn sparse_index_answers_ne_null() {
    let indexes = vec![asc("a").with_sparse(true)];
    let selection = select(doc! { "a": { "$ne": null } }, &indexes);
    assert_eq!(assigned(&selection, "a"), vec!["a_1"]);
}

// ── Negations and multikey ──────────────────────────────────────

#[test]
fn ne_null_on_multikey_path_is_incompatible() {
    let indexes = vec![asc("a.b").with_multikey_paths(["a"])];
    let selection = select(doc! { "a.b": { "$ne": null } }, &indexes);
    assert!(assigned(&selection, "a.b").is_empty());
}

#[test]
fn ne_null_inside_elem_match_ignores_array_prefix() {
    let indexes = vec![asc("a.b").with_multikey_paths(["a"])];
    let selection = select(
        doc! { "a": { "$elemMatch": { "b": { "$ne": null } } } },
        &indexes,
    );
    assert_eq!(assigned(&selection, "a.b"), vec!["a.b_1"]);

    let indexes = vec![asc("a.b").with_multikey_paths(["a", "a.b"])];
    let selection = select(
        doc! { "a": { "$elemMatch": { "b": { "$ne": null } } } },
        &indexes,
    );
    assert!(assigned(&selection, "a.b").is_empty());
}

#[test]
fn ne_null_with_untracked_multikey_is_incompatible() {
    let indexes = vec![asc("a").with_multikey()];
    let selection = select(doc! { "a": { "$ne": null } }, &indexes);
    assert!(assigned(&selection, "a").is_empty());
}

#[test]
fn negation_needs_non_multikey_path() {
    let selection = select(doc! { "a": { "$ne": 5 } }, &[asc("a")]);
    assert_eq!(assigned(&selection, "a"), vec!["a_1"]);

    let selection = select(doc! { "a": { "$nin": [1, 2] } }, &[asc("a").with_multikey()]);
    assert!(assigned(&selection, "a").is_empty());
}

#[test]
fn negated_array_equality_is_incompatible() {
    let selection = select(doc! { "a": { "$ne": [1, 2] } }, &[asc("a")]);
    assert!(assigned(&selection, "a").is_empty());
}

#[test]
fn hashed_index_answers_equality_only() {
    let indexes = vec![index("a_hashed", doc! { "a": "hashed" })];
    let selection = select(doc! { "a": 3 }, &indexes);
    assert_eq!(assigned(&selection, "a"), vec!["a_hashed"]);

    let selection = select(doc! { "a": { "$gt": 3 } }, &indexes);
    assert!(assigned(&selection, "a").is_empty());
}

// ── Collation ───────────────────────────────────────────────────

#[test]
fn string_predicates_need_matching_collation() {
    let french = || Arc::new(LocaleCollator::new(CollationSpec::new("fr")));
    let indexes = vec![asc("a").with_collator(french())];

    let selection = select(doc! { "a": "x" }, &indexes);
    assert!(assigned(&selection, "a").is_empty());

    let selection = select(doc! { "a": 5 }, &indexes);
    assert_eq!(assigned(&selection, "a"), vec!["a_1"]);

    let selector = IndexSelector::default().with_collator(french());
    let selection = select_with(selector, doc! { "a": "x" }, &indexes);
    assert_eq!(assigned(&selection, "a"), vec!["a_1"]);
}

// ── Unique lookups ──────────────────────────────────────────────

fn unique_indexes() -> Vec<slate_planner::IndexEntry> {
    vec![asc("a"), asc("b"), asc("c"), asc("d").with_unique(true)]
}

#[test]
fn unique_equality_drops_other_assignments_in_its_and() {
    let selection = select(
        doc! { "$or": [{ "a": 1, "b": 2 }, { "c": 3, "d": 4 }] },
        &unique_indexes(),
    );
    assert_eq!(assigned(&selection, "a"), vec!["a_1"]);
    assert_eq!(assigned(&selection, "b"), vec!["b_1"]);
    assert!(assigned(&selection, "c").is_empty());
    assert_eq!(assigned(&selection, "d"), vec!["d_1"]);
}

#[test]
fn unique_lookups_can_be_disabled() {
    let selector = IndexSelector::new(SelectionConfig {
        prefer_unique_lookups: false,
    });
    let selection = select_with(
        selector,
        doc! { "$or": [{ "a": 1, "b": 2 }, { "c": 3, "d": 4 }] },
        &unique_indexes(),
    );
    assert_eq!(assigned(&selection, "c"), vec!["c_1"]);
    assert_eq!(assigned(&selection, "d"), vec!["d_1"]);
}

// ── Errors ──────────────────────────────────────────────────────

#[test]
fn parse_errors_convert_to_invalid_query_specification() {
    let err: PlannerError = parse_filter(&doc! { "$bogus": 1 }).unwrap_err().into();
    match err {
        PlannerError::InvalidQuerySpecification(msg) => {
            assert!(msg.contains("$bogus"), "unexpected message: {msg}")
        }
    }
}
