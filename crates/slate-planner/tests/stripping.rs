mod common;
use common::*;

use bson::doc;
use slate_planner::SphereVersion;

// ── Text prefixes ───────────────────────────────────────────────

fn text_index() -> slate_planner::IndexEntry {
    index("abc_text", doc! { "a": 1, "b": 1, "c": "text" })
}

#[test]
fn text_prefix_missing_a_field_strips_the_prefix_equality() {
    let selection = select(
        doc! { "a": 1, "$text": { "$search": "x" } },
        &[text_index()],
    );
    assert!(assigned(&selection, "a").is_empty());
    assert_eq!(assigned(&selection, "_fts"), vec!["abc_text"]);
}

#[test]
fn text_prefix_pinned_by_equalities_is_kept() {
    let selection = select(
        doc! { "a": 1, "b": "y", "$text": { "$search": "x" } },
        &[text_index()],
    );
    assert_eq!(assigned(&selection, "a"), vec!["abc_text"]);
    assert_eq!(assigned(&selection, "b"), vec!["abc_text"]);
    assert_eq!(assigned(&selection, "_fts"), vec!["abc_text"]);
}

#[test]
fn text_prefix_needs_equality_not_range() {
    let selection = select(
        doc! { "a": 1, "b": { "$gt": 1 }, "$text": { "$search": "x" } },
        &[text_index()],
    );
    assert!(assigned(&selection, "a").is_empty());
    assert!(assigned(&selection, "b").is_empty());
}

#[test]
fn text_prefix_outside_the_text_and_is_stripped() {
    let selection = select(
        doc! { "$or": [{ "a": 1 }, { "a": 2, "b": 3, "$text": { "$search": "x" } }] },
        &[text_index()],
    );
    let a = assigned_on(&selection, "a");
    assert_eq!(a.len(), 2);
    assert!(a[0].is_empty());
    assert_eq!(a[1], vec!["abc_text"]);
}

// ── 2dsphere ────────────────────────────────────────────────────

fn sphere_index(version: SphereVersion) -> slate_planner::IndexEntry {
    index("a_1_geo_2dsphere", doc! { "a": 1, "geo": "2dsphere" }).with_sphere_version(version)
}

#[test]
fn sphere_v2_without_geo_predicate_is_stripped() {
    let selection = select(doc! { "a": 1 }, &[sphere_index(SphereVersion::V2)]);
    assert!(assigned(&selection, "a").is_empty());
}

#[test]
fn sphere_v1_keeps_non_geo_assignments() {
    let selection = select(doc! { "a": 1 }, &[sphere_index(SphereVersion::V1)]);
    assert_eq!(assigned(&selection, "a"), vec!["a_1_geo_2dsphere"]);
}

#[test]
fn sphere_v2_with_geo_sibling_is_kept() {
    let selection = select(
        doc! { "a": 1, "geo": geo_point() },
        &[sphere_index(SphereVersion::V2)],
    );
    assert_eq!(assigned(&selection, "a"), vec!["a_1_geo_2dsphere"]);
    assert_eq!(assigned(&selection, "geo"), vec!["a_1_geo_2dsphere"]);
}

#[test]
fn sphere_v2_needs_every_geo_field() {
    let indexes = vec![index(
        "two_geo",
        doc! { "a": 1, "g1": "2dsphere", "g2": "2dsphere" },
    )];
    let selection = select(doc! { "a": 1, "g1": geo_point() }, &indexes);
    assert!(assigned(&selection, "a").is_empty());
    assert_eq!(assigned(&selection, "g1"), vec!["two_geo"]);

    let selection = select(
        doc! { "a": 1, "g1": geo_point(), "g2": geo_point() },
        &indexes,
    );
    assert_eq!(assigned(&selection, "a"), vec!["two_geo"]);
}

#[test]
fn legacy_near_does_not_use_2dsphere() {
    let indexes = vec![index("geo_2dsphere", doc! { "geo": "2dsphere" })];
    let selection = select(doc! { "geo": { "$near": [1.0, 2.0] } }, &indexes);
    assert!(assigned(&selection, "geo").is_empty());

    let selection = select(doc! { "geo": { "$nearSphere": [1.0, 2.0] } }, &indexes);
    assert_eq!(assigned(&selection, "geo"), vec!["geo_2dsphere"]);
}

#[test]
fn flat_2d_answers_legacy_shapes() {
    let indexes = vec![index("geo_2d", doc! { "geo": "2d" })];
    let selection = select(
        doc! { "geo": { "$geoWithin": { "$box": [[0.0, 0.0], [1.0, 1.0]] } } },
        &indexes,
    );
    assert_eq!(assigned(&selection, "geo"), vec!["geo_2d"]);

    let selection = select(doc! { "geo": geo_point() }, &indexes);
    assert!(assigned(&selection, "geo").is_empty());
}

// ── Wildcard ────────────────────────────────────────────────────

fn wildcard() -> slate_planner::IndexEntry {
    index("$**_1", doc! { "$**": 1 })
}

#[test]
fn wildcard_expands_per_query_field() {
    let selection = select(doc! { "a": 1, "b.c": { "$gt": 1 }, "_id": 4 }, &[wildcard()]);
    assert_eq!(relevant_names(&selection), vec!["$**_1[a]", "$**_1[b.c]"]);
    assert_eq!(assigned(&selection, "b.c"), vec!["$**_1[b.c]"]);
}

#[test]
fn wildcard_does_not_answer_null_or_objects() {
    let selection = select(
        doc! { "a": null, "b": { "x": 1 }, "c": { "$in": [1, 2] } },
        &[wildcard()],
    );
    assert!(assigned(&selection, "a").is_empty());
    assert!(assigned(&selection, "b").is_empty());
    assert_eq!(assigned(&selection, "c"), vec!["$**_1[c]"]);
}

#[test]
fn wildcard_assignment_on_text_path_is_stripped() {
    let selection = select(
        doc! { "a": 1, "$text": { "$search": "x" } },
        &[wildcard()],
    );
    assert!(assigned(&selection, "_fts").is_empty());
    assert_eq!(assigned(&selection, "a"), vec!["$**_1[a]"]);
}

// ── Partial indexes ─────────────────────────────────────────────

fn partial() -> slate_planner::IndexEntry {
    asc("a")
        .with_partial_filter(&doc! { "b": { "$gt": 5 } })
        .unwrap()
}

#[test]
fn partial_index_needs_implied_filter() {
    let selection = select(doc! { "a": 1, "b": { "$gt": 10 } }, &[partial()]);
    assert_eq!(assigned(&selection, "a"), vec!["a_1"]);

    let selection = select(doc! { "a": 1, "b": { "$gt": 1 } }, &[partial()]);
    assert!(assigned(&selection, "a").is_empty());

    let selection = select(doc! { "a": 1 }, &[partial()]);
    assert!(assigned(&selection, "a").is_empty());
}

#[test]
fn partial_filter_bound_past_double_precision() {
    let index = asc("a")
        .with_partial_filter(&doc! { "b": { "$lte": 9_007_199_254_740_992.0 } })
        .unwrap();

    let selection = select(doc! { "a": 1, "b": 9_007_199_254_740_993_i64 }, &[index.clone()]);
    assert!(assigned(&selection, "a").is_empty());

    let selection = select(doc! { "a": 1, "b": 9_007_199_254_740_992_i64 }, &[index]);
    assert_eq!(assigned(&selection, "a"), vec!["a_1"]);
}

#[test]
fn partial_index_per_or_branch() {
    let selection = select(
        doc! { "$or": [{ "a": 1, "b": { "$gt": 10 } }, { "a": 2 }] },
        &[partial()],
    );
    let a = assigned_on(&selection, "a");
    assert_eq!(a, vec![vec!["a_1".to_string()], vec![]]);
}

#[test]
fn partial_index_or_under_and_sees_outer_conjunct_only_if_implied() {
    let selection = select(
        doc! { "b": { "$gt": 7 }, "$or": [{ "a": 1 }, { "a": 2 }] },
        &[partial()],
    );
    assert_eq!(assigned_on(&selection, "a"), vec![vec!["a_1".to_string()]; 2]);

    let selection = select(
        doc! { "c": 1, "$or": [{ "a": 1, "b": 9 }, { "a": 2 }] },
        &[partial()],
    );
    let a = assigned_on(&selection, "a");
    assert_eq!(a, vec![vec!["a_1".to_string()], vec![]]);
}
