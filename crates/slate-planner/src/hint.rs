use std::cmp::Ordering;

use bson::{Bson, Document};
use slate_query::value::compare_values;

use crate::error::PlannerError;
use crate::index::IndexEntry;

/// Restrict `all` to the indexes a user hint names.
///
/// - `{ $hint: "<name>" }` selects by catalog name.
/// - `{ $natural: 1 }` / `{ $natural: -1 }` asks for a collection scan and
///   selects nothing.
/// - Any other document is a key pattern, matched field by field against
///   each index's key pattern as written.
pub fn find_indexes_by_hint(
    hint: &Document,
    all: &[IndexEntry],
) -> Result<Vec<IndexEntry>, PlannerError> {
    let Some((first_key, first_value)) = hint.iter().next() else {
        return Err(PlannerError::invalid("hint must not be empty"));
    };

    let matched: Vec<IndexEntry> = match first_key.as_str() {
        "$hint" => {
            let Bson::String(name) = first_value else {
                return Err(PlannerError::invalid("$hint must name an index"));
            };
            if hint.len() != 1 {
                return Err(PlannerError::invalid("$hint must be the only field of a hint"));
            }
            all.iter().filter(|idx| idx.name() == name.as_str()).cloned().collect()
        }
        "$natural" => {
            let direction = match first_value {
                Bson::Int32(i) => i64::from(*i),
                Bson::Int64(i) => *i,
                Bson::Double(d) if d.fract() == 0.0 => *d as i64,
                _ => 0,
            };
            if hint.len() != 1 || direction.abs() != 1 {
                return Err(PlannerError::invalid("$natural hint must be 1 or -1"));
            }
            return Ok(Vec::new());
        }
        _ => all
            .iter()
            .filter(|idx| key_patterns_match(&idx.key_pattern.raw, hint))
            .cloned()
            .collect(),
    };

    if matched.is_empty() {
        return Err(PlannerError::invalid(format!(
            "hint provided does not correspond to an existing index: {hint}"
        )));
    }
    Ok(matched)
}

/// Same fields in the same order with equal values. Numbers compare by
/// value, so `{a: 1}` matches `{a: 1.0}`.
fn key_patterns_match(pattern: &Document, hint: &Document) -> bool {
    pattern.len() == hint.len()
        && pattern.iter().zip(hint.iter()).all(|((pk, pv), (hk, hv))| {
            pk == hk && (pv == hv || compare_values(pv, hv) == Some(Ordering::Equal))
        })
}
