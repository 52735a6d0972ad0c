use bson::spec::ElementType;
use bson::{Bson, Document};
use regex::Regex;

use crate::expression::{Condition, Expression, InList, TextQuery};
use crate::geo::{Crs, GeoJsonKind, GeoPredicate, GeoQuery, NearQuery, Point, Shape};

/// Parse error for filter documents.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParseError(pub String);

impl std::fmt::Display for FilterParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "filter parse error: {}", self.0)
    }
}

impl std::error::Error for FilterParseError {}

fn err<T>(msg: impl Into<String>) -> Result<T, FilterParseError> {
    Err(FilterParseError(msg.into()))
}

/// Parse a BSON filter document into an Expression tree.
///
/// Follows MongoDB query semantics:
/// - Top-level document is an implicit AND of all entries
/// - `{ "field": value }` is implicit `$eq`
/// - `{ "field": { "$gt": v } }` uses operator sub-documents
/// - `{ "$or": [...] }` / `{ "$and": [...] }` / `{ "$nor": [...] }` for logical ops
/// - `$ne`, `$nin`, `$not` and `$exists: false` become negations
/// - `$elemMatch` is an object match when its sub-document holds field
///   predicates and a value match when it holds operators
pub fn parse_filter(doc: &Document) -> Result<Expression, FilterParseError> {
    let mut children = Vec::new();

    for (key, value) in doc {
        match key.as_str() {
            "$and" => children.push(parse_logical_array(value, Expression::And)?),
            "$or" => children.push(parse_logical_array(value, Expression::Or)?),
            "$nor" => children.push(parse_logical_array(value, Expression::Nor)?),
            "$where" => children.push(parse_where(value)?),
            "$text" => children.push(parse_text(value)?),
            "$alwaysTrue" => children.push(Expression::AlwaysTrue),
            "$alwaysFalse" => children.push(Expression::AlwaysFalse),
            "$comment" => {}
            k if k.starts_with('$') => {
                return err(format!("unknown top-level operator: {k}"));
            }
            _ => children.push(parse_field_condition(key, value)?),
        }
    }

    match children.len() {
        0 => err("empty filter document"),
        1 => Ok(children.remove(0)),
        _ => Ok(Expression::And(children)),
    }
}

/// Parse a `$and`, `$or` or `$nor` array value into a logical expression.
fn parse_logical_array(
    value: &Bson,
    make: fn(Vec<Expression>) -> Expression,
) -> Result<Expression, FilterParseError> {
    let Bson::Array(arr) = value else {
        return err("$and/$or/$nor value must be an array");
    };

    let mut children = Vec::new();
    for elem in arr {
        match elem {
            Bson::Document(sub_doc) => children.push(parse_filter(sub_doc)?),
            _ => return err("$and/$or/$nor array elements must be documents"),
        }
    }

    if children.is_empty() {
        return err("$and/$or/$nor array must not be empty");
    }

    Ok(make(children))
}

fn parse_where(value: &Bson) -> Result<Expression, FilterParseError> {
    match value {
        Bson::String(code) => Ok(Expression::Where(code.clone())),
        Bson::JavaScriptCode(code) => Ok(Expression::Where(code.clone())),
        _ => err("$where value must be a string or code"),
    }
}

fn parse_text(value: &Bson) -> Result<Expression, FilterParseError> {
    let Bson::Document(doc) = value else {
        return err("$text value must be a document");
    };
    let mut query = TextQuery::default();
    let mut has_search = false;
    for (key, v) in doc {
        match (key.as_str(), v) {
            ("$search", Bson::String(s)) => {
                query.search = s.clone();
                has_search = true;
            }
            ("$language", Bson::String(s)) => query.language = Some(s.clone()),
            ("$caseSensitive", Bson::Boolean(b)) => query.case_sensitive = *b,
            ("$diacriticSensitive", Bson::Boolean(b)) => query.diacritic_sensitive = *b,
            (k, _) => return err(format!("invalid $text option: {k}")),
        }
    }
    if !has_search {
        return err("$text requires a $search string");
    }
    Ok(Expression::Text(query))
}

/// Parse a field condition: either implicit $eq or an operator sub-document.
fn parse_field_condition(field: &str, value: &Bson) -> Result<Expression, FilterParseError> {
    // If value is a document whose first key starts with $, it's an operator doc
    if let Bson::Document(sub_doc) = value {
        if sub_doc.keys().next().is_some_and(|k| k.starts_with('$')) {
            return parse_operator_doc(field, sub_doc);
        }
    }

    if let Bson::RegularExpression(re) = value {
        let regex = compile_regex(re.pattern.as_str(), Some(re.options.as_str()))?;
        return Ok(Expression::Leaf(field.to_string(), Condition::Regex(regex)));
    }

    // Otherwise: implicit $eq
    Ok(Expression::Leaf(field.to_string(), Condition::Eq(value.clone())))
}

/// Parse an operator sub-document like `{ "$gt": 21, "$lte": 100 }`.
fn parse_operator_doc(field: &str, doc: &Document) -> Result<Expression, FilterParseError> {
    // $regex needs special handling (consumes $options sibling)
    if doc.contains_key("$regex") {
        return parse_regex(field, doc);
    }
    // $near / $nearSphere consume their distance siblings
    if doc.contains_key("$near") || doc.contains_key("$nearSphere") {
        return parse_near(field, doc);
    }

    let leaf = |c: Condition| Expression::Leaf(field.to_string(), c);
    let mut conditions: Vec<Expression> = Vec::new();

    for (op_key, op_value) in doc {
        let expr = match op_key.as_str() {
            "$eq" => leaf(Condition::Eq(op_value.clone())),
            "$ne" => Expression::Not(Box::new(leaf(Condition::Eq(op_value.clone())))),
            "$gt" => leaf(Condition::Gt(op_value.clone())),
            "$gte" => leaf(Condition::Gte(op_value.clone())),
            "$lt" => leaf(Condition::Lt(op_value.clone())),
            "$lte" => leaf(Condition::Lte(op_value.clone())),
            "$in" => leaf(Condition::In(parse_in_list(op_value)?)),
            "$nin" => Expression::Not(Box::new(leaf(Condition::In(parse_in_list(op_value)?)))),
            "$exists" => Expression::exists(field, truthy(op_value)),
            "$mod" => leaf(parse_mod(op_value)?),
            "$type" => leaf(Condition::Type(parse_types(op_value)?)),
            "$size" => match op_value.as_i64().or_else(|| op_value.as_i32().map(i64::from)) {
                Some(n) if n >= 0 => leaf(Condition::Size(n)),
                _ => return err("$size value must be a non-negative integer"),
            },
            "$all" => parse_all(field, op_value)?,
            "$elemMatch" => parse_elem_match(field, op_value)?,
            "$not" => parse_not(field, op_value)?,
            "$geoWithin" | "$within" => leaf(Condition::Geo(GeoQuery {
                predicate: GeoPredicate::Within,
                shape: parse_within_shape(op_value)?,
            })),
            "$geoIntersects" => leaf(Condition::Geo(GeoQuery {
                predicate: GeoPredicate::Intersects,
                shape: parse_geometry_operand(op_value)?,
            })),
            "$options" => return err("$options without $regex"),
            k => return err(format!("unknown field operator: {k}")),
        };
        conditions.push(expr);
    }

    match conditions.len() {
        0 => err("empty operator document"),
        1 => Ok(conditions.remove(0)),
        _ => Ok(Expression::And(conditions)),
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(d) => *d != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

fn parse_in_list(value: &Bson) -> Result<InList, FilterParseError> {
    let Bson::Array(arr) = value else {
        return err("$in/$nin value must be an array");
    };
    let mut list = InList::default();
    for elem in arr {
        match elem {
            Bson::RegularExpression(re) => list.regexes.push(compile_regex(
                re.pattern.as_str(),
                Some(re.options.as_str()),
            )?),
            Bson::Document(d) if d.keys().next().is_some_and(|k| k.starts_with('$')) => {
                return err("cannot nest $ operators inside $in");
            }
            other => list.equalities.push(other.clone()),
        }
    }
    Ok(list)
}

fn parse_mod(value: &Bson) -> Result<Condition, FilterParseError> {
    let Bson::Array(arr) = value else {
        return err("$mod value must be an array");
    };
    let as_int = |v: &Bson| match v {
        Bson::Int32(i) => Some(i64::from(*i)),
        Bson::Int64(i) => Some(*i),
        Bson::Double(d) if d.is_finite() => Some(d.trunc() as i64),
        _ => None,
    };
    match arr.as_slice() {
        [d, r] => match (as_int(d), as_int(r)) {
            (Some(0), _) => err("$mod divisor cannot be 0"),
            (Some(divisor), Some(remainder)) => Ok(Condition::Mod { divisor, remainder }),
            _ => err("$mod elements must be numbers"),
        },
        _ => err("$mod requires [divisor, remainder]"),
    }
}

fn parse_types(value: &Bson) -> Result<Vec<ElementType>, FilterParseError> {
    let mut types = Vec::new();
    match value {
        Bson::Array(arr) => {
            for v in arr {
                push_type(v, &mut types)?;
            }
        }
        other => push_type(other, &mut types)?,
    }
    if types.is_empty() {
        return err("$type requires at least one type");
    }
    Ok(types)
}

fn push_type(value: &Bson, out: &mut Vec<ElementType>) -> Result<(), FilterParseError> {
    let code: i64 = match value {
        Bson::String(alias) => match alias.as_str() {
            "number" => {
                out.extend([
                    ElementType::Double,
                    ElementType::Int32,
                    ElementType::Int64,
                    ElementType::Decimal128,
                ]);
                return Ok(());
            }
            "double" => 1,
            "string" => 2,
            "object" => 3,
            "array" => 4,
            "binData" => 5,
            "undefined" => 6,
            "objectId" => 7,
            "bool" => 8,
            "date" => 9,
            "null" => 10,
            "regex" => 11,
            "dbPointer" => 12,
            "javascript" => 13,
            "symbol" => 14,
            "javascriptWithScope" => 15,
            "int" => 16,
            "timestamp" => 17,
            "long" => 18,
            "decimal" => 19,
            "minKey" => -1,
            "maxKey" => 127,
            other => return err(format!("unknown $type alias: {other}")),
        },
        Bson::Int32(i) => i64::from(*i),
        Bson::Int64(i) => *i,
        Bson::Double(d) if d.fract() == 0.0 => *d as i64,
        _ => return err("$type value must be a number or string alias"),
    };
    let byte = if code == -1 { 0xFF } else { code };
    match u8::try_from(byte).ok().and_then(ElementType::from) {
        Some(t) => {
            out.push(t);
            Ok(())
        }
        None => err(format!("invalid $type code: {code}")),
    }
}

/// `$all: [v1, v2]` is the conjunction of equalities. An empty list matches
/// nothing.
fn parse_all(field: &str, value: &Bson) -> Result<Expression, FilterParseError> {
    let Bson::Array(arr) = value else {
        return err("$all value must be an array");
    };
    let mut children = Vec::with_capacity(arr.len());
    for v in arr {
        let child = match v {
            Bson::Document(d) if d.contains_key("$elemMatch") => {
                parse_elem_match(field, d.get("$elemMatch").unwrap_or(&Bson::Null))?
            }
            Bson::RegularExpression(re) => Expression::Leaf(
                field.to_string(),
                Condition::Regex(compile_regex(re.pattern.as_str(), Some(re.options.as_str()))?),
            ),
            other => Expression::Leaf(field.to_string(), Condition::Eq(other.clone())),
        };
        children.push(child);
    }
    Ok(match children.len() {
        0 => Expression::AlwaysFalse,
        1 => children.remove(0),
        _ => Expression::And(children),
    })
}

const OBJECT_MATCH_OPERATORS: &[&str] = &[
    "$and",
    "$or",
    "$nor",
    "$where",
    "$text",
    "$expr",
    "$alwaysTrue",
    "$alwaysFalse",
];

fn parse_elem_match(field: &str, value: &Bson) -> Result<Expression, FilterParseError> {
    let Bson::Document(sub_doc) = value else {
        return err("$elemMatch needs an object");
    };
    let is_value_match = sub_doc
        .keys()
        .next()
        .is_some_and(|k| k.starts_with('$') && !OBJECT_MATCH_OPERATORS.contains(&k.as_str()));

    if is_value_match {
        // Conditions apply to the array elements themselves — empty path.
        let children = match parse_operator_doc("", sub_doc)? {
            Expression::And(children) => children,
            single => vec![single],
        };
        return Ok(Expression::ElemMatchValue(field.to_string(), children));
    }

    Ok(Expression::ElemMatchObject(
        field.to_string(),
        Box::new(parse_filter(sub_doc)?),
    ))
}

fn parse_not(field: &str, value: &Bson) -> Result<Expression, FilterParseError> {
    let inner = match value {
        Bson::Document(sub_doc) if sub_doc.is_empty() => return err("$not cannot be empty"),
        Bson::Document(sub_doc) => parse_operator_doc(field, sub_doc)?,
        Bson::RegularExpression(re) => Expression::Leaf(
            field.to_string(),
            Condition::Regex(compile_regex(re.pattern.as_str(), Some(re.options.as_str()))?),
        ),
        _ => return err("$not needs a regex or a document"),
    };
    Ok(Expression::Not(Box::new(inner)))
}

/// Parse a `$regex` + optional `$options` sub-document.
fn parse_regex(field: &str, doc: &Document) -> Result<Expression, FilterParseError> {
    let mut pattern: Option<&str> = None;
    let mut options: Option<&str> = None;

    for (key, value) in doc {
        match (key.as_str(), value) {
            ("$regex", Bson::String(s)) => pattern = Some(s.as_str()),
            ("$regex", Bson::RegularExpression(re)) => {
                pattern = Some(re.pattern.as_str());
                if options.is_none() && !re.options.as_str().is_empty() {
                    options = Some(re.options.as_str());
                }
            }
            ("$regex", _) => return err("$regex value must be a string"),
            ("$options", Bson::String(s)) => options = Some(s.as_str()),
            ("$options", _) => return err("$options value must be a string"),
            (k, _) => return err(format!("unexpected key alongside $regex: {k}")),
        }
    }

    let pat = pattern.ok_or_else(|| FilterParseError("missing $regex pattern".into()))?;
    let regex = compile_regex(pat, options)?;
    Ok(Expression::Leaf(field.to_string(), Condition::Regex(regex)))
}

fn compile_regex(pat: &str, options: Option<&str>) -> Result<Regex, FilterParseError> {
    // Build final pattern with flags
    let full_pattern = match options {
        Some(opts) if !opts.is_empty() => {
            let mut prefix = String::with_capacity(4 + opts.len() + pat.len());
            prefix.push_str("(?");
            for ch in opts.chars() {
                match ch {
                    'i' | 's' | 'm' | 'x' => prefix.push(ch),
                    c => return err(format!("unknown regex option: {c}")),
                }
            }
            prefix.push(')');
            prefix.push_str(pat);
            prefix
        }
        _ => pat.to_string(),
    };

    Regex::new(&full_pattern).map_err(|e| FilterParseError(format!("invalid regex pattern: {e}")))
}

// ── Geo operands ────────────────────────────────────────────────

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(d) => Some(*d),
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        _ => None,
    }
}

/// A legacy point: `[x, y]` or `{ <a>: x, <b>: y }`.
fn parse_point(value: &Bson) -> Result<Point, FilterParseError> {
    let coords: Vec<f64> = match value {
        Bson::Array(arr) => arr.iter().take(2).filter_map(number).collect(),
        Bson::Document(doc) => doc.values().take(2).filter_map(number).collect(),
        _ => Vec::new(),
    };
    match coords.as_slice() {
        [x, y] => Ok(Point::new(*x, *y)),
        _ => err("point must have two numeric coordinates"),
    }
}

fn parse_geojson(doc: &Document) -> Result<Shape, FilterParseError> {
    let kind = doc
        .get_str("type")
        .ok()
        .and_then(GeoJsonKind::from_name)
        .ok_or_else(|| FilterParseError("unknown GeoJSON type".into()))?;
    let coordinates = match kind {
        GeoJsonKind::GeometryCollection => doc
            .get("geometries")
            .cloned()
            .ok_or_else(|| FilterParseError("GeometryCollection needs geometries".into()))?,
        _ => doc
            .get("coordinates")
            .cloned()
            .ok_or_else(|| FilterParseError("GeoJSON geometry needs coordinates".into()))?,
    };
    Ok(Shape::GeoJson { kind, coordinates })
}

/// `{ $geometry: <GeoJSON> }`
fn parse_geometry_operand(value: &Bson) -> Result<Shape, FilterParseError> {
    match value {
        Bson::Document(doc) => match doc.get("$geometry") {
            Some(Bson::Document(geometry)) => parse_geojson(geometry),
            _ => err("$geoIntersects requires a $geometry"),
        },
        _ => err("geo operand must be a document"),
    }
}

fn parse_within_shape(value: &Bson) -> Result<Shape, FilterParseError> {
    let Bson::Document(doc) = value else {
        return err("$geoWithin operand must be a document");
    };
    let Some((key, operand)) = doc.iter().next() else {
        return err("$geoWithin operand is empty");
    };
    let array = |v: &Bson| match v {
        Bson::Array(arr) => Ok(arr.clone()),
        _ => err(format!("{key} requires an array")),
    };
    match key.as_str() {
        "$geometry" => match operand {
            Bson::Document(geometry) => parse_geojson(geometry),
            _ => err("$geometry must be a document"),
        },
        "$box" => match array(operand)?.as_slice() {
            [a, b] => Ok(Shape::Box {
                bottom_left: parse_point(a)?,
                top_right: parse_point(b)?,
            }),
            _ => err("$box requires two points"),
        },
        "$center" | "$centerSphere" => match array(operand)?.as_slice() {
            [c, r] => {
                let center = parse_point(c)?;
                let radius = number(r)
                    .filter(|r| *r >= 0.0)
                    .ok_or_else(|| FilterParseError(format!("{key} radius must be >= 0")))?;
                Ok(if key == "$center" {
                    Shape::Center { center, radius }
                } else {
                    Shape::CenterSphere { center, radius }
                })
            }
            _ => err(format!("{key} requires [center, radius]")),
        },
        "$polygon" => {
            let points = array(operand)?
                .iter()
                .map(parse_point)
                .collect::<Result<Vec<_>, _>>()?;
            if points.len() < 3 {
                return err("$polygon requires at least three points");
            }
            Ok(Shape::Polygon(points))
        }
        k => err(format!("unknown $geoWithin shape: {k}")),
    }
}

/// Parse `$near` / `$nearSphere` together with `$minDistance` / `$maxDistance`.
fn parse_near(field: &str, doc: &Document) -> Result<Expression, FilterParseError> {
    let mut near: Option<(bool, &Bson)> = None;
    let mut min_distance = None;
    let mut max_distance = None;

    for (key, value) in doc {
        match key.as_str() {
            "$near" => near = Some((false, value)),
            "$nearSphere" => near = Some((true, value)),
            "$minDistance" => min_distance = number(value),
            "$maxDistance" => max_distance = number(value),
            k => return err(format!("unexpected key alongside $near: {k}")),
        }
    }

    let (is_near_sphere, operand) =
        near.ok_or_else(|| FilterParseError("missing $near operand".into()))?;

    let (centroid, crs) = match operand {
        Bson::Document(d) if d.contains_key("$geometry") => {
            let Some(Bson::Document(geometry)) = d.get("$geometry") else {
                return err("$geometry must be a document");
            };
            if geometry.get_str("type").ok() != Some("Point") {
                return err("$near requires a GeoJSON Point");
            }
            let point = parse_point(geometry.get("coordinates").unwrap_or(&Bson::Null))?;
            // Distances may also live inside the $near document.
            min_distance = d.get("$minDistance").and_then(number).or(min_distance);
            max_distance = d.get("$maxDistance").and_then(number).or(max_distance);
            (point, Crs::Sphere)
        }
        other => {
            let crs = if is_near_sphere { Crs::Sphere } else { Crs::Flat };
            (parse_point(other)?, crs)
        }
    };

    Ok(Expression::Leaf(
        field.to_string(),
        Condition::GeoNear(NearQuery {
            centroid,
            crs,
            is_near_sphere,
            min_distance,
            max_distance,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn bare_field_implicit_eq() {
        let expr = parse_filter(&doc! { "status": "active" }).unwrap();
        match expr {
            Expression::Leaf(f, Condition::Eq(v)) => {
                assert_eq!(f, "status");
                assert_eq!(v, Bson::String("active".into()));
            }
            _ => panic!("expected Eq, got {:?}", expr),
        }
    }

    #[test]
    fn multiple_bare_fields_become_and() {
        let expr = parse_filter(&doc! { "status": "active", "age": 30_i32 }).unwrap();
        match expr {
            Expression::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[0], Expression::Leaf(f, _) if f == "status"));
                assert!(matches!(&children[1], Expression::Leaf(f, _) if f == "age"));
            }
            _ => panic!("expected And"),
        }
    }

    #[test]
    fn multiple_operators_same_field() {
        let expr = parse_filter(&doc! { "score": { "$gt": 50_i32, "$lte": 100_i32 } }).unwrap();
        match expr {
            Expression::And(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[0], Expression::Leaf(_, Condition::Gt(_))));
                assert!(matches!(&children[1], Expression::Leaf(_, Condition::Lte(_))));
            }
            _ => panic!("expected And"),
        }
    }

    #[test]
    fn nested_or_containing_and() {
        let expr = parse_filter(&doc! {
            "$or": [
                { "status": "active" },
                { "$and": [{ "score": { "$gt": 90_i32 } }, { "verified": true }] }
            ]
        })
        .unwrap();
        match expr {
            Expression::Or(children) => {
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[0], Expression::Leaf(..)));
                assert!(matches!(&children[1], Expression::And(..)));
            }
            _ => panic!("expected Or"),
        }
    }

    #[test]
    fn ne_and_nin_are_negations() {
        let expr = parse_filter(&doc! { "a": { "$ne": null } }).unwrap();
        assert!(matches!(
            expr,
            Expression::Not(ref inner) if matches!(**inner, Expression::Leaf(_, Condition::Eq(Bson::Null)))
        ));

        let expr = parse_filter(&doc! { "a": { "$nin": [1, 2] } }).unwrap();
        assert!(matches!(
            expr,
            Expression::Not(ref inner) if matches!(**inner, Expression::Leaf(_, Condition::In(_)))
        ));
    }

    #[test]
    fn exists_false_is_negated_exists() {
        let expr = parse_filter(&doc! { "deleted_at": { "$exists": false } }).unwrap();
        assert!(matches!(
            expr,
            Expression::Not(ref inner) if matches!(**inner, Expression::Leaf(ref f, Condition::Exists) if f == "deleted_at")
        ));
    }

    #[test]
    fn elem_match_object_vs_value() {
        let expr = parse_filter(&doc! { "a": { "$elemMatch": { "b": 1 } } }).unwrap();
        assert!(matches!(expr, Expression::ElemMatchObject(ref p, _) if p == "a"));

        let expr = parse_filter(&doc! { "a": { "$elemMatch": { "$gt": 1, "$lt": 5 } } }).unwrap();
        match expr {
            Expression::ElemMatchValue(p, children) => {
                assert_eq!(p, "a");
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[0], Expression::Leaf(f, Condition::Gt(_)) if f.is_empty()));
            }
            other => panic!("expected ElemMatchValue, got {other:?}"),
        }

        let expr = parse_filter(&doc! { "a": { "$elemMatch": { "$or": [{ "b": 1 }, { "c": 1 }] } } })
            .unwrap();
        assert!(matches!(expr, Expression::ElemMatchObject(..)));
    }

    #[test]
    fn in_list_collects_equalities() {
        let expr = parse_filter(&doc! { "name": { "$in": ["bob", null] } });
        match expr {
            Ok(Expression::Leaf(_, Condition::In(list))) => {
                assert_eq!(list.equalities.len(), 2);
                assert!(list.regexes.is_empty());
                assert!(list.has_null());
            }
            other => panic!("expected In, got {other:?}"),
        }

        let err = parse_filter(&doc! { "name": { "$in": [{ "$gt": 1 }] } }).unwrap_err();
        assert!(err.0.contains("$in"), "{}", err.0);
    }

    #[test]
    fn regex_with_options() {
        let expr = parse_filter(&doc! { "name": { "$regex": "^john", "$options": "i" } }).unwrap();
        match expr {
            Expression::Leaf(f, Condition::Regex(re)) => {
                assert_eq!(f, "name");
                assert_eq!(re.as_str(), "(?i)^john");
            }
            _ => panic!("expected Regex"),
        }
    }

    #[test]
    fn text_search() {
        let expr = parse_filter(&doc! { "$text": { "$search": "coffee", "$language": "en" } })
            .unwrap();
        match expr {
            Expression::Text(q) => {
                assert_eq!(q.search, "coffee");
                assert_eq!(q.language.as_deref(), Some("en"));
            }
            other => panic!("expected Text, got {other:?}"),
        }
    }

    #[test]
    fn near_legacy_is_flat() {
        let expr = parse_filter(&doc! { "loc": { "$near": [1.0, 2.0], "$maxDistance": 5.0 } })
            .unwrap();
        match expr {
            Expression::Leaf(_, Condition::GeoNear(q)) => {
                assert_eq!(q.crs, Crs::Flat);
                assert_eq!(q.max_distance, Some(5.0));
            }
            other => panic!("expected GeoNear, got {other:?}"),
        }
    }

    #[test]
    fn near_geojson_is_spherical() {
        let expr = parse_filter(&doc! {
            "loc": { "$near": { "$geometry": { "type": "Point", "coordinates": [1.0, 2.0] } } }
        })
        .unwrap();
        assert!(matches!(
            expr,
            Expression::Leaf(_, Condition::GeoNear(NearQuery { crs: Crs::Sphere, .. }))
        ));
    }

    #[test]
    fn geo_within_shapes() {
        let expr = parse_filter(&doc! {
            "loc": { "$geoWithin": { "$centerSphere": [[0.0, 0.0], 0.1] } }
        })
        .unwrap();
        assert!(matches!(
            expr,
            Expression::Leaf(_, Condition::Geo(GeoQuery { shape: Shape::CenterSphere { .. }, .. }))
        ));

        let expr = parse_filter(&doc! {
            "loc": { "$geoWithin": { "$box": [[0, 0], [10, 10]] } }
        })
        .unwrap();
        assert!(matches!(
            expr,
            Expression::Leaf(_, Condition::Geo(GeoQuery { shape: Shape::Box { .. }, .. }))
        ));
    }

    #[test]
    fn type_aliases() {
        let expr = parse_filter(&doc! { "a": { "$type": "number" } }).unwrap();
        match expr {
            Expression::Leaf(_, Condition::Type(types)) => assert_eq!(types.len(), 4),
            other => panic!("expected Type, got {other:?}"),
        }
        let err = parse_filter(&doc! { "a": { "$type": "nope" } }).unwrap_err();
        assert!(err.0.contains("unknown $type alias"), "{}", err.0);
    }

    #[test]
    fn unknown_top_level_operator_errors() {
        let err = parse_filter(&doc! { "$foo": [{ "a": 1_i32 }] }).unwrap_err();
        assert!(err.0.contains("unknown top-level operator"), "{}", err.0);
    }

    #[test]
    fn unknown_field_operator_errors() {
        let err = parse_filter(&doc! { "age": { "$between": 10_i32 } }).unwrap_err();
        assert!(err.0.contains("unknown field operator"), "{}", err.0);
    }

    #[test]
    fn empty_doc_errors() {
        let err = parse_filter(&doc! {}).unwrap_err();
        assert!(err.0.contains("empty"), "{}", err.0);
    }

    #[test]
    fn embedded_doc_as_eq_value() {
        // A sub-document that doesn't start with $ is an implicit $eq value
        let expr = parse_filter(&doc! { "address": { "city": "Austin", "state": "TX" } }).unwrap();
        assert!(matches!(expr, Expression::Leaf(ref f, Condition::Eq(_)) if f == "address"));
    }

    #[test]
    fn regex_invalid_pattern_errors() {
        let err = parse_filter(&doc! { "name": { "$regex": "[invalid" } }).unwrap_err();
        assert!(err.0.contains("invalid regex"), "{}", err.0);
    }

    #[test]
    fn mod_zero_divisor_errors() {
        let err = parse_filter(&doc! { "n": { "$mod": [0, 1] } }).unwrap_err();
        assert!(err.0.contains("divisor"), "{}", err.0);
    }
}
