use bson::Bson;
use bson::spec::ElementType;
use regex::Regex;

use crate::geo::{GeoQuery, NearQuery};

/// Path reported by a `$text` predicate. Text indexes store their terms under
/// this virtual key field.
pub const TEXT_PATH: &str = "_fts";

/// Comparison operator of a `$eq` / `$lt` / `$lte` / `$gt` / `$gte` leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// The operator and operand of a leaf predicate on a single path.
#[derive(Debug, Clone)]
pub enum Condition {
    Eq(Bson),
    Lt(Bson),
    Lte(Bson),
    Gt(Bson),
    Gte(Bson),
    In(InList),
    Regex(Regex),
    /// `$exists: true`. `$exists: false` is a negation of this.
    Exists,
    Mod { divisor: i64, remainder: i64 },
    Type(Vec<ElementType>),
    Size(i64),
    Geo(GeoQuery),
    GeoNear(NearQuery),
}

impl Condition {
    /// Operator and operand for the five comparison conditions.
    pub fn comparison(&self) -> Option<(CompareOp, &Bson)> {
        match self {
            Condition::Eq(v) => Some((CompareOp::Eq, v)),
            Condition::Lt(v) => Some((CompareOp::Lt, v)),
            Condition::Lte(v) => Some((CompareOp::Lte, v)),
            Condition::Gt(v) => Some((CompareOp::Gt, v)),
            Condition::Gte(v) => Some((CompareOp::Gte, v)),
            _ => None,
        }
    }

    pub fn is_geo(&self) -> bool {
        matches!(self, Condition::Geo(_) | Condition::GeoNear(_))
    }
}

/// Operand of `$in`: literal equalities plus regexes.
#[derive(Debug, Clone, Default)]
pub struct InList {
    pub equalities: Vec<Bson>,
    pub regexes: Vec<Regex>,
}

impl InList {
    pub fn new(equalities: Vec<Bson>) -> Self {
        Self {
            equalities,
            regexes: Vec::new(),
        }
    }

    pub fn has_null(&self) -> bool {
        self.equalities.iter().any(|v| matches!(v, Bson::Null))
    }

    /// True when the list is exactly `[null]` (possibly repeated).
    pub fn is_only_null(&self) -> bool {
        self.regexes.is_empty()
            && !self.equalities.is_empty()
            && self.equalities.iter().all(|v| matches!(v, Bson::Null))
    }

    pub fn has_array(&self) -> bool {
        self.equalities.iter().any(|v| matches!(v, Bson::Array(_)))
    }
}

/// Operand of a `$text` search.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextQuery {
    pub search: String,
    pub language: Option<String>,
    pub case_sensitive: bool,
    pub diacritic_sensitive: bool,
}

/// A recursive predicate tree.
///
/// This is the owned, builder-friendly shape. [`crate::MatchTree`] flattens
/// it into an arena so that planning stages can key side tables by node.
#[derive(Debug, Clone)]
pub enum Expression {
    // Logical
    And(Vec<Expression>),
    Or(Vec<Expression>),
    Nor(Vec<Expression>),
    Not(Box<Expression>),
    // Array matching — `path` is the array field
    ElemMatchObject(String, Box<Expression>),
    ElemMatchValue(String, Vec<Expression>),
    // Single-path condition
    Leaf(String, Condition),
    Text(TextQuery),
    /// `$where` — needs the whole document, never indexable.
    Where(String),
    AlwaysTrue,
    AlwaysFalse,
}

impl Expression {
    pub fn eq(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Expression::Leaf(path.into(), Condition::Eq(value.into()))
    }

    pub fn lt(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Expression::Leaf(path.into(), Condition::Lt(value.into()))
    }

    pub fn lte(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Expression::Leaf(path.into(), Condition::Lte(value.into()))
    }

    pub fn gt(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Expression::Leaf(path.into(), Condition::Gt(value.into()))
    }

    pub fn gte(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Expression::Leaf(path.into(), Condition::Gte(value.into()))
    }

    /// `{path: {$ne: value}}`
    pub fn ne(path: impl Into<String>, value: impl Into<Bson>) -> Self {
        Expression::Not(Box::new(Expression::eq(path, value)))
    }

    pub fn exists(path: impl Into<String>, exists: bool) -> Self {
        let leaf = Expression::Leaf(path.into(), Condition::Exists);
        if exists {
            leaf
        } else {
            Expression::Not(Box::new(leaf))
        }
    }

    pub fn in_list<V: Into<Bson>>(
        path: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let equalities = values.into_iter().map(Into::into).collect();
        Expression::Leaf(path.into(), Condition::In(InList::new(equalities)))
    }

    pub fn regex(path: impl Into<String>, regex: Regex) -> Self {
        Expression::Leaf(path.into(), Condition::Regex(regex))
    }

    pub fn not(expr: Expression) -> Self {
        Expression::Not(Box::new(expr))
    }

    pub fn and(children: impl IntoIterator<Item = Expression>) -> Self {
        Expression::And(children.into_iter().collect())
    }

    pub fn or(children: impl IntoIterator<Item = Expression>) -> Self {
        Expression::Or(children.into_iter().collect())
    }

    pub fn elem_match(path: impl Into<String>, child: Expression) -> Self {
        Expression::ElemMatchObject(path.into(), Box::new(child))
    }

    /// `{path: {$elemMatch: {<conditions>}}}` where the conditions apply to
    /// the array elements themselves.
    pub fn elem_match_value(
        path: impl Into<String>,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Self {
        let children = conditions
            .into_iter()
            .map(|c| Expression::Leaf(String::new(), c))
            .collect();
        Expression::ElemMatchValue(path.into(), children)
    }

    pub fn text(search: impl Into<String>) -> Self {
        Expression::Text(TextQuery {
            search: search.into(),
            ..Default::default()
        })
    }
}
