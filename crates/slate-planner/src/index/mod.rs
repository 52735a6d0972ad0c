mod key_pattern;
mod spec;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};
use slate_query::{MatchTree, parse_filter};

use crate::collation::Collator;
use crate::error::PlannerError;

pub use key_pattern::{
    KeyField, KeyPattern, KeyType, SphereVersion, TEXT_WEIGHTS_PATH, WILDCARD_SUFFIX,
};

// ── Identity ────────────────────────────────────────────────────

/// Names an index. Expanded wildcard entries share their source's catalog
/// name and are told apart by the field they were expanded for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexIdentifier {
    pub catalog_name: String,
    pub disambiguator: Option<String>,
}

impl IndexIdentifier {
    pub fn new(catalog_name: impl Into<String>) -> Self {
        Self {
            catalog_name: catalog_name.into(),
            disambiguator: None,
        }
    }
}

impl fmt::Display for IndexIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.disambiguator {
            Some(d) => write!(f, "{}[{}]", self.catalog_name, d),
            None => write!(f, "{}", self.catalog_name),
        }
    }
}

/// Access method of an index as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexKind {
    Btree,
    Hashed,
    Flat2d,
    Sphere2d,
    Text,
    Wildcard,
}

impl IndexKind {
    fn of(pattern: &KeyPattern) -> Self {
        match pattern.plugin() {
            None | Some(KeyType::Ascending | KeyType::Descending) => IndexKind::Btree,
            Some(KeyType::Hashed) => IndexKind::Hashed,
            Some(KeyType::Flat2d) => IndexKind::Flat2d,
            Some(KeyType::Sphere2d(_)) => IndexKind::Sphere2d,
            Some(KeyType::Text) => IndexKind::Text,
            Some(KeyType::Wildcard) => IndexKind::Wildcard,
        }
    }
}

// ── Index-type parameters ───────────────────────────────────────

/// Layout of a text index's key pattern around its `_fts`/`_ftsx` fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInfo {
    /// Ordinary key fields before the text fields. Queries must pin each of
    /// them with an equality to use the index.
    pub prefix_paths: Vec<String>,
    pub suffix_paths: Vec<String>,
}

impl TextInfo {
    fn of(pattern: &KeyPattern) -> Option<Self> {
        let at = pattern
            .fields
            .iter()
            .position(|f| f.key_type == KeyType::Text)?;
        let path = |f: &KeyField| f.path.clone();
        Some(Self {
            prefix_paths: pattern.fields[..at].iter().map(path).collect(),
            suffix_paths: pattern.fields[at + 2..].iter().map(path).collect(),
        })
    }
}

/// The `wildcardProjection` of a `$**` index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardProjection {
    /// Only these subtrees are indexed.
    Include(BTreeSet<String>),
    /// Everything except these subtrees is indexed. `include_id` is set when
    /// the projection explicitly opts `_id` back in.
    Exclude {
        paths: BTreeSet<String>,
        include_id: bool,
    },
}

impl WildcardProjection {
    pub fn parse(doc: &Document) -> Result<Self, PlannerError> {
        if doc.is_empty() {
            return Err(PlannerError::invalid("wildcardProjection is empty"));
        }
        let mut included = BTreeSet::new();
        let mut excluded = BTreeSet::new();
        let mut include_id = None;
        for (path, value) in doc {
            let on = match value {
                Bson::Boolean(b) => *b,
                Bson::Int32(i) => *i != 0,
                Bson::Int64(i) => *i != 0,
                Bson::Double(d) => *d != 0.0,
                _ => {
                    return Err(PlannerError::invalid(format!(
                        "wildcardProjection value for '{path}' must be 0 or 1"
                    )));
                }
            };
            if path == "_id" {
                include_id = Some(on);
            } else if on {
                included.insert(path.clone());
            } else {
                excluded.insert(path.clone());
            }
        }
        match (included.is_empty(), excluded.is_empty()) {
            (false, false) => Err(PlannerError::invalid(
                "wildcardProjection cannot mix inclusion and exclusion",
            )),
            // `{_id: 1}` alone indexes `_id` and nothing else.
            (true, true) if include_id == Some(true) => {
                Ok(WildcardProjection::Include(BTreeSet::from(["_id".to_string()])))
            }
            (false, true) => {
                if include_id == Some(true) {
                    included.insert("_id".to_string());
                }
                Ok(WildcardProjection::Include(included))
            }
            _ => Ok(WildcardProjection::Exclude {
                paths: excluded,
                include_id: include_id == Some(true),
            }),
        }
    }
}

/// Bounds and precision of a 2d index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flat2dParams {
    pub min: f64,
    pub max: f64,
    pub bits: u32,
}

impl Default for Flat2dParams {
    fn default() -> Self {
        Self {
            min: -180.0,
            max: 180.0,
            bits: 26,
        }
    }
}

// ── IndexEntry ──────────────────────────────────────────────────

/// Everything index selection needs to know about one index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub identifier: IndexIdentifier,
    pub key_pattern: KeyPattern,
    pub kind: IndexKind,
    pub sparse: bool,
    pub unique: bool,
    pub multikey: bool,
    /// Path prefixes known to hold arrays. `None` with `multikey` set means
    /// the index is multikey somewhere but nobody tracked where.
    pub multikey_paths: Option<BTreeSet<String>>,
    pub partial_filter: Option<Arc<MatchTree>>,
    pub collator: Option<Arc<dyn Collator>>,
    pub text: Option<TextInfo>,
    pub wildcard_projection: Option<WildcardProjection>,
    pub flat_2d: Flat2dParams,
}

impl IndexEntry {
    pub fn new(name: impl Into<String>, key: &Document) -> Result<Self, PlannerError> {
        Ok(Self::from_pattern(
            IndexIdentifier::new(name),
            KeyPattern::parse(key)?,
        ))
    }

    pub(crate) fn from_pattern(identifier: IndexIdentifier, key_pattern: KeyPattern) -> Self {
        Self {
            identifier,
            kind: IndexKind::of(&key_pattern),
            text: TextInfo::of(&key_pattern),
            key_pattern,
            sparse: false,
            unique: false,
            multikey: false,
            multikey_paths: None,
            partial_filter: None,
            collator: None,
            wildcard_projection: None,
            flat_2d: Flat2dParams::default(),
        }
    }

    pub fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    /// Multikey, with no record of which paths hold arrays.
    pub fn with_multikey(mut self) -> Self {
        self.multikey = true;
        self.multikey_paths = None;
        self
    }

    /// Multikey on exactly these path prefixes. An empty set is not multikey.
    pub fn with_multikey_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: BTreeSet<String> = paths.into_iter().map(Into::into).collect();
        self.multikey = !paths.is_empty();
        self.multikey_paths = Some(paths);
        self
    }

    pub fn with_partial_filter(mut self, filter: &Document) -> Result<Self, PlannerError> {
        let expr = parse_filter(filter).map_err(|e| {
            PlannerError::invalid(format!("malformed partialFilterExpression: {}", e.0))
        })?;
        self.partial_filter = Some(Arc::new(MatchTree::new(expr)));
        Ok(self)
    }

    pub fn with_collator(mut self, collator: Arc<dyn Collator>) -> Self {
        self.collator = Some(collator);
        self
    }

    /// Sets the version of every 2dsphere key field.
    pub fn with_sphere_version(mut self, version: SphereVersion) -> Self {
        for field in &mut self.key_pattern.fields {
            if let KeyType::Sphere2d(v) = &mut field.key_type {
                *v = version;
            }
        }
        self
    }

    pub fn with_wildcard_projection(mut self, projection: &Document) -> Result<Self, PlannerError> {
        if self.kind != IndexKind::Wildcard {
            return Err(PlannerError::invalid(
                "wildcardProjection is only valid on a wildcard index",
            ));
        }
        if self.key_pattern.fields[0].path != WILDCARD_SUFFIX {
            return Err(PlannerError::invalid(
                "wildcardProjection is only valid on a '$**' key pattern",
            ));
        }
        self.wildcard_projection = Some(WildcardProjection::parse(projection)?);
        Ok(self)
    }

    pub fn with_2d_params(mut self, params: Flat2dParams) -> Self {
        self.flat_2d = params;
        self
    }

    pub fn name(&self) -> &str {
        &self.identifier.catalog_name
    }

    pub fn leading_path(&self) -> Option<&str> {
        self.key_pattern.leading().map(|f| f.path.as_str())
    }

    pub fn is_single_field(&self) -> bool {
        self.key_pattern.len() == 1
    }

    /// Key fields indexed as 2dsphere.
    pub fn geo_paths(&self) -> impl Iterator<Item = &str> {
        self.key_pattern
            .fields
            .iter()
            .filter(|f| matches!(f.key_type, KeyType::Sphere2d(_)))
            .map(|f| f.path.as_str())
    }

    pub fn sphere_version(&self) -> Option<SphereVersion> {
        self.key_pattern.fields.iter().find_map(|f| match f.key_type {
            KeyType::Sphere2d(v) => Some(v),
            _ => None,
        })
    }

    /// Whether `path` or any of its prefixes may hold an array.
    pub fn path_has_multikey_component(&self, path: &str) -> bool {
        if !self.multikey {
            return false;
        }
        match &self.multikey_paths {
            None => true,
            Some(set) => path_prefixes(path).any(|p| set.contains(p)),
        }
    }
}

/// `"a.b.c"` → `"a"`, `"a.b"`, `"a.b.c"`.
pub(crate) fn path_prefixes(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('.')
        .map(|(i, _)| &path[..i])
        .chain(std::iter::once(path))
}
