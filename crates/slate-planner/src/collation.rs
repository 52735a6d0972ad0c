//! Collation seam.
//!
//! Index selection never compares strings itself. It only needs to know
//! whether the collation a query runs under is the one an index was built
//! with, so a collator is reduced to its settings.

use std::fmt;
use std::sync::Arc;

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;

/// Settings that determine how strings order and compare.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollationSpec {
    pub locale: String,
    #[serde(default = "default_strength")]
    pub strength: i32,
    #[serde(default)]
    pub case_level: bool,
    #[serde(default)]
    pub numeric_ordering: bool,
}

fn default_strength() -> i32 {
    3
}

impl CollationSpec {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            strength: default_strength(),
            case_level: false,
            numeric_ordering: false,
        }
    }

    pub fn with_strength(mut self, strength: i32) -> Self {
        self.strength = strength;
        self
    }

    /// Read a `{locale, strength, caseLevel, numericOrdering}` document.
    pub fn from_document(doc: &Document) -> Result<Self, PlannerError> {
        let locale = doc
            .get_str("locale")
            .map_err(|_| PlannerError::invalid("collation requires a string locale"))?;
        let mut spec = CollationSpec::new(locale);
        for (key, value) in doc {
            match (key.as_str(), value) {
                ("locale", _) => {}
                ("strength", Bson::Int32(s)) if (1..=5).contains(s) => spec.strength = *s,
                ("strength", _) => {
                    return Err(PlannerError::invalid("collation strength must be 1-5"));
                }
                ("caseLevel", Bson::Boolean(b)) => spec.case_level = *b,
                ("numericOrdering", Bson::Boolean(b)) => spec.numeric_ordering = *b,
                (k, _) => {
                    return Err(PlannerError::invalid(format!("invalid collation field: {k}")));
                }
            }
        }
        Ok(spec)
    }
}

/// A string comparison policy attached to a query or an index.
pub trait Collator: fmt::Debug + Send + Sync {
    fn spec(&self) -> &CollationSpec;
}

/// Collator identified purely by its [`CollationSpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleCollator {
    spec: CollationSpec,
}

impl LocaleCollator {
    pub fn new(spec: CollationSpec) -> Self {
        Self { spec }
    }

    /// Build a shared collator from a collation document. Locale `"simple"`
    /// is binary comparison, which is the same as having no collator.
    pub fn from_document(doc: &Document) -> Result<Option<Arc<dyn Collator>>, PlannerError> {
        let spec = CollationSpec::from_document(doc)?;
        if spec.locale == "simple" {
            return Ok(None);
        }
        Ok(Some(Arc::new(LocaleCollator::new(spec))))
    }
}

impl Collator for LocaleCollator {
    fn spec(&self) -> &CollationSpec {
        &self.spec
    }
}

/// Whether two optional collators produce identical comparisons.
pub fn collators_match(a: Option<&dyn Collator>, b: Option<&dyn Collator>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.spec() == b.spec(),
        _ => false,
    }
}
