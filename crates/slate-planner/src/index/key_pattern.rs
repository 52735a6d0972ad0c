use std::fmt;

use bson::{Bson, Document};
use slate_query::TEXT_PATH;

use crate::error::PlannerError;

/// Virtual key field holding a text index's language/term weights.
pub const TEXT_WEIGHTS_PATH: &str = "_ftsx";

/// Key suffix marking a wildcard key field.
pub const WILDCARD_SUFFIX: &str = "$**";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SphereVersion {
    V1,
    V2,
}

/// How a single key field is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    Ascending,
    Descending,
    Hashed,
    Flat2d,
    Sphere2d(SphereVersion),
    Text,
    Wildcard,
}

impl KeyType {
    pub fn is_ordinary(self) -> bool {
        matches!(self, KeyType::Ascending | KeyType::Descending)
    }

    /// Access method name, as written in a key pattern.
    pub fn plugin_name(self) -> Option<&'static str> {
        match self {
            KeyType::Ascending | KeyType::Descending => None,
            KeyType::Hashed => Some("hashed"),
            KeyType::Flat2d => Some("2d"),
            KeyType::Sphere2d(_) => Some("2dsphere"),
            KeyType::Text => Some("text"),
            KeyType::Wildcard => Some("wildcard"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyField {
    pub path: String,
    pub key_type: KeyType,
}

impl KeyField {
    pub fn new(path: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            path: path.into(),
            key_type,
        }
    }
}

/// A parsed key pattern.
///
/// Text key patterns are normalized: the text fields collapse into the
/// virtual `_fts` (text) and `_ftsx` (ascending) key fields at the position
/// of the first text field. `raw` keeps the document as written, which is
/// what hints are matched against.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPattern {
    pub fields: Vec<KeyField>,
    pub raw: Document,
    /// Paths of the document fields that feed the text index.
    pub text_fields: Vec<String>,
}

impl KeyPattern {
    pub fn parse(raw: &Document) -> Result<Self, PlannerError> {
        if raw.is_empty() {
            return Err(PlannerError::invalid("key pattern is empty"));
        }

        let mut fields = Vec::with_capacity(raw.len());
        let mut text_fields = Vec::new();
        // Position of the first text field, once seen.
        let mut text_at: Option<usize> = None;
        let mut text_closed = false;

        for (path, value) in raw {
            validate_path(path)?;
            let key_type = parse_key_type(path, value)?;

            if key_type == KeyType::Text {
                if text_closed {
                    return Err(PlannerError::invalid(
                        "text fields in a key pattern must be contiguous",
                    ));
                }
                text_at.get_or_insert(fields.len());
                if path != TEXT_PATH {
                    text_fields.push(path.clone());
                }
                continue;
            }
            if text_at.is_some() {
                // Already-normalized `{_fts: "text", _ftsx: 1}` form.
                if path == TEXT_WEIGHTS_PATH && !text_closed {
                    continue;
                }
                text_closed = true;
            }
            fields.push(KeyField::new(path.clone(), key_type));
        }

        if let Some(at) = text_at {
            fields.insert(at, KeyField::new(TEXT_PATH, KeyType::Text));
            fields.insert(at + 1, KeyField::new(TEXT_WEIGHTS_PATH, KeyType::Ascending));
        }

        let pattern = Self {
            fields,
            raw: raw.clone(),
            text_fields,
        };
        pattern.validate_plugins()?;
        Ok(pattern)
    }

    /// Single ascending field, as synthesized for expanded wildcard entries.
    pub fn single(path: impl Into<String>) -> Self {
        let path = path.into();
        let mut raw = Document::new();
        raw.insert(path.clone(), 1_i32);
        Self {
            fields: vec![KeyField::new(path, KeyType::Ascending)],
            raw,
            text_fields: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn leading(&self) -> Option<&KeyField> {
        self.fields.first()
    }

    /// The special access method of the pattern, if any.
    pub fn plugin(&self) -> Option<KeyType> {
        self.fields
            .iter()
            .map(|f| f.key_type)
            .find(|t| !t.is_ordinary())
    }

    fn validate_plugins(&self) -> Result<(), PlannerError> {
        let mut plugin: Option<KeyType> = None;
        let mut hashed = 0;
        for (pos, field) in self.fields.iter().enumerate() {
            let key_type = field.key_type;
            if key_type.is_ordinary() {
                continue;
            }
            if let Some(seen) = plugin
                && seen.plugin_name() != key_type.plugin_name()
            {
                return Err(PlannerError::invalid(format!(
                    "cannot mix index types '{}' and '{}' in one key pattern",
                    seen.plugin_name().unwrap_or_default(),
                    key_type.plugin_name().unwrap_or_default(),
                )));
            }
            plugin = Some(key_type);
            match key_type {
                KeyType::Hashed => {
                    hashed += 1;
                    if hashed > 1 {
                        return Err(PlannerError::invalid(
                            "a key pattern can hold at most one hashed field",
                        ));
                    }
                }
                KeyType::Flat2d if pos != 0 => {
                    return Err(PlannerError::invalid("2d must be the first key field"));
                }
                KeyType::Wildcard if self.fields.len() != 1 => {
                    return Err(PlannerError::invalid(
                        "a wildcard key pattern must have exactly one field",
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

fn validate_path(path: &str) -> Result<(), PlannerError> {
    if path.is_empty() {
        return Err(PlannerError::invalid("key pattern field name is empty"));
    }
    let wildcard = path == WILDCARD_SUFFIX || path.ends_with(".$**");
    for (i, component) in path.split('.').enumerate() {
        if component.is_empty() {
            return Err(PlannerError::invalid(format!(
                "key pattern field '{path}' has an empty component"
            )));
        }
        let last = i == path.split('.').count() - 1;
        if component.starts_with('$') && !(wildcard && last) {
            return Err(PlannerError::invalid(format!(
                "key pattern field '{path}' has a component starting with '$'"
            )));
        }
    }
    Ok(())
}

fn parse_key_type(path: &str, value: &Bson) -> Result<KeyType, PlannerError> {
    let number = match value {
        Bson::Int32(i) => Some(f64::from(*i)),
        Bson::Int64(i) => Some(*i as f64),
        Bson::Double(d) => Some(*d),
        _ => None,
    };

    if path == WILDCARD_SUFFIX || path.ends_with(".$**") {
        return match number {
            Some(n) if n != 0.0 && !n.is_nan() => Ok(KeyType::Wildcard),
            _ => Err(PlannerError::invalid(format!(
                "wildcard field '{path}' requires a numeric direction"
            ))),
        };
    }

    match (value, number) {
        (_, Some(n)) if n.is_nan() => Err(PlannerError::invalid(format!(
            "key pattern field '{path}' has a NaN direction"
        ))),
        (_, Some(n)) if n < 0.0 => Ok(KeyType::Descending),
        (_, Some(_)) => Ok(KeyType::Ascending),
        (Bson::String(name), None) => match name.as_str() {
            "hashed" => Ok(KeyType::Hashed),
            "2d" => Ok(KeyType::Flat2d),
            "2dsphere" => Ok(KeyType::Sphere2d(SphereVersion::V2)),
            "text" => Ok(KeyType::Text),
            other => Err(PlannerError::invalid(format!(
                "unknown index plugin '{other}'"
            ))),
        },
        _ => Err(PlannerError::invalid(format!(
            "key pattern field '{path}' must be a number or a plugin name"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn paths(p: &KeyPattern) -> Vec<&str> {
        p.fields.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn directions() {
        let p = KeyPattern::parse(&doc! { "a": 1, "b": -1.0 }).unwrap();
        assert_eq!(p.fields[0].key_type, KeyType::Ascending);
        assert_eq!(p.fields[1].key_type, KeyType::Descending);
        assert_eq!(p.plugin(), None);
    }

    #[test]
    fn text_fields_are_normalized() {
        let p = KeyPattern::parse(&doc! { "a": 1, "title": "text", "body": "text", "z": 1 })
            .unwrap();
        assert_eq!(paths(&p), vec!["a", "_fts", "_ftsx", "z"]);
        assert_eq!(p.text_fields, vec!["title", "body"]);
        assert_eq!(p.fields[1].key_type, KeyType::Text);
    }

    #[test]
    fn normalized_text_pattern_is_stable() {
        let p = KeyPattern::parse(&doc! { "a": 1, "_fts": "text", "_ftsx": 1 }).unwrap();
        assert_eq!(paths(&p), vec!["a", "_fts", "_ftsx"]);
        assert!(p.text_fields.is_empty());
    }

    #[test]
    fn split_text_fields_rejected() {
        let err = KeyPattern::parse(&doc! { "t1": "text", "a": 1, "t2": "text" }).unwrap_err();
        assert!(err.to_string().contains("contiguous"), "{err}");
    }

    #[test]
    fn mixed_plugins_rejected() {
        let err = KeyPattern::parse(&doc! { "a": "2d", "b": "text" }).unwrap_err();
        assert!(err.to_string().contains("cannot mix"), "{err}");
    }

    #[test]
    fn compound_2dsphere_allowed() {
        let p = KeyPattern::parse(&doc! { "loc": "2dsphere", "a": 1, "area": "2dsphere" }).unwrap();
        assert_eq!(p.plugin(), Some(KeyType::Sphere2d(SphereVersion::V2)));
    }

    #[test]
    fn malformed_patterns() {
        assert!(KeyPattern::parse(&doc! {}).is_err());
        assert!(KeyPattern::parse(&doc! { "a..b": 1 }).is_err());
        assert!(KeyPattern::parse(&doc! { "a": "geoHaystack" }).is_err());
        assert!(KeyPattern::parse(&doc! { "a": "hashed", "b": "hashed" }).is_err());
        assert!(KeyPattern::parse(&doc! { "$**": 1, "b": 1 }).is_err());
        assert!(KeyPattern::parse(&doc! { "a.$x": 1 }).is_err());
        assert!(KeyPattern::parse(&doc! { "a": 1, "loc": "2d" }).is_err());
        assert!(KeyPattern::parse(&doc! { "a": true }).is_err());
    }

    #[test]
    fn wildcard_patterns() {
        let p = KeyPattern::parse(&doc! { "$**": 1 }).unwrap();
        assert_eq!(p.plugin(), Some(KeyType::Wildcard));
        let p = KeyPattern::parse(&doc! { "a.b.$**": 1 }).unwrap();
        assert_eq!(p.fields[0].path, "a.b.$**");
    }
}
