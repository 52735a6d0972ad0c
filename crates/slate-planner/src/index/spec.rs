use bson::{Bson, Document};

use super::{Flat2dParams, IndexEntry, SphereVersion};
use crate::collation::LocaleCollator;
use crate::error::PlannerError;

impl IndexEntry {
    /// Build an entry from a catalog index spec such as
    /// `{ key: { a: 1 }, name: "a_1", unique: true }`.
    ///
    /// Catalog bookkeeping fields (`v`, `ns`, `background`, ...) are ignored.
    /// A missing `name` is derived from the key pattern.
    pub fn from_spec(spec: &Document) -> Result<Self, PlannerError> {
        let key = spec
            .get_document("key")
            .map_err(|_| PlannerError::invalid("index spec requires a 'key' document"))?;
        let name = match spec.get("name") {
            Some(Bson::String(name)) => name.clone(),
            Some(_) => return Err(PlannerError::invalid("index name must be a string")),
            None => default_name(key),
        };

        let mut entry = IndexEntry::new(name, key)?
            .with_sparse(flag(spec, "sparse")?)
            .with_unique(flag(spec, "unique")?);

        if let Some(filter) = sub_document(spec, "partialFilterExpression")? {
            entry = entry.with_partial_filter(filter)?;
        }
        if let Some(collation) = sub_document(spec, "collation")?
            && let Some(collator) = LocaleCollator::from_document(collation)?
        {
            entry = entry.with_collator(collator);
        }
        if let Some(version) = spec.get("2dsphereIndexVersion") {
            entry = entry.with_sphere_version(sphere_version(version)?);
        }
        if let Some(projection) = sub_document(spec, "wildcardProjection")? {
            entry = entry.with_wildcard_projection(projection)?;
        }

        let mut params = Flat2dParams::default();
        if let Some(min) = spec.get("min") {
            params.min = number(min, "min")?;
        }
        if let Some(max) = spec.get("max") {
            params.max = number(max, "max")?;
        }
        if let Some(bits) = spec.get("bits") {
            let bits = number(bits, "bits")?;
            if !(1.0..=32.0).contains(&bits) || bits.fract() != 0.0 {
                return Err(PlannerError::invalid("bits must be an integer in 1..=32"));
            }
            params.bits = bits as u32;
        }
        if params.min >= params.max {
            return Err(PlannerError::invalid("2d min must be less than max"));
        }
        Ok(entry.with_2d_params(params))
    }
}

/// `{a: 1, b: -1}` → `"a_1_b_-1"`
fn default_name(key: &Document) -> String {
    let mut parts = Vec::with_capacity(key.len() * 2);
    for (path, value) in key {
        parts.push(path.clone());
        parts.push(match value {
            Bson::Int32(i) => i.to_string(),
            Bson::Int64(i) => i.to_string(),
            Bson::Double(d) if d.fract() == 0.0 => (*d as i64).to_string(),
            Bson::String(s) => s.clone(),
            other => other.to_string(),
        });
    }
    parts.join("_")
}

fn flag(spec: &Document, key: &str) -> Result<bool, PlannerError> {
    match spec.get(key) {
        None => Ok(false),
        Some(Bson::Boolean(b)) => Ok(*b),
        Some(Bson::Int32(i)) => Ok(*i != 0),
        Some(Bson::Int64(i)) => Ok(*i != 0),
        Some(Bson::Double(d)) => Ok(*d != 0.0),
        Some(_) => Err(PlannerError::invalid(format!("'{key}' must be a boolean"))),
    }
}

fn sub_document<'a>(spec: &'a Document, key: &str) -> Result<Option<&'a Document>, PlannerError> {
    match spec.get(key) {
        None => Ok(None),
        Some(Bson::Document(doc)) => Ok(Some(doc)),
        Some(_) => Err(PlannerError::invalid(format!("'{key}' must be a document"))),
    }
}

fn number(value: &Bson, key: &str) -> Result<f64, PlannerError> {
    match value {
        Bson::Int32(i) => Ok(f64::from(*i)),
        Bson::Int64(i) => Ok(*i as f64),
        Bson::Double(d) if d.is_finite() => Ok(*d),
        _ => Err(PlannerError::invalid(format!("'{key}' must be a finite number"))),
    }
}

fn sphere_version(value: &Bson) -> Result<SphereVersion, PlannerError> {
    match number(value, "2dsphereIndexVersion")? {
        v if v == 1.0 => Ok(SphereVersion::V1),
        v if v == 2.0 || v == 3.0 => Ok(SphereVersion::V2),
        v => Err(PlannerError::invalid(format!(
            "unsupported 2dsphereIndexVersion: {v}"
        ))),
    }
}
