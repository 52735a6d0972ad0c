//! Cross-type ordering of BSON values.
//!
//! Values of different types sort by a fixed type bracket; numbers of any
//! width share one bracket and compare numerically.

use std::cmp::Ordering;

use bson::Bson;

/// Sort bracket of a value's type. Values in different brackets never compare
/// equal.
pub fn canonical_type(value: &Bson) -> i32 {
    match value {
        Bson::MinKey => -1,
        Bson::Undefined => 0,
        Bson::Null => 5,
        Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_) | Bson::Decimal128(_) => 10,
        Bson::String(_) | Bson::Symbol(_) => 15,
        Bson::Document(_) => 20,
        Bson::Array(_) => 25,
        Bson::Binary(_) => 30,
        Bson::ObjectId(_) => 35,
        Bson::Boolean(_) => 40,
        Bson::DateTime(_) => 45,
        Bson::Timestamp(_) => 47,
        Bson::RegularExpression(_) => 50,
        Bson::DbPointer(_) => 55,
        Bson::JavaScriptCode(_) => 60,
        Bson::JavaScriptCodeWithScope(_) => 65,
        Bson::MaxKey => 127,
    }
}

/// Whether comparisons against this value depend on the collation.
pub fn is_collatable(value: &Bson) -> bool {
    matches!(
        value,
        Bson::String(_) | Bson::Symbol(_) | Bson::Document(_) | Bson::Array(_)
    )
}

pub fn is_nan(value: &Bson) -> bool {
    matches!(value, Bson::Double(d) if d.is_nan())
}

/// Compare two values using binary string ordering.
///
/// Returns `None` when the values are in different brackets or when this
/// module does not know how to order them (decimals, code, binary payloads of
/// different subtypes). Callers must treat `None` as "unknown", never as
/// "unequal".
pub fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if canonical_type(a) != canonical_type(b) {
        return None;
    }
    match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => Some(x.cmp(y)),
        (Bson::Int64(x), Bson::Int64(y)) => Some(x.cmp(y)),
        (Bson::Int32(x), Bson::Int64(y)) => Some(i64::from(*x).cmp(y)),
        (Bson::Int64(x), Bson::Int32(y)) => Some(x.cmp(&i64::from(*y))),
        (Bson::Decimal128(_), _) | (_, Bson::Decimal128(_)) => None,
        (Bson::Double(x), Bson::Double(y)) => x.partial_cmp(y),
        (Bson::Int32(i), Bson::Double(d)) => compare_int_double(i64::from(*i), *d),
        (Bson::Int64(i), Bson::Double(d)) => compare_int_double(*i, *d),
        (Bson::Double(d), Bson::Int32(i)) => {
            compare_int_double(i64::from(*i), *d).map(Ordering::reverse)
        }
        (Bson::Double(d), Bson::Int64(i)) => compare_int_double(*i, *d).map(Ordering::reverse),
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Symbol(x), Bson::Symbol(y)) => Some(x.cmp(y)),
        (Bson::String(x), Bson::Symbol(y)) | (Bson::Symbol(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => {
            Some(x.timestamp_millis().cmp(&y.timestamp_millis()))
        }
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            Some((x.time, x.increment).cmp(&(y.time, y.increment)))
        }
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.bytes().cmp(&y.bytes())),
        (Bson::Null, Bson::Null)
        | (Bson::Undefined, Bson::Undefined)
        | (Bson::MinKey, Bson::MinKey)
        | (Bson::MaxKey, Bson::MaxKey) => Some(Ordering::Equal),
        (x, y) if x == y => Some(Ordering::Equal),
        _ => None,
    }
}

/// Exact `i` vs `d`. Casting `i` to f64 would round above 2^53.
fn compare_int_double(i: i64, d: f64) -> Option<Ordering> {
    // 2^63, the first double past i64::MAX.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if d.is_nan() {
        return None;
    }
    if d >= LIMIT {
        return Some(Ordering::Less);
    }
    if d < -LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = d.trunc() as i64;
    Some(i.cmp(&whole).then_with(|| {
        let fract = d.fract();
        if fract > 0.0 {
            Ordering::Less
        } else if fract < 0.0 {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }))
}
