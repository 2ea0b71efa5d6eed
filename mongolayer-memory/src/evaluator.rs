//! Filter and update evaluation for in-memory documents.
//!
//! Filters are interpreted with MongoDB semantics for the operators the repositories
//! issue: implicit equality (including array membership), `$eq`, `$ne`, `$gt`, `$gte`,
//! `$lt`, `$lte`, `$in`, `$nin`, `$exists`, `$near`, and the `$and`, `$or` and `$nor`
//! combinators. Field names may be dotted paths. Unknown operators are rejected rather
//! than silently ignored.
//!
//! Updates support `$set`, `$unset` and `$inc`.

use std::{cmp::Ordering, collections::HashMap};

use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use mongolayer_core::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::{ID_FIELD, Sort, SortDirection},
};

/// Mean Earth radius used for `$near` distances, in metres.
const EARTH_RADIUS_METRES: f64 = 6_378_100.0;

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to f64 so that `1_i32 == 1.0_f64`, as in MongoDB.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(*value as f64),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(arr.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.bytes().partial_cmp(&b.bytes()),
            _ => None,
        }
    }
}

impl<'a> Comparable<'a> {
    /// Position in MongoDB's cross-type sort order.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Null => 0,
            Comparable::Number(_) => 1,
            Comparable::String(_) => 2,
            Comparable::Map(_) => 3,
            Comparable::Array(_) => 4,
            Comparable::ObjectId(_) => 5,
            Comparable::Bool(_) => 6,
            Comparable::DateTime(_) => 7,
        }
    }

    /// Total order used for sorting: by type rank first, then by value.
    fn sort_cmp(&self, other: &Self) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

/// Resolves a possibly dotted field path. Numeric segments index into arrays.
pub(crate) fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Bson::Document(nested) => nested.get(segment)?,
            Bson::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Returns whether `document` satisfies `filter`.
pub(crate) fn matches(document: &Document, filter: &Document) -> DocumentStoreResult<bool> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => {
                let mut all = true;
                for clause in clauses(key, condition)? {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let mut any = false;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            "$nor" => {
                let mut none = true;
                for clause in clauses(key, condition)? {
                    if matches(document, clause)? {
                        none = false;
                        break;
                    }
                }
                none
            }
            op if op.starts_with('$') => {
                return Err(unsupported("query operator", op));
            }
            field => matches_field(lookup(document, field), condition)?,
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(true)
}

fn clauses<'f>(operator: &str, condition: &'f Bson) -> DocumentStoreResult<Vec<&'f Document>> {
    let invalid = || DocumentStoreError::InvalidQuery(format!("{operator} expects an array of documents"));

    condition
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|clause| clause.as_document().ok_or_else(invalid))
        .collect()
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
    condition
        .as_document()
        .filter(|doc| doc.keys().next().is_some_and(|key| key.starts_with('$')))
}

fn matches_field(value: Option<&Bson>, condition: &Bson) -> DocumentStoreResult<bool> {
    let Some(operators) = is_operator_document(condition) else {
        return Ok(equals(value, condition));
    };

    for (op, operand) in operators {
        let matched = match op.as_str() {
            "$eq" => equals(value, operand),
            "$ne" => !equals(value, operand),
            "$gt" => compares(value, operand, |o| o == Ordering::Greater),
            "$gte" => compares(value, operand, |o| o != Ordering::Less),
            "$lt" => compares(value, operand, |o| o == Ordering::Less),
            "$lte" => compares(value, operand, |o| o != Ordering::Greater),
            "$in" => in_list(value, op, operand)?,
            "$nin" => !in_list(value, op, operand)?,
            "$exists" => value.is_some() == truthy(operand),
            "$near" => near(value, operand)?,
            other => return Err(unsupported("field operator", other)),
        };

        if !matched {
            return Ok(false);
        }
    }

    Ok(true)
}

/// MongoDB equality: a missing field equals null, and an array field matches when any
/// element (or the array as a whole) equals the operand.
fn equals(value: Option<&Bson>, operand: &Bson) -> bool {
    let expected = Comparable::from(operand);

    match value {
        None => expected == Comparable::Null,
        Some(Bson::Array(items)) if !matches!(operand, Bson::Array(_)) => {
            items.iter().any(|item| Comparable::from(item) == expected)
        }
        Some(actual) => Comparable::from(actual) == expected,
    }
}

fn compares(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    let bound = Comparable::from(operand);
    let check = |item: &Bson| {
        Comparable::from(item)
            .partial_cmp(&bound)
            .is_some_and(&accept)
    };

    match value {
        None => false,
        Some(Bson::Array(items)) => items.iter().any(check),
        Some(actual) => check(actual),
    }
}

fn in_list(value: Option<&Bson>, op: &str, operand: &Bson) -> DocumentStoreResult<bool> {
    let candidates = operand
        .as_array()
        .ok_or_else(|| DocumentStoreError::InvalidQuery(format!("{op} expects an array")))?;

    Ok(candidates.iter().any(|candidate| equals(value, candidate)))
}

fn truthy(operand: &Bson) -> bool {
    match operand {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        _ => true,
    }
}

fn near(value: Option<&Bson>, operand: &Bson) -> DocumentStoreResult<bool> {
    let invalid = |reason: &str| DocumentStoreError::InvalidQuery(format!("$near: {reason}"));

    let params = operand.as_document().ok_or_else(|| invalid("expected a document"))?;
    let geometry = params
        .get("$geometry")
        .and_then(Bson::as_document)
        .ok_or_else(|| invalid("missing $geometry"))?;
    let (centre_lng, centre_lat) = point(geometry).ok_or_else(|| invalid("$geometry is not a point"))?;

    let max_distance = params.get("$maxDistance").and_then(number).unwrap_or(f64::INFINITY);
    let min_distance = params.get("$minDistance").and_then(number).unwrap_or(0.0);

    let Some((lng, lat)) = value.and_then(stored_point) else {
        return Ok(false);
    };

    let distance = haversine_metres(centre_lat, centre_lng, lat, lng);
    Ok(distance >= min_distance && distance <= max_distance)
}

/// Reads a stored location: a GeoJSON point or a legacy `[lng, lat]` pair.
fn stored_point(value: &Bson) -> Option<(f64, f64)> {
    match value {
        Bson::Document(doc) => point(doc),
        Bson::Array(pair) => pair_of(pair),
        _ => None,
    }
}

fn point(geometry: &Document) -> Option<(f64, f64)> {
    pair_of(geometry.get("coordinates")?.as_array()?)
}

fn pair_of(pair: &[Bson]) -> Option<(f64, f64)> {
    match pair {
        [lng, lat] => Some((number(lng)?, number(lat)?)),
        _ => None,
    }
}

fn number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(*n as f64),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

pub(crate) fn haversine_metres(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METRES * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Compares two documents by a sort specification. Missing fields sort as null.
pub(crate) fn compare_by(a: &Document, b: &Document, sort: &[Sort]) -> Ordering {
    for key in sort {
        let left = lookup(a, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);
        let right = lookup(b, &key.field).map(Comparable::from).unwrap_or(Comparable::Null);

        let ordering = match key.direction {
            SortDirection::Asc => left.sort_cmp(&right),
            SortDirection::Desc => right.sort_cmp(&left),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

/// Parses a `{ field: 1 | -1 }` sort document.
pub(crate) fn parse_sort(sort: &Document) -> DocumentStoreResult<Vec<Sort>> {
    sort.iter()
        .map(|(field, direction)| match number(direction) {
            Some(d) if d > 0.0 => Ok(Sort::asc(field.clone())),
            Some(d) if d < 0.0 => Ok(Sort::desc(field.clone())),
            _ => Err(DocumentStoreError::InvalidQuery(format!(
                "sort direction for {field} must be 1 or -1"
            ))),
        })
        .collect()
}

/// Applies an update-operator document to `document` in place.
///
/// Returns whether the document changed.
pub(crate) fn apply_update(document: &mut Document, update: &Document) -> DocumentStoreResult<bool> {
    if update.is_empty() {
        return Err(DocumentStoreError::InvalidQuery("update document is empty".to_string()));
    }

    let before = document.clone();

    for (op, fields) in update {
        let fields = fields.as_document().ok_or_else(|| {
            DocumentStoreError::InvalidQuery(format!("{op} expects a document of fields"))
        })?;

        match op.as_str() {
            "$set" => {
                for (path, value) in fields {
                    if path == ID_FIELD && document.get(ID_FIELD) != Some(value) {
                        return Err(DocumentStoreError::InvalidQuery(
                            "the _id field is immutable".to_string(),
                        ));
                    }
                    set_path(document, path, value.clone())?;
                }
            }
            "$unset" => {
                for (path, _) in fields {
                    unset_path(document, path);
                }
            }
            "$inc" => {
                for (path, delta) in fields {
                    let current = lookup(document, path).cloned();
                    set_path(document, path, increment(path, current, delta)?)?;
                }
            }
            other if other.starts_with('$') => return Err(unsupported("update operator", other)),
            _ => {
                return Err(DocumentStoreError::InvalidQuery(
                    "update document must contain only update operators".to_string(),
                ));
            }
        }
    }

    Ok(*document != before)
}

fn increment(path: &str, current: Option<Bson>, delta: &Bson) -> DocumentStoreResult<Bson> {
    let not_numeric = || DocumentStoreError::InvalidQuery(format!("cannot $inc non-numeric field {path}"));

    let overflow = || DocumentStoreError::InvalidQuery(format!("$inc on {path} overflows a 64-bit integer"));
    let wide = |a: i64, b: i64| a.checked_add(b).map(Bson::Int64).ok_or_else(overflow);

    match (current.unwrap_or(Bson::Int32(0)), delta) {
        (Bson::Int32(a), Bson::Int32(b)) => Ok(a.checked_add(*b).map(Bson::Int32).unwrap_or(Bson::Int64(a as i64 + *b as i64))),
        (Bson::Int32(a), Bson::Int64(b)) => wide(a as i64, *b),
        (Bson::Int64(a), Bson::Int32(b)) => wide(a, *b as i64),
        (Bson::Int64(a), Bson::Int64(b)) => wide(a, *b),
        (current, delta) => Ok(Bson::Double(number(&current).ok_or_else(not_numeric)? + number(delta).ok_or_else(not_numeric)?)),
    }
}

fn set_path(document: &mut Document, path: &str, value: Bson) -> DocumentStoreResult<()> {
    match path.split_once('.') {
        None => {
            document.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !document.contains_key(head) {
                document.insert(head, Document::new());
            }
            match document.get_mut(head) {
                Some(Bson::Document(nested)) => set_path(nested, rest, value),
                _ => Err(DocumentStoreError::InvalidQuery(format!(
                    "cannot set {path}: {head} is not a document"
                ))),
            }
        }
    }
}

fn unset_path(document: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            document.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(nested)) = document.get_mut(head) {
                unset_path(nested, rest);
            }
        }
    }
}

fn unsupported(kind: &str, op: &str) -> DocumentStoreError {
    DocumentStoreError::InvalidQuery(format!("unsupported {kind} {op}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn sample() -> Document {
        doc! {
            "_id": ObjectId::parse_str("65a000000000000000000001").unwrap(),
            "name": "Alice",
            "age": 30,
            "tags": ["admin", "staff"],
            "address": { "city": "Oslo" },
            "location": { "type": "Point", "coordinates": [10.75, 59.91] },
        }
    }

    fn check(filter: Document) -> bool {
        matches(&sample(), &filter).unwrap()
    }

    #[test]
    fn implicit_equality_and_membership() {
        assert!(check(doc! { "name": "Alice" }));
        assert!(check(doc! { "age": 30.0 }));
        assert!(check(doc! { "tags": "staff" }));
        assert!(check(doc! { "address.city": "Oslo" }));
        assert!(check(doc! { "missing": Bson::Null }));
        assert!(!check(doc! { "name": "Bob" }));
        assert!(check(doc! {}));
    }

    #[test]
    fn comparison_operators() {
        assert!(check(doc! { "age": { "$gt": 20, "$lte": 30 } }));
        assert!(!check(doc! { "age": { "$lt": 30 } }));
        assert!(!check(doc! { "name": { "$gt": 5 } }));
        assert!(check(doc! { "_id": { "$lt": ObjectId::parse_str("65a000000000000000000002").unwrap() } }));
        assert!(check(doc! { "name": { "$ne": "Bob" } }));
    }

    #[test]
    fn set_operators() {
        assert!(check(doc! { "name": { "$in": ["Bob", "Alice"] } }));
        assert!(check(doc! { "tags": { "$in": ["admin"] } }));
        assert!(check(doc! { "name": { "$nin": ["Bob"] } }));
        assert!(check(doc! { "age": { "$exists": true }, "email": { "$exists": false } }));
    }

    #[test]
    fn combinators() {
        assert!(check(doc! { "$or": [{ "name": "Bob" }, { "age": 30 }] }));
        assert!(!check(doc! { "$and": [{ "name": "Alice" }, { "age": 31 }] }));
        assert!(check(doc! { "$nor": [{ "name": "Bob" }] }));
    }

    #[test]
    fn unknown_operators_are_rejected() {
        assert!(matches(&sample(), &doc! { "name": { "$regex": "^A" } }).is_err());
        assert!(matches(&sample(), &doc! { "$where": "true" }).is_err());
    }

    #[test]
    fn near_filters_by_distance_band() {
        let near = |min: i64, max: i64| {
            doc! { "location": { "$near": {
                "$geometry": { "type": "Point", "coordinates": [10.76, 59.91] },
                "$minDistance": min,
                "$maxDistance": max,
            } } }
        };

        // roughly 560 m apart
        assert!(check(near(0, 1_000)));
        assert!(!check(near(0, 100)));
        assert!(!check(near(1_000, 5_000)));
    }

    #[test]
    fn haversine_known_distance() {
        // London to Paris is about 344 km
        let d = haversine_metres(51.5074, -0.1278, 48.8566, 2.3522);
        assert!((d - 344_000.0).abs() < 2_000.0, "{d}");
    }

    #[test]
    fn sorts_across_types_and_fields() {
        let mut docs = vec![
            doc! { "n": 2, "s": "b" },
            doc! { "s": "z" },
            doc! { "n": 2, "s": "a" },
            doc! { "n": 1 },
        ];
        docs.sort_by(|a, b| compare_by(a, b, &[Sort::desc("n"), Sort::asc("s")]));

        assert_eq!(
            docs,
            vec![
                doc! { "n": 2, "s": "a" },
                doc! { "n": 2, "s": "b" },
                doc! { "n": 1 },
                doc! { "s": "z" },
            ]
        );
    }

    #[test]
    fn parses_sort_documents() {
        let sort = parse_sort(&doc! { "_id": -1, "name": 1 }).unwrap();
        assert_eq!(sort, vec![Sort::desc("_id"), Sort::asc("name")]);
        assert!(parse_sort(&doc! { "name": "up" }).is_err());
    }

    #[test]
    fn applies_update_operators() {
        let mut document = sample();

        let changed = apply_update(
            &mut document,
            &doc! {
                "$set": { "name": "Alicia", "address.zip": "0150" },
                "$inc": { "age": 1, "visits": 2 },
                "$unset": { "tags": "" },
            },
        )
        .unwrap();

        assert!(changed);
        assert_eq!(document.get_str("name").unwrap(), "Alicia");
        assert_eq!(document.get_i32("age").unwrap(), 31);
        assert_eq!(document.get_i32("visits").unwrap(), 2);
        assert_eq!(lookup(&document, "address.zip"), Some(&Bson::String("0150".into())));
        assert!(!document.contains_key("tags"));
    }

    #[test]
    fn unchanged_values_report_no_modification() {
        let mut document = sample();
        assert!(!apply_update(&mut document, &doc! { "$set": { "name": "Alice" } }).unwrap());
    }

    #[test]
    fn rejects_replacement_and_id_changes() {
        let mut document = sample();
        assert!(apply_update(&mut document, &doc! { "name": "Bob" }).is_err());
        assert!(apply_update(&mut document, &doc! { "$set": { "_id": ObjectId::new() } }).is_err());
        assert!(apply_update(&mut document, &doc! { "$inc": { "name": 1 } }).is_err());
    }

    #[test]
    fn inc_widens_int32_and_rejects_int64_overflow() {
        let mut document = doc! { "small": i32::MAX, "big": i64::MAX };

        apply_update(&mut document, &doc! { "$inc": { "small": 1 } }).unwrap();
        assert_eq!(document.get_i64("small").unwrap(), i32::MAX as i64 + 1);

        for delta in [Bson::Int32(1), Bson::Int64(1)] {
            let err = apply_update(&mut document, &doc! { "$inc": { "big": delta } }).unwrap_err();
            assert!(matches!(err, DocumentStoreError::InvalidQuery(_)));
        }
        assert_eq!(document.get_i64("big").unwrap(), i64::MAX);

        let mut document = doc! { "n": i64::MIN };
        assert!(apply_update(&mut document, &doc! { "$inc": { "n": -1_i32 } }).is_err());
    }
}
