//! Geospatial point storage and `$near` query construction.
//!
//! Points are stored as GeoJSON (`{ "type": "Point", "coordinates": [lng, lat] }`) and
//! exposed to API consumers as `{ "latitude": .., "longitude": .. }` through
//! [`ObjectLocation::to_view`].
//!
//! Raw request values are parsed and range checked by [`parse_geo_location`] and
//! [`LocationParameters::from_raw`]; failures name the offending parameter.

use bson::{Document, doc};
use serde::{Deserialize, Serialize};

use crate::error::{DocumentStoreError, DocumentStoreResult};

pub const LONGITUDE_KEY: &str = "longitude";
pub const LATITUDE_KEY: &str = "latitude";
pub const MIN_DISTANCE_KEY: &str = "min_distance";
pub const MAX_DISTANCE_KEY: &str = "max_distance";

/// Upper bound accepted for distances, in metres.
pub const MAX_DISTANCE_LIMIT: i64 = 32_000_000_000;

const GEOJSON_POINT: &str = "Point";

/// A GeoJSON point as stored in a document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ObjectLocation {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`, in GeoJSON order.
    pub coordinates: [f64; 2],
}

impl ObjectLocation {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            kind: GEOJSON_POINT.to_string(),
            coordinates: [longitude, latitude],
        }
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn to_view(&self) -> LocationView {
        LocationView {
            latitude: self.latitude(),
            longitude: self.longitude(),
        }
    }
}

/// Client-facing shape of a point.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct LocationView {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&ObjectLocation> for LocationView {
    fn from(location: &ObjectLocation) -> Self {
        location.to_view()
    }
}

/// Unparsed location parameters as they arrive from a request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawLocation<'a> {
    pub longitude: Option<&'a str>,
    pub latitude: Option<&'a str>,
    pub min_distance: Option<&'a str>,
    pub max_distance: Option<&'a str>,
}

/// A validated proximity search: a centre point and a distance band in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationParameters {
    pub latitude: f64,
    pub longitude: f64,
    pub min_distance: i64,
    pub max_distance: i64,
}

impl LocationParameters {
    /// Parses and validates raw parameters.
    ///
    /// Returns `Ok(None)` when either coordinate is absent. `min_distance` defaults to 0 and
    /// `max_distance` to `default_max_distance`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidLocation`] for unparsable or out of range values
    /// and when the minimum distance exceeds the maximum.
    pub fn from_raw(raw: RawLocation<'_>, default_max_distance: i64) -> DocumentStoreResult<Option<Self>> {
        let (Some(longitude_raw), Some(latitude_raw)) = (raw.longitude, raw.latitude) else {
            return Ok(None);
        };

        let (longitude, latitude) = parse_geo_location(longitude_raw, latitude_raw)?;

        let max_distance = match raw.max_distance {
            Some(value) => parse_distance(value, MAX_DISTANCE_KEY)?,
            None => default_max_distance,
        };
        let min_distance = match raw.min_distance {
            Some(value) => parse_distance(value, MIN_DISTANCE_KEY)?,
            None => 0,
        };

        if min_distance > max_distance {
            return Err(DocumentStoreError::invalid_location(
                MIN_DISTANCE_KEY,
                "min distance is greater than max distance",
            ));
        }

        Ok(Some(Self { latitude, longitude, min_distance, max_distance }))
    }

    /// The `$near` operator document for this search, to be placed under the location
    /// field of a filter.
    pub fn to_near_query(&self) -> Document {
        doc! {
            "$near": {
                "$geometry": {
                    "type": GEOJSON_POINT,
                    "coordinates": [self.longitude, self.latitude],
                },
                "$maxDistance": self.max_distance,
                "$minDistance": self.min_distance,
            }
        }
    }

    /// A complete filter matching documents whose `field` lies within the distance band.
    pub fn to_filter(&self, field: impl Into<String>) -> Document {
        let mut filter = Document::new();
        filter.insert(field.into(), self.to_near_query());
        filter
    }
}

/// Parses a longitude/latitude pair and checks both are on the globe.
pub fn parse_geo_location(longitude_raw: &str, latitude_raw: &str) -> DocumentStoreResult<(f64, f64)> {
    let longitude = parse_coordinate(longitude_raw, LONGITUDE_KEY, 180.0)?;
    let latitude = parse_coordinate(latitude_raw, LATITUDE_KEY, 90.0)?;

    Ok((longitude, latitude))
}

fn parse_coordinate(raw: &str, key: &str, bound: f64) -> DocumentStoreResult<f64> {
    let value = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| DocumentStoreError::invalid_location(key, "INVALID_FLOAT"))?;

    if !(-bound..=bound).contains(&value) {
        return Err(DocumentStoreError::invalid_location(
            key,
            format!("must be between {} and {}", -bound, bound),
        ));
    }

    Ok(value)
}

fn parse_distance(raw: &str, key: &str) -> DocumentStoreResult<i64> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| DocumentStoreError::invalid_location(key, "INVALID_INT"))?;

    if !(0..=MAX_DISTANCE_LIMIT).contains(&value) {
        return Err(DocumentStoreError::invalid_location(
            key,
            format!("must be between 0 and {MAX_DISTANCE_LIMIT}"),
        ));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw<'a>(lng: &'a str, lat: &'a str) -> RawLocation<'a> {
        RawLocation {
            longitude: Some(lng),
            latitude: Some(lat),
            ..RawLocation::default()
        }
    }

    fn invalid_key(result: DocumentStoreResult<impl std::fmt::Debug>) -> String {
        match result {
            Err(DocumentStoreError::InvalidLocation { key, .. }) => key,
            other => panic!("expected InvalidLocation, got {other:?}"),
        }
    }

    #[test]
    fn stores_geojson_and_presents_lat_lng() {
        let location = ObjectLocation::new(52.52, 13.405);

        assert_eq!(
            serde_json::to_value(&location).unwrap(),
            json!({ "type": "Point", "coordinates": [13.405, 52.52] })
        );
        assert_eq!(
            serde_json::to_value(location.to_view()).unwrap(),
            json!({ "latitude": 52.52, "longitude": 13.405 })
        );
    }

    #[test]
    fn missing_coordinates_mean_no_search() {
        let params = RawLocation { longitude: Some("10"), ..RawLocation::default() };

        assert_eq!(LocationParameters::from_raw(params, 1000).unwrap(), None);
        assert_eq!(LocationParameters::from_raw(RawLocation::default(), 1000).unwrap(), None);
    }

    #[test]
    fn applies_distance_defaults() {
        let params = LocationParameters::from_raw(raw("13.4", "52.5"), 5000).unwrap().unwrap();

        assert_eq!(params.longitude, 13.4);
        assert_eq!(params.latitude, 52.5);
        assert_eq!(params.min_distance, 0);
        assert_eq!(params.max_distance, 5000);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert_eq!(invalid_key(parse_geo_location("181", "0")), LONGITUDE_KEY);
        assert_eq!(invalid_key(parse_geo_location("0", "-90.5")), LATITUDE_KEY);
        assert_eq!(invalid_key(parse_geo_location("east", "0")), LONGITUDE_KEY);
        assert!(parse_geo_location("-180", "90").is_ok());
    }

    #[test]
    fn rejects_bad_distances() {
        let mut params = raw("0", "0");
        params.max_distance = Some("-1");
        assert_eq!(invalid_key(LocationParameters::from_raw(params, 10)), MAX_DISTANCE_KEY);

        params.max_distance = Some("100");
        params.min_distance = Some("200");
        assert_eq!(invalid_key(LocationParameters::from_raw(params, 10)), MIN_DISTANCE_KEY);

        params.min_distance = Some("ten");
        assert_eq!(invalid_key(LocationParameters::from_raw(params, 10)), MIN_DISTANCE_KEY);
    }

    #[test]
    fn builds_near_query() {
        let params = LocationParameters {
            latitude: 1.5,
            longitude: 2.5,
            min_distance: 10,
            max_distance: 500,
        };

        assert_eq!(
            params.to_filter("location"),
            doc! {
                "location": {
                    "$near": {
                        "$geometry": { "type": "Point", "coordinates": [2.5, 1.5] },
                        "$maxDistance": 500_i64,
                        "$minDistance": 10_i64,
                    }
                }
            }
        );
    }
}
