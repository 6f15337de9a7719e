//! Airspace zone classification.
//!
//! A [`ZoneGeometryMap`] holds the GREEN/AMBER/RED features supplied by the
//! airspace data source; [`ZoneClassifier`] answers the containment and
//! intersection questions the validator and decision engine ask.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::geometry::{self, ZonePolygon};
use crate::models::{FlightArea, GeoPoint};

/// Airspace classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneType {
    /// Pre-cleared airspace
    Green,
    /// Flights need a human review
    Amber,
    /// Prohibited airspace
    Red,
}

impl ZoneType {
    pub const ALL: [ZoneType; 3] = [ZoneType::Green, ZoneType::Amber, ZoneType::Red];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Amber => "AMBER",
            Self::Red => "RED",
        }
    }
}

impl fmt::Display for ZoneType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ZoneType {
    type Err = ZoneDataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GREEN" => Ok(Self::Green),
            "AMBER" => Ok(Self::Amber),
            "RED" => Ok(Self::Red),
            _ => Err(ZoneDataError::UnknownZoneType(s.to_string())),
        }
    }
}

/// Errors raised while reading zone data.
#[derive(Debug, thiserror::Error)]
pub enum ZoneDataError {
    #[error("invalid zone JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("GeoJSON object without a \"type\" member")]
    MissingType,
    #[error("GeoJSON {object} without a \"{member}\" array")]
    MissingMember {
        object: &'static str,
        member: &'static str,
    },
    #[error("malformed {geometry} coordinates: {reason}")]
    InvalidCoordinates {
        geometry: &'static str,
        reason: String,
    },
    #[error("unknown zone type {0:?}")]
    UnknownZoneType(String),
}

/// Counters collected while parsing GeoJSON zone data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub polygons: usize,
    /// Rings with fewer than 3 distinct vertices (skipped)
    pub degenerate_rings: usize,
    /// Points, lines and other non-areal geometries (skipped)
    pub unsupported_geometries: usize,
    /// Features with a null geometry
    pub empty_features: usize,
}

impl ParseReport {
    pub fn skipped(&self) -> usize {
        self.degenerate_rings + self.unsupported_geometries + self.empty_features
    }

    fn merge(&mut self, other: ParseReport) {
        self.polygons += other.polygons;
        self.degenerate_rings += other.degenerate_rings;
        self.unsupported_geometries += other.unsupported_geometries;
        self.empty_features += other.empty_features;
    }
}

/// Zone features keyed by classification. Zones of different types may overlap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneGeometryMap {
    zones: BTreeMap<ZoneType, Vec<ZonePolygon>>,
}

impl ZoneGeometryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, zone: ZoneType, feature: ZonePolygon) -> Self {
        self.insert(zone, feature);
        self
    }

    pub fn insert(&mut self, zone: ZoneType, feature: ZonePolygon) {
        self.zones.entry(zone).or_default().push(feature);
    }

    /// Features of one classification; empty when the source had none.
    pub fn features(&self, zone: ZoneType) -> &[ZonePolygon] {
        self.zones.get(&zone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn feature_count(&self, zone: ZoneType) -> usize {
        self.features(zone).len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.values().all(Vec::is_empty)
    }

    /// Parse a GeoJSON document into a single-classification map.
    pub fn from_geojson_str(
        zone: ZoneType,
        raw: &str,
    ) -> Result<(Self, ParseReport), ZoneDataError> {
        let mut map = Self::new();
        let report = map.insert_geojson(zone, raw)?;
        Ok((map, report))
    }

    /// Add every polygon of a GeoJSON document under `zone`.
    ///
    /// Accepts FeatureCollection, Feature, GeometryCollection, Polygon and
    /// MultiPolygon. Positions are `[longitude, latitude]`.
    pub fn insert_geojson(&mut self, zone: ZoneType, raw: &str) -> Result<ParseReport, ZoneDataError> {
        let value: Value = serde_json::from_str(raw)?;
        self.insert_geojson_value(zone, &value)
    }

    pub fn insert_geojson_value(
        &mut self,
        zone: ZoneType,
        value: &Value,
    ) -> Result<ParseReport, ZoneDataError> {
        let mut features = Vec::new();
        let report = collect_polygons(value, &mut features)?;
        self.zones.entry(zone).or_default().extend(features);
        Ok(report)
    }
}

fn collect_polygons(value: &Value, out: &mut Vec<ZonePolygon>) -> Result<ParseReport, ZoneDataError> {
    let mut report = ParseReport::default();
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ZoneDataError::MissingType)?;

    match kind {
        "FeatureCollection" => {
            let features = member_array(value, "FeatureCollection", "features")?;
            for feature in features {
                report.merge(collect_polygons(feature, out)?);
            }
        }
        "Feature" => match value.get("geometry") {
            Some(geometry) if !geometry.is_null() => {
                report.merge(collect_polygons(geometry, out)?);
            }
            _ => report.empty_features += 1,
        },
        "GeometryCollection" => {
            let geometries = member_array(value, "GeometryCollection", "geometries")?;
            for geometry in geometries {
                report.merge(collect_polygons(geometry, out)?);
            }
        }
        "Polygon" => {
            let rings = coordinates_array(value, "Polygon")?;
            push_polygon(rings, "Polygon", out, &mut report)?;
        }
        "MultiPolygon" => {
            for polygon in coordinates_array(value, "MultiPolygon")? {
                let rings = polygon.as_array().ok_or_else(|| ZoneDataError::InvalidCoordinates {
                    geometry: "MultiPolygon",
                    reason: "polygon is not an array of rings".to_string(),
                })?;
                push_polygon(rings, "MultiPolygon", out, &mut report)?;
            }
        }
        _ => report.unsupported_geometries += 1,
    }

    Ok(report)
}

fn member_array<'a>(
    value: &'a Value,
    object: &'static str,
    member: &'static str,
) -> Result<&'a [Value], ZoneDataError> {
    value
        .get(member)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or(ZoneDataError::MissingMember { object, member })
}

fn coordinates_array<'a>(
    geometry: &'a Value,
    kind: &'static str,
) -> Result<&'a [Value], ZoneDataError> {
    geometry
        .get("coordinates")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .ok_or_else(|| ZoneDataError::InvalidCoordinates {
            geometry: kind,
            reason: "missing coordinates array".to_string(),
        })
}

fn push_polygon(
    rings: &[Value],
    kind: &'static str,
    out: &mut Vec<ZonePolygon>,
    report: &mut ParseReport,
) -> Result<(), ZoneDataError> {
    let Some((exterior, holes)) = rings.split_first() else {
        report.degenerate_rings += 1;
        return Ok(());
    };

    let exterior = parse_ring(exterior, kind)?;
    if !is_areal_ring(&exterior) {
        report.degenerate_rings += 1;
        return Ok(());
    }

    let mut polygon = ZonePolygon::new(exterior);
    for hole in holes {
        let hole = parse_ring(hole, kind)?;
        if is_areal_ring(&hole) {
            polygon = polygon.with_hole(hole);
        } else {
            report.degenerate_rings += 1;
        }
    }

    out.push(polygon);
    report.polygons += 1;
    Ok(())
}

fn parse_ring(ring: &Value, kind: &'static str) -> Result<Vec<GeoPoint>, ZoneDataError> {
    let positions = ring.as_array().ok_or_else(|| ZoneDataError::InvalidCoordinates {
        geometry: kind,
        reason: "ring is not an array of positions".to_string(),
    })?;

    positions
        .iter()
        .map(|position| {
            parse_position(position).ok_or_else(|| ZoneDataError::InvalidCoordinates {
                geometry: kind,
                reason: format!("bad position {position}"),
            })
        })
        .collect()
}

fn parse_position(value: &Value) -> Option<GeoPoint> {
    let arr = value.as_array()?;
    if arr.len() < 2 {
        return None;
    }
    let lon = arr[0].as_f64()?;
    let lat = arr[1].as_f64()?;
    if !lon.is_finite() || !lat.is_finite() {
        return None;
    }
    Some(GeoPoint::new(lat, lon))
}

fn is_areal_ring(ring: &[GeoPoint]) -> bool {
    let ring = geometry::normalize_ring(ring.to_vec());
    ring.len() >= 3 && geometry::signed_area(&ring).abs() > geometry::MIN_AREA_DEG2
}

/// Answers zone questions about a flight area against one zone map snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ZoneClassifier<'a> {
    map: &'a ZoneGeometryMap,
}

impl<'a> ZoneClassifier<'a> {
    pub fn new(map: &'a ZoneGeometryMap) -> Self {
        Self { map }
    }

    /// Whole area inside the union of `zone` features. False without zone data.
    pub fn is_fully_within(&self, area: &FlightArea, zone: ZoneType) -> bool {
        geometry::within(area, self.map.features(zone))
    }

    /// Area touches any `zone` feature. False without zone data.
    pub fn intersects_zone(&self, area: &FlightArea, zone: ZoneType) -> bool {
        geometry::intersects(area, self.map.features(zone))
    }

    /// Every zone answer at once, for reporting.
    pub fn classify(&self, area: &FlightArea) -> ZoneReport {
        ZoneReport {
            within_green: self.is_fully_within(area, ZoneType::Green),
            intersects_green: self.intersects_zone(area, ZoneType::Green),
            intersects_amber: self.intersects_zone(area, ZoneType::Amber),
            intersects_red: self.intersects_zone(area, ZoneType::Red),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneReport {
    pub within_green: bool,
    pub intersects_green: bool,
    pub intersects_amber: bool,
    pub intersects_red: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_FEATURES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"name": "west"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[0.0, 0.0], [5.0, 0.0], [5.0, 5.0], [0.0, 5.0], [0.0, 0.0]]]
                }
            },
            {
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[10.0, 10.0], [12.0, 10.0], [12.0, 12.0], [10.0, 12.0], [10.0, 10.0]]],
                        [[[20.0, 20.0], [22.0, 20.0], [22.0, 22.0], [20.0, 20.0]]]
                    ]
                }
            },
            {"type": "Feature", "properties": {}, "geometry": null},
            {"type": "Feature", "properties": {}, "geometry": {"type": "Point", "coordinates": [1.0, 1.0]}},
            {
                "type": "Feature",
                "properties": {},
                "geometry": {"type": "Polygon", "coordinates": [[[1.0, 1.0], [2.0, 2.0], [1.0, 1.0]]]}
            }
        ]
    }"#;

    fn parse(zone: ZoneType, raw: &str) -> (ZoneGeometryMap, ParseReport) {
        ZoneGeometryMap::from_geojson_str(zone, raw).expect("valid zone GeoJSON")
    }

    #[test]
    fn parses_feature_collection_and_counts_skips() {
        let (map, report) = parse(ZoneType::Green, SQUARE_FEATURES);
        assert_eq!(map.feature_count(ZoneType::Green), 3);
        assert_eq!(map.feature_count(ZoneType::Red), 0);
        assert_eq!(report.polygons, 3);
        assert_eq!(report.empty_features, 1);
        assert_eq!(report.unsupported_geometries, 1);
        assert_eq!(report.degenerate_rings, 1);
        assert_eq!(report.skipped(), 3);
    }

    #[test]
    fn geojson_positions_are_lon_lat() {
        let raw = r#"{"type":"Polygon","coordinates":[[[70.0,10.0],[71.0,10.0],[71.0,11.0],[70.0,11.0]]]}"#;
        let (map, _) = ZoneGeometryMap::from_geojson_str(ZoneType::Red, raw).unwrap();
        let feature = &map.features(ZoneType::Red)[0];
        assert_eq!(feature.exterior[0], GeoPoint::new(10.0, 70.0));
        assert!(feature.contains_point(GeoPoint::new(10.5, 70.5)));
        assert!(!feature.contains_point(GeoPoint::new(70.5, 10.5)));
    }

    #[test]
    fn polygon_holes_are_kept() {
        let raw = r#"{"type":"Polygon","coordinates":[
            [[0.0,0.0],[10.0,0.0],[10.0,10.0],[0.0,10.0],[0.0,0.0]],
            [[4.0,4.0],[6.0,4.0],[6.0,6.0],[4.0,6.0],[4.0,4.0]]
        ]}"#;
        let (map, report) = ZoneGeometryMap::from_geojson_str(ZoneType::Amber, raw).unwrap();
        assert_eq!(report.polygons, 1);
        assert!(!map.features(ZoneType::Amber)[0].contains_point(GeoPoint::new(5.0, 5.0)));
        assert!(map.features(ZoneType::Amber)[0].contains_point(GeoPoint::new(2.0, 2.0)));
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(matches!(
            ZoneGeometryMap::from_geojson_str(ZoneType::Red, "{not json"),
            Err(ZoneDataError::Json(_))
        ));
        assert!(matches!(
            ZoneGeometryMap::from_geojson_str(ZoneType::Red, r#"{"features": []}"#),
            Err(ZoneDataError::MissingType)
        ));
        assert!(matches!(
            ZoneGeometryMap::from_geojson_str(
                ZoneType::Red,
                r#"{"type":"Polygon","coordinates":[[[0.0,"x"],[1.0,0.0],[1.0,1.0]]]}"#
            ),
            Err(ZoneDataError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn collections_without_members_are_errors() {
        assert!(matches!(
            ZoneGeometryMap::from_geojson_str(ZoneType::Green, r#"{"type":"FeatureCollection"}"#),
            Err(ZoneDataError::MissingMember {
                object: "FeatureCollection",
                member: "features",
            })
        ));
        assert!(matches!(
            ZoneGeometryMap::from_geojson_str(
                ZoneType::Green,
                r#"{"type":"GeometryCollection","geometries":{}}"#
            ),
            Err(ZoneDataError::MissingMember {
                object: "GeometryCollection",
                member: "geometries",
            })
        ));

        let (map, report) = ZoneGeometryMap::from_geojson_str(
            ZoneType::Green,
            r#"{"type":"FeatureCollection","features":[]}"#,
        )
        .unwrap();
        assert_eq!(map.feature_count(ZoneType::Green), 0);
        assert_eq!(report.skipped(), 0);
    }

    #[test]
    fn classifier_treats_missing_zone_as_absent() {
        let map = ZoneGeometryMap::new().with_zone(
            ZoneType::Green,
            ZonePolygon::from_lat_lon(&[(0.0, 0.0), (0.0, 10.0), (10.0, 10.0), (10.0, 0.0)]),
        );
        let area =
            FlightArea::from_lat_lon(&[(1.0, 1.0), (1.0, 2.0), (2.0, 2.0), (2.0, 1.0)]).unwrap();
        let classifier = ZoneClassifier::new(&map);

        assert!(classifier.is_fully_within(&area, ZoneType::Green));
        assert!(!classifier.intersects_zone(&area, ZoneType::Red));
        assert!(!classifier.intersects_zone(&area, ZoneType::Amber));
        assert!(!classifier.is_fully_within(&area, ZoneType::Red));

        let report = classifier.classify(&area);
        assert!(report.within_green && report.intersects_green);
        assert!(!report.intersects_red && !report.intersects_amber);
    }

    #[test]
    fn zone_type_parses_case_insensitively() {
        assert_eq!("amber".parse::<ZoneType>().unwrap(), ZoneType::Amber);
        assert_eq!(" RED ".parse::<ZoneType>().unwrap(), ZoneType::Red);
        assert!("blue".parse::<ZoneType>().is_err());
    }
}
