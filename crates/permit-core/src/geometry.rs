//! Planar polygon predicates for flight areas against zone features.
//!
//! Latitude and longitude are treated as Euclidean coordinates
//! (x = longitude, y = latitude). Rings are implicitly closed: the edge from
//! the last vertex back to the first is always part of the ring.

use serde::{Deserialize, Serialize};

use crate::models::{FlightArea, GeoPoint};

/// Tolerance in degrees for boundary, touch and collinearity checks.
pub const BOUNDARY_EPS_DEG: f64 = 1e-9;

/// Polygons with less absolute area than this (square degrees) are degenerate.
pub const MIN_AREA_DEG2: f64 = 1e-12;

/// One polygon of a zone: an exterior ring with optional holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZonePolygon {
    pub exterior: Vec<GeoPoint>,
    #[serde(default)]
    pub holes: Vec<Vec<GeoPoint>>,
}

impl ZonePolygon {
    pub fn new(exterior: Vec<GeoPoint>) -> Self {
        Self {
            exterior: normalize_ring(exterior),
            holes: Vec::new(),
        }
    }

    /// Build from `(lat, lon)` pairs.
    pub fn from_lat_lon(pairs: &[(f64, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|(lat, lon)| GeoPoint::new(*lat, *lon))
                .collect(),
        )
    }

    pub fn with_hole(mut self, hole: Vec<GeoPoint>) -> Self {
        self.holes.push(normalize_ring(hole));
        self
    }

    /// Inside or on the boundary of the exterior and not strictly inside a hole.
    ///
    /// A point on a hole's edge is on the feature boundary and counts as
    /// contained.
    pub fn contains_point(&self, point: GeoPoint) -> bool {
        if !ring_contains(&self.exterior, point) {
            return false;
        }
        !self
            .holes
            .iter()
            .any(|hole| ring_contains_strictly(hole, point))
    }

    fn rings(&self) -> impl Iterator<Item = &[GeoPoint]> {
        std::iter::once(self.exterior.as_slice()).chain(self.holes.iter().map(Vec::as_slice))
    }
}

/// True iff the whole flight area lies inside the union of `features`.
///
/// Every vertex and every edge midpoint has to be inside (or on the boundary
/// of) at least one feature. The midpoints catch an area that straddles a
/// zone boundary with all of its vertices inside. A hole reaching into the
/// area's interior also fails the test, even when every sample point is
/// inside the exterior around it.
pub fn within(area: &FlightArea, features: &[ZonePolygon]) -> bool {
    if features.is_empty() {
        return false;
    }

    let ring = area.points();
    let vertices = ring.iter().copied();
    let midpoints = area.edges().map(|(a, b)| a.midpoint(&b));

    let sampled_inside = vertices
        .chain(midpoints)
        .all(|point| features.iter().any(|feature| feature.contains_point(point)));

    sampled_inside
        && !features
            .iter()
            .flat_map(|feature| feature.holes.iter())
            .any(|hole| hole_reaches_into(ring, hole))
}

/// A hole overlaps the ring's interior rather than just touching its boundary.
fn hole_reaches_into(ring: &[GeoPoint], hole: &[GeoPoint]) -> bool {
    let hole_inside = ring_edges(hole).any(|(a, b)| {
        ring_contains_strictly(ring, a) || ring_contains_strictly(ring, a.midpoint(&b))
    });

    hole_inside
        || ring_edges(ring)
            .any(|(a1, a2)| ring_edges(hole).any(|(b1, b2)| segments_cross_properly(a1, a2, b1, b2)))
}

/// True iff the flight area shares any point with any feature.
pub fn intersects(area: &FlightArea, features: &[ZonePolygon]) -> bool {
    features
        .iter()
        .any(|feature| intersects_feature(area.points(), feature))
}

fn intersects_feature(ring: &[GeoPoint], feature: &ZonePolygon) -> bool {
    // Area vertex inside the zone (covers area fully inside zone).
    if ring.iter().any(|point| feature.contains_point(*point)) {
        return true;
    }

    // Zone vertex inside the area (covers zone fully inside area).
    if feature
        .exterior
        .iter()
        .any(|point| ring_contains(ring, *point))
    {
        return true;
    }

    feature.rings().any(|zone_ring| rings_cross(ring, zone_ring))
}

fn rings_cross(a: &[GeoPoint], b: &[GeoPoint]) -> bool {
    ring_edges(a).any(|(a1, a2)| ring_edges(b).any(|(b1, b2)| segments_intersect(a1, a2, b1, b2)))
}

/// Point-in-ring test that treats the boundary as inside.
pub fn ring_contains(ring: &[GeoPoint], point: GeoPoint) -> bool {
    on_ring_boundary(ring, point) || ray_cast(ring, point)
}

fn ring_contains_strictly(ring: &[GeoPoint], point: GeoPoint) -> bool {
    !on_ring_boundary(ring, point) && ray_cast(ring, point)
}

/// Ray casting: count crossings of a ray towards +longitude.
fn ray_cast(ring: &[GeoPoint], point: GeoPoint) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = ring[i].latitude;
        let xi = ring[i].longitude;
        let yj = ring[j].latitude;
        let xj = ring[j].longitude;

        if ((yi > point.latitude) != (yj > point.latitude))
            && (point.longitude < (xj - xi) * (point.latitude - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}

fn on_ring_boundary(ring: &[GeoPoint], point: GeoPoint) -> bool {
    ring_edges(ring).any(|(a, b)| point_on_segment(point, a, b))
}

fn point_on_segment(point: GeoPoint, a: GeoPoint, b: GeoPoint) -> bool {
    let dx = b.longitude - a.longitude;
    let dy = b.latitude - a.latitude;
    let length = dx.hypot(dy);

    if length <= BOUNDARY_EPS_DEG {
        return (point.longitude - a.longitude).hypot(point.latitude - a.latitude)
            <= BOUNDARY_EPS_DEG;
    }

    // Perpendicular distance to the supporting line.
    let cross = dx * (point.latitude - a.latitude) - dy * (point.longitude - a.longitude);
    if cross.abs() / length > BOUNDARY_EPS_DEG {
        return false;
    }

    in_range(a.longitude, b.longitude, point.longitude)
        && in_range(a.latitude, b.latitude, point.latitude)
}

fn in_range(a: f64, b: f64, value: f64) -> bool {
    value >= a.min(b) - BOUNDARY_EPS_DEG && value <= a.max(b) + BOUNDARY_EPS_DEG
}

/// Segment intersection including touches and collinear overlaps.
pub(crate) fn segments_intersect(a1: GeoPoint, a2: GeoPoint, b1: GeoPoint, b2: GeoPoint) -> bool {
    fn orient(p: GeoPoint, q: GeoPoint, r: GeoPoint) -> f64 {
        (q.longitude - p.longitude) * (r.latitude - p.latitude)
            - (q.latitude - p.latitude) * (r.longitude - p.longitude)
    }

    let o1 = orient(a1, a2, b1);
    let o2 = orient(a1, a2, b2);
    let o3 = orient(b1, b2, a1);
    let o4 = orient(b1, b2, a2);

    if point_on_segment(b1, a1, a2)
        || point_on_segment(b2, a1, a2)
        || point_on_segment(a1, b1, b2)
        || point_on_segment(a2, b1, b2)
    {
        return true;
    }

    let a_crosses = (o1 > 0.0 && o2 < 0.0) || (o1 < 0.0 && o2 > 0.0);
    let b_crosses = (o3 > 0.0 && o4 < 0.0) || (o3 < 0.0 && o4 > 0.0);
    a_crosses && b_crosses
}

/// Segments cross at a single interior point of both; touches do not count.
fn segments_cross_properly(a1: GeoPoint, a2: GeoPoint, b1: GeoPoint, b2: GeoPoint) -> bool {
    if point_on_segment(b1, a1, a2)
        || point_on_segment(b2, a1, a2)
        || point_on_segment(a1, b1, b2)
        || point_on_segment(a2, b1, b2)
    {
        return false;
    }
    segments_intersect(a1, a2, b1, b2)
}

/// Edges of an implicitly closed ring.
pub fn ring_edges(ring: &[GeoPoint]) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
    let n = ring.len();
    let count = if n < 2 { 0 } else { n };
    (0..count).map(move |i| (ring[i], ring[(i + 1) % n]))
}

/// Drop consecutive repeated vertices and an explicit closing vertex.
pub fn normalize_ring(points: Vec<GeoPoint>) -> Vec<GeoPoint> {
    let mut ring: Vec<GeoPoint> = Vec::with_capacity(points.len());
    for point in points {
        if ring.last().is_some_and(|last| last.approx_eq(&point)) {
            continue;
        }
        ring.push(point);
    }
    while ring.len() > 1 && ring[0].approx_eq(&ring[ring.len() - 1]) {
        ring.pop();
    }
    ring
}

/// Shoelace area in square degrees; positive when counter-clockwise in (lon, lat).
pub fn signed_area(ring: &[GeoPoint]) -> f64 {
    ring_edges(ring)
        .map(|(a, b)| a.longitude * b.latitude - b.longitude * a.latitude)
        .sum::<f64>()
        / 2.0
}

/// First pair of non-adjacent edges that touch or cross, if any.
pub(crate) fn first_self_intersection(ring: &[GeoPoint]) -> Option<(usize, usize)> {
    let n = ring.len();
    if n < 4 {
        return None;
    }

    for i in 0..n {
        for j in (i + 2)..n {
            // First and last edges share the closing vertex.
            if i == 0 && j == n - 1 {
                continue;
            }
            let (a1, a2) = (ring[i], ring[(i + 1) % n]);
            let (b1, b2) = (ring[j], ring[(j + 1) % n]);
            if segments_intersect(a1, a2, b1, b2) {
                return Some((i, j));
            }
        }
    }
    None
}
