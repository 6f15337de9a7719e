//! Core data models for drone permission applications.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry;

/// Maximum length of free-text application fields.
pub const MAX_TEXT_FIELD_LEN: usize = 500;

/// A geographic point in decimal degrees.
///
/// Range is not checked here; the geometry treats latitude/longitude as
/// planar coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }

    /// Planar midpoint between two points.
    pub fn midpoint(&self, other: &GeoPoint) -> GeoPoint {
        GeoPoint {
            latitude: (self.latitude + other.latitude) / 2.0,
            longitude: (self.longitude + other.longitude) / 2.0,
        }
    }

    pub(crate) fn approx_eq(&self, other: &GeoPoint) -> bool {
        (self.latitude - other.latitude).abs() <= geometry::BOUNDARY_EPS_DEG
            && (self.longitude - other.longitude).abs() <= geometry::BOUNDARY_EPS_DEG
    }
}

/// Reasons a flight area polygon is structurally unusable.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FlightAreaError {
    #[error("vertex {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
    #[error("flight area needs at least 3 distinct vertices, got {distinct}")]
    TooFewVertices { distinct: usize },
    #[error("flight area encloses no area")]
    ZeroArea,
    #[error("flight area edges {first} and {second} cross each other")]
    SelfIntersecting { first: usize, second: usize },
}

/// Ground footprint of a planned flight.
///
/// The ring is implicitly closed. A trailing copy of the first vertex and
/// consecutive repeated vertices are dropped on construction; vertex order is
/// otherwise preserved and defines the edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<GeoPoint>", into = "Vec<GeoPoint>")]
pub struct FlightArea {
    points: Vec<GeoPoint>,
}

impl FlightArea {
    pub fn new(points: Vec<GeoPoint>) -> Result<Self, FlightAreaError> {
        if let Some(index) = points.iter().position(|point| !point.is_finite()) {
            return Err(FlightAreaError::NonFiniteCoordinate { index });
        }

        let points = geometry::normalize_ring(points);

        let mut distinct: Vec<GeoPoint> = Vec::with_capacity(points.len());
        for point in &points {
            if !distinct.iter().any(|seen| seen.approx_eq(point)) {
                distinct.push(*point);
            }
        }
        if distinct.len() < 3 {
            return Err(FlightAreaError::TooFewVertices {
                distinct: distinct.len(),
            });
        }

        if let Some((first, second)) = geometry::first_self_intersection(&points) {
            return Err(FlightAreaError::SelfIntersecting { first, second });
        }

        if geometry::signed_area(&points).abs() <= geometry::MIN_AREA_DEG2 {
            return Err(FlightAreaError::ZeroArea);
        }

        Ok(Self { points })
    }

    /// Build from `(lat, lon)` pairs.
    pub fn from_lat_lon(pairs: &[(f64, f64)]) -> Result<Self, FlightAreaError> {
        Self::new(
            pairs
                .iter()
                .map(|(lat, lon)| GeoPoint::new(*lat, *lon))
                .collect(),
        )
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edges of the closed ring, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
        geometry::ring_edges(&self.points)
    }
}

impl TryFrom<Vec<GeoPoint>> for FlightArea {
    type Error = FlightAreaError;

    fn try_from(points: Vec<GeoPoint>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<FlightArea> for Vec<GeoPoint> {
    fn from(area: FlightArea) -> Self {
        area.points
    }
}

/// Identifier assigned to an application when it is first stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    /// Being prepared by the applicant; the only editable state
    #[default]
    Draft,
    /// Waiting for an approver
    Submitted,
    /// Approved by an approver or self-approved on submission
    Approved,
    /// Rejected by an approver
    Rejected,
}

impl ApplicationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Submitted => "SUBMITTED",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How an acquired drone changes hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModeOfAcquisition {
    Purchase,
    Lease,
}

/// Fields specific to a fly-drone permission application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightPermissionDetails {
    pub pilot_id: String,
    pub drone_id: u64,
    pub operator_id: u64,
    pub fly_area: FlightArea,
    #[serde(default)]
    pub payload_weight_kg: f64,
    #[serde(default)]
    pub payload_details: String,
    #[serde(default)]
    pub flight_purpose: String,
    pub start_date_time: NaiveDateTime,
    pub end_date_time: NaiveDateTime,
}

/// Fields shared by drone import and local acquisition applications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionDetails {
    pub acquisition_mode: ModeOfAcquisition,
    pub drone_type_id: u64,
    pub quantity: u32,
}

/// Application variants sharing the common record in [`Application`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApplicationKind {
    FlyDronePermission(FlightPermissionDetails),
    ImportDrone(AcquisitionDetails),
    LocalDroneAcquisition(AcquisitionDetails),
}

impl ApplicationKind {
    /// Flight area, for kinds that carry one.
    pub fn flight_area(&self) -> Option<&FlightArea> {
        match self {
            Self::FlyDronePermission(details) => Some(&details.fly_area),
            Self::ImportDrone(_) | Self::LocalDroneAcquisition(_) => None,
        }
    }

    pub fn acquisition_mode(&self) -> Option<ModeOfAcquisition> {
        match self {
            Self::FlyDronePermission(_) => None,
            Self::ImportDrone(details) | Self::LocalDroneAcquisition(details) => {
                Some(details.acquisition_mode)
            }
        }
    }

    pub fn drone_id(&self) -> Option<u64> {
        match self {
            Self::FlyDronePermission(details) => Some(details.drone_id),
            Self::ImportDrone(_) | Self::LocalDroneAcquisition(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FlyDronePermission(_) => "fly_drone_permission",
            Self::ImportDrone(_) => "import_drone",
            Self::LocalDroneAcquisition(_) => "local_drone_acquisition",
        }
    }
}

/// Shared application record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub applicant_id: u64,
    pub applicant: String,
    pub status: ApplicationStatus,
    #[serde(default)]
    pub approver: Option<String>,
    #[serde(default)]
    pub approver_id: Option<u64>,
    #[serde(default)]
    pub approver_comments: Option<String>,
    #[serde(default)]
    pub approved_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submitted_date: Option<DateTime<Utc>>,
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub last_modified_date: Option<DateTime<Utc>>,
    /// Optimistic concurrency counter, owned by the store
    #[serde(default)]
    pub version: u64,
    pub kind: ApplicationKind,
}

impl Application {
    pub fn can_be_modified(&self) -> bool {
        self.status == ApplicationStatus::Draft
    }

    pub fn is_submitted(&self) -> bool {
        self.status == ApplicationStatus::Submitted
    }

    /// Last modification time, falling back to creation time.
    pub fn modified_date(&self) -> DateTime<Utc> {
        self.last_modified_date.unwrap_or(self.created_date)
    }

    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        self.applicant_id == principal.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Applicant,
    Approver,
}

/// The identity acting on an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: u64,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn applicant(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            role: Role::Applicant,
        }
    }

    pub fn approver(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            role: Role::Approver,
        }
    }

    pub fn can_review(&self) -> bool {
        self.role == Role::Approver
    }
}

/// Status an applicant may request when saving an application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestedStatus {
    #[default]
    Draft,
    Submitted,
}

/// Editable payload for creating or updating an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDraft {
    pub kind: ApplicationKind,
    #[serde(default)]
    pub status: RequestedStatus,
}

impl ApplicationDraft {
    pub fn new(kind: ApplicationKind) -> Self {
        Self {
            kind,
            status: RequestedStatus::Draft,
        }
    }

    pub fn submitted(mut self) -> Self {
        self.status = RequestedStatus::Submitted;
        self
    }
}

/// Outcome an approver can give a submitted application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApproverDecision {
    Approved,
    Rejected,
}

impl ApproverDecision {
    pub fn status(&self) -> ApplicationStatus {
        match self {
            Self::Approved => ApplicationStatus::Approved,
            Self::Rejected => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub application_id: ApplicationId,
    pub decision: ApproverDecision,
    #[serde(default)]
    pub comments: String,
}
