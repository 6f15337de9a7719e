//! Gatekeeping checks run whenever an application's contents are set or changed.

use crate::error::{PermitError, ZoneViolation};
use crate::models::{
    AcquisitionDetails, ApplicationKind, FlightArea, FlightPermissionDetails, MAX_TEXT_FIELD_LEN,
};
use crate::zones::{ZoneClassifier, ZoneGeometryMap, ZoneType};

/// Result of a flight area passing zone validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clearance {
    /// Entirely inside GREEN airspace
    PreCleared,
    /// Clear of RED, but touches non-green airspace; settled at submission
    NeedsReview,
}

/// Green-accept / red-reject rule for a flight area.
///
/// A flight fully inside GREEN zones is accepted before RED is consulted.
pub fn validate_flight_area(
    area: &FlightArea,
    zones: &ZoneGeometryMap,
) -> Result<Clearance, ZoneViolation> {
    let classifier = ZoneClassifier::new(zones);

    if classifier.is_fully_within(area, ZoneType::Green) {
        return Ok(Clearance::PreCleared);
    }
    if classifier.intersects_zone(area, ZoneType::Red) {
        return Err(ZoneViolation::intersects(ZoneType::Red));
    }
    Ok(Clearance::NeedsReview)
}

/// Validate every field of an application payload.
///
/// Returns the zone clearance for kinds that carry a flight area, `None` for
/// the rest.
pub fn validate_application(
    kind: &ApplicationKind,
    zones: &ZoneGeometryMap,
) -> Result<Option<Clearance>, PermitError> {
    match kind {
        ApplicationKind::FlyDronePermission(details) => {
            check_flight_details(details)?;
            let clearance = validate_flight_area(&details.fly_area, zones)?;
            Ok(Some(clearance))
        }
        ApplicationKind::ImportDrone(details) | ApplicationKind::LocalDroneAcquisition(details) => {
            check_acquisition_details(details)?;
            Ok(None)
        }
    }
}

fn check_flight_details(details: &FlightPermissionDetails) -> Result<(), PermitError> {
    if details.pilot_id.trim().is_empty() {
        return Err(invalid("pilot_id", "must not be empty"));
    }
    check_text("payload_details", &details.payload_details)?;
    check_text("flight_purpose", &details.flight_purpose)?;

    if !details.payload_weight_kg.is_finite() || details.payload_weight_kg < 0.0 {
        return Err(invalid(
            "payload_weight_kg",
            format!("must be a non-negative number, got {}", details.payload_weight_kg),
        ));
    }
    if details.end_date_time < details.start_date_time {
        return Err(invalid("end_date_time", "must not be before start_date_time"));
    }
    Ok(())
}

fn check_acquisition_details(details: &AcquisitionDetails) -> Result<(), PermitError> {
    if details.quantity == 0 {
        return Err(invalid("quantity", "must be at least 1"));
    }
    Ok(())
}

fn check_text(field: &'static str, value: &str) -> Result<(), PermitError> {
    let len = value.chars().count();
    if len > MAX_TEXT_FIELD_LEN {
        return Err(invalid(
            field,
            format!("is {len} characters, limit is {MAX_TEXT_FIELD_LEN}"),
        ));
    }
    Ok(())
}

fn invalid(field: &'static str, reason: impl Into<String>) -> PermitError {
    PermitError::InvalidField {
        field,
        reason: reason.into(),
    }
}
