//! Submission decision: auto-approve, hold for review, or reject.
//!
//! The decision is a pure function of the flight area and the zone snapshot.
//! Applying it to an application record is the lifecycle's job.

use serde::Serialize;

use crate::error::ZoneViolation;
use crate::models::FlightArea;
use crate::zones::{ZoneClassifier, ZoneGeometryMap, ZoneType};

/// Approver comment recorded on self-approved applications.
pub const SELF_APPROVAL_COMMENT: &str = "Self approval, within green zone";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionDecision {
    /// No AMBER or RED contact; the applicant's submission is its own approval
    AutoApproved { comment: String },
    /// Touches AMBER airspace; a human approver must decide
    PendingReview,
    /// Touches RED airspace
    Rejected { violation: ZoneViolation },
}

impl SubmissionDecision {
    pub fn is_auto_approved(&self) -> bool {
        matches!(self, Self::AutoApproved { .. })
    }
}

/// Decide what happens when a flight area is submitted.
///
/// Precedence: RED rejection, then AMBER review, then auto-approval.
pub fn decide_submission(area: &FlightArea, zones: &ZoneGeometryMap) -> SubmissionDecision {
    let classifier = ZoneClassifier::new(zones);

    if classifier.intersects_zone(area, ZoneType::Red) {
        return SubmissionDecision::Rejected {
            violation: ZoneViolation::intersects(ZoneType::Red),
        };
    }
    if classifier.intersects_zone(area, ZoneType::Amber) {
        return SubmissionDecision::PendingReview;
    }
    SubmissionDecision::AutoApproved {
        comment: SELF_APPROVAL_COMMENT.to_string(),
    }
}
