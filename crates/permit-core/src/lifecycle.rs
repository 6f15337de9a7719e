//! Application state machine.
//!
//! DRAFT -> SUBMITTED -> {APPROVED, REJECTED}. Every transition takes the
//! record by value and hands back the new record; nothing here touches
//! storage, so callers persist the result as one atomic write.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::decision::{decide_submission, SubmissionDecision};
use crate::error::{Action, PermitError};
use crate::models::{
    Application, ApplicationDraft, ApplicationId, ApplicationKind, ApplicationStatus,
    ApprovalRequest, ApproverDecision, Principal, RequestedStatus,
};
use crate::validator::validate_application;
use crate::zones::ZoneGeometryMap;

/// Observable outcome of a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Submitted { id: ApplicationId },
    Approved { id: ApplicationId, automatic: bool },
    Rejected { id: ApplicationId },
}

impl LifecycleEvent {
    pub fn is_approval(&self) -> bool {
        matches!(self, Self::Approved { .. })
    }
}

/// New application state plus the event it produced, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub application: Application,
    pub event: Option<LifecycleEvent>,
}

impl Transition {
    fn quiet(application: Application) -> Self {
        Self {
            application,
            event: None,
        }
    }
}

/// Start a new application owned by `actor`.
pub fn create(
    id: ApplicationId,
    draft: ApplicationDraft,
    actor: &Principal,
    zones: &ZoneGeometryMap,
    now: DateTime<Utc>,
) -> Result<Transition, PermitError> {
    validate_application(&draft.kind, zones)?;

    let application = Application {
        id,
        applicant_id: actor.id,
        applicant: actor.username.clone(),
        status: ApplicationStatus::Draft,
        approver: None,
        approver_id: None,
        approver_comments: None,
        approved_date: None,
        submitted_date: None,
        created_date: now,
        last_modified_date: Some(now),
        version: 0,
        kind: draft.kind,
    };

    finish_edit(application, draft.status, actor, zones, now)
}

/// Replace the contents of a DRAFT application.
///
/// Identity, ownership, creation date and store version carry over from
/// `current`.
pub fn update(
    current: Application,
    draft: ApplicationDraft,
    actor: &Principal,
    zones: &ZoneGeometryMap,
    now: DateTime<Utc>,
) -> Result<Transition, PermitError> {
    ensure_editable(&current)?;
    ensure_owner(&current, actor, Action::Edit)?;
    validate_application(&draft.kind, zones)?;

    let application = Application {
        kind: draft.kind,
        last_modified_date: Some(now),
        ..current
    };

    finish_edit(application, draft.status, actor, zones, now)
}

/// Move a DRAFT application to SUBMITTED and apply the submission decision.
pub fn submit(
    application: Application,
    actor: &Principal,
    zones: &ZoneGeometryMap,
    now: DateTime<Utc>,
) -> Result<Transition, PermitError> {
    ensure_editable(&application)?;
    ensure_owner(&application, actor, Action::Submit)?;
    validate_application(&application.kind, zones)?;

    let decision = submission_decision(&application.kind, zones);
    if let SubmissionDecision::Rejected { violation } = decision {
        return Err(PermitError::Validation(violation));
    }

    let mut application = application;
    application.status = ApplicationStatus::Submitted;
    application.submitted_date = Some(now);
    application.last_modified_date = Some(now);

    let event = match decision {
        SubmissionDecision::AutoApproved { comment } => {
            application.status = ApplicationStatus::Approved;
            application.approver = Some(application.applicant.clone());
            application.approver_id = Some(application.applicant_id);
            application.approver_comments = Some(comment);
            application.approved_date = Some(now);
            LifecycleEvent::Approved {
                id: application.id.clone(),
                automatic: true,
            }
        }
        _ => LifecycleEvent::Submitted {
            id: application.id.clone(),
        },
    };

    Ok(Transition {
        application,
        event: Some(event),
    })
}

/// Record an approver's decision on a SUBMITTED application.
pub fn review(
    application: Application,
    request: &ApprovalRequest,
    actor: &Principal,
    now: DateTime<Utc>,
) -> Result<Transition, PermitError> {
    if request.application_id != application.id {
        return Err(PermitError::NotFound(request.application_id.clone()));
    }
    if !actor.can_review() {
        return Err(PermitError::Unauthorized {
            id: application.id,
            actor: actor.id,
            action: Action::Review,
        });
    }
    if !application.is_submitted() {
        return Err(PermitError::WrongState {
            id: application.id,
            expected: ApplicationStatus::Submitted,
            actual: application.status,
        });
    }

    let mut application = application;
    application.status = request.decision.status();
    application.approver = Some(actor.username.clone());
    application.approver_id = Some(actor.id);
    application.approver_comments = Some(request.comments.clone());
    application.approved_date = Some(now);
    application.last_modified_date = Some(now);

    let id = application.id.clone();
    let event = match request.decision {
        ApproverDecision::Approved => LifecycleEvent::Approved {
            id,
            automatic: false,
        },
        ApproverDecision::Rejected => LifecycleEvent::Rejected { id },
    };

    Ok(Transition {
        application,
        event: Some(event),
    })
}

fn finish_edit(
    application: Application,
    requested: RequestedStatus,
    actor: &Principal,
    zones: &ZoneGeometryMap,
    now: DateTime<Utc>,
) -> Result<Transition, PermitError> {
    match requested {
        RequestedStatus::Draft => Ok(Transition::quiet(application)),
        RequestedStatus::Submitted => submit(application, actor, zones, now),
    }
}

// Acquisition applications have no flight area and always wait for a human.
fn submission_decision(kind: &ApplicationKind, zones: &ZoneGeometryMap) -> SubmissionDecision {
    match kind.flight_area() {
        Some(area) => decide_submission(area, zones),
        None => SubmissionDecision::PendingReview,
    }
}

fn ensure_editable(application: &Application) -> Result<(), PermitError> {
    if application.can_be_modified() {
        Ok(())
    } else {
        Err(PermitError::NotEditable {
            id: application.id.clone(),
            status: application.status,
        })
    }
}

fn ensure_owner(
    application: &Application,
    actor: &Principal,
    action: Action,
) -> Result<(), PermitError> {
    if application.is_owned_by(actor) {
        Ok(())
    } else {
        Err(PermitError::Unauthorized {
            id: application.id.clone(),
            actor: actor.id,
            action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::SELF_APPROVAL_COMMENT;
    use crate::geometry::ZonePolygon;
    use crate::models::{AcquisitionDetails, FlightArea, FlightPermissionDetails, ModeOfAcquisition};
    use crate::zones::ZoneType;
    use chrono::{NaiveDate, TimeZone};

    fn square(lat0: f64, lon0: f64, size: f64) -> Vec<(f64, f64)> {
        vec![
            (lat0, lon0),
            (lat0, lon0 + size),
            (lat0 + size, lon0 + size),
            (lat0 + size, lon0),
        ]
    }

    fn zones() -> ZoneGeometryMap {
        ZoneGeometryMap::new()
            .with_zone(ZoneType::Green, ZonePolygon::from_lat_lon(&square(0.0, 0.0, 10.0)))
            .with_zone(ZoneType::Amber, ZonePolygon::from_lat_lon(&square(0.0, 10.0, 5.0)))
            .with_zone(ZoneType::Red, ZonePolygon::from_lat_lon(&square(0.0, 15.0, 5.0)))
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    fn flight_kind(pairs: &[(f64, f64)]) -> ApplicationKind {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        ApplicationKind::FlyDronePermission(FlightPermissionDetails {
            pilot_id: "pilot-1".into(),
            drone_id: 42,
            operator_id: 9,
            fly_area: FlightArea::from_lat_lon(pairs).unwrap(),
            payload_weight_kg: 0.5,
            payload_details: "none".into(),
            flight_purpose: "mapping".into(),
            start_date_time: start,
            end_date_time: start + chrono::Duration::hours(1),
        })
    }

    fn green_kind() -> ApplicationKind {
        flight_kind(&square(2.0, 2.0, 2.0))
    }

    fn amber_kind() -> ApplicationKind {
        flight_kind(&square(2.0, 8.0, 4.0))
    }

    fn red_kind() -> ApplicationKind {
        flight_kind(&square(2.0, 14.0, 3.0))
    }

    fn owner() -> Principal {
        Principal::applicant(1, "asha")
    }

    fn approver() -> Principal {
        Principal::approver(99, "dgca-officer")
    }

    fn draft_of(kind: ApplicationKind) -> Application {
        create(
            ApplicationId::new("app-1"),
            ApplicationDraft::new(kind),
            &owner(),
            &zones(),
            at(8),
        )
        .unwrap()
        .application
    }

    fn submitted_of(kind: ApplicationKind) -> Application {
        let app = submit(draft_of(kind), &owner(), &zones(), at(9))
            .unwrap()
            .application;
        assert_eq!(app.status, ApplicationStatus::Submitted);
        app
    }

    fn request(decision: ApproverDecision) -> ApprovalRequest {
        ApprovalRequest {
            application_id: ApplicationId::new("app-1"),
            decision,
            comments: "checked".into(),
        }
    }

    #[test]
    fn create_stamps_owner_and_dates() {
        let app = draft_of(green_kind());
        assert_eq!(app.status, ApplicationStatus::Draft);
        assert_eq!(app.applicant_id, 1);
        assert_eq!(app.applicant, "asha");
        assert_eq!(app.created_date, at(8));
        assert!(app.submitted_date.is_none());
    }

    #[test]
    fn create_rejects_red_area_before_anything_is_built() {
        let err = create(
            ApplicationId::new("app-1"),
            ApplicationDraft::new(red_kind()),
            &owner(),
            &zones(),
            at(8),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn create_with_submitted_status_runs_submission() {
        let transition = create(
            ApplicationId::new("app-1"),
            ApplicationDraft::new(green_kind()).submitted(),
            &owner(),
            &zones(),
            at(8),
        )
        .unwrap();
        assert_eq!(transition.application.status, ApplicationStatus::Approved);
        assert!(transition.event.unwrap().is_approval());
    }

    #[test]
    fn green_submission_self_approves() {
        let transition = submit(draft_of(green_kind()), &owner(), &zones(), at(9)).unwrap();
        let app = transition.application;
        assert_eq!(app.status, ApplicationStatus::Approved);
        assert_eq!(app.approver.as_deref(), Some("asha"));
        assert_eq!(app.approver_id, Some(1));
        assert_eq!(app.approver_comments.as_deref(), Some(SELF_APPROVAL_COMMENT));
        assert_eq!(app.approved_date, Some(at(9)));
        assert_eq!(app.submitted_date, Some(at(9)));
        assert_eq!(
            transition.event,
            Some(LifecycleEvent::Approved {
                id: ApplicationId::new("app-1"),
                automatic: true
            })
        );
    }

    #[test]
    fn amber_submission_waits_for_review() {
        let transition = submit(draft_of(amber_kind()), &owner(), &zones(), at(9)).unwrap();
        assert_eq!(transition.application.status, ApplicationStatus::Submitted);
        assert!(transition.application.approver.is_none());
        assert!(transition.application.approved_date.is_none());
        assert!(matches!(
            transition.event,
            Some(LifecycleEvent::Submitted { .. })
        ));
    }

    #[test]
    fn red_submission_fails_without_changing_status() {
        let mut app = draft_of(green_kind());
        app.kind = red_kind();
        let err = submit(app, &owner(), &zones(), at(9)).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn acquisition_submission_always_needs_an_approver() {
        let kind = ApplicationKind::ImportDrone(AcquisitionDetails {
            acquisition_mode: ModeOfAcquisition::Purchase,
            drone_type_id: 3,
            quantity: 2,
        });
        let app = submitted_of(kind);
        assert!(app.approver.is_none());
    }

    #[test]
    fn only_owner_may_submit() {
        let stranger = Principal::applicant(2, "ravi");
        let err = submit(draft_of(green_kind()), &stranger, &zones(), at(9)).unwrap_err();
        assert!(matches!(
            err,
            PermitError::Unauthorized {
                action: Action::Submit,
                actor: 2,
                ..
            }
        ));
    }

    #[test]
    fn submitting_twice_is_not_editable() {
        let app = submitted_of(amber_kind());
        let err = submit(app, &owner(), &zones(), at(10)).unwrap_err();
        assert!(matches!(
            err,
            PermitError::NotEditable {
                status: ApplicationStatus::Submitted,
                ..
            }
        ));
    }

    #[test]
    fn update_replaces_kind_and_keeps_identity() {
        let app = draft_of(green_kind());
        let updated = update(
            app,
            ApplicationDraft::new(amber_kind()),
            &owner(),
            &zones(),
            at(10),
        )
        .unwrap()
        .application;
        assert_eq!(updated.id, ApplicationId::new("app-1"));
        assert_eq!(updated.created_date, at(8));
        assert_eq!(updated.last_modified_date, Some(at(10)));
        assert_eq!(updated.kind, amber_kind());
        assert_eq!(updated.status, ApplicationStatus::Draft);
    }

    #[test]
    fn update_by_stranger_is_unauthorized() {
        let err = update(
            draft_of(green_kind()),
            ApplicationDraft::new(amber_kind()),
            &Principal::applicant(2, "ravi"),
            &zones(),
            at(10),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PermitError::Unauthorized {
                action: Action::Edit,
                ..
            }
        ));
    }

    #[test]
    fn update_checks_status_before_ownership() {
        let err = update(
            submitted_of(amber_kind()),
            ApplicationDraft::new(green_kind()),
            &Principal::applicant(2, "ravi"),
            &zones(),
            at(10),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "not_editable");
    }

    #[test]
    fn update_into_red_is_rejected() {
        let err = update(
            draft_of(green_kind()),
            ApplicationDraft::new(red_kind()),
            &owner(),
            &zones(),
            at(10),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn approver_can_approve_submitted_application() {
        let transition = review(
            submitted_of(amber_kind()),
            &request(ApproverDecision::Approved),
            &approver(),
            at(11),
        )
        .unwrap();
        let app = transition.application;
        assert_eq!(app.status, ApplicationStatus::Approved);
        assert_eq!(app.approver.as_deref(), Some("dgca-officer"));
        assert_eq!(app.approver_id, Some(99));
        assert_eq!(app.approver_comments.as_deref(), Some("checked"));
        assert_eq!(app.approved_date, Some(at(11)));
        assert!(matches!(
            transition.event,
            Some(LifecycleEvent::Approved {
                automatic: false,
                ..
            })
        ));
    }

    #[test]
    fn approver_can_reject_submitted_application() {
        let transition = review(
            submitted_of(amber_kind()),
            &request(ApproverDecision::Rejected),
            &approver(),
            at(11),
        )
        .unwrap();
        assert_eq!(transition.application.status, ApplicationStatus::Rejected);
        assert!(matches!(
            transition.event,
            Some(LifecycleEvent::Rejected { .. })
        ));
    }

    #[test]
    fn review_of_non_submitted_application_is_wrong_state() {
        for app in [draft_of(amber_kind()), draft_of(green_kind())] {
            let err = review(app, &request(ApproverDecision::Approved), &approver(), at(11))
                .unwrap_err();
            assert!(matches!(
                err,
                PermitError::WrongState {
                    expected: ApplicationStatus::Submitted,
                    actual: ApplicationStatus::Draft,
                    ..
                }
            ));
        }

        let approved = submit(draft_of(green_kind()), &owner(), &zones(), at(9))
            .unwrap()
            .application;
        let err = review(approved, &request(ApproverDecision::Rejected), &approver(), at(11))
            .unwrap_err();
        assert_eq!(err.kind(), "wrong_state");
    }

    #[test]
    fn rejected_application_cannot_be_reviewed_again() {
        let rejected = review(
            submitted_of(amber_kind()),
            &request(ApproverDecision::Rejected),
            &approver(),
            at(11),
        )
        .unwrap()
        .application;

        for decision in [ApproverDecision::Approved, ApproverDecision::Rejected] {
            let err = review(rejected.clone(), &request(decision), &approver(), at(12))
                .unwrap_err();
            assert!(matches!(
                err,
                PermitError::WrongState {
                    expected: ApplicationStatus::Submitted,
                    actual: ApplicationStatus::Rejected,
                    ..
                }
            ));
        }
    }

    #[test]
    fn applicant_cannot_review() {
        let err = review(
            submitted_of(amber_kind()),
            &request(ApproverDecision::Approved),
            &owner(),
            at(11),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PermitError::Unauthorized {
                action: Action::Review,
                ..
            }
        ));
    }
}
