//! Permission workflow service.
//!
//! Each operation reads the current record, runs one lifecycle transition
//! against a fresh zone snapshot and writes the result back through the
//! store's version check.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use permit_core::lifecycle::{self, LifecycleEvent, Transition};
use permit_core::{
    decide_submission, validate_flight_area, Application, ApplicationDraft, ApplicationId,
    ApprovalRequest, FlightArea, PermitError, Principal, SubmissionDecision, ZoneClassifier,
    ZoneGeometryMap, ZoneReport, ZoneViolation,
};

use crate::airspace::{AirspaceError, AirspaceSource};
use crate::hooks::ApprovalHook;
use crate::state::{ApplicationStore, StoreError};

/// Service composing the application store, airspace source and approval hook.
pub struct ApplicationService<S, A, H> {
    store: Arc<S>,
    airspace: Arc<A>,
    hook: Arc<H>,
}

impl<S, A, H> ApplicationService<S, A, H>
where
    S: ApplicationStore + 'static,
    A: AirspaceSource + 'static,
    H: ApprovalHook + 'static,
{
    pub fn new(store: Arc<S>, airspace: Arc<A>, hook: Arc<H>) -> Self {
        Self {
            store,
            airspace,
            hook,
        }
    }

    /// Create an application owned by `actor`, submitting it right away if
    /// the draft asks for SUBMITTED.
    pub fn create_application(
        &self,
        draft: ApplicationDraft,
        actor: &Principal,
    ) -> Result<Application, ServiceError> {
        let zones = self.airspace.fetch_zone_map()?;
        let id = ApplicationId::new(Uuid::new_v4().to_string());
        let kind = draft.kind.label();

        let transition = lifecycle::create(id, draft, actor, &zones, Utc::now())
            .map_err(|err| rejected("create", None, actor, err))?;
        let stored = self.store.insert(transition.application)?;
        tracing::info!(
            "Created {} application {} for applicant {}",
            kind,
            stored.id,
            stored.applicant_id
        );

        self.after_transition(&stored, transition.event);
        Ok(stored)
    }

    /// Replace the contents of a DRAFT application.
    pub fn update_application(
        &self,
        id: &ApplicationId,
        draft: ApplicationDraft,
        actor: &Principal,
    ) -> Result<Application, ServiceError> {
        let current = self.find_existing(id)?;
        let zones = self.airspace.fetch_zone_map()?;

        let transition = lifecycle::update(current, draft, actor, &zones, Utc::now())
            .map_err(|err| rejected("update", Some(id), actor, err))?;
        self.persist(transition)
    }

    /// Submit a DRAFT application; green-only flights come back APPROVED.
    pub fn submit_application(
        &self,
        id: &ApplicationId,
        actor: &Principal,
    ) -> Result<Application, ServiceError> {
        let current = self.find_existing(id)?;
        let zones = self.airspace.fetch_zone_map()?;

        let transition = lifecycle::submit(current, actor, &zones, Utc::now())
            .map_err(|err| rejected("submit", Some(id), actor, err))?;
        self.persist(transition)
    }

    /// Apply an approver's decision to a SUBMITTED application.
    pub fn review_application(
        &self,
        request: &ApprovalRequest,
        actor: &Principal,
    ) -> Result<Application, ServiceError> {
        let current = self.find_existing(&request.application_id)?;

        let transition = lifecycle::review(current, request, actor, Utc::now())
            .map_err(|err| rejected("review", Some(&request.application_id), actor, err))?;
        self.persist(transition)
    }

    pub fn get(&self, id: &ApplicationId) -> Result<Application, ServiceError> {
        self.find_existing(id)
    }

    /// Applications of one applicant, most recently modified first.
    pub fn applications_of_applicant(
        &self,
        applicant_id: u64,
    ) -> Result<Vec<Application>, ServiceError> {
        Ok(newest_first(self.store.find_by_applicant(applicant_id)?))
    }

    /// Flight applications for one drone, most recently modified first.
    pub fn applications_of_drone(&self, drone_id: u64) -> Result<Vec<Application>, ServiceError> {
        Ok(newest_first(self.store.find_by_drone(drone_id)?))
    }

    pub fn all_applications(&self) -> Result<Vec<Application>, ServiceError> {
        Ok(newest_first(self.store.find_all()?))
    }

    /// What submitting `area` right now would do, without touching any record.
    pub fn preview_submission(&self, area: &FlightArea) -> Result<SubmissionPreview, ServiceError> {
        let zones = self.airspace.fetch_zone_map()?;
        Ok(SubmissionPreview::evaluate(area, &zones))
    }

    fn find_existing(&self, id: &ApplicationId) -> Result<Application, ServiceError> {
        self.store
            .find(id)?
            .ok_or_else(|| ServiceError::from(PermitError::NotFound(id.clone())))
    }

    fn persist(&self, transition: Transition) -> Result<Application, ServiceError> {
        let id = transition.application.id.clone();
        let stored = self.store.save(transition.application).map_err(|err| {
            if let StoreError::VersionConflict { .. } = err {
                tracing::warn!("Concurrent write on application {}: {}", id, err);
            }
            err
        })?;

        self.after_transition(&stored, transition.event);
        Ok(stored)
    }

    fn after_transition(&self, application: &Application, event: Option<LifecycleEvent>) {
        match event {
            Some(LifecycleEvent::Approved { automatic, .. }) => {
                if automatic {
                    tracing::info!(
                        "Application {} self-approved for applicant {}",
                        application.id,
                        application.applicant_id
                    );
                } else {
                    tracing::info!(
                        "Application {} approved by {}",
                        application.id,
                        application.approver.as_deref().unwrap_or("unknown")
                    );
                }
                // The approval is already stored; a failing hook must not undo it.
                if let Err(err) = self.hook.on_approved(application) {
                    tracing::warn!("Approval hook failed for {}: {}", application.id, err);
                }
            }
            Some(LifecycleEvent::Submitted { .. }) => {
                tracing::info!("Application {} submitted for review", application.id);
            }
            Some(LifecycleEvent::Rejected { .. }) => {
                tracing::info!(
                    "Application {} rejected by {}",
                    application.id,
                    application.approver.as_deref().unwrap_or("unknown")
                );
            }
            None => {
                tracing::debug!("Application {} saved as {}", application.id, application.status);
            }
        }
    }
}

/// Zone answers plus the validator and decision outcomes for one flight area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionPreview {
    pub zones: ZoneReport,
    /// Set when the validator would refuse the area outright
    pub violation: Option<ZoneViolation>,
    pub decision: SubmissionDecision,
}

impl SubmissionPreview {
    pub fn evaluate(area: &FlightArea, zones: &ZoneGeometryMap) -> Self {
        let report = ZoneClassifier::new(zones).classify(area);
        tracing::debug!("Zone classification: {:?}", report);
        Self {
            zones: report,
            violation: validate_flight_area(area, zones).err(),
            decision: decide_submission(area, zones),
        }
    }
}

/// Error raised by the application service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Permit(#[from] PermitError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Airspace(#[from] AirspaceError),
}

impl ServiceError {
    /// The domain error, when the failure came from a lifecycle rule.
    pub fn permit(&self) -> Option<&PermitError> {
        match self {
            Self::Permit(err) => Some(err),
            _ => None,
        }
    }
}

fn rejected(
    operation: &str,
    id: Option<&ApplicationId>,
    actor: &Principal,
    err: PermitError,
) -> PermitError {
    match id {
        Some(id) => tracing::warn!(
            "Refused {} of application {} by user {} ({}): {}",
            operation,
            id,
            actor.id,
            err.kind(),
            err
        ),
        None => tracing::warn!(
            "Refused {} by user {} ({}): {}",
            operation,
            actor.id,
            err.kind(),
            err
        ),
    }
    err
}

fn newest_first(mut applications: Vec<Application>) -> Vec<Application> {
    applications.sort_by(|a, b| b.modified_date().cmp(&a.modified_date()));
    applications
}
