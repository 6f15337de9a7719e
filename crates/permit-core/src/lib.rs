pub mod decision;
pub mod error;
pub mod geometry;
pub mod lifecycle;
pub mod models;
pub mod validator;
pub mod zones;

pub use decision::{decide_submission, SubmissionDecision, SELF_APPROVAL_COMMENT};
pub use error::{Action, PermitError, ZoneViolation};
pub use geometry::{intersects, within, ZonePolygon};
pub use lifecycle::{LifecycleEvent, Transition};
pub use models::{
    AcquisitionDetails, Application, ApplicationDraft, ApplicationId, ApplicationKind,
    ApplicationStatus, ApprovalRequest, ApproverDecision, FlightArea, FlightAreaError,
    FlightPermissionDetails, GeoPoint, ModeOfAcquisition, Principal, RequestedStatus, Role,
};
pub use validator::{validate_application, validate_flight_area, Clearance};
pub use zones::{ParseReport, ZoneClassifier, ZoneDataError, ZoneGeometryMap, ZoneReport, ZoneType};
