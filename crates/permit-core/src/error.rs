//! Error taxonomy for permission decisions and lifecycle transitions.

use serde::Serialize;
use std::fmt;

use crate::models::{ApplicationId, ApplicationStatus, FlightAreaError};
use crate::zones::ZoneType;

/// A flight area touched a zone it must stay clear of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ZoneViolation {
    pub zone: ZoneType,
}

impl ZoneViolation {
    pub fn intersects(zone: ZoneType) -> Self {
        Self { zone }
    }
}

impl fmt::Display for ZoneViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flight area intersects a {} zone", self.zone)
    }
}

impl std::error::Error for ZoneViolation {}

/// Operation an identity attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Edit,
    Submit,
    Review,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Edit => write!(f, "edit"),
            Action::Submit => write!(f, "submit"),
            Action::Review => write!(f, "review"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PermitError {
    #[error("flight area rejected: {0}")]
    Validation(#[from] ZoneViolation),
    #[error("invalid flight area: {0}")]
    InvalidFlightArea(#[from] FlightAreaError),
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("application {id} is {status} and can no longer be modified")]
    NotEditable {
        id: ApplicationId,
        status: ApplicationStatus,
    },
    #[error("user {actor} is not allowed to {action} application {id}")]
    Unauthorized {
        id: ApplicationId,
        actor: u64,
        action: Action,
    },
    #[error("application {id} must be {expected} but is {actual}")]
    WrongState {
        id: ApplicationId,
        expected: ApplicationStatus,
        actual: ApplicationStatus,
    },
}

impl PermitError {
    /// Short machine-readable kind, for logs and API mapping.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::InvalidFlightArea(_) => "invalid_flight_area",
            Self::InvalidField { .. } => "invalid_field",
            Self::NotFound(_) => "not_found",
            Self::NotEditable { .. } => "not_editable",
            Self::Unauthorized { .. } => "unauthorized",
            Self::WrongState { .. } => "wrong_state",
        }
    }
}
