//! Storage, airspace data and workflow orchestration around `permit-core`.

pub mod airspace;
pub mod config;
pub mod hooks;
pub mod service;
pub mod state;

pub use airspace::{AirspaceError, AirspaceSource, GeoJsonAirspace, StaticAirspace};
pub use config::Config;
pub use hooks::{ApprovalHook, HookError, NoopApprovalHook, RecordingApprovalHook};
pub use service::{ApplicationService, ServiceError, SubmissionPreview};
pub use state::{ApplicationStore, InMemoryApplicationStore, StoreError};
