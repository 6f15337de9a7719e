//! Post-approval hooks.
//!
//! The permission-document collaborator plugs in here; it runs after an
//! APPROVED record has been persisted.

use std::sync::Mutex;

use permit_core::{Application, ApplicationId};

pub trait ApprovalHook: Send + Sync {
    fn on_approved(&self, application: &Application) -> Result<(), HookError>;
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("approval hook unavailable: {0}")]
    Unavailable(String),
    #[error("approval hook failed: {0}")]
    Failed(String),
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopApprovalHook;

impl ApprovalHook for NoopApprovalHook {
    fn on_approved(&self, _application: &Application) -> Result<(), HookError> {
        Ok(())
    }
}

/// Hook that remembers which applications it saw.
#[derive(Debug, Default)]
pub struct RecordingApprovalHook {
    seen: Mutex<Vec<ApplicationId>>,
}

impl RecordingApprovalHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn approved_ids(&self) -> Vec<ApplicationId> {
        self.seen
            .lock()
            .map(|seen| seen.clone())
            .unwrap_or_default()
    }
}

impl ApprovalHook for RecordingApprovalHook {
    fn on_approved(&self, application: &Application) -> Result<(), HookError> {
        let mut seen = self
            .seen
            .lock()
            .map_err(|_| HookError::Unavailable("recording lock poisoned".to_string()))?;
        seen.push(application.id.clone());
        Ok(())
    }
}
