//! In-memory application store using DashMap.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use permit_core::{Application, ApplicationId};

/// Persistence collaborator for application records.
///
/// `save` is a compare-and-swap on `version`: callers read a record, run a
/// transition on it and save it back; a concurrent write in between makes the
/// save fail instead of being silently overwritten.
pub trait ApplicationStore: Send + Sync {
    fn find(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    /// Store a new record. The stored copy starts at version 1.
    fn insert(&self, application: Application) -> Result<Application, StoreError>;
    /// Replace an existing record whose stored version equals `application.version`.
    fn save(&self, application: Application) -> Result<Application, StoreError>;
    fn find_by_applicant(&self, applicant_id: u64) -> Result<Vec<Application>, StoreError>;
    fn find_by_drone(&self, drone_id: u64) -> Result<Vec<Application>, StoreError>;
    fn find_all(&self) -> Result<Vec<Application>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("application {0} already exists")]
    Conflict(ApplicationId),
    #[error("application {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        id: ApplicationId,
        expected: u64,
        found: u64,
    },
    #[error("application {0} not found")]
    NotFound(ApplicationId),
}

/// Thread-safe store for application records.
#[derive(Debug, Default)]
pub struct InMemoryApplicationStore {
    applications: DashMap<ApplicationId, Application>,
}

impl InMemoryApplicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.applications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }

    fn collect<F>(&self, keep: F) -> Vec<Application>
    where
        F: Fn(&Application) -> bool,
    {
        self.applications
            .iter()
            .filter(|r| keep(r.value()))
            .map(|r| r.value().clone())
            .collect()
    }
}

impl ApplicationStore for InMemoryApplicationStore {
    fn find(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError> {
        Ok(self.applications.get(id).map(|r| r.value().clone()))
    }

    fn insert(&self, mut application: Application) -> Result<Application, StoreError> {
        match self.applications.entry(application.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict(application.id)),
            Entry::Vacant(slot) => {
                application.version = 1;
                slot.insert(application.clone());
                Ok(application)
            }
        }
    }

    fn save(&self, mut application: Application) -> Result<Application, StoreError> {
        match self.applications.entry(application.id.clone()) {
            Entry::Vacant(_) => Err(StoreError::NotFound(application.id)),
            Entry::Occupied(mut slot) => {
                let found = slot.get().version;
                if found != application.version {
                    return Err(StoreError::VersionConflict {
                        id: application.id,
                        expected: application.version,
                        found,
                    });
                }
                application.version = found + 1;
                slot.insert(application.clone());
                Ok(application)
            }
        }
    }

    fn find_by_applicant(&self, applicant_id: u64) -> Result<Vec<Application>, StoreError> {
        Ok(self.collect(|app| app.applicant_id == applicant_id))
    }

    fn find_by_drone(&self, drone_id: u64) -> Result<Vec<Application>, StoreError> {
        Ok(self.collect(|app| app.kind.drone_id() == Some(drone_id)))
    }

    fn find_all(&self) -> Result<Vec<Application>, StoreError> {
        Ok(self.collect(|_| true))
    }
}
