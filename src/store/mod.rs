// ABOUTME: Persistent application store: the durable name-to-record mapping.
// ABOUTME: Every mutation is a whole-map read-modify-write through the AppStore trait.

mod error;
mod json;
mod record;

pub use error::StoreError;
pub use json::JsonFileStore;
pub(crate) use json::{read_json, write_json_atomic};
pub use record::{
    AppSummary, ApplicationRecord, BuildType, ContainerStatus, PipelineState, Step, WebhookStatus,
};

use std::collections::BTreeMap;

use crate::types::AppName;

/// Durable storage of application records.
///
/// Implementations provide whole-mapping `load`/`save`; the single-record
/// operations are defined on top of them so every backend shares the same
/// read-modify-write semantics.
pub trait AppStore: Send + Sync {
    /// Read the full mapping.
    fn load(&self) -> Result<BTreeMap<AppName, ApplicationRecord>, StoreError>;

    /// Replace the full mapping.
    fn save(&self, apps: &BTreeMap<AppName, ApplicationRecord>) -> Result<(), StoreError>;

    /// Look up a record, failing with `NotFound` if absent.
    fn get(&self, name: &AppName) -> Result<ApplicationRecord, StoreError> {
        self.find(name)?
            .ok_or_else(|| StoreError::NotFound(name.clone()))
    }

    /// Look up a record, returning `None` if absent.
    fn find(&self, name: &AppName) -> Result<Option<ApplicationRecord>, StoreError> {
        Ok(self.load()?.remove(name))
    }

    /// Create a record, failing with `AlreadyExists` if the name is taken.
    fn insert_new(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        let mut apps = self.load()?;
        if apps.contains_key(&record.name) {
            return Err(StoreError::AlreadyExists(record.name.clone()));
        }
        apps.insert(record.name.clone(), record.clone());
        self.save(&apps)
    }

    /// Insert or replace a record.
    fn upsert(&self, record: &ApplicationRecord) -> Result<(), StoreError> {
        let mut apps = self.load()?;
        apps.insert(record.name.clone(), record.clone());
        self.save(&apps)
    }

    /// Modify a stored record in place and return the updated copy.
    ///
    /// The record is re-read immediately before `f` runs, so fields `f` does
    /// not touch keep whatever a concurrent run last checkpointed.
    fn update(
        &self,
        name: &AppName,
        f: &mut dyn FnMut(&mut ApplicationRecord),
    ) -> Result<ApplicationRecord, StoreError> {
        let mut apps = self.load()?;
        let record = apps
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.clone()))?;
        f(record);
        let updated = record.clone();
        self.save(&apps)?;
        Ok(updated)
    }

    /// Remove a record, returning it. Fails with `NotFound` if absent.
    fn delete(&self, name: &AppName) -> Result<ApplicationRecord, StoreError> {
        let mut apps = self.load()?;
        let removed = apps
            .remove(name)
            .ok_or_else(|| StoreError::NotFound(name.clone()))?;
        self.save(&apps)?;
        Ok(removed)
    }
}
