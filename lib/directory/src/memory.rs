//! In-memory profile directory backend.
//!
//! Backs the test suite and the server's demo mode. Records live in a
//! `HashMap` behind an async `RwLock`; list operations scan the map, which
//! is fine at fixture scale.

use async_trait::async_trait;
use cloudledger_core::Handle;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::directory::ProfileDirectory;
use crate::error::DirectoryError;
use crate::record::{NewProfile, ProfileChanges, ProfileRecord};

/// In-memory [`ProfileDirectory`] implementation.
#[derive(Default)]
pub struct MemoryDirectory {
    records: RwLock<HashMap<Handle, ProfileRecord>>,
}

impl MemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a record directly, bypassing create semantics.
    ///
    /// Fixture seeding for tests and demo mode; overwrites any existing
    /// record for the handle.
    pub async fn seed(&self, record: ProfileRecord) {
        let mut records = self.records.write().await;
        records.insert(record.handle().clone(), record);
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if no records are stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ProfileDirectory for MemoryDirectory {
    async fn get(&self, handle: &Handle) -> Result<Option<ProfileRecord>, DirectoryError> {
        let records = self.records.read().await;
        Ok(records.get(handle).cloned())
    }

    async fn create(&self, new: NewProfile) -> Result<ProfileRecord, DirectoryError> {
        let mut records = self.records.write().await;
        if records.contains_key(&new.handle) {
            return Err(DirectoryError::AlreadyExists {
                handle: new.handle,
            });
        }
        let record = ProfileRecord::pending(new);
        records.insert(record.handle().clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        handle: &Handle,
        changes: ProfileChanges,
    ) -> Result<ProfileRecord, DirectoryError> {
        let mut records = self.records.write().await;
        let record = records.get_mut(handle).ok_or_else(|| DirectoryError::NotFound {
            handle: handle.clone(),
        })?;
        record.apply(&changes);
        Ok(record.clone())
    }

    async fn list_by_role(&self, role: &str) -> Result<Vec<ProfileRecord>, DirectoryError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| {
                r.role()
                    .is_some_and(|assigned| assigned.eq_ignore_ascii_case(role))
            })
            .cloned()
            .collect())
    }

    async fn list_by_company(&self, company: &str) -> Result<Vec<ProfileRecord>, DirectoryError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.company() == Some(company))
            .cloned()
            .collect())
    }

    async fn delete(&self, handle: &Handle) -> Result<(), DirectoryError> {
        let mut records = self.records.write().await;
        records.remove(handle);
        Ok(())
    }
}
