//! The profile directory storage contract.

use async_trait::async_trait;
use cloudledger_core::Handle;

use crate::error::DirectoryError;
use crate::record::{NewProfile, ProfileChanges, ProfileRecord};

/// Key-value storage of profile records, keyed by login handle.
///
/// The directory is treated as eventually consistent with the identity
/// provider: callers performing a provider write followed by a directory
/// write get no transactional guarantee across the pair, and decide per
/// call site whether a directory failure is surfaced or merely logged.
///
/// Implementations must be safe to share across tasks (`Send + Sync`); all
/// methods take `&self`.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Fetches the record for a handle, or `None` if absent.
    ///
    /// Absence is an ordinary outcome, not an error — authenticated users
    /// without a record are simply unprivileged.
    async fn get(&self, handle: &Handle) -> Result<Option<ProfileRecord>, DirectoryError>;

    /// Creates a record with status `pending_verification` and returns it
    /// with directory-assigned timestamps.
    async fn create(&self, new: NewProfile) -> Result<ProfileRecord, DirectoryError>;

    /// Applies a partial update to an existing record and returns the
    /// updated record.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::NotFound`] if no record exists for the
    /// handle.
    async fn update(
        &self,
        handle: &Handle,
        changes: ProfileChanges,
    ) -> Result<ProfileRecord, DirectoryError>;

    /// Lists records whose role matches `role` case-insensitively.
    async fn list_by_role(&self, role: &str) -> Result<Vec<ProfileRecord>, DirectoryError>;

    /// Lists records belonging to `company` (exact match).
    async fn list_by_company(&self, company: &str) -> Result<Vec<ProfileRecord>, DirectoryError>;

    /// Removes the record for a handle.
    ///
    /// Deleting an absent record is a no-op; the operator-facing flows that
    /// use this treat repeated deletes as idempotent.
    async fn delete(&self, handle: &Handle) -> Result<(), DirectoryError>;
}
