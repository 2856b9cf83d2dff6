//! Profile record types and their lifecycle.
//!
//! A profile record is created at sign-up with status
//! `pending_verification`, promoted to `active` at confirmation, and mutated
//! thereafter by profile edits and operator role assignments. Records are
//! not deleted in the normal flow; an explicit delete exists for operator
//! use only.

use chrono::{DateTime, Utc};
use cloudledger_core::Handle;
use serde::{Deserialize, Serialize};

/// Account lifecycle status as tracked by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    /// Registered with the identity provider but not yet confirmed.
    PendingVerification,
    /// Confirmed and usable.
    Active,
}

impl ProfileStatus {
    /// Returns the wire/storage representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingVerification => "pending_verification",
            Self::Active => "active",
        }
    }

    /// Parses a stored status string, defaulting unknown values to
    /// `pending_verification` rather than failing a read.
    #[must_use]
    pub fn parse_lossy(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            _ => Self::PendingVerification,
        }
    }
}

/// Application-level metadata associated with a principal.
///
/// The `role` is an open string compared case-insensitively by the role
/// policy; an absent role means no privilege, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Login handle; matches the principal's handle.
    handle: Handle,
    /// Email address, if known.
    email: Option<String>,
    /// Company the user belongs to (the tenant boundary).
    company: Option<String>,
    /// Department within the company.
    department: Option<String>,
    /// Authorization role, open string.
    role: Option<String>,
    /// Account lifecycle status.
    status: ProfileStatus,
    /// When sign-up confirmation completed, if it has.
    verified_at: Option<DateTime<Utc>>,
    /// When the record was created.
    created_at: DateTime<Utc>,
    /// When the record was last written.
    updated_at: DateTime<Utc>,
}

impl ProfileRecord {
    /// Creates a freshly registered record with status
    /// `pending_verification` and both timestamps set to now.
    ///
    /// Used by directory backends when servicing a create; callers go
    /// through [`ProfileDirectory::create`](crate::ProfileDirectory::create)
    /// with a [`NewProfile`].
    #[must_use]
    pub fn pending(new: NewProfile) -> Self {
        let now = Utc::now();
        Self {
            handle: new.handle,
            email: new.email,
            company: new.company,
            department: new.department,
            role: new.role,
            status: ProfileStatus::PendingVerification,
            verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitutes a record from storage with all fields specified.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        handle: Handle,
        email: Option<String>,
        company: Option<String>,
        department: Option<String>,
        role: Option<String>,
        status: ProfileStatus,
        verified_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            handle,
            email,
            company,
            department,
            role,
            status,
            verified_at,
            created_at,
            updated_at,
        }
    }

    /// Returns the login handle this record belongs to.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Returns the email address, if known.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// Returns the company, if set.
    #[must_use]
    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    /// Returns the department, if set.
    #[must_use]
    pub fn department(&self) -> Option<&str> {
        self.department.as_deref()
    }

    /// Returns the authorization role, if one has been assigned.
    #[must_use]
    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    /// Returns the account lifecycle status.
    #[must_use]
    pub fn status(&self) -> ProfileStatus {
        self.status
    }

    /// Returns when sign-up confirmation completed, if it has.
    #[must_use]
    pub fn verified_at(&self) -> Option<DateTime<Utc>> {
        self.verified_at
    }

    /// Returns when the record was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the record was last written.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Applies a partial update and stamps `updated_at`.
    ///
    /// Backends share this so partial-update semantics cannot drift between
    /// the in-memory and network implementations.
    pub fn apply(&mut self, changes: &ProfileChanges) {
        if let Some(email) = &changes.email {
            self.email = Some(email.clone());
        }
        if let Some(company) = &changes.company {
            self.company = Some(company.clone());
        }
        if let Some(department) = &changes.department {
            self.department = Some(department.clone());
        }
        if let Some(role) = &changes.role {
            self.role = Some(role.clone());
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(verified_at) = changes.verified_at {
            self.verified_at = Some(verified_at);
        }
        self.updated_at = Utc::now();
    }
}

/// Input for creating a profile record.
///
/// Status and timestamps are assigned by the directory, not the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProfile {
    pub handle: Handle,
    pub email: Option<String>,
    pub company: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
}

impl NewProfile {
    /// Creates a minimal new-profile input for the given handle.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            email: None,
            company: None,
            department: None,
            role: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    /// Sets the company.
    #[must_use]
    pub fn with_company(mut self, company: Option<String>) -> Self {
        self.company = company;
        self
    }

    /// Sets the department.
    #[must_use]
    pub fn with_department(mut self, department: Option<String>) -> Self {
        self.department = department;
        self
    }

    /// Sets the role.
    #[must_use]
    pub fn with_role(mut self, role: Option<String>) -> Self {
        self.role = role;
        self
    }
}

/// Partial update applied to an existing record.
///
/// `Some` fields are written; `None` fields are left untouched. Fields
/// cannot be cleared through this type — the directory never unsets
/// metadata once recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub company: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub status: Option<ProfileStatus>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl ProfileChanges {
    /// Changes that mark a record verified: status `active` plus the
    /// verification timestamp.
    #[must_use]
    pub fn verified(at: DateTime<Utc>) -> Self {
        Self {
            status: Some(ProfileStatus::Active),
            verified_at: Some(at),
            ..Self::default()
        }
    }

    /// Changes that assign a role.
    #[must_use]
    pub fn role(role: String) -> Self {
        Self {
            role: Some(role),
            ..Self::default()
        }
    }

    /// Returns true if no field would be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(s: &str) -> Handle {
        Handle::new(s).expect("valid handle")
    }

    #[test]
    fn pending_record_has_pending_status_and_timestamps() {
        let before = Utc::now();
        let record = ProfileRecord::pending(
            NewProfile::new(handle("ana@x.com"))
                .with_email(Some("ana@x.com".to_string()))
                .with_company(Some("Acme".to_string())),
        );
        let after = Utc::now();

        assert_eq!(record.status(), ProfileStatus::PendingVerification);
        assert_eq!(record.email(), Some("ana@x.com"));
        assert_eq!(record.company(), Some("Acme"));
        assert!(record.role().is_none());
        assert!(record.verified_at().is_none());
        assert!(record.created_at() >= before);
        assert!(record.created_at() <= after);
        assert_eq!(record.created_at(), record.updated_at());
    }

    #[test]
    fn apply_writes_some_fields_and_bumps_updated_at() {
        let mut record = ProfileRecord::pending(NewProfile::new(handle("ana@x.com")));
        let original_updated_at = record.updated_at();

        std::thread::sleep(std::time::Duration::from_millis(1));

        record.apply(&ProfileChanges {
            department: Some("FinOps".to_string()),
            role: Some("c3ops".to_string()),
            ..ProfileChanges::default()
        });

        assert_eq!(record.department(), Some("FinOps"));
        assert_eq!(record.role(), Some("c3ops"));
        assert_eq!(record.status(), ProfileStatus::PendingVerification);
        assert!(record.updated_at() > original_updated_at);
    }

    #[test]
    fn apply_leaves_none_fields_untouched() {
        let mut record = ProfileRecord::pending(
            NewProfile::new(handle("ana@x.com")).with_email(Some("ana@x.com".to_string())),
        );

        record.apply(&ProfileChanges::role("executive".to_string()));

        assert_eq!(record.email(), Some("ana@x.com"));
        assert_eq!(record.role(), Some("executive"));
    }

    #[test]
    fn verified_changes_set_status_and_timestamp() {
        let mut record = ProfileRecord::pending(NewProfile::new(handle("ana@x.com")));
        let at = Utc::now();

        record.apply(&ProfileChanges::verified(at));

        assert_eq!(record.status(), ProfileStatus::Active);
        assert_eq!(record.verified_at(), Some(at));
    }

    #[test]
    fn status_round_trips_through_storage_form() {
        assert_eq!(ProfileStatus::parse_lossy("active"), ProfileStatus::Active);
        assert_eq!(
            ProfileStatus::parse_lossy("pending_verification"),
            ProfileStatus::PendingVerification
        );
        assert_eq!(
            ProfileStatus::parse_lossy("garbage"),
            ProfileStatus::PendingVerification
        );
        assert_eq!(ProfileStatus::Active.as_str(), "active");
    }

    #[test]
    fn empty_changes_detected() {
        assert!(ProfileChanges::default().is_empty());
        assert!(!ProfileChanges::role("admin".to_string()).is_empty());
    }

    #[test]
    fn record_serialization_roundtrip() {
        let record = ProfileRecord::pending(
            NewProfile::new(handle("ana@x.com")).with_role(Some("admin".to_string())),
        );
        let json = serde_json::to_string(&record).expect("serialize");
        let parsed: ProfileRecord = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(record, parsed);
    }
}
