//! Role policy: pure predicates over a profile record's role.
//!
//! Roles are open strings compared case-insensitively. The super-role
//! satisfies every check unconditionally. A missing profile or missing
//! role means "no privilege" — the predicates are total and never fail;
//! callers render an access-restricted view instead of erroring.

use cloudledger_directory::ProfileRecord;

/// Role that satisfies every check (administrative bypass).
pub const SUPER_ROLE: &str = "admin";

/// Operations-team role that unlocks operator consoles (client management,
/// onboarding).
pub const OPERATIONS_ROLE: &str = "c3ops";

/// Executive role with read access to client management.
pub const EXECUTIVE_ROLE: &str = "executive";

/// Predicates derived from an optional profile record.
///
/// Cheap to construct per check; borrows the snapshot it evaluates.
#[derive(Debug, Clone, Copy)]
pub struct RolePolicy<'a> {
    profile: Option<&'a ProfileRecord>,
}

impl<'a> RolePolicy<'a> {
    /// Creates a policy over an optional profile record.
    #[must_use]
    pub fn new(profile: Option<&'a ProfileRecord>) -> Self {
        Self { profile }
    }

    fn role(&self) -> Option<&str> {
        self.profile.and_then(ProfileRecord::role)
    }

    /// True if the profile's role equals `required` case-insensitively, or
    /// is the super-role.
    #[must_use]
    pub fn has_role(&self, required: &str) -> bool {
        match self.role() {
            Some(role) => {
                role.eq_ignore_ascii_case(required) || role.eq_ignore_ascii_case(SUPER_ROLE)
            }
            None => false,
        }
    }

    /// True if [`has_role`](Self::has_role) holds for any element of
    /// `required`. False for an empty set.
    #[must_use]
    pub fn has_any_role(&self, required: &[&str]) -> bool {
        required.iter().any(|role| self.has_role(role))
    }

    /// True for the roles allowed into operator-only consoles.
    #[must_use]
    pub fn is_privileged_operator(&self) -> bool {
        self.has_any_role(&[SUPER_ROLE, OPERATIONS_ROLE])
    }

    /// True for the roles allowed to manage client accounts.
    #[must_use]
    pub fn can_manage_clients(&self) -> bool {
        self.has_any_role(&[SUPER_ROLE, OPERATIONS_ROLE, EXECUTIVE_ROLE])
    }
}
