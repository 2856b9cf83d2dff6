//! Session state owned by the session store.

use cloudledger_directory::ProfileRecord;
use serde::{Deserialize, Serialize};

use crate::policy::RolePolicy;
use crate::principal::Principal;

/// Coarse lifecycle phase derived from the state fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// The initial resume attempt has not resolved yet. Consumers must not
    /// treat the absent principal as "definitely unauthenticated".
    Bootstrapping,
    /// No principal is signed in.
    Unauthenticated,
    /// A principal is signed in; its profile record may still be missing.
    Authenticated { profile_loaded: bool },
}

/// Snapshot of the session store's state.
///
/// The store is the single writer; consumers receive cloned snapshots and
/// only read. `loading` is true exactly during the bootstrap window between
/// construction and the first resolved resume attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub(crate) principal: Option<Principal>,
    pub(crate) profile: Option<ProfileRecord>,
    pub(crate) loading: bool,
    pub(crate) last_error: Option<String>,
}

impl SessionState {
    /// The initial state: bootstrap pending, nothing known.
    #[must_use]
    pub fn bootstrapping() -> Self {
        Self {
            principal: None,
            profile: None,
            loading: true,
            last_error: None,
        }
    }

    /// Returns the signed-in principal, if any.
    #[must_use]
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    /// Returns the principal's profile record, if one was found.
    #[must_use]
    pub fn profile(&self) -> Option<&ProfileRecord> {
        self.profile.as_ref()
    }

    /// Returns true while the initial resume attempt is unresolved.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// Returns the most recent provider error message, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the derived lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        if self.loading {
            SessionPhase::Bootstrapping
        } else if self.principal.is_some() {
            SessionPhase::Authenticated {
                profile_loaded: self.profile.is_some(),
            }
        } else {
            SessionPhase::Unauthenticated
        }
    }

    /// Returns the role policy evaluated over this snapshot's profile.
    #[must_use]
    pub fn policy(&self) -> RolePolicy<'_> {
        RolePolicy::new(self.profile.as_ref())
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::bootstrapping()
    }
}
