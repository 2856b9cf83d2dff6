//! Route guard: the access decision for protected screens.
//!
//! A pure function over the session snapshot. While the store is still
//! bootstrapping the decision is [`AccessDecision::Defer`], never a
//! redirect — users holding a valid resumable session must not be bounced
//! through the login flow by a race with startup.

use crate::state::SessionState;

/// Outcome of a guard evaluation for a protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// A principal is signed in; render the screen. A missing profile does
    /// not block rendering — it only affects role checks.
    Render,
    /// Bootstrap is still in flight; render a neutral placeholder and
    /// re-evaluate once it resolves.
    Defer,
    /// Nobody is signed in; send the caller to the login entry point,
    /// preserving where they were headed.
    RedirectToLogin {
        /// The navigation target to return to after authentication.
        target: String,
    },
}

/// Decides whether a protected route may render for the given session
/// snapshot. `requested` is the in-flight navigation target, preserved in
/// the redirect outcome.
#[must_use]
pub fn decide(state: &SessionState, requested: &str) -> AccessDecision {
    if state.loading() {
        return AccessDecision::Defer;
    }
    if state.principal().is_some() {
        return AccessDecision::Render;
    }
    AccessDecision::RedirectToLogin {
        target: requested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::principal::{Principal, SessionTokens};
    use cloudledger_core::Handle;

    fn signed_in_state() -> SessionState {
        SessionState {
            principal: Some(Principal::new(
                Handle::new("ana@x.com").expect("valid handle"),
                SessionTokens::new("access-1".to_string(), None, None),
            )),
            profile: None,
            loading: false,
            last_error: None,
        }
    }

    #[test]
    fn loading_defers_never_redirects() {
        let state = SessionState::bootstrapping();
        assert_eq!(decide(&state, "/reports"), AccessDecision::Defer);

        // Even with a principal already present, loading still defers.
        let state = SessionState {
            loading: true,
            ..signed_in_state()
        };
        assert_eq!(decide(&state, "/reports"), AccessDecision::Defer);
    }

    #[test]
    fn signed_in_renders() {
        assert_eq!(decide(&signed_in_state(), "/reports"), AccessDecision::Render);
    }

    #[test]
    fn signed_in_without_profile_still_renders() {
        let state = signed_in_state();
        assert!(state.profile().is_none());
        assert_eq!(decide(&state, "/reports"), AccessDecision::Render);
    }

    #[test]
    fn signed_out_redirects_preserving_target() {
        let state = SessionState {
            loading: false,
            ..SessionState::bootstrapping()
        };
        assert_eq!(
            decide(&state, "/clients/42/billing"),
            AccessDecision::RedirectToLogin {
                target: "/clients/42/billing".to_string()
            }
        );
    }
}
