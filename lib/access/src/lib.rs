//! Authentication, session management, and role policy for the cloudledger
//! console.
//!
//! This crate provides:
//! - Session management (`SessionStore`, `SessionState`) over an injected
//!   identity provider and profile directory
//! - The identity-provider contract (`IdentityProvider`) with an in-memory
//!   implementation for tests and demo mode
//! - Role-based access checks (`RolePolicy`) over profile records
//! - The route-guard decision (`guard::decide`) for protected screens
//!
//! # Access Control Model
//!
//! Authentication and authorization are deliberately decoupled. The
//! identity provider decides who can sign in; the profile directory's
//! `role` field decides what they can see. A signed-in principal with no
//! profile record renders normally but passes no role check.
//!
//! # Example
//!
//! ```
//! use cloudledger_access::guard::{self, AccessDecision};
//! use cloudledger_access::{RolePolicy, SessionState};
//! use cloudledger_core::Handle;
//! use cloudledger_directory::{NewProfile, ProfileRecord};
//!
//! // Role checks are case-insensitive and the admin role passes them all.
//! let profile = ProfileRecord::pending(
//!     NewProfile::new(Handle::new("ana@x.com").unwrap())
//!         .with_role(Some("Admin".to_string())),
//! );
//! let policy = RolePolicy::new(Some(&profile));
//! assert!(policy.has_role("executive"));
//! assert!(policy.is_privileged_operator());
//!
//! // While the session store is still bootstrapping, protected screens
//! // defer instead of redirecting.
//! let state = SessionState::bootstrapping();
//! assert_eq!(guard::decide(&state, "/reports"), AccessDecision::Defer);
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod memory;
pub mod policy;
pub mod principal;
pub mod provider;
pub mod state;
pub mod store;

// Re-export main types at crate root
pub use config::{UserPoolConfig, UserPoolConfigBuilder};
pub use error::{IdentityError, SessionError};
pub use guard::AccessDecision;
pub use memory::{AccountFixture, MemoryIdentityProvider};
pub use policy::{EXECUTIVE_ROLE, OPERATIONS_ROLE, RolePolicy, SUPER_ROLE};
pub use principal::{Principal, SessionTokens};
pub use provider::{Attribute, IdentityProvider, SignInResponse};
pub use state::{SessionPhase, SessionState};
pub use store::{SessionStore, SignIn, SignUp, SignUpRequest};
