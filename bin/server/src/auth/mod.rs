//! Authentication module for the cloudledger server.
//!
//! This module provides:
//! - JSON routes driving every session-store operation (login, signup,
//!   confirmation, logout, profile updates, whoami)
//! - Extractors translating the route-guard decision into HTTP semantics
//! - Operator-gated directory administration routes
//!
//! # Authorization Model
//!
//! Authentication (can this caller act as a principal?) is decided by the
//! session store via the route guard. Authorization (what may they see?)
//! is decided by the role policy over the principal's profile record:
//! - `admin` passes every check
//! - `c3ops` unlocks operator consoles
//! - `executive` additionally unlocks client management
//!
//! Role changes take effect the next time the profile is fetched — on
//! sign-in, or after a profile edit refreshes the record.

pub mod admin;
pub mod extract;
pub mod routes;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "cl_session";
