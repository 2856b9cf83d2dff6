//! Profile directory for the cloudledger platform.
//!
//! The profile directory is the application-level store of per-user
//! metadata: role, company, department, and account lifecycle status. It is
//! keyed by the user's login handle and is deliberately decoupled from the
//! identity provider — a principal can be authenticated while having no
//! profile record at all, in which case every role check simply denies.
//!
//! This crate defines:
//! - [`ProfileRecord`] and its lifecycle types ([`ProfileStatus`],
//!   [`NewProfile`], [`ProfileChanges`])
//! - The [`ProfileDirectory`] storage contract
//! - [`MemoryDirectory`], an in-memory backend for tests and demo mode
//!
//! Production deployments plug in a network-backed implementation; the rest
//! of the platform only ever sees the trait.

pub mod directory;
pub mod error;
pub mod memory;
pub mod record;

pub use directory::ProfileDirectory;
pub use error::DirectoryError;
pub use memory::MemoryDirectory;
pub use record::{NewProfile, ProfileChanges, ProfileRecord, ProfileStatus};
