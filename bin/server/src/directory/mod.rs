//! Production profile-directory backend.

pub mod pg;

pub use pg::PgProfileDirectory;
