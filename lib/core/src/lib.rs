//! Core identifier types for the cloudledger platform.
//!
//! This crate provides the strongly-typed identifiers shared by every other
//! crate in the workspace: [`Handle`] (a validated login identifier) and
//! [`SubjectId`] (the opaque subject assigned by the identity provider).

pub mod id;

pub use id::{Handle, InvalidHandle, SubjectId};
