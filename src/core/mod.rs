//! core
//!
//! Core domain types and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, ObjectId, RepoPath, FileMode
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing rejects malformed branches and paths before any network call
//! - Schemas are strict (`deny_unknown_fields`) and validated after parsing

pub mod config;
pub mod types;
