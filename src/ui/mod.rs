//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Output formatting and display
//!
//! # Design
//!
//! All terminal output goes through this module so quiet mode and the
//! stdout/stderr split are handled in one place. Log events go through
//! `tracing` instead and never mix with command results.

pub mod output;
