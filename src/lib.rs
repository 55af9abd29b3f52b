//! sitegit - persist personal site content as atomic commits in a remote git repository
//!
//! The site's editable content (the about document and the guestbook) lives
//! in a git repository reached over an HTTP API instead of a database. Every
//! save becomes exactly one new commit on the content branch, and concurrent
//! editors are kept from overwriting each other by a compare-and-swap on
//! the branch ref.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture, leaf first:
//!
//! - [`core`] - Domain types and configuration
//! - [`content`] - Documents and their byte encoding
//! - [`auth`] - Credential providers
//! - [`store`] - Remote object/ref store (GitHub, in-memory)
//! - [`pipeline`] - Change set to commit, with optimistic concurrency
//! - [`site`] - The about and guestbook flows
//! - [`cli`] / [`ui`] - Command-line interface and output
//!
//! # Correctness Invariants
//!
//! 1. A successful commit call created exactly one commit and the branch
//!    points at it
//! 2. The branch only moves through compare-and-swap from the tip the
//!    change was built on
//! 3. A failed call never moves the branch
//! 4. Nothing is retried behind the caller's back; reapplying after a
//!    conflict re-reads content first

pub mod auth;
pub mod cli;
pub mod content;
pub mod core;
pub mod pipeline;
pub mod site;
pub mod store;
pub mod ui;
