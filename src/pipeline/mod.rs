//! pipeline
//!
//! The commit pipeline: one change set in, exactly one new commit out.
//!
//! # Algorithm
//!
//! 1. Resolve the branch tip `T0` (or take one the caller already holds)
//! 2. Create one blob per changed file
//! 3. Create a tree with `T0`'s tree as base and the blobs as delta
//! 4. Create a commit with that tree and parent `T0`
//! 5. Compare-and-swap the branch from `T0` to the new commit
//!
//! A failure at steps 1-4 leaves only unreferenced objects behind; the ref
//! update is the single commit point. A rejected compare-and-swap becomes
//! [`CommitError::ConcurrentModification`] and is never retried here.
//! Flows that can recompute their change use [`CommitPipeline::commit_with_policy`].
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sitegit::core::types::{BranchName, RepoPath};
//! use sitegit::pipeline::{ChangeSet, CommitPipeline};
//! use sitegit::store::mock::MockStore;
//!
//! # tokio_test::block_on(async {
//! let main = BranchName::new("main").unwrap();
//! let store = MockStore::new().with_branch(&main, &[]);
//! let pipeline = CommitPipeline::new(Arc::new(store.clone()));
//!
//! let mut changes = ChangeSet::new();
//! changes.insert_bytes(RepoPath::new("notes.txt").unwrap(), "hello");
//! let outcome = pipeline.commit_files(&main, "Add notes", &changes).await.unwrap();
//!
//! assert_eq!(store.tip(&main).unwrap().commit, outcome.commit);
//! # });
//! ```

mod changes;
mod commit;
mod errors;
mod reapply;

pub use changes::ChangeSet;
pub use commit::{CommitOutcome, CommitPipeline, Snapshot};
pub use errors::CommitError;
pub use reapply::{Applied, ConflictPolicy, PreparedCommit};
