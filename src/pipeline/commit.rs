//! pipeline::commit
//!
//! The atomic "update these files" operation.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::changes::ChangeSet;
use super::errors::CommitError;
use crate::core::types::{BranchName, ObjectId, RepoPath};
use crate::store::{BlobEncoding, BranchTip, ObjectStore, RefUpdate, TreeEntry};

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// The new branch tip
    pub commit: ObjectId,
    /// Tree of the new commit
    pub tree: ObjectId,
    /// The tip the commit was built on
    pub parent: ObjectId,
}

/// File contents read at one branch tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub tip: BranchTip,
    /// `None` for paths absent from the tip's tree
    pub files: BTreeMap<RepoPath, Option<Vec<u8>>>,
}

impl Snapshot {
    /// Content of `path`, if it was requested and exists.
    pub fn get(&self, path: &RepoPath) -> Option<&[u8]> {
        self.files.get(path).and_then(|c| c.as_deref())
    }
}

/// Turns a [`ChangeSet`] into exactly one new commit on a branch.
///
/// The pipeline holds no mutable state. Clones share the store, and any
/// number of tasks may commit at once; the store's compare-and-swap on the
/// branch ref decides which of several racing commits wins.
#[derive(Clone)]
pub struct CommitPipeline {
    store: Arc<dyn ObjectStore>,
}

impl std::fmt::Debug for CommitPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitPipeline")
            .field("store", &self.store.name())
            .finish()
    }
}

impl CommitPipeline {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// Read the current tip of `branch`.
    pub async fn resolve_tip(&self, branch: &BranchName) -> Result<BranchTip, CommitError> {
        Ok(self.store.resolve_ref(branch).await?)
    }

    /// Commit `changes` on top of the current tip of `branch`.
    ///
    /// # Errors
    ///
    /// - `EmptyChangeSet` / `EmptyMessage` before any request is made
    /// - `AuthUnavailable` / `RemoteStore` when a store call fails; the
    ///   branch is untouched
    /// - `ConcurrentModification` when the branch moved after it was resolved
    pub async fn commit_files(
        &self,
        branch: &BranchName,
        message: &str,
        changes: &ChangeSet,
    ) -> Result<CommitOutcome, CommitError> {
        validate(message, changes)?;
        let tip = self.resolve_tip(branch).await?;
        self.commit_files_on(branch, &tip, message, changes).await
    }

    /// Commit `changes` on top of `expected`, a tip the caller already holds.
    ///
    /// Callers that built `changes` from content read at `expected` must
    /// commit against that same tip, so a branch that moved in between is
    /// reported instead of overwritten.
    pub async fn commit_files_on(
        &self,
        branch: &BranchName,
        expected: &BranchTip,
        message: &str,
        changes: &ChangeSet,
    ) -> Result<CommitOutcome, CommitError> {
        validate(message, changes)?;

        let mut entries = Vec::with_capacity(changes.len());
        for (path, content) in changes.iter() {
            let blob = self
                .store
                .create_blob(content, BlobEncoding::for_content(content))
                .await?;
            tracing::debug!(%path, blob = %blob.short(12), "created blob");
            entries.push(TreeEntry::blob(path.clone(), blob));
        }

        let tree = self
            .store
            .create_tree(Some(&expected.tree), &entries)
            .await?;
        tracing::debug!(tree = %tree.short(12), base = %expected.tree.short(12), "created tree");

        let commit = self
            .store
            .create_commit(message, &tree, std::slice::from_ref(&expected.commit))
            .await?;
        tracing::debug!(commit = %commit.short(12), "created commit");

        match self.store.update_ref(branch, &expected.commit, &commit).await? {
            RefUpdate::Updated => {
                tracing::info!(
                    %branch,
                    from = %expected.commit.short(12),
                    to = %commit.short(12),
                    files = changes.len(),
                    "branch advanced"
                );
                Ok(CommitOutcome {
                    commit,
                    tree,
                    parent: expected.commit.clone(),
                })
            }
            RefUpdate::Conflict { current } => {
                tracing::warn!(
                    %branch,
                    expected = %expected.commit.short(12),
                    current = current.as_ref().map(|c| c.short(12)).unwrap_or("unknown"),
                    "branch moved, commit rejected"
                );
                Err(CommitError::ConcurrentModification {
                    branch: branch.clone(),
                    expected: expected.commit.clone(),
                    current,
                })
            }
        }
    }

    /// Resolve the tip of `branch` and read `paths` from its tree.
    pub async fn snapshot(
        &self,
        branch: &BranchName,
        paths: &[RepoPath],
    ) -> Result<Snapshot, CommitError> {
        let tip = self.resolve_tip(branch).await?;
        let mut files = BTreeMap::new();
        for path in paths {
            let content = self.store.read_file(&tip.tree, path).await?;
            files.insert(path.clone(), content);
        }
        Ok(Snapshot { tip, files })
    }
}

fn validate(message: &str, changes: &ChangeSet) -> Result<(), CommitError> {
    if changes.is_empty() {
        return Err(CommitError::EmptyChangeSet);
    }
    if message.trim().is_empty() {
        return Err(CommitError::EmptyMessage);
    }
    Ok(())
}
