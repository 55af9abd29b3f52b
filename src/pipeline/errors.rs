//! pipeline::errors
//!
//! The failure taxonomy returned to application flows.
//!
//! Three conditions matter to callers: the credential was unavailable, the
//! remote store failed, or the branch moved underneath the commit. The
//! first two are fatal for the call; the third is an expected outcome of
//! optimistic concurrency and is kept distinct so the caller can re-read
//! and reapply.

use thiserror::Error;

use crate::content::ContentError;
use crate::core::types::{BranchName, ObjectId, RepoPath};
use crate::store::StoreError;

/// Errors from [`super::CommitPipeline`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommitError {
    /// The change set names no files.
    #[error("nothing to commit: the change set is empty")]
    EmptyChangeSet,

    /// The commit message is empty or whitespace.
    #[error("commit message cannot be empty")]
    EmptyMessage,

    /// A document could not be encoded.
    #[error("cannot encode '{path}': {source}")]
    Encode {
        path: RepoPath,
        #[source]
        source: ContentError,
    },

    /// No credential could be produced; no request was sent.
    #[error("credential unavailable: {0}")]
    AuthUnavailable(String),

    /// A remote store call failed; the branch was not changed.
    #[error("remote store error: {0}")]
    RemoteStore(StoreError),

    /// The branch no longer pointed at the expected tip.
    #[error("branch '{branch}' moved from {expected} while committing")]
    ConcurrentModification {
        branch: BranchName,
        expected: ObjectId,
        /// The tip the store observed, when it reports one
        current: Option<ObjectId>,
    },
}

impl From<StoreError> for CommitError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AuthUnavailable(msg) => CommitError::AuthUnavailable(msg),
            other => CommitError::RemoteStore(other),
        }
    }
}

impl CommitError {
    /// Whether retrying can succeed.
    ///
    /// A remote store failure mutated nothing, so the whole call may be
    /// repeated. A concurrent modification needs a re-read first.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommitError::RemoteStore(_) | CommitError::ConcurrentModification { .. }
        )
    }

    /// Whether this is the compare-and-swap rejection.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CommitError::ConcurrentModification { .. })
    }

    /// Text shown to the person who tried to save.
    pub fn user_message(&self) -> &'static str {
        match self {
            CommitError::AuthUnavailable(_) => "Cannot save, please re-authenticate.",
            CommitError::RemoteStore(StoreError::AuthFailed(_)) => {
                "Cannot save, please re-authenticate."
            }
            CommitError::ConcurrentModification { .. } => {
                "The content changed while you were editing. Reload and try again."
            }
            CommitError::EmptyChangeSet | CommitError::EmptyMessage | CommitError::Encode { .. } => {
                "Nothing could be saved: the change is invalid."
            }
            CommitError::RemoteStore(_) => "Saving failed. Please try again later.",
        }
    }
}
