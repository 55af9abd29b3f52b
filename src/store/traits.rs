//! store::traits
//!
//! The object/ref store trait and its request/response types.
//!
//! # Design
//!
//! The trait is async because every primitive is a network round trip.
//! Objects (blobs, trees, commits) are immutable and content addressed; the
//! only mutation is [`ObjectStore::update_ref`], a compare-and-swap on a
//! branch. The store, not the caller, is the authority for that comparison.
//!
//! # Example
//!
//! ```ignore
//! use sitegit::store::{BlobEncoding, ObjectStore, RefUpdate, TreeEntry};
//!
//! async fn write_one(store: &dyn ObjectStore, branch: &BranchName, path: RepoPath) -> Result<(), StoreError> {
//!     let tip = store.resolve_ref(branch).await?;
//!     let blob = store.create_blob(b"{}", BlobEncoding::Utf8).await?;
//!     let tree = store.create_tree(Some(&tip.tree), &[TreeEntry::blob(path, blob)]).await?;
//!     let commit = store.create_commit("update", &tree, &[tip.commit.clone()]).await?;
//!     match store.update_ref(branch, &tip.commit, &commit).await? {
//!         RefUpdate::Updated => Ok(()),
//!         RefUpdate::Conflict { .. } => todo!("re-read and reapply"),
//!     }
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::{BranchName, FileMode, ObjectId, ObjectKind, RepoPath};

/// Errors from store operations.
///
/// These map to the failure modes of a remote git-data API. None of them
/// implies the branch was changed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The credential provider could not produce a credential.
    #[error("credential unavailable: {0}")]
    AuthUnavailable(String),

    /// The remote rejected the credential (invalid, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested branch or object does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// The API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The request itself was malformed (e.g. duplicate tree paths).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Current state of a branch: its tip commit and that commit's tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchTip {
    pub commit: ObjectId,
    pub tree: ObjectId,
}

/// How blob content is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlobEncoding {
    /// Content is valid UTF-8 text and sent as-is
    #[default]
    Utf8,
    /// Content is arbitrary bytes and sent base64 encoded
    Base64,
}

impl BlobEncoding {
    /// Choose the encoding for a payload: text when it is valid UTF-8.
    pub fn for_content(content: &[u8]) -> Self {
        if std::str::from_utf8(content).is_ok() {
            BlobEncoding::Utf8
        } else {
            BlobEncoding::Base64
        }
    }

    /// Wire name of the encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlobEncoding::Utf8 => "utf-8",
            BlobEncoding::Base64 => "base64",
        }
    }
}

/// One entry of a tree delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: RepoPath,
    pub mode: FileMode,
    pub kind: ObjectKind,
    pub id: ObjectId,
}

impl TreeEntry {
    /// A regular file entry pointing at a blob.
    pub fn blob(path: RepoPath, id: ObjectId) -> Self {
        Self {
            path,
            mode: FileMode::Blob,
            kind: ObjectKind::Blob,
            id,
        }
    }
}

/// Outcome of a compare-and-swap on a branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefUpdate {
    /// The branch now points at the new commit.
    Updated,
    /// The branch no longer pointed at the expected commit; nothing changed.
    Conflict {
        /// The tip the store observed, when it reports one
        current: Option<ObjectId>,
    },
}

/// Reject tree deltas that name the same path twice.
pub fn check_unique_paths(entries: &[TreeEntry]) -> Result<(), StoreError> {
    let mut seen = std::collections::HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.path.as_str()) {
            return Err(StoreError::InvalidRequest(format!(
                "duplicate tree path '{}'",
                entry.path
            )));
        }
    }
    Ok(())
}

/// The remote object/ref store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store is shared by every
/// concurrent pipeline invocation.
///
/// # Errors
///
/// All methods return `Result<T, StoreError>`. Callers should handle:
/// - `AuthUnavailable`: no credential could be produced; nothing was sent
/// - `AuthFailed`: prompt the user to re-authenticate
/// - `NotFound`: branch or object does not exist
/// - `RateLimited` / `Timeout` / `NetworkError` / `ApiError`: generic failure,
///   safe to retry wholesale because no ref was moved
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Get the store name (e.g., "github", "mock").
    fn name(&self) -> &'static str;

    /// Read the current tip of a branch.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    async fn resolve_ref(&self, branch: &BranchName) -> Result<BranchTip, StoreError>;

    /// Store a blob and return its content identifier.
    ///
    /// Identical content always yields the identical identifier. Size limits
    /// are enforced by the remote.
    async fn create_blob(
        &self,
        content: &[u8],
        encoding: BlobEncoding,
    ) -> Result<ObjectId, StoreError>;

    /// Create a tree from a base tree plus a delta.
    ///
    /// Paths in the base and absent from `entries` are retained; paths in
    /// `entries` are added or replaced. With no base the tree contains
    /// exactly `entries`.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if `entries` names a path twice
    async fn create_tree(
        &self,
        base_tree: Option<&ObjectId>,
        entries: &[TreeEntry],
    ) -> Result<ObjectId, StoreError>;

    /// Create a commit object.
    async fn create_commit(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> Result<ObjectId, StoreError>;

    /// Atomically move `branch` from `expected` to `new_tip`.
    ///
    /// Returns [`RefUpdate::Conflict`] without changing anything when the
    /// branch no longer points at `expected`.
    async fn update_ref(
        &self,
        branch: &BranchName,
        expected: &ObjectId,
        new_tip: &ObjectId,
    ) -> Result<RefUpdate, StoreError>;

    /// Read the blob at `path` inside `tree`.
    ///
    /// Returns `None` when no blob exists at that path.
    async fn read_file(&self, tree: &ObjectId, path: &RepoPath)
        -> Result<Option<Vec<u8>>, StoreError>;
}
