//! store
//!
//! The remote object/ref store.
//!
//! # Architecture
//!
//! [`ObjectStore`] is the seam between the commit pipeline and a concrete
//! remote. Every primitive maps to one git-data operation: resolve a branch,
//! create a blob, tree or commit, compare-and-swap a ref, and read a file
//! out of a tree.
//!
//! # Implementations
//!
//! - [`github::GitHubStore`] - GitHub REST git-data API
//! - [`mock::MockStore`] - in-memory, for tests
//!
//! # Example
//!
//! ```
//! use sitegit::store::mock::MockStore;
//! use sitegit::store::ObjectStore;
//!
//! let store = MockStore::new();
//! assert_eq!(store.name(), "mock");
//! ```

pub mod github;
pub mod mock;
mod traits;

pub use traits::{
    check_unique_paths, BlobEncoding, BranchTip, ObjectStore, RefUpdate, StoreError, TreeEntry,
};
