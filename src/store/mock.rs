//! store::mock
//!
//! In-memory object store for deterministic testing.
//!
//! # Design
//!
//! Objects are content addressed with SHA-256 over a canonical encoding, so
//! identical content always yields the identical id. Trees are flat maps
//! from full repository path to blob, which is enough to model base-tree
//! retention. Ref updates are a real compare-and-swap under the store lock.
//!
//! Two hooks make races reproducible:
//! - [`MockStore::interleave_commit`] lands a foreign commit on the branch
//!   immediately before the next `update_ref` compares
//! - [`MockStore::gate_updates`] makes the next `n` calls to `update_ref`
//!   wait for each other, so concurrent callers all reach the comparison
//!   holding the same expected tip
//!
//! # Example
//!
//! ```
//! use sitegit::core::types::{BranchName, RepoPath};
//! use sitegit::store::mock::MockStore;
//! use sitegit::store::ObjectStore;
//!
//! # tokio_test::block_on(async {
//! let main = BranchName::new("main").unwrap();
//! let path = RepoPath::new("data/a.json").unwrap();
//! let store = MockStore::new().with_branch(&main, &[(&path, b"{}")]);
//!
//! let tip = store.resolve_ref(&main).await.unwrap();
//! let bytes = store.read_file(&tip.tree, &path).await.unwrap();
//! assert_eq!(bytes.as_deref(), Some(&b"{}"[..]));
//! # });
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Barrier;

use super::traits::{
    check_unique_paths, BlobEncoding, BranchTip, ObjectStore, RefUpdate, StoreError, TreeEntry,
};
use crate::core::types::{BranchName, FileMode, ObjectId, ObjectKind, RepoPath};

/// Mock store for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    inner: Arc<Mutex<MockStoreInner>>,
}

#[derive(Debug, Default)]
struct MockStoreInner {
    blobs: HashMap<ObjectId, Vec<u8>>,
    trees: HashMap<ObjectId, FlatTree>,
    commits: HashMap<ObjectId, MockCommit>,
    refs: HashMap<BranchName, ObjectId>,
    /// Operation to fail (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
    /// Foreign commit applied right before the next ref comparison.
    interleave: Option<Interleave>,
    /// Barrier the next ref updates wait on, and how many still will.
    update_gate: Option<(Arc<Barrier>, usize)>,
}

/// Full path to (mode, blob id).
type FlatTree = BTreeMap<RepoPath, (FileMode, ObjectId)>;

/// A stored commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCommit {
    pub message: String,
    pub tree: ObjectId,
    pub parents: Vec<ObjectId>,
}

#[derive(Debug)]
struct Interleave {
    files: Vec<(RepoPath, Vec<u8>)>,
    message: String,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    ResolveRef(StoreError),
    CreateBlob(StoreError),
    CreateTree(StoreError),
    CreateCommit(StoreError),
    UpdateRef(StoreError),
    ReadFile(StoreError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    ResolveRef {
        branch: String,
    },
    CreateBlob {
        len: usize,
        encoding: BlobEncoding,
    },
    CreateTree {
        base: Option<ObjectId>,
        paths: Vec<String>,
    },
    CreateCommit {
        message: String,
        parents: Vec<ObjectId>,
    },
    UpdateRef {
        branch: String,
        expected: ObjectId,
        new_tip: ObjectId,
    },
    ReadFile {
        path: String,
    },
}

impl MockOperation {
    /// Whether this operation writes to the store.
    pub fn is_write(&self) -> bool {
        !matches!(
            self,
            MockOperation::ResolveRef { .. } | MockOperation::ReadFile { .. }
        )
    }
}

impl MockStore {
    /// Create a new empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a branch with one root commit holding `files`.
    pub fn with_branch(self, branch: &BranchName, files: &[(&RepoPath, &[u8])]) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            let mut tree = FlatTree::new();
            for (path, content) in files {
                let blob = inner.put_blob(content);
                tree.insert((*path).clone(), (FileMode::Blob, blob));
            }
            let tree = inner.put_tree(tree);
            let commit = inner.put_commit(MockCommit {
                message: "Initial commit".to_string(),
                tree,
                parents: Vec::new(),
            });
            inner.refs.insert(branch.clone(), commit);
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// ```
    /// use sitegit::store::mock::{FailOn, MockStore};
    /// use sitegit::store::StoreError;
    ///
    /// let store = MockStore::new().fail_on(FailOn::CreateTree(StoreError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on = Some(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on = None;
    }

    /// Hold the next `parties` calls to `update_ref` until all of them
    /// have arrived, then let them compare one at a time.
    pub fn gate_updates(&self, parties: usize) {
        let mut inner = self.inner.lock().unwrap();
        inner.update_gate = Some((Arc::new(Barrier::new(parties)), parties));
    }

    /// Land a foreign commit writing `files` right before the next
    /// `update_ref` compares, as if another writer won the race.
    pub fn interleave_commit(&self, files: &[(&RepoPath, &[u8])], message: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.interleave = Some(Interleave {
            files: files
                .iter()
                .map(|(p, c)| ((*p).clone(), c.to_vec()))
                .collect(),
            message: message.to_string(),
        });
    }

    /// Commit `files` on top of the branch tip immediately.
    pub fn push_commit(
        &self,
        branch: &BranchName,
        files: &[(&RepoPath, &[u8])],
        message: &str,
    ) -> Result<ObjectId, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let files: Vec<(RepoPath, Vec<u8>)> = files
            .iter()
            .map(|(p, c)| ((*p).clone(), c.to_vec()))
            .collect();
        inner.advance(branch, &files, message)
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// Current tip of a branch (for test verification).
    pub fn tip(&self, branch: &BranchName) -> Option<BranchTip> {
        let inner = self.inner.lock().unwrap();
        inner.tip(branch).ok()
    }

    /// Content of `path` at the branch tip (for test verification).
    pub fn file_at(&self, branch: &BranchName, path: &RepoPath) -> Option<Vec<u8>> {
        let inner = self.inner.lock().unwrap();
        let tip = inner.tip(branch).ok()?;
        inner.lookup(&tip.tree, path)
    }

    /// Paths present at the branch tip (for test verification).
    pub fn paths_at(&self, branch: &BranchName) -> Vec<RepoPath> {
        let inner = self.inner.lock().unwrap();
        inner
            .tip(branch)
            .ok()
            .and_then(|tip| inner.trees.get(&tip.tree))
            .map(|tree| tree.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Get a stored commit (for test verification).
    pub fn commit(&self, id: &ObjectId) -> Option<MockCommit> {
        let inner = self.inner.lock().unwrap();
        inner.commits.get(id).cloned()
    }

    /// Number of stored commits.
    pub fn commit_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.commits.len()
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Option<StoreError> {
        let inner = self.inner.lock().unwrap();
        match &inner.fail_on {
            Some(FailOn::ResolveRef(e)) if expected == "resolve_ref" => Some(e.clone()),
            Some(FailOn::CreateBlob(e)) if expected == "create_blob" => Some(e.clone()),
            Some(FailOn::CreateTree(e)) if expected == "create_tree" => Some(e.clone()),
            Some(FailOn::CreateCommit(e)) if expected == "create_commit" => Some(e.clone()),
            Some(FailOn::UpdateRef(e)) if expected == "update_ref" => Some(e.clone()),
            Some(FailOn::ReadFile(e)) if expected == "read_file" => Some(e.clone()),
            _ => None,
        }
    }
}

impl MockStoreInner {
    fn tip(&self, branch: &BranchName) -> Result<BranchTip, StoreError> {
        let commit = self
            .refs
            .get(branch)
            .ok_or_else(|| StoreError::NotFound(format!("branch '{}'", branch)))?;
        let tree = self
            .commits
            .get(commit)
            .map(|c| c.tree.clone())
            .ok_or_else(|| StoreError::NotFound(format!("commit {}", commit)))?;
        Ok(BranchTip {
            commit: commit.clone(),
            tree,
        })
    }

    fn lookup(&self, tree: &ObjectId, path: &RepoPath) -> Option<Vec<u8>> {
        let (_, blob) = self.trees.get(tree)?.get(path)?;
        self.blobs.get(blob).cloned()
    }

    fn put_blob(&mut self, content: &[u8]) -> ObjectId {
        let mut hasher = Sha256::new();
        hasher.update(format!("blob {}\0", content.len()).as_bytes());
        hasher.update(content);
        let id = digest_id(hasher);
        self.blobs.entry(id.clone()).or_insert_with(|| content.to_vec());
        id
    }

    fn put_tree(&mut self, tree: FlatTree) -> ObjectId {
        let mut hasher = Sha256::new();
        hasher.update(b"tree\0");
        for (path, (mode, id)) in &tree {
            hasher.update(format!("{} {}\0{}\n", mode, path, id).as_bytes());
        }
        let id = digest_id(hasher);
        self.trees.entry(id.clone()).or_insert(tree);
        id
    }

    fn put_commit(&mut self, commit: MockCommit) -> ObjectId {
        let mut hasher = Sha256::new();
        hasher.update(format!("commit\0tree {}\n", commit.tree).as_bytes());
        for parent in &commit.parents {
            hasher.update(format!("parent {}\n", parent).as_bytes());
        }
        hasher.update(b"\n");
        hasher.update(commit.message.as_bytes());
        let id = digest_id(hasher);
        self.commits.entry(id.clone()).or_insert(commit);
        id
    }

    fn advance(
        &mut self,
        branch: &BranchName,
        files: &[(RepoPath, Vec<u8>)],
        message: &str,
    ) -> Result<ObjectId, StoreError> {
        let tip = self.tip(branch)?;
        let mut tree = self.trees.get(&tip.tree).cloned().unwrap_or_default();
        for (path, content) in files {
            let blob = self.put_blob(content);
            tree.insert(path.clone(), (FileMode::Blob, blob));
        }
        let tree = self.put_tree(tree);
        let commit = self.put_commit(MockCommit {
            message: message.to_string(),
            tree,
            parents: vec![tip.commit],
        });
        self.refs.insert(branch.clone(), commit.clone());
        Ok(commit)
    }
}

fn digest_id(hasher: Sha256) -> ObjectId {
    ObjectId::from_digest(&hasher.finalize())
}

#[async_trait]
impl ObjectStore for MockStore {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn resolve_ref(&self, branch: &BranchName) -> Result<BranchTip, StoreError> {
        self.record(MockOperation::ResolveRef {
            branch: branch.to_string(),
        });

        if let Some(err) = self.check_fail("resolve_ref") {
            return Err(err);
        }

        let inner = self.inner.lock().unwrap();
        inner.tip(branch)
    }

    async fn create_blob(
        &self,
        content: &[u8],
        encoding: BlobEncoding,
    ) -> Result<ObjectId, StoreError> {
        self.record(MockOperation::CreateBlob {
            len: content.len(),
            encoding,
        });

        if let Some(err) = self.check_fail("create_blob") {
            return Err(err);
        }
        if encoding == BlobEncoding::Utf8 && std::str::from_utf8(content).is_err() {
            return Err(StoreError::InvalidRequest(
                "utf-8 blob content is not valid UTF-8".into(),
            ));
        }

        let mut inner = self.inner.lock().unwrap();
        Ok(inner.put_blob(content))
    }

    async fn create_tree(
        &self,
        base_tree: Option<&ObjectId>,
        entries: &[TreeEntry],
    ) -> Result<ObjectId, StoreError> {
        self.record(MockOperation::CreateTree {
            base: base_tree.cloned(),
            paths: entries.iter().map(|e| e.path.to_string()).collect(),
        });

        if let Some(err) = self.check_fail("create_tree") {
            return Err(err);
        }
        check_unique_paths(entries)?;

        let mut inner = self.inner.lock().unwrap();
        let mut tree = match base_tree {
            Some(base) => inner
                .trees
                .get(base)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("tree {}", base)))?,
            None => FlatTree::new(),
        };

        for entry in entries {
            match entry.kind {
                ObjectKind::Blob => {
                    if !inner.blobs.contains_key(&entry.id) {
                        return Err(StoreError::NotFound(format!("blob {}", entry.id)));
                    }
                    tree.insert(entry.path.clone(), (entry.mode, entry.id.clone()));
                }
                ObjectKind::Tree => {
                    let subtree = inner
                        .trees
                        .get(&entry.id)
                        .ok_or_else(|| StoreError::NotFound(format!("tree {}", entry.id)))?;
                    let prefix = format!("{}/", entry.path);
                    tree.retain(|path, _| !path.as_str().starts_with(&prefix));
                    for (path, value) in subtree {
                        let joined = RepoPath::new(format!("{}{}", prefix, path))
                            .map_err(|e| StoreError::InvalidRequest(e.to_string()))?;
                        tree.insert(joined, value.clone());
                    }
                }
            }
        }

        Ok(inner.put_tree(tree))
    }

    async fn create_commit(
        &self,
        message: &str,
        tree: &ObjectId,
        parents: &[ObjectId],
    ) -> Result<ObjectId, StoreError> {
        self.record(MockOperation::CreateCommit {
            message: message.to_string(),
            parents: parents.to_vec(),
        });

        if let Some(err) = self.check_fail("create_commit") {
            return Err(err);
        }

        let mut inner = self.inner.lock().unwrap();
        if !inner.trees.contains_key(tree) {
            return Err(StoreError::NotFound(format!("tree {}", tree)));
        }
        if let Some(missing) = parents.iter().find(|p| !inner.commits.contains_key(*p)) {
            return Err(StoreError::NotFound(format!("commit {}", missing)));
        }

        Ok(inner.put_commit(MockCommit {
            message: message.to_string(),
            tree: tree.clone(),
            parents: parents.to_vec(),
        }))
    }

    async fn update_ref(
        &self,
        branch: &BranchName,
        expected: &ObjectId,
        new_tip: &ObjectId,
    ) -> Result<RefUpdate, StoreError> {
        self.record(MockOperation::UpdateRef {
            branch: branch.to_string(),
            expected: expected.clone(),
            new_tip: new_tip.clone(),
        });

        if let Some(err) = self.check_fail("update_ref") {
            return Err(err);
        }

        let gate = {
            let mut inner = self.inner.lock().unwrap();
            match inner.update_gate.as_mut() {
                Some((barrier, remaining)) if *remaining > 0 => {
                    *remaining -= 1;
                    Some(Arc::clone(barrier))
                }
                _ => None,
            }
        };
        if let Some(barrier) = gate {
            barrier.wait().await;
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(foreign) = inner.interleave.take() {
            inner.advance(branch, &foreign.files, &foreign.message)?;
        }
        if !inner.commits.contains_key(new_tip) {
            return Err(StoreError::NotFound(format!("commit {}", new_tip)));
        }

        let current = inner
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("branch '{}'", branch)))?;
        if current != *expected {
            return Ok(RefUpdate::Conflict {
                current: Some(current),
            });
        }

        inner.refs.insert(branch.clone(), new_tip.clone());
        Ok(RefUpdate::Updated)
    }

    async fn read_file(
        &self,
        tree: &ObjectId,
        path: &RepoPath,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        self.record(MockOperation::ReadFile {
            path: path.to_string(),
        });

        if let Some(err) = self.check_fail("read_file") {
            return Err(err);
        }

        let inner = self.inner.lock().unwrap();
        if !inner.trees.contains_key(tree) {
            return Err(StoreError::NotFound(format!("tree {}", tree)));
        }
        Ok(inner.lookup(tree, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn main() -> BranchName {
        BranchName::new("main").unwrap()
    }

    fn path(p: &str) -> RepoPath {
        RepoPath::new(p).unwrap()
    }

    #[tokio::test]
    async fn blobs_are_content_addressed() {
        let store = MockStore::new();
        let a = store.create_blob(b"hello", BlobEncoding::Utf8).await.unwrap();
        let b = store.create_blob(b"hello", BlobEncoding::Utf8).await.unwrap();
        let c = store.create_blob(b"world", BlobEncoding::Utf8).await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[tokio::test]
    async fn utf8_encoding_rejects_binary() {
        let store = MockStore::new();
        let result = store.create_blob(&[0xff, 0x00], BlobEncoding::Utf8).await;
        assert!(matches!(result, Err(StoreError::InvalidRequest(_))));
        assert!(store
            .create_blob(&[0xff, 0x00], BlobEncoding::Base64)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn tree_retains_base_entries() {
        let a = path("a.json");
        let b = path("dir/b.json");
        let store = MockStore::new().with_branch(&main(), &[(&a, b"A"), (&b, b"B")]);
        let tip = store.resolve_ref(&main()).await.unwrap();

        let blob = store.create_blob(b"B2", BlobEncoding::Utf8).await.unwrap();
        let tree = store
            .create_tree(Some(&tip.tree), &[TreeEntry::blob(b.clone(), blob)])
            .await
            .unwrap();

        assert_eq!(store.read_file(&tree, &a).await.unwrap(), Some(b"A".to_vec()));
        assert_eq!(store.read_file(&tree, &b).await.unwrap(), Some(b"B2".to_vec()));
        assert_eq!(store.read_file(&tree, &path("nope")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn tree_without_base_holds_only_entries() {
        let a = path("a.json");
        let store = MockStore::new().with_branch(&main(), &[(&a, b"A")]);
        let blob = store.create_blob(b"C", BlobEncoding::Utf8).await.unwrap();
        let c = path("c.json");
        let tree = store
            .create_tree(None, &[TreeEntry::blob(c.clone(), blob)])
            .await
            .unwrap();

        assert_eq!(store.read_file(&tree, &a).await.unwrap(), None);
        assert_eq!(store.read_file(&tree, &c).await.unwrap(), Some(b"C".to_vec()));
    }

    #[tokio::test]
    async fn tree_rejects_unknown_blob() {
        let store = MockStore::new();
        let bogus = ObjectId::new("deadbeef").unwrap();
        let result = store
            .create_tree(None, &[TreeEntry::blob(path("x"), bogus)])
            .await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn update_ref_is_compare_and_swap() {
        let a = path("a.json");
        let store = MockStore::new().with_branch(&main(), &[(&a, b"A")]);
        let tip = store.resolve_ref(&main()).await.unwrap();

        let commit = store
            .create_commit("next", &tip.tree, &[tip.commit.clone()])
            .await
            .unwrap();
        let stale = ObjectId::new("0000").unwrap();

        assert_eq!(
            store.update_ref(&main(), &stale, &commit).await.unwrap(),
            RefUpdate::Conflict {
                current: Some(tip.commit.clone())
            }
        );
        assert_eq!(store.tip(&main()).unwrap().commit, tip.commit);

        assert_eq!(
            store.update_ref(&main(), &tip.commit, &commit).await.unwrap(),
            RefUpdate::Updated
        );
        assert_eq!(store.tip(&main()).unwrap().commit, commit);
    }

    #[tokio::test]
    async fn interleaved_commit_wins_the_race() {
        let a = path("a.json");
        let store = MockStore::new().with_branch(&main(), &[(&a, b"A")]);
        let tip = store.resolve_ref(&main()).await.unwrap();
        let commit = store
            .create_commit("mine", &tip.tree, &[tip.commit.clone()])
            .await
            .unwrap();

        store.interleave_commit(&[(&a, b"theirs")], "theirs");
        let outcome = store.update_ref(&main(), &tip.commit, &commit).await.unwrap();

        assert!(matches!(outcome, RefUpdate::Conflict { current: Some(_) }));
        assert_eq!(store.file_at(&main(), &a), Some(b"theirs".to_vec()));
    }

    #[tokio::test]
    async fn missing_branch_is_not_found() {
        let store = MockStore::new();
        assert!(matches!(
            store.resolve_ref(&main()).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn fail_on_injects_error_and_records() {
        let store = MockStore::new()
            .with_branch(&main(), &[])
            .fail_on(FailOn::ResolveRef(StoreError::RateLimited));

        assert_eq!(store.resolve_ref(&main()).await, Err(StoreError::RateLimited));
        assert_eq!(
            store.operations(),
            vec![MockOperation::ResolveRef {
                branch: "main".into()
            }]
        );

        store.clear_fail_on();
        assert!(store.resolve_ref(&main()).await.is_ok());
    }

    #[test]
    fn push_commit_advances_branch() {
        let a = path("a.json");
        let store = MockStore::new().with_branch(&main(), &[(&a, b"A")]);
        let before = store.tip(&main()).unwrap();

        let commit = store.push_commit(&main(), &[(&a, b"B")], "external").unwrap();

        assert_eq!(store.tip(&main()).unwrap().commit, commit);
        assert_eq!(store.commit(&commit).unwrap().parents, vec![before.commit]);
        assert_eq!(store.file_at(&main(), &a), Some(b"B".to_vec()));
    }
}
